mod crawl;
mod enrich;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "grabber")]
#[command(about = "Crawl ramen shops from Tabelog and geocode their addresses")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl listing and detail pages for a location
    Crawl {
        /// Location slug in the listing URL (e.g. tokyo); defaults to
        /// `GRABBER_DEFAULT_LOCATION`
        location: Option<String>,
        /// Number of listing pages to fetch
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        /// Fetch and extract listing pages without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Geocode stored shops that have an address but no coordinates
    Geocode {
        /// Maximum rows to process; defaults to `GRABBER_GEOCODE_BATCH_LIMIT`
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Clean stored data (not implemented)
    Clean {
        /// Output kind to clean
        #[arg(long = "type", default_value = "csv")]
        kind: String,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // DATABASE_URL is checked later, only by commands that open a pool.
    let config = grabber_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Crawl {
            location,
            pages,
            dry_run,
        }) => {
            let location = location.unwrap_or_else(|| config.default_location.clone());
            let client = grabber_scraper::TabelogClient::new(
                config.scraper_request_timeout_secs,
                &config.scraper_user_agent,
            )?;
            let options = crawl::CrawlOptions {
                location: &location,
                pages,
                date: chrono::Local::now().date_naive(),
                max_concurrent: config.scraper_max_concurrent_requests,
            };

            if dry_run {
                crawl::preview_crawl(&client, &options).await;
                return Ok(());
            }

            let pool = connect_and_migrate(&config).await?;
            let summary = crawl::run_crawl(&pool, &client, &options).await?;
            println!("{summary}");
        }
        Some(Commands::Geocode { limit }) => {
            let client = enrich::build_geocoding_client(&config)?;
            let pool = connect_and_migrate(&config).await?;
            let limit = limit.unwrap_or(config.geocode_batch_limit);
            let summary = enrich::run_geocode(&pool, &client, limit).await?;
            println!("{summary}");
        }
        Some(Commands::Clean { kind }) => {
            tracing::info!(kind = %kind, "clean is not implemented; nothing to do");
        }
        Some(Commands::Db { command }) => {
            let database_url = config.require_database_url()?;
            let pool_config = grabber_db::PoolConfig::from_app_config(&config);
            let pool = grabber_db::connect_pool(database_url, pool_config).await?;
            match command {
                DbCommands::Ping => {
                    grabber_db::ping(&pool).await?;
                    println!("database: ok");
                }
                DbCommands::Migrate => {
                    let applied = grabber_db::run_migrations(&pool).await?;
                    println!("migrations applied: {applied}");
                }
            }
        }
        None => println!("grabber: no command given; run `grabber --help`"),
    }

    Ok(())
}

/// Connects the pool and brings the schema up to date.
///
/// # Errors
///
/// Fails without a configured `DATABASE_URL`; either step failing aborts the
/// command.
async fn connect_and_migrate(config: &grabber_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let database_url = config.require_database_url()?;
    let pool_config = grabber_db::PoolConfig::from_app_config(config);
    let pool = grabber_db::connect_pool(database_url, pool_config).await?;
    let applied = grabber_db::run_migrations(&pool).await?;
    tracing::debug!(applied, "migrations checked");
    Ok(pool)
}
