use super::*;

use grabber_core::Shop;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEOCODE_PATH: &str = "/maps/api/geocode/json";

fn test_config(api_key: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: Some("postgres://localhost/grabber_test".to_string()),
        log_level: "info".to_string(),
        db_max_connections: 2,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        scraper_request_timeout_secs: 5,
        scraper_user_agent: "grabber-test/0.1".to_string(),
        scraper_max_concurrent_requests: 2,
        default_location: "tokyo".to_string(),
        geocoding_api_key: api_key.map(str::to_string),
        geocode_rate_per_sec: 50,
        geocode_timeout_secs: 5,
        geocode_batch_limit: 100,
    }
}

fn client(server: &MockServer) -> GeocodingClient {
    GeocodingClient::with_base_url("test-key", 5, 50, &server.uri())
        .expect("failed to build test GeocodingClient")
}

fn shop(n: u32, address: Option<&str>) -> Shop {
    Shop {
        name: format!("Shop {n}"),
        tabelog_url: format!("https://tabelog.com/tokyo/A1303/A130301/1300{n:04}/"),
        price: "3.40".to_string(),
        station: "Shibuya".to_string(),
        station_distance: "5min".to_string(),
        prefecture: Some("tokyo".to_string()),
        address: address.map(str::to_string),
    }
}

/// Inserts `shops` and writes their addresses, as a crawl would.
async fn seed(pool: &sqlx::PgPool, shops: &[Shop]) {
    grabber_db::insert_shops(pool, shops)
        .await
        .expect("seed insert failed");
    for s in shops {
        grabber_db::update_shop(pool, s)
            .await
            .expect("seed update failed");
    }
}

async fn stored(pool: &sqlx::PgPool, shop: &Shop) -> ShopRow {
    grabber_db::get_shop_by_url(pool, &shop.tabelog_url)
        .await
        .unwrap()
        .expect("seeded row should exist")
}

// ---------------------------------------------------------------------------
// build_geocoding_client
// ---------------------------------------------------------------------------

#[test]
fn missing_api_key_is_an_error() {
    let err = build_geocoding_client(&test_config(None))
        .err()
        .expect("expected an error without an API key");
    assert!(
        err.to_string().contains("GOOGLE_MAPS_GEOCODING_API_KEY"),
        "got: {err}"
    );
}

#[test]
fn configured_api_key_builds_client() {
    assert!(build_geocoding_client(&test_config(Some("k"))).is_ok());
}

// ---------------------------------------------------------------------------
// run_geocode (live database)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn found_result_is_committed(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let target = shop(1, Some("東京都渋谷区道玄坂2-6-17"));
    seed(&pool, std::slice::from_ref(&target)).await;

    let body = json!({
        "status": "OK",
        "results": [{
            "geometry": {
                "location": { "lat": 35.6595, "lng": 139.6982 },
                "location_type": "ROOFTOP"
            }
        }]
    });
    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", "東京都渋谷区道玄坂2-6-17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let summary = run_geocode(&pool, &client(&server), 10).await.unwrap();

    assert_eq!(summary.geocoded, 1);
    assert_eq!(summary.failed, 0);

    let row = stored(&pool, &target).await;
    assert!(row.is_geocoded);
    assert_eq!(row.latitude, Some(35.6595));
    assert_eq!(row.longitude, Some(139.6982));
    assert_eq!(row.location_type.as_deref(), Some("ROOFTOP"));
    assert_eq!(row.full_api_response, Some(body));
}

#[sqlx::test(migrations = "../../migrations")]
async fn provider_error_leaves_row_pending(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let target = shop(2, Some("Somewhere 1-1"));
    seed(&pool, std::slice::from_ref(&target)).await;

    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OVER_QUERY_LIMIT",
            "error_message": "You have exceeded your rate-limit for this API.",
            "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = run_geocode(&pool, &client(&server), 10).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.geocoded, 0);

    let row = stored(&pool, &target).await;
    assert!(!row.is_geocoded);
    assert!(row.latitude.is_none());
    assert!(row.full_api_response.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_results_leave_row_pending(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let target = shop(3, Some("Nowhere 0-0"));
    seed(&pool, std::slice::from_ref(&target)).await;

    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "OK", "results": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let summary = run_geocode(&pool, &client(&server), 10).await.unwrap();

    assert_eq!(summary.no_result, 1);
    assert!(!stored(&pool, &target).await.is_geocoded);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rows_without_address_are_not_sent(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed(&pool, &[shop(4, None)]).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let summary = run_geocode(&pool, &client(&server), 10).await.unwrap();

    assert_eq!(summary.pending, 1);
    assert_eq!(summary.skipped, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn one_failure_does_not_stop_the_batch(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let bad = shop(5, Some("Bad Address"));
    let good = shop(6, Some("Good Address"));
    seed(&pool, &[bad.clone(), good.clone()]).await;

    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", "Bad Address"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", "Good Address"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "geometry": {
                    "location": { "lat": 34.7, "lng": 135.5 },
                    "location_type": "APPROXIMATE"
                }
            }]
        })))
        .mount(&server)
        .await;

    let summary = run_geocode(&pool, &client(&server), 10).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.geocoded, 1);
    assert!(!stored(&pool, &bad).await.is_geocoded);
    assert!(stored(&pool, &good).await.is_geocoded);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rows_without_address_do_not_starve_the_batch(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed(&pool, &[shop(8, None), shop(9, None)]).await;
    let target = shop(10, Some("Behind The Queue 3-3"));
    seed(&pool, std::slice::from_ref(&target)).await;

    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", "Behind The Queue 3-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "geometry": {
                    "location": { "lat": 35.1, "lng": 136.9 },
                    "location_type": "ROOFTOP"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Fewer slots than address-less rows.
    let summary = run_geocode(&pool, &client(&server), 2).await.unwrap();

    assert_eq!(summary.geocoded, 1);
    assert_eq!(summary.skipped, 1);
    assert!(stored(&pool, &target).await.is_geocoded);
}

#[sqlx::test(migrations = "../../migrations")]
async fn geocoded_rows_are_not_picked_up_again(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed(&pool, &[shop(7, Some("Once Only"))]).await;

    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{
                "geometry": {
                    "location": { "lat": 35.0, "lng": 135.7 },
                    "location_type": "GEOMETRIC_CENTER"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let first = run_geocode(&pool, &client(&server), 10).await.unwrap();
    let second = run_geocode(&pool, &client(&server), 10).await.unwrap();

    assert_eq!(first.geocoded, 1);
    assert_eq!(second.pending, 0);
}
