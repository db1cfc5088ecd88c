//! Integration tests for `HierarchyStore` caching and lookups.

use std::sync::Arc;

use dalil_api::DirectoryClient;
use dalil_geo::HierarchyStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cities_body() -> serde_json::Value {
    serde_json::json!([
        { "id": 1, "name": "Riyadh", "slug": "riyadh", "regionId": 10 },
        { "id": 2, "name": "Jeddah", "slug": "jeddah", "regionId": 11 },
        { "id": 3, "name": "Taif", "slug": "taif", "regionId": 11 }
    ])
}

fn regions_body() -> serde_json::Value {
    serde_json::json!([
        { "id": 10, "name": "Riyadh Region", "slug": "riyadh-region", "countryId": 100 },
        { "id": 11, "name": "Makkah Region", "slug": "makkah-region", "countryId": 100 }
    ])
}

fn countries_body() -> serde_json::Value {
    serde_json::json!([
        { "id": 100, "name": "Saudi Arabia", "slug": "saudi-arabia", "code": "SA" }
    ])
}

fn store_for(server: &MockServer) -> HierarchyStore {
    let client = DirectoryClient::with_base_url(&server.uri(), 30)
        .expect("client construction should not fail");
    HierarchyStore::new(Arc::new(client))
}

#[tokio::test]
async fn repeat_fetch_issues_one_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let first = store.fetch_cities(false).await.expect("first fetch");
    let second = store.fetch_cities(false).await.expect("second fetch");

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn force_refetches_even_when_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .expect(2)
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.fetch_cities(false).await.expect("first fetch");
    store.fetch_cities(true).await.expect("forced fetch");
}

#[tokio::test]
async fn concurrent_first_fetches_coalesce() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let (a, b) = tokio::join!(store.fetch_cities(false), store.fetch_cities(false));
    assert_eq!(a.expect("fetch a"), b.expect("fetch b"));
}

#[tokio::test]
async fn failed_fetch_leaves_cache_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(store.fetch_cities(false).await.is_err());
    let cities = store.fetch_cities(false).await.expect("retry should succeed");
    assert_eq!(cities.len(), 3);
}

#[tokio::test]
async fn slug_lookup_is_case_insensitive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.fetch_cities(false).await.expect("fetch");

    let city = store.city_by_slug("RiYaDh").await.expect("city should match");
    assert_eq!(city.id, 1);
    assert!(store.city_by_slug("unknown").await.is_none());
}

#[tokio::test]
async fn lookups_answer_nothing_before_load() {
    let server = MockServer::start().await;
    let store = store_for(&server);
    assert!(store.city_by_slug("riyadh").await.is_none());
    assert!(store.representative_city(11).await.is_none());
}

#[tokio::test]
async fn representative_city_is_first_in_backend_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.fetch_cities(false).await.expect("fetch");

    // Jeddah precedes Taif in the backend list for Makkah Region.
    let city = store.representative_city(11).await.expect("match");
    assert_eq!(city.name, "Jeddah");
    assert!(store.representative_city(99).await.is_none());
}

#[tokio::test]
async fn any_city_in_country_walks_region_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(regions_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(countries_body()))
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.ensure_loaded().await.expect("load");

    let city = store.any_city_in_country(100).await.expect("match");
    assert_eq!(city.region_id, 10);
    assert!(store.any_city_in_country(999).await.is_none());
}

#[tokio::test]
async fn default_city_prefers_home_name_then_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .mount(&server)
        .await;

    let store = store_for(&server);
    store.fetch_cities(false).await.expect("fetch");

    assert_eq!(store.default_city("jeddah").await.expect("match").id, 2);
    // Unknown home name falls back to the first city in the hierarchy.
    assert_eq!(store.default_city("Dubai").await.expect("match").id, 1);
}
