//! Integration tests for the one-shot geolocation bootstrapper.

use std::sync::Arc;
use std::time::Duration;

use dalil_api::DirectoryClient;
use dalil_core::{AppConfig, Environment};
use dalil_geo::{
    BootstrapOutcome, Coordinates, FixedPosition, GeoBootstrapper, HierarchyStore, PositionError,
    PositionSource, ReverseGeocoder, SelectionSource, SessionState,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct DeniedPosition;

impl PositionSource for DeniedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Err(PositionError::Denied)
    }
}

struct NeverPosition;

impl PositionSource for NeverPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        std::future::pending().await
    }
}

fn jeddah_fix() -> FixedPosition {
    FixedPosition(Coordinates {
        latitude: 21.54,
        longitude: 39.17,
    })
}

fn test_config(base_url: &str, timeout_secs: u64) -> AppConfig {
    AppConfig {
        api_base_url: base_url.to_owned(),
        geocode_base_url: base_url.to_owned(),
        env: Environment::Test,
        log_level: "debug".to_owned(),
        request_timeout_secs: 30,
        connect_timeout_secs: 10,
        user_agent: "dalil-tests/0.1".to_owned(),
        max_retries: 0,
        retry_backoff_base_ms: 0,
        default_city_name: "Riyadh".to_owned(),
        geolocation_timeout_secs: timeout_secs,
        suggest_debounce_ms: 300,
        suggest_min_query_len: 2,
        suggest_group_limit: 5,
    }
}

async fn mount_hierarchy(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 1, "name": "Riyadh", "slug": "riyadh", "regionId": 10 },
            { "id": 2, "name": "Jeddah", "slug": "jeddah", "regionId": 11 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 10, "name": "Riyadh Region", "slug": "riyadh-region", "countryId": 100 },
            { "id": 11, "name": "Makkah Region", "slug": "makkah-region", "countryId": 100 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 100, "name": "Saudi Arabia", "slug": "saudi-arabia", "code": "SA" }
        ])))
        .mount(server)
        .await;
}

fn reverse_body(address: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "place_id": 42, "address": address })
}

struct Fixture {
    bootstrapper: GeoBootstrapper,
    session: Arc<SessionState>,
}

fn fixture(server: &MockServer, timeout_secs: u64) -> Fixture {
    let cfg = test_config(&server.uri(), timeout_secs);
    let client = Arc::new(DirectoryClient::new(&cfg).expect("client"));
    let store = Arc::new(HierarchyStore::new(Arc::clone(&client)));
    let geocoder = ReverseGeocoder::new(&cfg).expect("geocoder");
    let session = Arc::new(SessionState::new(
        dalil_geo::LocationDescriptor::global(),
    ));
    let bootstrapper = GeoBootstrapper::new(
        store,
        client,
        geocoder,
        Arc::clone(&session),
        &cfg,
    );
    Fixture {
        bootstrapper,
        session,
    }
}

#[tokio::test]
async fn geolocated_city_is_applied_from_local_match() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "jsonv2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reverse_body(
            serde_json::json!({ "city": "Jeddah", "state": "Makkah Region", "country": "Saudi Arabia" }),
        )))
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let outcome = f.bootstrapper.run(&jeddah_fix()).await;

    assert!(
        matches!(outcome, BootstrapOutcome::Resolved(ref d) if d.name == "Jeddah"),
        "expected Jeddah, got {outcome:?}"
    );
    assert_eq!(f.session.current().name, "Jeddah");
    assert_eq!(f.session.source(), SelectionSource::Geolocated);
}

#[tokio::test]
async fn runs_at_most_once_per_session() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reverse_body(
            serde_json::json!({ "city": "Jeddah" }),
        )))
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let first = f.bootstrapper.run(&jeddah_fix()).await;
    let second = f.bootstrapper.run(&jeddah_fix()).await;

    assert!(matches!(first, BootstrapOutcome::Resolved(_)));
    assert_eq!(second, BootstrapOutcome::AlreadyRan);
}

#[tokio::test]
async fn denied_permission_applies_default_city() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;

    let f = fixture(&server, 10);
    let outcome = f.bootstrapper.run(&DeniedPosition).await;

    assert!(
        matches!(outcome, BootstrapOutcome::AppliedDefault(Some(ref d)) if d.name == "Riyadh"),
        "expected the default city, got {outcome:?}"
    );
    assert_eq!(f.session.source(), SelectionSource::Geolocated);
}

#[tokio::test]
async fn position_timeout_applies_default_city() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;

    let f = fixture(&server, 1);
    let outcome = f.bootstrapper.run(&NeverPosition).await;

    assert!(
        matches!(outcome, BootstrapOutcome::AppliedDefault(Some(ref d)) if d.name == "Riyadh"),
        "expected the default city, got {outcome:?}"
    );
}

#[tokio::test]
async fn geocode_failure_applies_default_city() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let outcome = f.bootstrapper.run(&jeddah_fix()).await;

    assert!(matches!(
        outcome,
        BootstrapOutcome::AppliedDefault(Some(_))
    ));
}

#[tokio::test]
async fn explicit_selection_is_skipped_entirely() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;

    let f = fixture(&server, 10);
    let riyadh = dalil_geo::LocationDescriptor {
        kind: dalil_geo::LocationKind::City,
        id: Some(1),
        slug: "riyadh".to_owned(),
        name: "Riyadh".to_owned(),
        region_id: Some(10),
    };
    f.session.select(riyadh);

    let outcome = f.bootstrapper.run(&jeddah_fix()).await;
    assert_eq!(outcome, BootstrapOutcome::SkippedExplicit);
    assert_eq!(f.session.current().name, "Riyadh");
}

#[tokio::test]
async fn selection_during_geocode_is_not_overwritten() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reverse_body(serde_json::json!({ "city": "Jeddah" })))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let bootstrapper = Arc::new(f.bootstrapper);
    let session = Arc::clone(&f.session);

    let run = {
        let bootstrapper = Arc::clone(&bootstrapper);
        tokio::spawn(async move { bootstrapper.run(&jeddah_fix()).await })
    };

    // The user picks a city while the reverse geocode is still in flight.
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.select(dalil_geo::LocationDescriptor {
        kind: dalil_geo::LocationKind::City,
        id: Some(1),
        slug: "riyadh".to_owned(),
        name: "Riyadh".to_owned(),
        region_id: Some(10),
    });

    let outcome = run.await.expect("bootstrap task");
    assert_eq!(outcome, BootstrapOutcome::SkippedExplicit);
    assert_eq!(f.session.current().name, "Riyadh");
    assert_eq!(f.session.source(), SelectionSource::Explicit);
}

#[tokio::test]
async fn cascade_falls_through_to_remote_city_search() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reverse_body(
            serde_json::json!({ "town": "Thuwal" }),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/search/unified"))
        .and(query_param("query", "Thuwal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cities": [ { "id": 9, "name": "Thuwal", "slug": "thuwal", "regionId": 11 } ],
            "regions": [],
            "countries": [],
            "query": "Thuwal"
        })))
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let outcome = f.bootstrapper.run(&jeddah_fix()).await;

    assert!(
        matches!(outcome, BootstrapOutcome::Resolved(ref d) if d.name == "Thuwal"),
        "expected the remotely matched city, got {outcome:?}"
    );
}

#[tokio::test]
async fn cascade_maps_region_to_representative_city() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    // No city-like fields at all; only the state matches a region.
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reverse_body(
            serde_json::json!({ "state": "Makkah Region" }),
        )))
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let outcome = f.bootstrapper.run(&jeddah_fix()).await;

    assert!(
        matches!(outcome, BootstrapOutcome::Resolved(ref d) if d.name == "Jeddah"),
        "expected the region's representative city, got {outcome:?}"
    );
}

#[tokio::test]
async fn cascade_maps_country_to_any_city() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reverse_body(
            serde_json::json!({ "country": "Saudi Arabia" }),
        )))
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let outcome = f.bootstrapper.run(&jeddah_fix()).await;

    assert!(
        matches!(outcome, BootstrapOutcome::Resolved(ref d) if d.kind == dalil_geo::LocationKind::City),
        "expected some city under the country, got {outcome:?}"
    );
}

#[tokio::test]
async fn exhausted_cascade_applies_default_city() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reverse_body(
            serde_json::json!({ "city": "Reykjavik", "country": "Iceland" }),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/locations/search/unified"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cities": [], "regions": [], "countries": [], "query": ""
        })))
        .mount(&server)
        .await;

    let f = fixture(&server, 10);
    let outcome = f.bootstrapper.run(&jeddah_fix()).await;

    assert!(
        matches!(outcome, BootstrapOutcome::AppliedDefault(Some(ref d)) if d.name == "Riyadh"),
        "expected the default city, got {outcome:?}"
    );
}
