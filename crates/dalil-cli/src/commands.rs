//! Command handlers for the CLI.
//!
//! Each handler wires the client, hierarchy store, and the relevant piece of
//! the location core from the shared configuration, runs one operation, and
//! prints a human-readable result.

use std::str::FromStr;
use std::sync::Arc;

use dalil_api::types::{AdPlacement, BusinessQuery};
use dalil_api::DirectoryClient;
use dalil_core::AppConfig;
use dalil_geo::{
    BootstrapOutcome, Coordinates, FixedPosition, GeoBootstrapper, HierarchyStore,
    LocationDescriptor, LocationResolver, Resolution, ReverseGeocoder, SessionState,
};
use dalil_search::SuggestionAggregator;
use dalil_targeting::{select_ad, BusinessFinder};

fn build_client(config: &AppConfig) -> anyhow::Result<Arc<DirectoryClient>> {
    Ok(Arc::new(DirectoryClient::new(config)?))
}

pub(crate) async fn run_resolve(config: &AppConfig, slug: &str) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let store = Arc::new(HierarchyStore::new(Arc::clone(&client)));
    let resolver = LocationResolver::new(store, client, config.default_city_name.clone());

    match resolver.resolve(slug).await {
        Resolution::City(d) => print_descriptor("city", &d)?,
        Resolution::Region {
            descriptor,
            representative_city,
        } => {
            print_descriptor("region", &descriptor)?;
            match representative_city {
                Some(city) => println!("representative city: {} ({})", city.name, city.slug),
                None => println!("representative city: none"),
            }
        }
        Resolution::Country(d) => print_descriptor("country", &d)?,
        Resolution::Unresolved => println!("'{slug}' did not resolve to any location"),
    }
    Ok(())
}

pub(crate) async fn run_locate(
    config: &AppConfig,
    latitude: f64,
    longitude: f64,
) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let store = Arc::new(HierarchyStore::new(Arc::clone(&client)));
    let geocoder = ReverseGeocoder::new(config)?;
    let session = Arc::new(SessionState::new(LocationDescriptor::global()));
    let bootstrapper = GeoBootstrapper::new(
        store,
        client,
        geocoder,
        Arc::clone(&session),
        config,
    );

    let source = FixedPosition(Coordinates {
        latitude,
        longitude,
    });
    match bootstrapper.run(&source).await {
        BootstrapOutcome::Resolved(d) => print_descriptor("located", &d)?,
        BootstrapOutcome::AppliedDefault(Some(d)) => {
            println!("no hierarchy match for ({latitude}, {longitude}); fell back to default");
            print_descriptor("default", &d)?;
        }
        BootstrapOutcome::AppliedDefault(None) => {
            println!("no hierarchy match and no default city available");
        }
        BootstrapOutcome::AlreadyRan | BootstrapOutcome::SkippedExplicit => {
            println!("geolocation skipped");
        }
    }
    Ok(())
}

pub(crate) async fn run_suggest(
    config: &AppConfig,
    query: &str,
    city_id: Option<i64>,
    places: bool,
) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let aggregator = SuggestionAggregator::new(client, config);

    if places {
        let Some(suggestions) = aggregator.suggest_places(query).await else {
            return Ok(());
        };
        println!("places for '{}':", suggestions.query);
        for city in &suggestions.cities {
            println!("  city    {} ({})", city.name, city.slug);
        }
        for region in &suggestions.regions {
            println!("  region  {} ({})", region.name, region.slug);
        }
        for country in &suggestions.countries {
            println!("  country {} ({})", country.name, country.slug);
        }
        if suggestions.is_empty() {
            println!("  (none)");
        }
        return Ok(());
    }

    let Some(suggestions) = aggregator.suggest(query, city_id).await else {
        return Ok(());
    };
    println!("suggestions for '{}':", suggestions.query);
    for category in &suggestions.categories {
        println!("  category {} ({})", category.name, category.slug);
    }
    for business in &suggestions.businesses {
        println!("  business {} ({})", business.name, business.slug);
    }
    if suggestions.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

pub(crate) async fn run_businesses(
    config: &AppConfig,
    slug: &str,
    category_ids: Vec<i64>,
    search: Option<String>,
) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let store = Arc::new(HierarchyStore::new(Arc::clone(&client)));
    let resolver = LocationResolver::new(
        Arc::clone(&store),
        Arc::clone(&client),
        config.default_city_name.clone(),
    );

    let resolution = resolver.resolve_or_default(slug).await;
    let Some(location) = resolution.descriptor() else {
        anyhow::bail!("'{slug}' did not resolve and no default city is available");
    };

    let finder = BusinessFinder::new(client, store);
    let filters = BusinessQuery {
        category_ids,
        search,
        ..BusinessQuery::default()
    };
    let results = finder.search(&filters, location).await;

    let context = &results.location_context;
    match &context.applied {
        Some(applied) if context.fallback_applied => {
            println!(
                "no results in {}; showing {} from {} ({})",
                context.requested.name, results.pagination.total, applied.name, applied.kind
            );
        }
        Some(applied) => {
            println!("{} results in {}", results.pagination.total, applied.name);
        }
        None => println!("no results for this search anywhere"),
    }
    for business in &results.businesses {
        let rating = business
            .rating
            .map_or_else(|| "unrated".to_owned(), |r| format!("{r:.1}"));
        println!("  {} ({}) [{rating}]", business.name, business.slug);
    }
    Ok(())
}

pub(crate) async fn run_ad(
    config: &AppConfig,
    placement: &str,
    slug: &str,
    category_id: Option<i64>,
) -> anyhow::Result<()> {
    let placement = AdPlacement::from_str(placement).map_err(anyhow::Error::msg)?;
    let client = build_client(config)?;
    let store = Arc::new(HierarchyStore::new(Arc::clone(&client)));
    let resolver = LocationResolver::new(
        Arc::clone(&store),
        Arc::clone(&client),
        config.default_city_name.clone(),
    );

    let resolution = resolver.resolve_or_default(slug).await;
    let Some(location) = resolution.descriptor() else {
        anyhow::bail!("'{slug}' did not resolve and no default city is available");
    };
    store.ensure_loaded().await?;
    let ancestry = store.ancestry_of(location).await;

    let candidates = client.display_candidates(placement).await?;
    match select_ad(
        &candidates,
        placement,
        category_id,
        &ancestry,
        chrono::Utc::now(),
    ) {
        Some(ad) => println!("{}", serde_json::to_string_pretty(ad)?),
        None => println!(
            "no eligible {} ad for {}",
            placement.as_str(),
            location.name
        ),
    }
    Ok(())
}

fn print_descriptor(label: &str, descriptor: &LocationDescriptor) -> anyhow::Result<()> {
    println!("{label}: {}", serde_json::to_string_pretty(descriptor)?);
    Ok(())
}
