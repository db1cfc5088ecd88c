//! Slug → typed location resolution.
//!
//! Precedence is most specific first: a slug that matches both a city and a
//! region always resolves to the city. A local cache miss on the city step
//! falls through to one remote city-by-slug lookup before region matching
//! is attempted. Resolved slugs are memoized for the session, and the memo
//! lock is held across the whole resolution so concurrent calls for the
//! same slug collapse into one lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use dalil_api::types::City;
use dalil_api::DirectoryClient;

use crate::descriptor::LocationDescriptor;
use crate::hierarchy::HierarchyStore;

/// Outcome of resolving one URL slug.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    City(LocationDescriptor),
    /// A region match additionally carries a representative city, because
    /// several downstream features (search defaults, listings) are keyed on
    /// a city even when the user browses at region granularity.
    Region {
        descriptor: LocationDescriptor,
        representative_city: Option<City>,
    },
    Country(LocationDescriptor),
    /// The slug matched nothing. Callers render a not-found state, except
    /// on the default route where [`LocationResolver::resolve_or_default`]
    /// substitutes the home city.
    Unresolved,
}

impl Resolution {
    #[must_use]
    pub fn descriptor(&self) -> Option<&LocationDescriptor> {
        match self {
            Resolution::City(d) | Resolution::Country(d) => Some(d),
            Resolution::Region { descriptor, .. } => Some(descriptor),
            Resolution::Unresolved => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }
}

pub struct LocationResolver {
    store: Arc<HierarchyStore>,
    client: Arc<DirectoryClient>,
    default_city_name: String,
    memo: Mutex<HashMap<String, Resolution>>,
}

impl LocationResolver {
    #[must_use]
    pub fn new(
        store: Arc<HierarchyStore>,
        client: Arc<DirectoryClient>,
        default_city_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            client,
            default_city_name: default_city_name.into(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a URL slug into a typed location.
    ///
    /// Never fails: network errors during resolution are logged and degrade
    /// to [`Resolution::Unresolved`]. A resolution that degraded this way is
    /// not memoized, so a later call for the same slug can heal once the
    /// backend recovers.
    pub async fn resolve(&self, slug: &str) -> Resolution {
        let slug = slug.trim().to_lowercase();
        if slug.is_empty() {
            return Resolution::Unresolved;
        }

        // Held across the lookup: concurrent calls for the same slug wait
        // here and then hit the memo instead of re-resolving.
        let mut memo = self.memo.lock().await;
        if let Some(resolution) = memo.get(&slug) {
            tracing::debug!(%slug, "slug resolution served from memo");
            return resolution.clone();
        }

        let (resolution, degraded) = self.resolve_uncached(&slug).await;
        if resolution.is_resolved() || !degraded {
            memo.insert(slug, resolution.clone());
        }
        resolution
    }

    /// Like [`LocationResolver::resolve`], but substitutes the configured
    /// home city (else the first city in the hierarchy) when the slug does
    /// not resolve. Used for the default/home route, which must always have
    /// a location.
    pub async fn resolve_or_default(&self, slug: &str) -> Resolution {
        let resolution = self.resolve(slug).await;
        if resolution.is_resolved() {
            return resolution;
        }
        self.default_resolution().await
    }

    /// The hard-default resolution: the configured home city, else the first
    /// city in the hierarchy, else `Unresolved` when nothing is loaded.
    pub async fn default_resolution(&self) -> Resolution {
        if let Err(e) = self.store.fetch_cities(false).await {
            tracing::warn!(error = %e, "could not load cities for default resolution");
        }
        match self.store.default_city(&self.default_city_name).await {
            Some(city) => Resolution::City(LocationDescriptor::from_city(&city)),
            None => Resolution::Unresolved,
        }
    }

    /// One full precedence pass: city (local, then remote), region, country.
    /// Returns the resolution and whether a network failure degraded it.
    async fn resolve_uncached(&self, slug: &str) -> (Resolution, bool) {
        let mut degraded = false;

        if let Err(e) = self.store.fetch_cities(false).await {
            tracing::warn!(%slug, error = %e, "city list unavailable during resolution");
            degraded = true;
        }
        if let Some(city) = self.store.city_by_slug(slug).await {
            return (
                Resolution::City(LocationDescriptor::from_city(&city)),
                degraded,
            );
        }

        match self.client.city_by_slug(slug).await {
            Ok(Some(city)) => {
                return (
                    Resolution::City(LocationDescriptor::from_city(&city)),
                    degraded,
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%slug, error = %e, "remote city lookup failed");
                degraded = true;
            }
        }

        if let Err(e) = self.store.fetch_regions(false).await {
            tracing::warn!(%slug, error = %e, "region list unavailable during resolution");
            degraded = true;
        }
        if let Some(region) = self.store.region_by_slug(slug).await {
            let representative_city = self.store.representative_city(region.id).await;
            if representative_city.is_none() {
                tracing::debug!(%slug, region_id = region.id, "region has no representative city");
            }
            return (
                Resolution::Region {
                    descriptor: LocationDescriptor::from_region(&region),
                    representative_city,
                },
                degraded,
            );
        }

        if let Err(e) = self.store.fetch_countries(false).await {
            tracing::warn!(%slug, error = %e, "country list unavailable during resolution");
            degraded = true;
        }
        if let Some(country) = self.store.country_by_slug(slug).await {
            return (
                Resolution::Country(LocationDescriptor::from_country(&country)),
                degraded,
            );
        }

        tracing::debug!(%slug, "slug did not resolve to any location");
        (Resolution::Unresolved, degraded)
    }
}
