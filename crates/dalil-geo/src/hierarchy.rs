//! Session-lifetime cache of the country → region → city hierarchy.
//!
//! Each collection is fetched at most once per session (unless `force` is
//! passed) and indexed by id and lower-cased slug. The populate step holds
//! an async lock across the network call, so concurrent first fetches
//! coalesce into a single request and every waiter sees the same cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use dalil_api::types::{City, Country, Region};
use dalil_api::{ApiError, DirectoryClient};

use crate::descriptor::{LocationAncestry, LocationDescriptor, LocationKind};

trait Keyed {
    fn key_id(&self) -> i64;
    fn key_slug(&self) -> &str;
}

impl Keyed for Country {
    fn key_id(&self) -> i64 {
        self.id
    }
    fn key_slug(&self) -> &str {
        &self.slug
    }
}

impl Keyed for Region {
    fn key_id(&self) -> i64 {
        self.id
    }
    fn key_slug(&self) -> &str {
        &self.slug
    }
}

impl Keyed for City {
    fn key_id(&self) -> i64 {
        self.id
    }
    fn key_slug(&self) -> &str {
        &self.slug
    }
}

/// One cached collection, indexed by id and lower-cased slug.
#[derive(Debug)]
struct Indexed<T> {
    items: Vec<T>,
    by_id: HashMap<i64, usize>,
    by_slug: HashMap<String, usize>,
}

impl<T: Keyed> Indexed<T> {
    fn build(items: Vec<T>) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_slug = HashMap::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            by_id.insert(item.key_id(), idx);
            // First writer wins on a duplicate slug; list order is backend order.
            by_slug.entry(item.key_slug().to_lowercase()).or_insert(idx);
        }
        Self {
            items,
            by_id,
            by_slug,
        }
    }

    fn by_id(&self, id: i64) -> Option<&T> {
        self.by_id.get(&id).map(|&idx| &self.items[idx])
    }

    fn by_slug(&self, slug: &str) -> Option<&T> {
        self.by_slug
            .get(&slug.to_lowercase())
            .map(|&idx| &self.items[idx])
    }
}

type Slot<T> = Mutex<Option<Arc<Indexed<T>>>>;

/// Process-wide cache of the geographic hierarchy.
///
/// Read-mostly: the only writer is the fetch-once populate step. All lookup
/// methods answer from the cache and never trigger network I/O; callers that
/// need the data loaded go through the `fetch_*` methods (or
/// [`HierarchyStore::ensure_loaded`]) first.
pub struct HierarchyStore {
    client: Arc<DirectoryClient>,
    countries: Slot<Country>,
    regions: Slot<Region>,
    cities: Slot<City>,
}

impl HierarchyStore {
    #[must_use]
    pub fn new(client: Arc<DirectoryClient>) -> Self {
        Self {
            client,
            countries: Mutex::new(None),
            regions: Mutex::new(None),
            cities: Mutex::new(None),
        }
    }

    /// Fetches (or returns the cached) country list.
    ///
    /// Idempotent: repeat calls without `force` return the cached value and
    /// issue no network request. Concurrent first calls coalesce into one
    /// request.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the directory client; the cache is left
    /// untouched on failure so a later call can retry.
    pub async fn fetch_countries(&self, force: bool) -> Result<Vec<Country>, ApiError> {
        let mut guard = self.countries.lock().await;
        if !force {
            if let Some(cache) = guard.as_ref() {
                tracing::debug!(count = cache.items.len(), "countries served from cache");
                return Ok(cache.items.clone());
            }
        }
        let items = self.client.list_countries().await?;
        let cache = Indexed::build(items);
        let out = cache.items.clone();
        *guard = Some(Arc::new(cache));
        Ok(out)
    }

    /// Fetches (or returns the cached) region list. See
    /// [`HierarchyStore::fetch_countries`] for the caching contract.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the directory client.
    pub async fn fetch_regions(&self, force: bool) -> Result<Vec<Region>, ApiError> {
        let mut guard = self.regions.lock().await;
        if !force {
            if let Some(cache) = guard.as_ref() {
                tracing::debug!(count = cache.items.len(), "regions served from cache");
                return Ok(cache.items.clone());
            }
        }
        let items = self.client.list_regions(None).await?;
        let cache = Indexed::build(items);
        let out = cache.items.clone();
        *guard = Some(Arc::new(cache));
        Ok(out)
    }

    /// Fetches (or returns the cached) city list. See
    /// [`HierarchyStore::fetch_countries`] for the caching contract.
    ///
    /// # Errors
    ///
    /// Propagates [`ApiError`] from the directory client.
    pub async fn fetch_cities(&self, force: bool) -> Result<Vec<City>, ApiError> {
        let mut guard = self.cities.lock().await;
        if !force {
            if let Some(cache) = guard.as_ref() {
                tracing::debug!(count = cache.items.len(), "cities served from cache");
                return Ok(cache.items.clone());
            }
        }
        let items = self.client.list_cities(None).await?;
        let cache = Indexed::build(items);
        let out = cache.items.clone();
        *guard = Some(Arc::new(cache));
        Ok(out)
    }

    /// Loads all three collections if they are not cached yet.
    ///
    /// # Errors
    ///
    /// Propagates the first [`ApiError`] encountered.
    pub async fn ensure_loaded(&self) -> Result<(), ApiError> {
        self.fetch_countries(false).await?;
        self.fetch_regions(false).await?;
        self.fetch_cities(false).await?;
        Ok(())
    }

    async fn countries_snapshot(&self) -> Option<Arc<Indexed<Country>>> {
        self.countries.lock().await.clone()
    }

    async fn regions_snapshot(&self) -> Option<Arc<Indexed<Region>>> {
        self.regions.lock().await.clone()
    }

    async fn cities_snapshot(&self) -> Option<Arc<Indexed<City>>> {
        self.cities.lock().await.clone()
    }

    /// Case-insensitive exact slug match against the cached city list.
    pub async fn city_by_slug(&self, slug: &str) -> Option<City> {
        self.cities_snapshot().await?.by_slug(slug).cloned()
    }

    /// Case-insensitive exact slug match against the cached region list.
    pub async fn region_by_slug(&self, slug: &str) -> Option<Region> {
        self.regions_snapshot().await?.by_slug(slug).cloned()
    }

    /// Case-insensitive exact slug match against the cached country list.
    pub async fn country_by_slug(&self, slug: &str) -> Option<Country> {
        self.countries_snapshot().await?.by_slug(slug).cloned()
    }

    pub async fn city_by_id(&self, id: i64) -> Option<City> {
        self.cities_snapshot().await?.by_id(id).cloned()
    }

    pub async fn region_by_id(&self, id: i64) -> Option<Region> {
        self.regions_snapshot().await?.by_id(id).cloned()
    }

    pub async fn country_by_id(&self, id: i64) -> Option<Country> {
        self.countries_snapshot().await?.by_id(id).cloned()
    }

    /// The city that stands in for a region when a city-level context is
    /// structurally required: the first cached city belonging to the region.
    pub async fn representative_city(&self, region_id: i64) -> Option<City> {
        let cities = self.cities_snapshot().await?;
        cities
            .items
            .iter()
            .find(|c| c.region_id == region_id)
            .cloned()
    }

    /// Any city under the given country, walking city → region → country.
    /// Requires both the city and region caches to be loaded.
    pub async fn any_city_in_country(&self, country_id: i64) -> Option<City> {
        let cities = self.cities_snapshot().await?;
        let regions = self.regions_snapshot().await?;
        cities
            .items
            .iter()
            .find(|c| {
                regions
                    .by_id(c.region_id)
                    .is_some_and(|r| r.country_id == country_id)
            })
            .cloned()
    }

    /// The configured "home" city, matched case-insensitively by name, else
    /// the first city in the hierarchy.
    pub async fn default_city(&self, home_name: &str) -> Option<City> {
        let cities = self.cities_snapshot().await?;
        let home = home_name.to_lowercase();
        cities
            .items
            .iter()
            .find(|c| c.name.to_lowercase() == home)
            .or_else(|| cities.items.first())
            .cloned()
    }

    /// Matches a reverse-geocoded place name against cached cities: exact
    /// name/slug match first, then containment in either direction.
    pub async fn city_by_name(&self, candidate: &str) -> Option<City> {
        let cities = self.cities_snapshot().await?;
        let needle = candidate.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        cities
            .items
            .iter()
            .find(|c| {
                let name = c.name.to_lowercase();
                name == needle || c.slug.to_lowercase() == needle
            })
            .or_else(|| {
                cities.items.iter().find(|c| {
                    let name = c.name.to_lowercase();
                    name.contains(&needle) || needle.contains(&name)
                })
            })
            .cloned()
    }

    /// Case-insensitive exact name (or slug) match against cached regions.
    pub async fn region_by_name(&self, candidate: &str) -> Option<Region> {
        let regions = self.regions_snapshot().await?;
        let needle = candidate.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        regions
            .items
            .iter()
            .find(|r| r.name.to_lowercase() == needle || r.slug.to_lowercase() == needle)
            .cloned()
    }

    /// Case-insensitive exact name (or slug) match against cached countries.
    pub async fn country_by_name(&self, candidate: &str) -> Option<Country> {
        let countries = self.countries_snapshot().await?;
        let needle = candidate.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        countries
            .items
            .iter()
            .find(|c| c.name.to_lowercase() == needle || c.slug.to_lowercase() == needle)
            .cloned()
    }

    /// The next-less-specific descriptor for fallback broadening:
    /// city → its region, region → its country, country → global.
    ///
    /// When the parent cannot be found in the cache (partial load), the
    /// broadening degrades straight to global rather than guessing an id.
    pub async fn parent_of(&self, descriptor: &LocationDescriptor) -> Option<LocationDescriptor> {
        match descriptor.kind {
            LocationKind::City => {
                let region = match descriptor.region_id {
                    Some(region_id) => self.region_by_id(region_id).await,
                    None => None,
                };
                Some(match region {
                    Some(r) => LocationDescriptor::from_region(&r),
                    None => {
                        tracing::warn!(
                            slug = %descriptor.slug,
                            "city has no cached parent region; broadening to global"
                        );
                        LocationDescriptor::global()
                    }
                })
            }
            LocationKind::Region => {
                let country = match descriptor.id {
                    Some(id) => match self.region_by_id(id).await {
                        Some(r) => self.country_by_id(r.country_id).await,
                        None => None,
                    },
                    None => None,
                };
                Some(match country {
                    Some(c) => LocationDescriptor::from_country(&c),
                    None => {
                        tracing::warn!(
                            slug = %descriptor.slug,
                            "region has no cached parent country; broadening to global"
                        );
                        LocationDescriptor::global()
                    }
                })
            }
            LocationKind::Country => Some(LocationDescriptor::global()),
            LocationKind::Global => None,
        }
    }

    /// Resolves the ancestor chain of a descriptor for advertisement
    /// eligibility. Lookup-only; load the hierarchy first.
    pub async fn ancestry_of(&self, descriptor: &LocationDescriptor) -> LocationAncestry {
        match descriptor.kind {
            LocationKind::City => {
                let region_id = descriptor.region_id;
                let country_id = match region_id {
                    Some(rid) => self.region_by_id(rid).await.map(|r| r.country_id),
                    None => None,
                };
                LocationAncestry {
                    city_id: descriptor.id,
                    region_id,
                    country_id,
                }
            }
            LocationKind::Region => {
                let country_id = match descriptor.id {
                    Some(id) => self.region_by_id(id).await.map(|r| r.country_id),
                    None => None,
                };
                LocationAncestry {
                    city_id: None,
                    region_id: descriptor.id,
                    country_id,
                }
            }
            LocationKind::Country => LocationAncestry {
                city_id: None,
                region_id: None,
                country_id: descriptor.id,
            },
            LocationKind::Global => LocationAncestry::default(),
        }
    }
}
