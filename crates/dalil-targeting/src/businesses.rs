//! Location-scoped business search with fallback broadening.
//!
//! The requested location is applied as an exact filter first. While the
//! result set is empty, the scope widens exactly one level at a time
//! (city → region → country → global), stopping at the first level with
//! results. The returned [`LocationContext`] records whether broadening
//! happened so callers can render "showing results from X" messaging.

use std::sync::Arc;

use serde::Serialize;

use dalil_api::types::{Business, BusinessQuery, Pagination};
use dalil_api::DirectoryClient;
use dalil_geo::{HierarchyStore, LocationDescriptor, LocationKind};

/// A location reference in the search result metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRef {
    pub id: Option<i64>,
    pub kind: LocationKind,
    pub name: String,
}

impl From<&LocationDescriptor> for LocationRef {
    fn from(d: &LocationDescriptor) -> Self {
        Self {
            id: d.id,
            kind: d.kind,
            name: d.name.clone(),
        }
    }
}

/// Where the results actually came from, relative to what was asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationContext {
    pub requested: LocationRef,
    /// The level that produced results, or `None` when even the unscoped
    /// query was empty.
    pub applied: Option<LocationRef>,
    /// `true` whenever `applied` differs from `requested`.
    pub fallback_applied: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopedResults {
    pub businesses: Vec<Business>,
    pub pagination: Pagination,
    pub location_context: LocationContext,
}

pub struct BusinessFinder {
    client: Arc<DirectoryClient>,
    store: Arc<HierarchyStore>,
}

impl BusinessFinder {
    #[must_use]
    pub fn new(client: Arc<DirectoryClient>, store: Arc<HierarchyStore>) -> Self {
        Self { client, store }
    }

    /// Runs a business search scoped to `location`, broadening one level at
    /// a time while the result set is empty.
    ///
    /// Never fails: a network error degrades to an empty result with the
    /// context accumulated so far, logged at `warn`.
    pub async fn search(
        &self,
        filters: &BusinessQuery,
        location: &LocationDescriptor,
    ) -> ScopedResults {
        let requested = LocationRef::from(location);
        let mut current = location.clone();

        loop {
            let scoped = filters.with_location(current.id, current.kind.scope());
            let response = match self.client.search_businesses(&scoped).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        requested = %requested.name,
                        applied = %current.name,
                        error = %e,
                        "business search failed; returning empty results"
                    );
                    return Self::empty(filters, requested, None, !location.is_global());
                }
            };

            if response.pagination.total > 0 {
                let fallback_applied = current != *location;
                if fallback_applied {
                    tracing::debug!(
                        requested = %requested.name,
                        applied = %current.name,
                        total = response.pagination.total,
                        "business search broadened to a wider location"
                    );
                }
                return ScopedResults {
                    businesses: response.businesses,
                    pagination: response.pagination,
                    location_context: LocationContext {
                        requested,
                        applied: Some(LocationRef::from(&current)),
                        fallback_applied,
                    },
                };
            }

            self.preload_parents(current.kind).await;
            match self.store.parent_of(&current).await {
                Some(parent) => {
                    tracing::debug!(
                        from = %current.kind,
                        to = %parent.kind,
                        "no businesses at this level; broadening one level"
                    );
                    current = parent;
                }
                None => {
                    // Even the unscoped query came back empty.
                    return ScopedResults {
                        businesses: response.businesses,
                        pagination: response.pagination,
                        location_context: LocationContext {
                            requested,
                            applied: None,
                            fallback_applied: !location.is_global(),
                        },
                    };
                }
            }
        }
    }

    /// Best-effort load of the caches `parent_of` needs for this level.
    async fn preload_parents(&self, kind: LocationKind) {
        let result = match kind {
            LocationKind::City => self.store.fetch_regions(false).await.map(|_| ()),
            LocationKind::Region => {
                let regions = self.store.fetch_regions(false).await.map(|_| ());
                let countries = self.store.fetch_countries(false).await.map(|_| ());
                regions.and(countries)
            }
            LocationKind::Country | LocationKind::Global => Ok(()),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not load parent caches for broadening");
        }
    }

    fn empty(
        filters: &BusinessQuery,
        requested: LocationRef,
        applied: Option<LocationRef>,
        fallback_applied: bool,
    ) -> ScopedResults {
        ScopedResults {
            businesses: Vec::new(),
            pagination: Pagination {
                total: 0,
                page: filters.page.unwrap_or(1),
                limit: filters.limit.unwrap_or(20),
                total_pages: 0,
            },
            location_context: LocationContext {
                requested,
                applied,
                fallback_applied,
            },
        }
    }
}
