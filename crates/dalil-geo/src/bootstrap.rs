//! One-shot geolocation bootstrapper.
//!
//! Runs at most once per session, purely as a background upgrade of the
//! default location: acquire a position fix (bounded by a hard timeout),
//! reverse-geocode it, and cascade the address components through the
//! hierarchy until a city is found. Permission denial, timeouts, network
//! failures, and an empty cascade all land on the configured default city.
//! The final write goes through [`SessionState::apply_geolocated`], so an
//! explicit user selection made while the pipeline was in flight is never
//! overwritten.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use dalil_api::DirectoryClient;
use dalil_core::AppConfig;

use crate::descriptor::LocationDescriptor;
use crate::geocode::{Address, Coordinates, ReverseGeocoder};
use crate::hierarchy::HierarchyStore;
use crate::session::{SelectionSource, SessionState};

/// Number of hits requested from the remote place search per cascade step.
const CASCADE_SEARCH_LIMIT: usize = 5;

/// Why a position fix could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("permission denied")]
    Denied,
    #[error("position unavailable")]
    Unavailable,
}

/// Source of device position fixes. The browser geolocation API in the web
/// frontend; a fixed coordinate pair in the CLI and in tests.
pub trait PositionSource {
    fn current_position(
        &self,
    ) -> impl Future<Output = Result<Coordinates, PositionError>> + Send;
}

/// A position source that always returns the same fix.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Ok(self.0)
    }
}

/// Terminal state of one bootstrapper run.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// The latch was already taken; nothing was done.
    AlreadyRan,
    /// The user had already made an explicit selection; geolocation skipped
    /// (or its late result discarded).
    SkippedExplicit,
    /// The cascade matched a location and it was applied.
    Resolved(LocationDescriptor),
    /// Geolocation failed or matched nothing; the default city was applied.
    /// `None` when even the default could not be determined.
    AppliedDefault(Option<LocationDescriptor>),
}

pub struct GeoBootstrapper {
    store: Arc<HierarchyStore>,
    client: Arc<DirectoryClient>,
    geocoder: ReverseGeocoder,
    session: Arc<SessionState>,
    position_timeout: Duration,
    default_city_name: String,
    ran: AtomicBool,
}

impl GeoBootstrapper {
    #[must_use]
    pub fn new(
        store: Arc<HierarchyStore>,
        client: Arc<DirectoryClient>,
        geocoder: ReverseGeocoder,
        session: Arc<SessionState>,
        cfg: &AppConfig,
    ) -> Self {
        Self {
            store,
            client,
            geocoder,
            session,
            position_timeout: Duration::from_secs(cfg.geolocation_timeout_secs),
            default_city_name: cfg.default_city_name.clone(),
            ran: AtomicBool::new(false),
        }
    }

    /// Runs the pipeline. At most one run per session: the latch is taken
    /// atomically, so two concurrent callers cannot both start geolocation.
    pub async fn run<P: PositionSource + Sync>(&self, source: &P) -> BootstrapOutcome {
        if self.ran.swap(true, Ordering::SeqCst) {
            return BootstrapOutcome::AlreadyRan;
        }
        if self.session.source() != SelectionSource::Default {
            tracing::debug!("bootstrapper skipped; location already chosen explicitly");
            return BootstrapOutcome::SkippedExplicit;
        }
        if let Err(e) = self.store.fetch_cities(false).await {
            tracing::warn!(error = %e, "city list unavailable; applying default location");
            return self.apply_default().await;
        }

        let coords = match tokio::time::timeout(self.position_timeout, source.current_position())
            .await
        {
            Ok(Ok(coords)) => coords,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "no position fix; applying default location");
                return self.apply_default().await;
            }
            Err(_) => {
                tracing::debug!(
                    timeout_secs = self.position_timeout.as_secs(),
                    "position fix timed out; applying default location"
                );
                return self.apply_default().await;
            }
        };

        let address = match self.geocoder.reverse(coords).await {
            Ok(address) => address,
            Err(e) => {
                tracing::warn!(error = %e, "reverse geocoding failed; applying default location");
                return self.apply_default().await;
            }
        };

        match self.match_hierarchy(&address).await {
            Some(descriptor) => {
                if self.session.apply_geolocated(descriptor.clone()) {
                    tracing::info!(name = %descriptor.name, "geolocated location applied");
                    BootstrapOutcome::Resolved(descriptor)
                } else {
                    BootstrapOutcome::SkippedExplicit
                }
            }
            None => self.apply_default().await,
        }
    }

    /// The address-to-hierarchy cascade. Each step runs only if the previous
    /// one produced no match; remote failures are logged and treated as a
    /// miss so the cascade keeps going.
    async fn match_hierarchy(&self, address: &Address) -> Option<LocationDescriptor> {
        let city_candidates = address.city_candidates();

        // 1. City-like components against the local city cache.
        for candidate in &city_candidates {
            if let Some(city) = self.store.city_by_name(candidate).await {
                tracing::debug!(candidate, city = %city.name, "cascade matched local city");
                return Some(LocationDescriptor::from_city(&city));
            }
        }

        // 2. City-like components through the remote place search.
        for candidate in &city_candidates {
            match self.client.place_search(candidate, CASCADE_SEARCH_LIMIT).await {
                Ok(response) => {
                    if let Some(city) = response.cities.first() {
                        tracing::debug!(candidate, city = %city.name, "cascade matched remote city");
                        return Some(LocationDescriptor::from_city(city));
                    }
                }
                Err(e) => {
                    tracing::warn!(candidate, error = %e, "remote city search failed in cascade");
                }
            }
        }

        if let Err(e) = self.store.fetch_regions(false).await {
            tracing::warn!(error = %e, "region list unavailable in cascade");
        }
        let region_candidates = address.region_candidates();

        // 3. Region-like components against the local region cache, mapped
        //    to that region's representative city.
        for candidate in &region_candidates {
            if let Some(region) = self.store.region_by_name(candidate).await {
                if let Some(city) = self.store.representative_city(region.id).await {
                    tracing::debug!(candidate, city = %city.name, "cascade matched local region");
                    return Some(LocationDescriptor::from_city(&city));
                }
            }
        }

        // 4. Region-like components through the remote place search.
        for candidate in &region_candidates {
            match self.client.place_search(candidate, CASCADE_SEARCH_LIMIT).await {
                Ok(response) => {
                    if let Some(region) = response.regions.first() {
                        if let Some(city) = self.store.representative_city(region.id).await {
                            tracing::debug!(candidate, city = %city.name, "cascade matched remote region");
                            return Some(LocationDescriptor::from_city(&city));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(candidate, error = %e, "remote region search failed in cascade");
                }
            }
        }

        if let Err(e) = self.store.fetch_countries(false).await {
            tracing::warn!(error = %e, "country list unavailable in cascade");
        }

        // 5. Country component against the local country cache, mapped to
        //    any city under that country.
        if let Some(candidate) = address.country() {
            if let Some(country) = self.store.country_by_name(candidate).await {
                if let Some(city) = self.store.any_city_in_country(country.id).await {
                    tracing::debug!(candidate, city = %city.name, "cascade matched local country");
                    return Some(LocationDescriptor::from_city(&city));
                }
            }

            // 6. Country component through the remote place search.
            match self.client.place_search(candidate, CASCADE_SEARCH_LIMIT).await {
                Ok(response) => {
                    if let Some(country) = response.countries.first() {
                        if let Some(city) = self.store.any_city_in_country(country.id).await {
                            tracing::debug!(candidate, city = %city.name, "cascade matched remote country");
                            return Some(LocationDescriptor::from_city(&city));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(candidate, error = %e, "remote country search failed in cascade");
                }
            }
        }

        tracing::debug!("cascade exhausted without a match");
        None
    }

    /// Applies the hard default: the configured home city, else the first
    /// city in the hierarchy. Still goes through the guarded write, so an
    /// explicit selection that raced in is respected.
    async fn apply_default(&self) -> BootstrapOutcome {
        if let Err(e) = self.store.fetch_cities(false).await {
            tracing::warn!(error = %e, "city list unavailable for default location");
        }
        match self.store.default_city(&self.default_city_name).await {
            Some(city) => {
                let descriptor = LocationDescriptor::from_city(&city);
                if self.session.apply_geolocated(descriptor.clone()) {
                    BootstrapOutcome::AppliedDefault(Some(descriptor))
                } else {
                    BootstrapOutcome::SkippedExplicit
                }
            }
            None => {
                tracing::warn!("no cities loaded; default location unavailable");
                BootstrapOutcome::AppliedDefault(None)
            }
        }
    }
}
