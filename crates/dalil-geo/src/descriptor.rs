//! The typed, resolved location used as the unit of geographic scoping.

use dalil_api::types::{City, Country, LocationScope, Region};
use serde::{Deserialize, Serialize};

/// Granularity of a resolved location, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    City,
    Region,
    Country,
    Global,
}

impl LocationKind {
    /// The next-less-specific level, or `None` for `Global`.
    #[must_use]
    pub fn broadened(self) -> Option<LocationKind> {
        match self {
            LocationKind::City => Some(LocationKind::Region),
            LocationKind::Region => Some(LocationKind::Country),
            LocationKind::Country => Some(LocationKind::Global),
            LocationKind::Global => None,
        }
    }

    /// The query-parameter scope for the business search endpoint.
    /// `Global` has no scope: the query is sent unfiltered.
    #[must_use]
    pub fn scope(self) -> Option<LocationScope> {
        match self {
            LocationKind::City => Some(LocationScope::City),
            LocationKind::Region => Some(LocationScope::Region),
            LocationKind::Country => Some(LocationScope::Country),
            LocationKind::Global => None,
        }
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LocationKind::City => "city",
            LocationKind::Region => "region",
            LocationKind::Country => "country",
            LocationKind::Global => "global",
        };
        write!(f, "{s}")
    }
}

/// A resolved, typed location. `Global` carries no id and means
/// "no geographic restriction".
///
/// Descriptors are cheap to clone and treated as immutable: consumers read
/// them, they never patch fields in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    pub kind: LocationKind,
    pub id: Option<i64>,
    pub slug: String,
    pub name: String,
    /// Parent region, present only for city descriptors.
    pub region_id: Option<i64>,
}

impl LocationDescriptor {
    #[must_use]
    pub fn from_city(city: &City) -> Self {
        Self {
            kind: LocationKind::City,
            id: Some(city.id),
            slug: city.slug.clone(),
            name: city.name.clone(),
            region_id: Some(city.region_id),
        }
    }

    #[must_use]
    pub fn from_region(region: &Region) -> Self {
        Self {
            kind: LocationKind::Region,
            id: Some(region.id),
            slug: region.slug.clone(),
            name: region.name.clone(),
            region_id: None,
        }
    }

    #[must_use]
    pub fn from_country(country: &Country) -> Self {
        Self {
            kind: LocationKind::Country,
            id: Some(country.id),
            slug: country.slug.clone(),
            name: country.name.clone(),
            region_id: None,
        }
    }

    #[must_use]
    pub fn global() -> Self {
        Self {
            kind: LocationKind::Global,
            id: None,
            slug: String::new(),
            name: "Global".to_owned(),
            region_id: None,
        }
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.kind == LocationKind::Global
    }
}

/// The ancestor chain of a descriptor, used by advertisement targeting:
/// a city-scoped request is also eligible for ads scoped to the city's
/// region or country.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationAncestry {
    pub city_id: Option<i64>,
    pub region_id: Option<i64>,
    pub country_id: Option<i64>,
}
