//! Wire types for the directory REST API.
//!
//! Field names follow the API's camelCase JSON. Ids are `i64` throughout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// ISO 3166-1 alpha-2 where the backend has it.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub country_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub region_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub city_id: Option<i64>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Slot an advertisement is sold for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdPlacement {
    #[serde(rename = "CATEGORY")]
    Category,
    #[serde(rename = "TOP")]
    Top,
    #[serde(rename = "FOOTER")]
    Footer,
}

impl AdPlacement {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdPlacement::Category => "CATEGORY",
            AdPlacement::Top => "TOP",
            AdPlacement::Footer => "FOOTER",
        }
    }
}

impl std::str::FromStr for AdPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CATEGORY" => Ok(AdPlacement::Category),
            "TOP" => Ok(AdPlacement::Top),
            "FOOTER" => Ok(AdPlacement::Footer),
            other => Err(format!("unknown ad placement: {other}")),
        }
    }
}

/// An advertisement record as stored by the backend.
///
/// At most one of `city_id`/`region_id`/`country_id` is set; all three
/// empty means the ad runs everywhere. Missing `starts_at`/`ends_at`
/// bounds are treated as unbounded on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: i64,
    pub ad_type: AdPlacement,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub city_id: Option<i64>,
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub country_id: Option<i64>,
    pub is_active: bool,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Geographic granularity accepted by the business search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationScope {
    City,
    Region,
    Country,
}

impl LocationScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LocationScope::City => "city",
            LocationScope::Region => "region",
            LocationScope::Country => "country",
        }
    }
}

/// Filter set for `GET /businesses`. All fields optional; unset fields are
/// omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessQuery {
    pub location_id: Option<i64>,
    pub location_type: Option<LocationScope>,
    pub category_ids: Vec<i64>,
    pub search: Option<String>,
    pub rating: Option<f64>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BusinessQuery {
    /// Returns a copy scoped to a different location, keeping every other filter.
    #[must_use]
    pub fn with_location(&self, location_id: Option<i64>, location_type: Option<LocationScope>) -> Self {
        Self {
            location_id,
            location_type,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSearchResponse {
    pub businesses: Vec<Business>,
    pub pagination: Pagination,
}

/// Categories-and-businesses result of the unified text search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedSearchResponse {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub businesses: Vec<Business>,
    #[serde(default)]
    pub query: String,
}

/// Places result of the unified text search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSearchResponse {
    #[serde(default)]
    pub cities: Vec<City>,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(default)]
    pub query: String,
}
