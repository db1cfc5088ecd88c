//! Advertisement selection for a placement.
//!
//! Eligibility is a hard filter (placement, active flag, schedule window,
//! location scope); ranking among eligible ads is specificity first
//! (city > region > country > global), then category preference, then
//! most-recently-created. Exactly one ad (or none) comes out.

use chrono::{DateTime, Utc};

use dalil_api::types::{AdPlacement, Advertisement};
use dalil_geo::LocationAncestry;

/// Geographic specificity of an eligible ad relative to the request:
/// city 3 > region 2 > country 1 > global 0. `None` means the ad's scope
/// does not cover the requested location at all.
fn specificity(ad: &Advertisement, ancestry: &LocationAncestry) -> Option<u8> {
    if let Some(city_id) = ad.city_id {
        return (ancestry.city_id == Some(city_id)).then_some(3);
    }
    if let Some(region_id) = ad.region_id {
        return (ancestry.region_id == Some(region_id)).then_some(2);
    }
    if let Some(country_id) = ad.country_id {
        return (ancestry.country_id == Some(country_id)).then_some(1);
    }
    // No location set: the ad runs everywhere.
    Some(0)
}

/// Category preference used only to break ties at equal specificity:
/// exact category match > category-agnostic > other category.
fn category_rank(ad: &Advertisement, category_id: Option<i64>) -> u8 {
    match (ad.category_id, category_id) {
        (Some(a), Some(b)) if a == b => 2,
        (None, _) => 1,
        _ => 0,
    }
}

fn within_window(ad: &Advertisement, now: DateTime<Utc>) -> bool {
    // A missing bound is unbounded on that side.
    ad.starts_at.is_none_or(|s| s <= now) && ad.ends_at.is_none_or(|e| now <= e)
}

/// Selects the best advertisement for a placement, or `None` when nothing
/// is eligible.
///
/// `ancestry` is the requested location's ancestor chain (a city-level
/// request is also covered by ads scoped to that city's region or country);
/// resolve it via `HierarchyStore::ancestry_of` before calling.
#[must_use]
pub fn select_ad<'a>(
    ads: &'a [Advertisement],
    placement: AdPlacement,
    category_id: Option<i64>,
    ancestry: &LocationAncestry,
    now: DateTime<Utc>,
) -> Option<&'a Advertisement> {
    ads.iter()
        .filter(|ad| ad.ad_type == placement && ad.is_active && within_window(ad, now))
        .filter_map(|ad| specificity(ad, ancestry).map(|s| (ad, s)))
        .max_by_key(|(ad, s)| (*s, category_rank(ad, category_id), ad.created_at))
        .map(|(ad, _)| ad)
}
