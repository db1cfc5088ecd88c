//! Suggestion aggregation for the search box.
//!
//! Every keystroke becomes a call to [`SuggestionAggregator::suggest`]. Each
//! call supersedes the previous one: a debounce window coalesces bursts of
//! keystrokes into one network request, and a sequence check after the
//! response drops results that a newer query has already made stale. Callers
//! only ever see suggestions for the latest query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dalil_api::types::{Business, Category, City, Country, Region};
use dalil_api::DirectoryClient;
use dalil_core::AppConfig;

/// Grouped suggestions for one query, each group capped at the configured
/// limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggestions {
    pub categories: Vec<Category>,
    pub businesses: Vec<Business>,
    pub query: String,
}

impl Suggestions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.businesses.is_empty()
    }
}

/// Grouped place suggestions for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceSuggestions {
    pub cities: Vec<City>,
    pub regions: Vec<Region>,
    pub countries: Vec<Country>,
    pub query: String,
}

impl PlaceSuggestions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.regions.is_empty() && self.countries.is_empty()
    }
}

pub struct SuggestionAggregator {
    client: Arc<DirectoryClient>,
    debounce: Duration,
    min_query_len: usize,
    group_limit: usize,
    /// Bumped by every call; a call whose number is no longer current has
    /// been superseded.
    seq: AtomicU64,
    inflight: AtomicU64,
}

impl SuggestionAggregator {
    #[must_use]
    pub fn new(client: Arc<DirectoryClient>, cfg: &AppConfig) -> Self {
        Self::with_settings(
            client,
            Duration::from_millis(cfg.suggest_debounce_ms),
            cfg.suggest_min_query_len,
            cfg.suggest_group_limit,
        )
    }

    #[must_use]
    pub fn with_settings(
        client: Arc<DirectoryClient>,
        debounce: Duration,
        min_query_len: usize,
        group_limit: usize,
    ) -> Self {
        Self {
            client,
            debounce,
            min_query_len,
            group_limit,
            seq: AtomicU64::new(0),
            inflight: AtomicU64::new(0),
        }
    }

    /// Whether any suggestion request is currently on the wire.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inflight.load(Ordering::SeqCst) > 0
    }

    /// Suggests categories and businesses for `query`.
    ///
    /// Returns `None` when this call was superseded by a newer one before
    /// its results became available; the caller should simply drop it. A
    /// too-short query resolves immediately to empty suggestions (and still
    /// supersedes any in-flight call). A network failure also resolves to
    /// empty suggestions.
    pub async fn suggest(&self, query: &str, city_id: Option<i64>) -> Option<Suggestions> {
        let (trimmed, my_seq) = self.admit(query);
        let trimmed = match trimmed {
            Some(t) => t,
            None => {
                return Some(Suggestions {
                    query: query.trim().to_owned(),
                    ..Suggestions::default()
                })
            }
        };

        self.debounce_window(my_seq).await?;

        let result = {
            let _guard = InflightGuard::enter(&self.inflight);
            self.client
                .unified_search(&trimmed, self.group_limit, city_id)
                .await
        };
        self.current(my_seq)?;

        let mut response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(query = %trimmed, error = %e, "suggestion request failed");
                dalil_api::types::UnifiedSearchResponse::default()
            }
        };
        response.categories.truncate(self.group_limit);
        response.businesses.truncate(self.group_limit);
        Some(Suggestions {
            categories: response.categories,
            businesses: response.businesses,
            query: trimmed,
        })
    }

    /// Suggests cities, regions, and countries for `query`.
    ///
    /// Same superseding and degradation behaviour as
    /// [`SuggestionAggregator::suggest`].
    pub async fn suggest_places(&self, query: &str) -> Option<PlaceSuggestions> {
        let (trimmed, my_seq) = self.admit(query);
        let trimmed = match trimmed {
            Some(t) => t,
            None => {
                return Some(PlaceSuggestions {
                    query: query.trim().to_owned(),
                    ..PlaceSuggestions::default()
                })
            }
        };

        self.debounce_window(my_seq).await?;

        let result = {
            let _guard = InflightGuard::enter(&self.inflight);
            self.client.place_search(&trimmed, self.group_limit).await
        };
        self.current(my_seq)?;

        let mut response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(query = %trimmed, error = %e, "place suggestion request failed");
                return Some(PlaceSuggestions {
                    query: trimmed,
                    ..PlaceSuggestions::default()
                });
            }
        };
        response.cities.truncate(self.group_limit);
        response.regions.truncate(self.group_limit);
        response.countries.truncate(self.group_limit);
        Some(PlaceSuggestions {
            cities: response.cities,
            regions: response.regions,
            countries: response.countries,
            query: trimmed,
        })
    }

    /// Claims a sequence number for this call and normalises the query.
    /// Returns `None` for the query when it is too short to search.
    fn admit(&self, query: &str) -> (Option<String>, u64) {
        let my_seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let trimmed = query.trim();
        if trimmed.chars().count() < self.min_query_len {
            return (None, my_seq);
        }
        (Some(trimmed.to_owned()), my_seq)
    }

    /// Sleeps out the debounce window, returning `None` if a newer call
    /// arrived meanwhile.
    async fn debounce_window(&self, my_seq: u64) -> Option<()> {
        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }
        self.current(my_seq)
    }

    fn current(&self, my_seq: u64) -> Option<()> {
        if self.seq.load(Ordering::SeqCst) == my_seq {
            Some(())
        } else {
            tracing::trace!(seq = my_seq, "suggestion call superseded");
            None
        }
    }
}

/// Keeps the in-flight counter accurate even when a request errors.
struct InflightGuard<'a> {
    counter: &'a AtomicU64,
}

impl<'a> InflightGuard<'a> {
    fn enter(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflight_guard_balances_on_drop() {
        let counter = AtomicU64::new(0);
        {
            let _guard = InflightGuard::enter(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
