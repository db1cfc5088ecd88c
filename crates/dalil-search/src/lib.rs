//! Debounced, superseding search suggestions over the directory API.

mod aggregator;

pub use aggregator::{PlaceSuggestions, SuggestionAggregator, Suggestions};
