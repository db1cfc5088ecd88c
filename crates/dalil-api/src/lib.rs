//! Typed async client for the dalil directory REST API.
//!
//! Covers the read-side endpoints the location core consumes: the
//! country/region/city hierarchy, city lookup by slug, business search,
//! advertisement candidates, and the unified text search. Transient
//! failures (timeouts, connection errors, 5xx) are retried with
//! exponential backoff; everything else surfaces as a typed [`ApiError`].

mod client;
mod error;
mod retry;
pub mod types;

pub use client::DirectoryClient;
pub use error::ApiError;
