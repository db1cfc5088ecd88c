//! HTTP client for the directory REST API.
//!
//! Wraps `reqwest` with typed endpoints, status-code mapping, and retry
//! with back-off for transient failures. All endpoints are reads.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use dalil_core::AppConfig;

use crate::error::ApiError;
use crate::retry::retry_with_backoff;
use crate::types::{
    Advertisement, AdPlacement, BusinessQuery, BusinessSearchResponse, City, Country,
    PlaceSearchResponse, Region, UnifiedSearchResponse,
};

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = "dalil/0.1 (business-directory)";

/// Client for the directory REST API.
///
/// Manages the HTTP client, base URL, and retry policy. Use
/// [`DirectoryClient::new`] for production or
/// [`DirectoryClient::with_base_url`] to point at a mock server in tests.
pub struct DirectoryClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl DirectoryClient {
    /// Creates a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`ApiError::InvalidUrl`] if the configured base URL
    /// does not parse.
    pub fn new(cfg: &AppConfig) -> Result<Self, ApiError> {
        Self::build(
            &cfg.api_base_url,
            cfg.request_timeout_secs,
            cfg.connect_timeout_secs,
            &cfg.user_agent,
            cfg.max_retries,
            cfg.retry_backoff_base_ms,
        )
    }

    /// Creates a client with a custom base URL and no retries (for testing
    /// with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::new`].
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        Self::with_retry_policy(base_url, timeout_secs, 0, 0)
    }

    /// Creates a client with an explicit retry policy and default connect
    /// timeout and user agent.
    ///
    /// `max_retries` is the number of additional attempts after the first
    /// failure for retriable errors. Set to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::new`].
    pub fn with_retry_policy(
        base_url: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ApiError> {
        Self::build(
            base_url,
            timeout_secs,
            DEFAULT_CONNECT_TIMEOUT_SECS,
            DEFAULT_USER_AGENT,
            max_retries,
            backoff_base_ms,
        )
    }

    fn build(
        base_url: &str,
        timeout_secs: u64,
        connect_timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .user_agent(user_agent)
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // Url::join appends path segments rather than replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ApiError::InvalidUrl {
            url: normalised.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches all countries.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Http`] on network failure after all retries.
    /// - [`ApiError::UnexpectedStatus`] on a non-2xx status.
    /// - [`ApiError::Deserialize`] if the response shape is unexpected.
    pub async fn list_countries(&self) -> Result<Vec<Country>, ApiError> {
        let url = self.build_url("countries", &[])?;
        self.get_json_with_retry(&url).await
    }

    /// Fetches regions, optionally restricted to one country.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::list_countries`].
    pub async fn list_regions(&self, country_id: Option<i64>) -> Result<Vec<Region>, ApiError> {
        let mut params = Vec::new();
        let id_str;
        if let Some(id) = country_id {
            id_str = id.to_string();
            params.push(("countryId", id_str.as_str()));
        }
        let url = self.build_url("regions", &params)?;
        self.get_json_with_retry(&url).await
    }

    /// Fetches cities, optionally restricted to one region.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::list_countries`].
    pub async fn list_cities(&self, region_id: Option<i64>) -> Result<Vec<City>, ApiError> {
        let mut params = Vec::new();
        let id_str;
        if let Some(id) = region_id {
            id_str = id.to_string();
            params.push(("regionId", id_str.as_str()));
        }
        let url = self.build_url("cities", &params)?;
        self.get_json_with_retry(&url).await
    }

    /// Looks a city up by its URL slug.
    ///
    /// A 404 means the slug is simply unknown and maps to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Http`] on network failure after all retries.
    /// - [`ApiError::UnexpectedStatus`] on a non-2xx, non-404 status.
    /// - [`ApiError::Deserialize`] if the response shape is unexpected.
    pub async fn city_by_slug(&self, slug: &str) -> Result<Option<City>, ApiError> {
        let url = self.build_url(&format!("cities/slug/{slug}"), &[])?;
        match self.get_json_with_retry::<City>(&url).await {
            Ok(city) => Ok(Some(city)),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Searches businesses with the given filter set.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::list_countries`].
    pub async fn search_businesses(
        &self,
        query: &BusinessQuery,
    ) -> Result<BusinessSearchResponse, ApiError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(id) = query.location_id {
            params.push(("locationId", id.to_string()));
        }
        if let Some(scope) = query.location_type {
            params.push(("locationType", scope.as_str().to_owned()));
        }
        if !query.category_ids.is_empty() {
            let joined = query
                .category_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("categoryIds", joined));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(rating) = query.rating {
            params.push(("rating", rating.to_string()));
        }
        if let Some(sort_by) = &query.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let borrowed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let url = self.build_url("businesses", &borrowed)?;
        self.get_json_with_retry(&url).await
    }

    /// Fetches the candidate advertisements for a placement.
    ///
    /// The backend returns every active-ish ad sold for the slot; eligibility
    /// filtering and ranking happen client-side in `dalil-targeting`.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::list_countries`].
    pub async fn display_candidates(
        &self,
        placement: AdPlacement,
    ) -> Result<Vec<Advertisement>, ApiError> {
        let url = self.build_url("advertisements/display", &[("adType", placement.as_str())])?;
        self.get_json_with_retry(&url).await
    }

    /// Unified text search over categories and businesses.
    ///
    /// `city_id` scopes business hits to one city when set.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::list_countries`].
    pub async fn unified_search(
        &self,
        query: &str,
        limit: usize,
        city_id: Option<i64>,
    ) -> Result<UnifiedSearchResponse, ApiError> {
        let limit_str = limit.to_string();
        let mut params = vec![("query", query), ("limit", limit_str.as_str())];
        let id_str;
        if let Some(id) = city_id {
            id_str = id.to_string();
            params.push(("cityId", id_str.as_str()));
        }
        let url = self.build_url("search/unified", &params)?;
        self.get_json_with_retry(&url).await
    }

    /// Unified text search over cities, regions, and countries.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::list_countries`].
    pub async fn place_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<PlaceSearchResponse, ApiError> {
        let limit_str = limit.to_string();
        let url = self.build_url(
            "locations/search/unified",
            &[("query", query), ("limit", limit_str.as_str())],
        )?;
        self.get_json_with_retry(&url).await
    }

    /// Builds the full request URL with properly percent-encoded query parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends a GET request with retry on transient errors and parses the
    /// response body as JSON.
    async fn get_json_with_retry<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move { self.get_json(&url).await }
        })
        .await
    }

    /// Sends one GET request, maps the status, and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NotFound`] on 404.
    /// - [`ApiError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ApiError::Http`] on network failure.
    /// - [`ApiError::Deserialize`] if the body is not the expected shape.
    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> DirectoryClient {
        DirectoryClient::with_base_url(base_url, 30)
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_joins_path_onto_base() {
        let client = test_client("https://api.dalil.example/api");
        let url = client.build_url("cities", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.dalil.example/api/cities");
    }

    #[test]
    fn build_url_strips_trailing_slash() {
        let client = test_client("https://api.dalil.example/api/");
        let url = client
            .build_url("regions", &[("countryId", "7")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.dalil.example/api/regions?countryId=7"
        );
    }

    #[test]
    fn build_url_encodes_special_characters() {
        let client = test_client("https://api.dalil.example/api");
        let url = client
            .build_url("search/unified", &[("query", "coffee & tea")])
            .unwrap();
        assert!(
            url.as_str().contains("coffee+%26+tea") || url.as_str().contains("coffee%20%26%20tea"),
            "query param should be percent-encoded: {url}"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        let result = DirectoryClient::with_base_url("not a url", 30);
        assert!(matches!(result, Err(ApiError::InvalidUrl { .. })));
    }
}
