//! Reverse-geocoding client (Nominatim-compatible `/reverse` endpoint).

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;

use dalil_core::AppConfig;

/// A device position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Errors from the reverse-geocoding service.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid geocoder base URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Address components of a reverse-geocoded fix. Field names match the
/// Nominatim `address` object; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub state_district: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Address {
    /// City-like components in matching priority order, skipping blanks.
    #[must_use]
    pub fn city_candidates(&self) -> Vec<&str> {
        [
            &self.city,
            &self.town,
            &self.village,
            &self.municipality,
            &self.county,
            &self.state_district,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .filter(|s| !s.trim().is_empty())
        .collect()
    }

    /// Region-like components in matching priority order, skipping blanks.
    #[must_use]
    pub fn region_candidates(&self) -> Vec<&str> {
        [&self.state, &self.region, &self.province]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Address,
}

/// Client for the reverse-geocoding service.
///
/// No retry here: the bootstrapper treats any failure as "no fix" and falls
/// back to the default city, so a single bounded attempt is enough.
pub struct ReverseGeocoder {
    client: Client,
    base_url: Url,
}

impl ReverseGeocoder {
    /// Creates a geocoder from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built, or
    /// [`GeocodeError::InvalidUrl`] if the base URL does not parse.
    pub fn new(cfg: &AppConfig) -> Result<Self, GeocodeError> {
        Self::build(
            &cfg.geocode_base_url,
            cfg.request_timeout_secs,
            cfg.connect_timeout_secs,
            &cfg.user_agent,
        )
    }

    /// Creates a geocoder with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`ReverseGeocoder::new`].
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, GeocodeError> {
        Self::build(base_url, timeout_secs, 10, user_agent)
    }

    fn build(
        base_url: &str,
        timeout_secs: u64,
        connect_timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .user_agent(user_agent)
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeocodeError::InvalidUrl {
            url: normalised.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { client, base_url })
    }

    /// Reverse-geocodes a position fix into address components.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure.
    /// - [`GeocodeError::UnexpectedStatus`] on a non-2xx status.
    /// - [`GeocodeError::Deserialize`] if the response shape is unexpected.
    pub async fn reverse(&self, coords: Coordinates) -> Result<Address, GeocodeError> {
        let mut url = self
            .base_url
            .join("reverse")
            .map_err(|e| GeocodeError::InvalidUrl {
                url: format!("{}reverse", self.base_url),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("lat", &coords.latitude.to_string())
            .append_pair("lon", &coords.longitude.to_string())
            .append_pair("format", "jsonv2");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        let parsed: ReverseResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: url.to_string(),
                source: e,
            })?;
        Ok(parsed.address)
    }
}
