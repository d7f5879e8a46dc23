//! Fuel price endpoint client.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};

use super::DatasetSource;
use super::error::FetchError;
use super::snapshot::DatasetSnapshot;
use super::types::parse_stations;

/// Default dataset endpoint (Spanish Ministry for the Ecological Transition,
/// land-based stations with current prices).
pub const DEFAULT_DATASET_URL: &str = "https://sedeaplicaciones.minetur.gob.es/ServiciosRESTCarburantes/PreciosCarburantes/EstacionesTerrestres/";

/// Configuration for the dataset client.
#[derive(Debug, Clone)]
pub struct DatasetClientConfig {
    /// Full URL of the dataset endpoint
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl DatasetClientConfig {
    /// Create a config pointing at the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for DatasetClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATASET_URL)
    }
}

/// Client for the station dataset endpoint.
///
/// The endpoint is unauthenticated and returns the whole country in one
/// response, so there is no pagination or rate limiting here.
#[derive(Debug, Clone)]
pub struct DatasetClient<C = SystemClock> {
    http: reqwest::Client,
    url: String,
    clock: C,
}

impl DatasetClient {
    /// Create a new dataset client.
    pub fn new(config: DatasetClientConfig) -> Result<Self, FetchError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> DatasetClient<C> {
    /// Create a client that stamps snapshots using `clock`.
    pub fn with_clock(config: DatasetClientConfig, clock: C) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
            clock,
        })
    }

    /// Fetch the full dataset once.
    pub async fn fetch(&self) -> Result<DatasetSnapshot, FetchError> {
        debug!(url = %self.url, "fetching station dataset");

        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await?;
        let stations = parse_stations(&body)?;

        info!(stations = stations.len(), "fetched station dataset");

        Ok(DatasetSnapshot::new(self.clock.now(), stations))
    }
}

impl<C: Clock> DatasetSource for DatasetClient<C> {
    async fn fetch(&self) -> Result<DatasetSnapshot, FetchError> {
        DatasetClient::fetch(self).await
    }
}
