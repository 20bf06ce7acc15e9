//! Upstream feed catalog and HTTP fetching.
//!
//! The dashboard's only data source is the Johns Hopkins CSSE time-series
//! repository: five wide CSV files under one fixed base URL. Fetching
//! happens once, at startup; a failure after retries is fatal because the
//! process cannot serve without its data.
//!
//! The base URL can be overridden with the `COVIDASH_BASE_URL` environment
//! variable (loaded from `.env` if present), e.g. to point at a mirror or
//! a local fixture server in tests.

use std::env;
use std::time::Duration;

use crate::api::logs::log_warning;
use crate::error::{FetchError, FetchResult};
use crate::models::Metric;

/// Default feed host: raw JHU CSSE time-series directory.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "COVIDASH_BASE_URL";

/// Default number of download attempts per feed.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Initial delay between attempts; doubles after each failure.
const RETRY_DELAY_MS: u64 = 1000;

// =============================================================================
// Feed Catalog
// =============================================================================

/// One of the five upstream CSV feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    GlobalConfirmed,
    GlobalDeaths,
    GlobalRecovered,
    UsConfirmed,
    UsDeaths,
}

impl Feed {
    /// All feeds, in load order.
    pub const ALL: [Feed; 5] = [
        Feed::GlobalConfirmed,
        Feed::GlobalDeaths,
        Feed::GlobalRecovered,
        Feed::UsConfirmed,
        Feed::UsDeaths,
    ];

    /// File name under the base URL.
    pub fn file_name(&self) -> &'static str {
        match self {
            Feed::GlobalConfirmed => "time_series_covid19_confirmed_global.csv",
            Feed::GlobalDeaths => "time_series_covid19_deaths_global.csv",
            Feed::GlobalRecovered => "time_series_covid19_recovered_global.csv",
            Feed::UsConfirmed => "time_series_covid19_confirmed_US.csv",
            Feed::UsDeaths => "time_series_covid19_deaths_US.csv",
        }
    }

    /// The metric this feed carries.
    pub fn metric(&self) -> Metric {
        match self {
            Feed::GlobalConfirmed | Feed::UsConfirmed => Metric::Confirmed,
            Feed::GlobalDeaths | Feed::UsDeaths => Metric::Deaths,
            Feed::GlobalRecovered => Metric::Recovered,
        }
    }
}

// =============================================================================
// Source Client
// =============================================================================

/// HTTP client for the feed host, with bounded retry.
#[derive(Debug, Clone)]
pub struct SourceClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl SourceClient {
    /// Create a client against an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a client from the environment, falling back to the JHU host.
    pub fn from_env() -> Self {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        let base_url = env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Override the number of download attempts (used to shorten tests).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Full URL of a feed.
    pub fn url_for(&self, feed: Feed) -> String {
        format!("{}{}", self.base_url, feed.file_name())
    }

    /// Download one feed, retrying with doubling backoff.
    ///
    /// Returns the raw CSV bytes; decoding is the parser's concern.
    pub async fn fetch_csv(&self, feed: Feed) -> FetchResult<Vec<u8>> {
        let url = self.url_for(feed);
        let mut delay = Duration::from_millis(RETRY_DELAY_MS);
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.try_fetch(&url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    log_warning(format!(
                        "attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_retries,
                        feed.file_name(),
                        e
                    ));
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::EmptyBody(url)))
    }

    /// Single download attempt.
    async fn try_fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_file_names() {
        assert_eq!(
            Feed::GlobalConfirmed.file_name(),
            "time_series_covid19_confirmed_global.csv"
        );
        assert_eq!(
            Feed::UsDeaths.file_name(),
            "time_series_covid19_deaths_US.csv"
        );
    }

    #[test]
    fn test_feed_metrics() {
        assert_eq!(Feed::GlobalRecovered.metric(), Metric::Recovered);
        assert_eq!(Feed::UsConfirmed.metric(), Metric::Confirmed);
    }

    #[test]
    fn test_url_joining_adds_slash() {
        let client = SourceClient::new("http://localhost:9000/feeds");
        assert_eq!(
            client.url_for(Feed::GlobalDeaths),
            "http://localhost:9000/feeds/time_series_covid19_deaths_global.csv"
        );
    }

    #[test]
    fn test_url_joining_keeps_existing_slash() {
        let client = SourceClient::new("http://localhost:9000/feeds/");
        assert!(!client.url_for(Feed::UsConfirmed).contains("//time_series"));
    }

    #[test]
    fn test_retry_attempts_floor_at_one() {
        let client = SourceClient::new("http://localhost").with_max_retries(0);
        assert_eq!(client.max_retries, 1);
    }
}
