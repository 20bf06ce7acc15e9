//! Error types for the covidash data pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`FetchError`] - upstream feed download errors
//! - [`CsvError`] - CSV decoding and parsing errors
//! - [`ReshapeError`] - wide-to-long reshape errors
//! - [`MergeError`] - metric-table join errors
//! - [`LoadError`] - top-level dataset construction errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across pipeline stages.

use thiserror::Error;

use crate::models::Metric;

// =============================================================================
// Feed Fetching Errors
// =============================================================================

/// Errors while downloading an upstream CSV feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the feed host.
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// The feed responded with an empty body.
    #[error("empty response body from {0}")]
    EmptyBody(String),
}

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while decoding and parsing a wide CSV feed.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read a local file.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode raw bytes into text.
    #[error("failed to decode input: {0}")]
    Encoding(String),

    /// Malformed CSV content.
    #[error("invalid CSV: {0}")]
    Parse(#[from] csv::Error),

    /// Input had no content at all.
    #[error("CSV input is empty")]
    EmptyInput,

    /// Header row was present but contained no columns.
    #[error("no headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Reshape Errors
// =============================================================================

/// Errors while reshaping a wide frame into a long metric table.
#[derive(Debug, Error)]
pub enum ReshapeError {
    /// No country-identifying column in the header.
    #[error("missing country column (expected Country/Region or Country_Region)")]
    MissingCountryColumn,

    /// County granularity requested but the feed carries no county column.
    #[error("missing county column (expected Admin2)")]
    MissingCountyColumn,

    /// No per-date columns recognized in the header.
    #[error("no date columns recognized in header")]
    NoDateColumns,
}

// =============================================================================
// Merge Errors
// =============================================================================

/// Errors while joining metric tables into a unified table.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Called with nothing to join.
    #[error("no input tables to merge")]
    NoInputs,

    /// Two input tables carry the same metric.
    #[error("duplicate {0} table in merge inputs")]
    DuplicateMetric(Metric),

    /// A required metric table is absent.
    #[error("missing {0} table in merge inputs")]
    MissingMetric(Metric),
}

// =============================================================================
// Dataset Load Errors (top-level)
// =============================================================================

/// Top-level dataset construction errors.
///
/// This is the main error type returned by
/// [`crate::transform::pipeline::load_dataset`]. It wraps all lower-level
/// errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Feed download error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// CSV decoding/parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Wide-to-long reshape error.
    #[error("reshape error: {0}")]
    Reshape(#[from] ReshapeError),

    /// Metric join error.
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// Every feed loaded but the combined table ended up empty.
    #[error("loaded dataset contains no rows")]
    EmptyDataset,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Dataset error surfaced through a request.
    #[error("dataset error: {0}")]
    Load(#[from] LoadError),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for feed fetching.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for reshape operations.
pub type ReshapeResult<T> = Result<T, ReshapeError>;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Result type for dataset construction.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> LoadError
        let csv_err = CsvError::EmptyInput;
        let load_err: LoadError = csv_err.into();
        assert!(load_err.to_string().contains("empty"));

        // MergeError -> LoadError
        let merge_err = MergeError::MissingMetric(Metric::Deaths);
        let load_err: LoadError = merge_err.into();
        assert!(load_err.to_string().contains("Deaths"));

        // LoadError -> ServerError
        let server_err: ServerError = LoadError::EmptyDataset.into();
        assert!(server_err.to_string().contains("no rows"));
    }

    #[test]
    fn test_fetch_status_format() {
        let err = FetchError::Status {
            url: "http://example.com/feed.csv".into(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("feed.csv"));
    }

    #[test]
    fn test_reshape_error_names_expected_columns() {
        let msg = ReshapeError::MissingCountryColumn.to_string();
        assert!(msg.contains("Country/Region"));
        assert!(msg.contains("Country_Region"));
    }
}
