//! # Covidash - COVID-19 case history dashboard backend
//!
//! Covidash fetches the Johns Hopkins CSSE time-series CSV feeds, reshapes
//! them into long-format in-memory tables, and serves chart-ready
//! per-region series over a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV Feeds  │────▶│    Melt     │────▶│    Merge    │────▶│   Dataset   │
//! │   (remote)  │     │ (wide→long) │     │ (join+cat)  │     │ (immutable) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                                    │
//!                                  per request:  select → derive → chart JSON
//! ```
//!
//! The dataset is built once at startup; every user interaction is a pure
//! function of (dataset, selection).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use covidash::fetch::SourceClient;
//! use covidash::transform::{load_dataset, LoadPolicy};
//! use covidash::series::{derive_daily, select_world, ChartData};
//! use covidash::models::{Metric, REGION_ALL};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = SourceClient::from_env();
//!     let dataset = load_dataset(&client, &LoadPolicy::default()).await.unwrap();
//!
//!     let rows = select_world(&dataset.combined, "US", REGION_ALL);
//!     let chart = ChartData::build(&derive_daily(&rows), &Metric::WORLD);
//!     println!("{} points", chart.dates.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Metric, RegionKey, tables, Dataset)
//! - [`parser`] - Wide-CSV parsing with encoding auto-detection
//! - [`fetch`] - Feed catalog and HTTP download with retry
//! - [`transform`] - Melt, merge, and the startup pipeline
//! - [`series`] - Per-request selection, derivation, chart assembly
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Input
pub mod fetch;
pub mod parser;

// Table construction
pub mod transform;

// Per-request computation
pub mod series;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, FetchError, LoadError, MergeError, ReshapeError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Dataset, DerivedRow, Metric, MetricRow, MetricTable, RegionKey, TimeSeriesRow, UnifiedTable,
    REGION_ALL,
};

// =============================================================================
// Re-exports - Parsing and fetching
// =============================================================================

pub use fetch::{Feed, SourceClient, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use parser::{parse_wide_bytes, parse_wide_file, WideFrame};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    concat, load_dataset, melt, merge, synthesize_recovered, Granularity, LoadPolicy, MeltOptions,
};

// =============================================================================
// Re-exports - Series
// =============================================================================

pub use series::{
    derive_daily, select_county, select_world, ChartData, MetricSeries, DATE_LABEL_FORMAT,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, OptionList, SeriesResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
