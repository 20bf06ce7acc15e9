//! Startup orchestration: fetch, parse, melt, and merge every feed into
//! the process-wide [`Dataset`].
//!
//! The dataset is built exactly once, before the server binds, and is
//! immutable afterwards. Each US feed is downloaded once and melted twice
//! (state rollup and county detail).
//!
//! # Example
//!
//! ```rust,ignore
//! use covidash::fetch::SourceClient;
//! use covidash::transform::{load_dataset, LoadPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SourceClient::from_env();
//!     let dataset = load_dataset(&client, &LoadPolicy::default()).await?;
//!     println!("{} combined rows", dataset.combined.len());
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;

use crate::api::logs::{log_info, log_success};
use crate::error::{LoadError, LoadResult};
use crate::fetch::{Feed, SourceClient};
use crate::models::{Dataset, MetricTable};
use crate::parser::{parse_wide_bytes, WideFrame};
use crate::transform::melt::{melt, MeltOptions};
use crate::transform::merge::{concat, merge, synthesize_recovered};

/// Data-shaping policy constants.
///
/// The recovered ratio is an undocumented approximation inherited from the
/// source data pipeline; it lives here, configurable, rather than hardcoded
/// at the call site.
#[derive(Debug, Clone, Copy)]
pub struct LoadPolicy {
    /// Fraction of confirmed counts reported as recovered for the US scope,
    /// which has no native recovered feed.
    pub us_recovered_ratio: f64,
    /// Drop US county observations before this date (sparse early noise).
    pub county_cutoff: NaiveDate,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            us_recovered_ratio: 0.11,
            county_cutoff: NaiveDate::from_ymd_opt(2020, 3, 1).expect("valid calendar date"),
        }
    }
}

/// Fetch all feeds and build the dashboard dataset.
///
/// Fatal on fetch exhaustion or structural feed problems: the process
/// cannot serve without its data.
pub async fn load_dataset(client: &SourceClient, policy: &LoadPolicy) -> LoadResult<Dataset> {
    log_info("Building world table...");
    let world = merge(vec![
        load_feed(client, Feed::GlobalConfirmed, &MeltOptions::state()).await?,
        load_feed(client, Feed::GlobalDeaths, &MeltOptions::state()).await?,
        load_feed(client, Feed::GlobalRecovered, &MeltOptions::state()).await?,
    ])?;
    log_success(format!("World table: {} rows", world.len()));

    log_info("Building US tables...");
    let us_confirmed = fetch_frame(client, Feed::UsConfirmed).await?;
    let us_deaths = fetch_frame(client, Feed::UsDeaths).await?;

    let mut us_states = merge(vec![
        melt(&us_confirmed, Feed::UsConfirmed.metric(), &MeltOptions::state())?,
        melt(&us_deaths, Feed::UsDeaths.metric(), &MeltOptions::state())?,
    ])?;
    synthesize_recovered(&mut us_states, policy.us_recovered_ratio);
    log_success(format!("US state table: {} rows", us_states.len()));

    let county_options = MeltOptions::county(policy.county_cutoff);
    let us_counties = merge(vec![
        melt(&us_confirmed, Feed::UsConfirmed.metric(), &county_options)?,
        melt(&us_deaths, Feed::UsDeaths.metric(), &county_options)?,
    ])?;
    log_success(format!("US county table: {} rows", us_counties.len()));

    let combined = concat(world, us_states);
    if combined.is_empty() {
        return Err(LoadError::EmptyDataset);
    }
    log_success(format!(
        "Dataset ready: {} combined rows, {} county rows",
        combined.len(),
        us_counties.len()
    ));

    Ok(Dataset::from_tables(combined, us_counties))
}

/// Download and parse one feed.
async fn fetch_frame(client: &SourceClient, feed: Feed) -> LoadResult<WideFrame> {
    log_info(format!("Fetching {}...", feed.file_name()));
    let bytes = client.fetch_csv(feed).await?;
    let frame = parse_wide_bytes(&bytes)?;
    log_success(format!(
        "{}: {} regions, {} columns",
        feed.file_name(),
        frame.len(),
        frame.headers.len()
    ));
    Ok(frame)
}

/// Download, parse, and melt one feed in a single step.
async fn load_feed(
    client: &SourceClient,
    feed: Feed,
    options: &MeltOptions,
) -> LoadResult<MetricTable> {
    let frame = fetch_frame(client, feed).await?;
    Ok(melt(&frame, feed.metric(), options)?)
}
