//! Table transformation: wide feeds in, unified long tables out.
//!
//! - Melt: wide-to-long reshape with region-key normalization
//! - Merge: metric-table joins, recovered synthesis, concatenation
//! - Pipeline: startup orchestration producing the process-wide dataset

pub mod melt;
pub mod merge;
pub mod pipeline;

pub use melt::{melt, Granularity, MeltOptions};
pub use merge::{concat, merge, synthesize_recovered};
pub use pipeline::{load_dataset, LoadPolicy};
