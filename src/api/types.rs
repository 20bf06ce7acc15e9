//! REST API response types.
//!
//! Everything the charting frontend consumes is a camelCase JSON document
//! assembled here from the core types; no further computation is expected
//! client-side beyond rendering.

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::Metric;
use crate::series::ChartData;

/// A selector option list plus the selection a fresh client should start
/// from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionList {
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl OptionList {
    /// Default to the first option (empty lists carry no default).
    pub fn with_default_first(options: Vec<String>) -> Self {
        let default = options.first().cloned();
        Self { options, default }
    }

    /// Default to `preferred` when present, else the first option.
    pub fn with_preferred(options: Vec<String>, preferred: &str) -> Self {
        let default = options
            .iter()
            .find(|o| o.as_str() == preferred)
            .or_else(|| options.first())
            .cloned();
        Self { options, default }
    }
}

/// A chart-ready series document, echoing the selection it answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesResponse {
    /// Country (world scope) or US state (county scope).
    pub primary: String,
    /// Subdivision or `"<all>"` (world scope), county (county scope).
    pub secondary: String,
    pub metrics: Vec<Metric>,
    pub point_count: usize,
    #[serde(flatten)]
    pub chart: ChartData,
}

impl SeriesResponse {
    pub fn new(
        primary: impl Into<String>,
        secondary: impl Into<String>,
        metrics: Vec<Metric>,
        chart: ChartData,
    ) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            metrics,
            point_count: chart.dates.len(),
            chart,
        }
    }
}

/// JSON error body for non-2xx responses.
pub fn error_response(error: &str) -> Value {
    json!({ "error": error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::REGION_ALL;
    use crate::series::{derive_daily, ChartData};

    #[test]
    fn test_option_list_default_first() {
        let list = OptionList::with_default_first(vec![REGION_ALL.into(), "Hubei".into()]);
        assert_eq!(list.default.as_deref(), Some(REGION_ALL));

        let empty = OptionList::with_default_first(vec![]);
        assert!(empty.default.is_none());
    }

    #[test]
    fn test_option_list_preferred() {
        let countries = vec!["France".to_string(), "Italy".into(), "US".into()];
        let list = OptionList::with_preferred(countries.clone(), "US");
        assert_eq!(list.default.as_deref(), Some("US"));

        let list = OptionList::with_preferred(countries, "Wakanda");
        assert_eq!(list.default.as_deref(), Some("France"));
    }

    #[test]
    fn test_series_response_flattens_chart() {
        let chart = ChartData::build(&derive_daily(&[]), &[Metric::Confirmed]);
        let response = SeriesResponse::new("Italy", REGION_ALL, vec![Metric::Confirmed], chart);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["primary"], "Italy");
        assert_eq!(json["pointCount"], 0);
        // flattened chart fields sit at the top level
        assert!(json.get("dates").is_some());
        assert!(json.get("labels").is_some());
        assert!(json.get("series").is_some());
        assert!(json.get("chart").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("unknown metric: Active");
        assert_eq!(body["error"], "unknown metric: Active");
    }
}
