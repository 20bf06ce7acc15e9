//! HTTP server for the dashboard API.
//!
//! The dataset is built before the server starts and handed in as shared
//! read-only state; handlers compose `select -> derive -> build` per
//! request and never mutate anything.
//!
//! # API Endpoints
//!
//! | Method | Path                                  | Description                            |
//! |--------|---------------------------------------|----------------------------------------|
//! | GET    | `/health`                             | Health check + table sizes             |
//! | GET    | `/api/countries`                      | Primary selector options (world scope) |
//! | GET    | `/api/countries/{country}/states`     | Secondary selector options             |
//! | GET    | `/api/us/states`                      | Primary selector options (county scope)|
//! | GET    | `/api/us/states/{state}/counties`     | Secondary selector options             |
//! | GET    | `/api/series`                         | Chart data, world scope                |
//! | GET    | `/api/us/series`                      | Chart data, US county scope            |
//! | GET    | `/api/logs`                           | SSE stream of structured logs          |

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, OptionList, SeriesResponse};
use crate::models::{Dataset, Metric, REGION_ALL};
use crate::series::{derive_daily, select_county, select_world, ChartData};

/// Metric selection applied when the query names none.
const DEFAULT_METRICS: [Metric; 2] = [Metric::Confirmed, Metric::Deaths];

type ApiError = (StatusCode, Json<Value>);

/// Start the HTTP server over a fully built dataset.
pub async fn start_server(
    dataset: Arc<Dataset>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    // permissive CORS so any charting frontend can consume the API
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/countries", get(list_countries))
        .route("/api/countries/{country}/states", get(list_states))
        .route("/api/us/states", get(list_us_states))
        .route("/api/us/states/{state}/counties", get(list_counties))
        .route("/api/series", get(world_series))
        .route("/api/us/series", get(us_series))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(dataset);

    let ip: IpAddr = host.parse()?;
    let addr = SocketAddr::new(ip, port);

    println!("🚀 covidash serving on http://{}", addr);
    println!("   GET /api/countries             - world selector options");
    println!("   GET /api/series?country=US     - world chart data");
    println!("   GET /api/us/series?state=...   - county chart data");
    println!("   GET /api/logs                  - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint. Also advertises the metric options per scope,
/// so selectors can be built without hardcoding them client-side.
async fn health(State(dataset): State<Arc<Dataset>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "covidash",
        "version": env!("CARGO_PKG_VERSION"),
        "tables": {
            "combinedRows": dataset.combined.len(),
            "usCountyRows": dataset.us_counties.len(),
        },
        "metricOptions": {
            "world": Metric::WORLD.iter().map(|m| m.label()).collect::<Vec<_>>(),
            "usCounties": Metric::US_COUNTY.iter().map(|m| m.label()).collect::<Vec<_>>(),
        }
    }))
}

/// Countries of the combined table. Defaults to `US` when present.
async fn list_countries(State(dataset): State<Arc<Dataset>>) -> Json<OptionList> {
    Json(OptionList::with_preferred(
        dataset.combined.countries(),
        "US",
    ))
}

/// Subdivisions of one country. The sentinel sorts first and is the default.
async fn list_states(
    State(dataset): State<Arc<Dataset>>,
    Path(country): Path<String>,
) -> Json<OptionList> {
    Json(OptionList::with_default_first(
        dataset.combined.states_of(&country),
    ))
}

/// US states of the county table. Defaults to `Illinois` when present.
async fn list_us_states(State(dataset): State<Arc<Dataset>>) -> Json<OptionList> {
    Json(OptionList::with_preferred(
        dataset.us_counties.states(),
        "Illinois",
    ))
}

/// Counties of one US state. First alphabetical county is the default.
async fn list_counties(
    State(dataset): State<Arc<Dataset>>,
    Path(state): Path<String>,
) -> Json<OptionList> {
    Json(OptionList::with_default_first(
        dataset.us_counties.counties_of(&state),
    ))
}

#[derive(Debug, Deserialize)]
struct WorldSeriesQuery {
    country: String,
    #[serde(default = "default_state")]
    state: String,
    metrics: Option<String>,
}

fn default_state() -> String {
    REGION_ALL.to_string()
}

/// Chart data for one (country, subdivision) selection.
///
/// Unknown keys yield an empty chart with HTTP 200: stale client state is
/// a valid, non-error condition.
async fn world_series(
    State(dataset): State<Arc<Dataset>>,
    Query(query): Query<WorldSeriesQuery>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let metrics = parse_metrics(query.metrics.as_deref()).map_err(bad_request)?;

    let rows = select_world(&dataset.combined, &query.country, &query.state);
    let chart = ChartData::build(&derive_daily(&rows), &metrics);

    Ok(Json(SeriesResponse::new(
        query.country,
        query.state,
        metrics,
        chart,
    )))
}

#[derive(Debug, Deserialize)]
struct CountySeriesQuery {
    state: String,
    county: String,
    metrics: Option<String>,
}

/// Chart data for one (US state, county) selection.
async fn us_series(
    State(dataset): State<Arc<Dataset>>,
    Query(query): Query<CountySeriesQuery>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let metrics = parse_metrics(query.metrics.as_deref()).map_err(bad_request)?;

    let rows = select_county(&dataset.us_counties, &query.state, &query.county);
    let chart = ChartData::build(&derive_daily(&rows), &metrics);

    Ok(Json(SeriesResponse::new(
        query.state,
        query.county,
        metrics,
        chart,
    )))
}

/// SSE endpoint streaming structured log entries.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Parse a comma-separated metric list; `None`/blank falls back to
/// Confirmed + Deaths.
pub fn parse_metrics(raw: Option<&str>) -> Result<Vec<Metric>, String> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(DEFAULT_METRICS.to_vec()),
    };

    raw.split(',')
        .map(|part| {
            Metric::from_label(part).ok_or_else(|| format!("unknown metric: {}", part.trim()))
        })
        .collect()
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(&message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metrics_defaults() {
        assert_eq!(parse_metrics(None).unwrap(), DEFAULT_METRICS.to_vec());
        assert_eq!(parse_metrics(Some("  ")).unwrap(), DEFAULT_METRICS.to_vec());
    }

    #[test]
    fn test_parse_metrics_list() {
        let metrics = parse_metrics(Some("Confirmed,Recovered")).unwrap();
        assert_eq!(metrics, vec![Metric::Confirmed, Metric::Recovered]);

        // labels are case-insensitive and tolerate spaces
        let metrics = parse_metrics(Some("deaths, confirmed")).unwrap();
        assert_eq!(metrics, vec![Metric::Deaths, Metric::Confirmed]);
    }

    #[test]
    fn test_parse_metrics_unknown_is_error() {
        let err = parse_metrics(Some("Confirmed,Active")).unwrap_err();
        assert!(err.contains("Active"));
    }
}
