//! Covidash CLI - COVID-19 case history dashboard backend
//!
//! # Main Command
//!
//! ```bash
//! covidash serve                   # Fetch feeds, start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! covidash regions                 # Fetch feeds, list selectable countries
//! covidash series --country US     # Fetch feeds, print one chart document
//! covidash series --us-state Illinois --county Cook
//! covidash inspect feed.csv        # Parse a local wide CSV, print its shape
//! ```

use clap::{Parser, Subcommand};
use covidash::{
    derive_daily, load_dataset, parse_wide_file, select_county, select_world, ChartData, Dataset,
    LoadPolicy, SeriesResponse, SourceClient, REGION_ALL,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "covidash")]
#[command(about = "COVID-19 case history dashboard backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the upstream feeds and start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Fetch the feeds and print the selectable countries
    Regions,

    /// Fetch the feeds and print chart-ready series for one region
    Series {
        /// Country (world scope)
        #[arg(long, conflicts_with_all = ["us_state", "county"])]
        country: Option<String>,

        /// State/province within the country
        #[arg(long, default_value = REGION_ALL)]
        state: String,

        /// US state (county scope)
        #[arg(long)]
        us_state: Option<String>,

        /// County within the US state
        #[arg(long, requires = "us_state")]
        county: Option<String>,

        /// Comma-separated metrics
        #[arg(long, default_value = "Confirmed,Deaths")]
        metrics: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a local wide CSV feed snapshot and print its shape
    Inspect {
        /// Input CSV file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present) for COVIDASH_BASE_URL
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { host, port } => cmd_serve(&host, port).await,

        Commands::Regions => cmd_regions().await,

        Commands::Series {
            country,
            state,
            us_state,
            county,
            metrics,
            output,
        } => cmd_series(country, state, us_state, county, &metrics, output.as_deref()).await,

        Commands::Inspect { input } => cmd_inspect(&input),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn build_dataset() -> Result<Dataset, Box<dyn std::error::Error>> {
    let client = SourceClient::from_env();
    let dataset = load_dataset(&client, &LoadPolicy::default()).await?;
    Ok(dataset)
}

async fn cmd_serve(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = std::sync::Arc::new(build_dataset().await?);
    covidash::server::start_server(dataset, host, port).await
}

async fn cmd_regions() -> Result<(), Box<dyn std::error::Error>> {
    let dataset = build_dataset().await?;

    for country in dataset.combined.countries() {
        println!("{}", country);
    }
    Ok(())
}

async fn cmd_series(
    country: Option<String>,
    state: String,
    us_state: Option<String>,
    county: Option<String>,
    metrics: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = covidash::api::server::parse_metrics(Some(metrics))?;
    let dataset = build_dataset().await?;

    let response = match (country, us_state) {
        (Some(country), None) => {
            let rows = select_world(&dataset.combined, &country, &state);
            let chart = ChartData::build(&derive_daily(&rows), &metrics);
            SeriesResponse::new(country, state, metrics, chart)
        }
        (None, Some(us_state)) => {
            let county = county.ok_or("--county is required with --us-state")?;
            let rows = select_county(&dataset.us_counties, &us_state, &county);
            let chart = ChartData::build(&derive_daily(&rows), &metrics);
            SeriesResponse::new(us_state, county, metrics, chart)
        }
        _ => return Err("pass either --country or --us-state with --county".into()),
    };

    if response.point_count == 0 {
        eprintln!("⚠️  Selection matched no rows");
    }

    let json = serde_json::to_string_pretty(&response)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let frame = parse_wide_file(input)?;
    let dates = covidash::transform::melt::date_headers(&frame);

    eprintln!("   Columns: {}", frame.headers.len());
    eprintln!("   Regions: {}", frame.len());
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => {
            eprintln!("   Dates:   {} ({} .. {})", dates.len(), first, last)
        }
        _ => eprintln!("   Dates:   none recognized"),
    }
    eprintln!("   Headers: {}", frame.headers.join(", "));

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
