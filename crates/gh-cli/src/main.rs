use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use gh_calendar::{shift_days, MarketCalendar};
use gh_djia::{DjiaCache, Fetcher, IndicatorSource, StaticSource, DEFAULT_ENDPOINTS};
use gh_hash::{Cell, Coordinates, GeohashEngine};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser)]
#[command(name = "geohash")]
#[command(about = "xkcd geohashing coordinates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Geohash of one graticule
    Cell {
        #[command(flatten)]
        cell: CellArgs,
        #[command(flatten)]
        when: WhenArgs,
    },

    /// Globalhash
    Global {
        #[command(flatten)]
        when: WhenArgs,
    },

    /// Geohash of one graticule plus every later day already known
    Next {
        #[command(flatten)]
        cell: CellArgs,
        #[command(flatten)]
        when: WhenArgs,
    },

    /// Globalhash plus every later day already known
    GlobalNext {
        #[command(flatten)]
        when: WhenArgs,
    },
}

#[derive(Args)]
struct CellArgs {
    /// Latitude area, e.g. 52
    #[arg(long, allow_hyphen_values = true)]
    lat: i32,

    /// Longitude area, e.g. -122
    #[arg(long, allow_hyphen_values = true)]
    lon: i32,
}

#[derive(Args)]
struct WhenArgs {
    /// Day to compute (YYYY-MM-DD); defaults to today in --tz
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Wall-clock time (HH:MM) on --date; defaults to 00:00
    #[arg(long, requires = "date", value_parser = parse_time)]
    time: Option<NaiveTime>,

    /// IANA time zone the date and time are given in
    #[arg(long, default_value = "UTC", value_parser = parse_tz)]
    tz: Tz,

    /// Use this DJIA value for every date instead of fetching
    #[arg(long)]
    djia: Option<f64>,

    /// DJIA endpoint URL templates (strftime)
    #[arg(
        long = "djia-url",
        env = "GEOHASHING_DJIA_URLS",
        value_delimiter = ',',
        default_values = DEFAULT_ENDPOINTS.iter().copied()
    )]
    djia_urls: Vec<String>,

    /// Deadline for one DJIA lookup
    #[arg(long, env = "GEOHASHING_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    fetch_timeout_secs: u64,
}

impl WhenArgs {
    fn instant(&self) -> Result<DateTime<Tz>> {
        let Some(date) = self.date else {
            return Ok(Utc::now().with_timezone(&self.tz));
        };
        let naive = date.and_time(self.time.unwrap_or(NaiveTime::MIN));
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| anyhow!("{naive} does not exist in {}", self.tz))
    }

    fn engine(&self) -> Result<GeohashEngine> {
        let source: Arc<dyn IndicatorSource> = match self.djia {
            Some(value) => Arc::new(StaticSource::constant(value)),
            None => {
                let fetcher = Fetcher::new(
                    self.djia_urls.iter().cloned(),
                    Duration::from_secs(self.fetch_timeout_secs),
                )
                .context("invalid DJIA endpoint configuration")?;
                Arc::new(DjiaCache::new(Arc::new(fetcher)))
            }
        };
        Ok(GeohashEngine::new(Arc::new(MarketCalendar::new()), source))
    }
}

fn parse_tz(s: &str) -> Result<Tz, String> {
    s.parse().map_err(|_| format!("unknown IANA time zone {s:?}"))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

/// One printed geohash.
#[derive(Serialize)]
struct Entry {
    date: NaiveDate,
    lat: f64,
    lon: f64,
}

impl Entry {
    fn new(date: DateTime<Tz>, coords: Coordinates) -> Self {
        Self {
            date: date.date_naive(),
            lat: coords.lat,
            lon: coords.lon,
        }
    }
}

fn sequence(start: DateTime<Tz>, coords: Vec<Coordinates>) -> Vec<Entry> {
    coords
        .into_iter()
        .enumerate()
        .map(|(i, c)| Entry::new(shift_days(start, i as i64), c))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    let json = match cli.cmd {
        Commands::Cell { cell, when } => {
            let (engine, date) = (when.engine()?, when.instant()?);
            let coords = engine
                .cell(Cell::new(cell.lat, cell.lon), date, &cancel)
                .await?;
            serde_json::to_string_pretty(&Entry::new(date, coords))?
        }
        Commands::Global { when } => {
            let (engine, date) = (when.engine()?, when.instant()?);
            let coords = engine.global(date, &cancel).await?;
            serde_json::to_string_pretty(&Entry::new(date, coords))?
        }
        Commands::Next { cell, when } => {
            let (engine, date) = (when.engine()?, when.instant()?);
            let coords = engine
                .cell_next(Cell::new(cell.lat, cell.lon), date, &cancel)
                .await?;
            serde_json::to_string_pretty(&sequence(date, coords))?
        }
        Commands::GlobalNext { when } => {
            let (engine, date) = (when.engine()?, when.instant()?);
            let coords = engine.global_next(date, &cancel).await?;
            serde_json::to_string_pretty(&sequence(date, coords))?
        }
    };

    debug!(bytes = json.len(), "printing result");
    println!("{json}");
    Ok(())
}
