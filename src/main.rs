use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use wdiscraper::{
    config::Config,
    duck::Store,
    fetch::{FetchCache, HttpFetcher},
    pipeline::Pipeline,
    schema::{write_catalog, Catalog},
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scrape World Bank country profiles into DuckDB"
)]
struct Args {
    /// YAML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    cache_path: Option<PathBuf>,
    #[arg(long)]
    db_path: Option<PathBuf>,
    #[arg(long)]
    catalog_path: Option<PathBuf>,
    #[arg(long)]
    bootstrap_country: Option<String>,
    /// Stop after this many countries were stored
    #[arg(long)]
    max_countries: Option<usize>,
    #[arg(long)]
    concurrency: Option<usize>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    user_agent: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_yaml_file(path)?,
            None => Config::default(),
        };
        if let Some(v) = self.base_url {
            cfg.base_url = v;
        }
        if let Some(v) = self.cache_path {
            cfg.cache_path = v;
        }
        if let Some(v) = self.db_path {
            cfg.db_path = v;
        }
        if let Some(v) = self.catalog_path {
            cfg.catalog_path = v;
        }
        if let Some(v) = self.bootstrap_country {
            cfg.bootstrap_country = v;
        }
        if self.max_countries.is_some() {
            cfg.max_countries = self.max_countries;
        }
        if let Some(v) = self.concurrency {
            cfg.concurrency = v;
        }
        if let Some(v) = self.timeout_secs {
            cfg.timeout_secs = v;
        }
        if let Some(v) = self.user_agent {
            cfg.user_agent = v;
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) resolve config ───────────────────────────────────────────
    let cfg = Args::parse().into_config()?;
    info!(?cfg, "config");
    let start = Instant::now();

    // ─── 3) cache + store ────────────────────────────────────────────
    let fetcher = HttpFetcher::from_config(&cfg)?;
    let cache = FetchCache::open(cfg.cache_path.clone(), fetcher);
    let mut store = Store::open(&cfg.db_path)?;

    // ─── 4) bootstrap schema, ingest every country ───────────────────
    let catalog_path = cfg.catalog_path.clone();
    let pipeline = Pipeline::new(cfg, cache)?;
    let report = pipeline.run(&mut store).await?;

    for (country, reason) in &report.skipped {
        warn!(country = %country, reason = %reason, "skipped");
    }

    // ─── 5) hand the schema to consumers ─────────────────────────────
    let catalog = Catalog::new(&report.registry, report.countries);
    write_catalog(&catalog_path, &catalog)
        .with_context(|| format!("writing catalog {:?}", catalog_path))?;

    let cached = pipeline.cache().len().await;
    info!(
        countries = catalog.countries.len(),
        skipped = report.skipped.len(),
        cached,
        cache = %pipeline.cache().path().display(),
        elapsed = ?start.elapsed(),
        "all done"
    );
    Ok(())
}
