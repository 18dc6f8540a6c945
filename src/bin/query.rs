use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wdiscraper::{
    config::Config,
    duck::{QueryBuilder, SortKey, Store},
    schema::read_catalog,
};

#[derive(Parser)]
#[command(author, version, about = "Query a scraped indicator database")]
struct Args {
    /// YAML config file naming the database and catalog
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    db_path: Option<PathBuf>,
    #[arg(long)]
    catalog_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored countries and queryable fields
    Fields,
    /// One field over time for some countries
    Series {
        #[arg(short, long)]
        field: String,
        #[arg(short, long = "country", required = true)]
        countries: Vec<String>,
    },
    /// Several fields side by side for some countries
    Table {
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
        #[arg(short, long = "country", required = true)]
        countries: Vec<String>,
        #[arg(short, long, default_value_t = SortKey::Country)]
        sort: SortKey,
    },
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    if let Some(p) = args.db_path {
        cfg.db_path = p;
    }
    if let Some(p) = args.catalog_path {
        cfg.catalog_path = p;
    }

    if !cfg.catalog_path.exists() {
        bail!("no catalog at {:?}; run wdiscraper first", cfg.catalog_path);
    }
    let catalog = read_catalog(&cfg.catalog_path)?;
    let registry = catalog.registry()?;
    info!(tables = registry.tables().len(), "loaded catalog");

    let out = match args.command {
        Command::Fields => serde_json::json!({
            "countries": catalog.countries,
            "fields": registry.field_idents(),
        }),
        Command::Series { field, countries } => {
            let store = Store::open(&cfg.db_path)?;
            serde_json::to_value(store.series(&registry, &field, &countries)?)?
        }
        Command::Table {
            fields,
            countries,
            sort,
        } => {
            let columns = QueryBuilder::new(&registry)
                .tabular(&fields, &countries, sort)?
                .map(|q| q.columns)
                .unwrap_or_default();
            let store = Store::open(&cfg.db_path)?;
            let rows = store.tabular(&registry, &fields, &countries, sort)?;
            serde_json::json!({ "columns": columns, "rows": rows })
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
