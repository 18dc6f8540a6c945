// src/pipeline.rs

use anyhow::{anyhow, Context, Result};
use futures::{stream, StreamExt};
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::duck::Store;
use crate::error::IngestError;
use crate::fetch::{country_links, profile_link, CountryLink, Fetch, FetchCache};
use crate::process::{extract, normalize_tables, IndicatorTable};
use crate::schema::SchemaRegistry;

/// Path of the country overview page, relative to the site root.
pub const OVERVIEW_PATH: &str = "/country";

/// Outcome of a full run.
#[derive(Debug)]
pub struct RunReport {
    pub registry: SchemaRegistry,
    /// Countries stored, in overview order.
    pub countries: Vec<String>,
    /// Countries skipped, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Fetch → extract → normalise → store, one country at a time.
pub struct Pipeline<F> {
    cache: FetchCache<F>,
    base: Url,
    config: Config,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(config: Config, cache: FetchCache<F>) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .with_context(|| format!("parsing base URL {}", config.base_url))?;
        Ok(Self {
            cache,
            base,
            config,
        })
    }

    pub fn cache(&self) -> &FetchCache<F> {
        &self.cache
    }

    /// Countries listed on the overview page.
    pub async fn discover_countries(&self) -> Result<Vec<CountryLink>> {
        let url = self.base.join(OVERVIEW_PATH)?;
        let html = self
            .cache
            .get_or_fetch(&url)
            .await
            .context("fetching country overview")?;
        let links = country_links(&html, &url);
        if links.is_empty() {
            return Err(anyhow!("no countries listed on {}", url));
        }
        info!(count = links.len(), "discovered countries");
        Ok(links)
    }

    /// Country page → profile link → profile page → indicator tables.
    pub async fn country_tables(
        &self,
        link: &CountryLink,
    ) -> Result<Vec<IndicatorTable>, IngestError> {
        let page = self.cache.get_or_fetch(&link.url).await?;
        let profile = profile_link(&page, &link.url)?;
        let html = self.cache.get_or_fetch(&profile).await?;
        extract(&html)
    }

    /// Derive the schema from the bootstrap country and rebuild the tables.
    #[instrument(level = "info", skip(self, links, store))]
    pub async fn bootstrap(&self, links: &[CountryLink], store: &Store) -> Result<SchemaRegistry> {
        let name = &self.config.bootstrap_country;
        let link = links
            .iter()
            .find(|l| &l.name == name)
            .ok_or_else(|| anyhow!("bootstrap country {:?} is not listed", name))?;
        let tables = self
            .country_tables(link)
            .await
            .with_context(|| format!("reading bootstrap country {}", name))?;
        let registry = SchemaRegistry::derive(&tables)
            .with_context(|| format!("deriving schema from {}", name))?;
        store.create_schema(&registry)?;
        Ok(registry)
    }

    /// Full run. Per-country failures are logged and skipped; discovery,
    /// bootstrap, cache and store failures abort.
    pub async fn run(&self, store: &mut Store) -> Result<RunReport> {
        let start = Instant::now();
        let links = self.discover_countries().await?;
        let registry = self.bootstrap(&links, store).await?;

        let limit = self.config.max_countries.unwrap_or(usize::MAX);
        let mut countries = Vec::new();
        let mut skipped = Vec::new();

        // fetches overlap, results arrive in overview order
        let mut fetched = stream::iter(links.iter())
            .map(|link| async move { (link, self.country_tables(link).await) })
            .buffered(self.config.concurrency.max(1));

        while let Some((link, tables)) = fetched.next().await {
            if countries.len() >= limit {
                break;
            }
            let outcome = tables.and_then(|t| ingest(&registry, store, &link.name, &t));
            match outcome {
                Ok(rows) => {
                    info!(country = %link.name, rows, "ingested");
                    countries.push(link.name.clone());
                }
                Err(e) if e.is_per_country() => {
                    warn!(country = %link.name, error = %e, "skipping country");
                    skipped.push((link.name.clone(), e.to_string()));
                }
                Err(e) => {
                    error!(country = %link.name, error = %e, "aborting run");
                    return Err(e).with_context(|| format!("ingesting {}", link.name));
                }
            }
        }

        info!(
            ingested = countries.len(),
            skipped = skipped.len(),
            elapsed = ?start.elapsed(),
            "run finished"
        );
        Ok(RunReport {
            registry,
            countries,
            skipped,
        })
    }
}

/// Validate, normalise and store one country's tables.
pub fn ingest(
    registry: &SchemaRegistry,
    store: &mut Store,
    country: &str,
    tables: &[IndicatorTable],
) -> Result<usize, IngestError> {
    registry.conform(tables)?;
    let normalized = normalize_tables(tables)?;
    store.insert_country(registry, country, &normalized)
}
