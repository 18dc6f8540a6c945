// src/duck/store.rs

use anyhow::{Context, Result};
use duckdb::{Connection, ToSql};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument};

use super::query::{Query, QueryBuilder, SortKey};
use crate::error::IngestError;
use crate::process::{NormalizedTable, Values};
use crate::schema::ident::quote;
use crate::schema::{SchemaRegistry, TableSchema, COUNTRY_COLUMN, SURROGATE_KEY};

/// One point of a single-field time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub country: String,
    pub year: Option<i64>,
    pub value: Option<f64>,
}

/// One row of a multi-field dump; `values` follow the requested field order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularRow {
    pub country: String,
    pub year: Option<i64>,
    pub values: Vec<Option<f64>>,
}

/// DuckDB-backed indicator store. The only writer of its tables.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open a DuckDB database on disk at `path`, creating the file if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).with_context(|| format!("opening {:?}", path))?;
        Ok(Self { conn })
    }

    /// Open a DuckDB in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Second handle on the same database.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            conn: self.conn.try_clone()?,
        })
    }

    /// Drop and recreate one table per registry entry. Running it twice
    /// leaves the same empty schema.
    #[instrument(level = "info", skip_all)]
    pub fn create_schema(&self, registry: &SchemaRegistry) -> Result<()> {
        let mut ddl = String::new();
        for table in registry.tables() {
            ddl.push_str(&format!("DROP TABLE IF EXISTS {};\n", table.ident.quoted()));
            ddl.push_str(&create_table_sql(table));
            ddl.push_str(";\n");
        }
        debug!(%ddl, "schema ddl");
        self.conn
            .execute_batch(&ddl)
            .context("creating indicator tables")?;
        info!(tables = registry.tables().len(), "schema created");
        Ok(())
    }

    /// Append one row per reporting period to every table for `country`.
    /// All tables are written in one transaction; returns the rows written.
    #[instrument(level = "debug", skip(self, registry, tables))]
    pub fn insert_country(
        &mut self,
        registry: &SchemaRegistry,
        country: &str,
        tables: &[NormalizedTable],
    ) -> Result<usize, IngestError> {
        if tables.len() != registry.tables().len() {
            return Err(IngestError::structure(format!(
                "{} tables for a schema of {}",
                tables.len(),
                registry.tables().len()
            )));
        }

        let tx = self.conn.transaction()?;
        let mut written = 0;

        for (schema, table) in registry.tables().iter().zip(tables) {
            if schema.name != table.name || schema.fields.len() != table.fields.len() {
                return Err(IngestError::structure(format!(
                    "table {:?} does not match schema table {:?}",
                    table.name, schema.name
                )));
            }

            let t = schema.ident.quoted();
            let key = quote(SURROGATE_KEY);
            let last_id: i64 = tx.query_row(
                &format!("SELECT COALESCE(MAX({key}), 0) FROM {t}"),
                [],
                |r| r.get(0),
            )?;

            let mut stmt = tx.prepare(&insert_sql(schema))?;
            for period in 0..table.periods() {
                let mut params: Vec<Box<dyn ToSql>> = Vec::with_capacity(table.fields.len() + 2);
                params.push(Box::new(last_id + period as i64 + 1));
                params.push(Box::new(country.to_string()));
                for field in &table.fields {
                    match &field.values {
                        Values::Year(v) => params.push(Box::new(v.get(period).copied().flatten())),
                        Values::Measure(v) => {
                            params.push(Box::new(v.get(period).copied().flatten()))
                        }
                    }
                }
                let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
                stmt.execute(refs.as_slice())?;
                written += 1;
            }
        }

        tx.commit()?;
        debug!(country, rows = written, "stored country");
        Ok(written)
    }

    pub fn row_count(&self, table: &TableSchema) -> Result<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.ident.quoted()),
            [],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Column names of a stored table, in declaration order.
    pub fn columns(&self, table: &TableSchema) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let rows = stmt.query_map([table.ident.as_str()], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Single-field series for `countries`; countries with no rows simply
    /// contribute nothing.
    pub fn series(
        &self,
        registry: &SchemaRegistry,
        field: &str,
        countries: &[String],
    ) -> Result<Vec<SeriesPoint>> {
        let Some(query) = QueryBuilder::new(registry).series(field, countries)? else {
            return Ok(Vec::new());
        };
        self.run(&query, |r| {
            Ok(SeriesPoint {
                country: r.get(0)?,
                year: r.get(1)?,
                value: r.get(2)?,
            })
        })
    }

    /// Multi-field dump for `countries`, ordered by `sort`.
    pub fn tabular(
        &self,
        registry: &SchemaRegistry,
        fields: &[String],
        countries: &[String],
        sort: SortKey,
    ) -> Result<Vec<TabularRow>> {
        let Some(query) = QueryBuilder::new(registry).tabular(fields, countries, sort)? else {
            return Ok(Vec::new());
        };
        let width = fields.len();
        self.run(&query, |r| {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(r.get::<_, Option<f64>>(i + 2)?);
            }
            Ok(TabularRow {
                country: r.get(0)?,
                year: r.get(1)?,
                values,
            })
        })
    }

    fn run<T, F>(&self, query: &Query, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&duckdb::Row<'_>) -> duckdb::Result<T>,
    {
        debug!(sql = %query.sql, params = ?query.params, "query");
        let mut stmt = self
            .conn
            .prepare(&query.sql)
            .with_context(|| format!("preparing {}", query.sql))?;
        let refs: Vec<&dyn ToSql> = query.params.iter().map(|p| p as &dyn ToSql).collect();
        let rows = stmt.query_map(refs.as_slice(), map)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn create_table_sql(table: &TableSchema) -> String {
    let mut cols = vec![
        format!("{} BIGINT PRIMARY KEY", quote(SURROGATE_KEY)),
        format!("{} VARCHAR NOT NULL", quote(COUNTRY_COLUMN)),
    ];
    for field in &table.fields {
        let ty = if field.is_year() { "BIGINT" } else { "DOUBLE" };
        cols.push(format!("{} {}", field.ident.quoted(), ty));
    }
    format!("CREATE TABLE {} ({})", table.ident.quoted(), cols.join(", "))
}

fn insert_sql(table: &TableSchema) -> String {
    let mut cols = vec![quote(SURROGATE_KEY), quote(COUNTRY_COLUMN)];
    cols.extend(table.fields.iter().map(|f| f.ident.quoted()));
    let marks = vec!["?"; cols.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.ident.quoted(),
        cols.join(", "),
        marks
    )
}
