// src/error.rs

use thiserror::Error;

/// Failure while ingesting a single country.
///
/// `Fetch`, `Structure` and `Coercion` are scoped to one country: the pipeline
/// logs them and moves on. `Cache` and `Store` mean local state can no longer
/// be written and the run stops.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetching {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("unexpected document structure: {0}")]
    Structure(String),

    #[error("field `{field}`: cannot parse {value:?} as {expected}")]
    Coercion {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("persisting fetch cache {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error("store: {0}")]
    Store(#[from] duckdb::Error),
}

impl IngestError {
    pub fn structure(msg: impl Into<String>) -> Self {
        IngestError::Structure(msg.into())
    }

    /// True when the failure only invalidates the current country.
    pub fn is_per_country(&self) -> bool {
        !matches!(self, IngestError::Cache { .. } | IngestError::Store(_))
    }
}

/// Errors raised while deriving or consulting the schema registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid identifier {0:?}")]
    InvalidIdent(String),

    #[error("{kind} identifier `{ident}` derived from both {first:?} and {second:?}")]
    Collision {
        kind: &'static str,
        ident: String,
        first: String,
        second: String,
    },

    #[error("no table owns field `{0}`")]
    UnknownField(String),

    #[error("table `{0}` has no Year column")]
    MissingYear(String),

    #[error("no tables discovered")]
    Empty,
}
