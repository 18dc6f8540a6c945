// src/schema/types.rs

use serde::{Deserialize, Serialize};

use super::ident::Ident;
use crate::process::YEAR_FIELD;

/// One stored column, as discovered from the bootstrap country.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct FieldSchema {
    /// Text as scraped, e.g. "Population, total".
    pub name: String,
    pub ident: Ident,
}

impl FieldSchema {
    pub fn is_year(&self) -> bool {
        self.name == YEAR_FIELD
    }
}

/// One stored table: an indicator group and its ordered columns.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct TableSchema {
    pub name: String,
    pub ident: Ident,
    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn year(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_year())
    }
}
