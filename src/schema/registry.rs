// src/schema/registry.rs

use std::collections::HashMap;
use tracing::{debug, info};

use super::ident::{field_ident, table_ident, Ident};
use super::types::{FieldSchema, TableSchema};
use crate::error::{IngestError, SchemaError};
use crate::process::IndicatorTable;

/// Column names every table carries besides its fields.
pub const SURROGATE_KEY: &str = "#";
pub const COUNTRY_COLUMN: &str = "Country";

/// Tables and columns discovered from the bootstrap country.
///
/// Built once, never mutated; the store and the query builder borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRegistry {
    tables: Vec<TableSchema>,
    /// folded field ident → (table index, field index), measures only
    owners: HashMap<String, (usize, usize)>,
}

impl SchemaRegistry {
    /// Derive identifiers for every table and field of the bootstrap country.
    pub fn derive(tables: &[IndicatorTable]) -> Result<Self, SchemaError> {
        let schemas = tables
            .iter()
            .map(|t| {
                let fields = t
                    .fields
                    .iter()
                    .map(|f| {
                        Ok(FieldSchema {
                            name: f.name.clone(),
                            ident: field_ident(&f.name)?,
                        })
                    })
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                Ok(TableSchema {
                    name: t.name.clone(),
                    ident: table_ident(&t.name)?,
                    fields,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        let registry = Self::from_tables(schemas)?;
        info!(
            tables = registry.tables.len(),
            fields = registry.owners.len(),
            "derived schema registry"
        );
        Ok(registry)
    }

    /// Validate a table list and index its fields. Any two names folding to
    /// the same identifier are rejected.
    pub fn from_tables(tables: Vec<TableSchema>) -> Result<Self, SchemaError> {
        if tables.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut table_keys: HashMap<String, &str> = HashMap::new();
        let mut owners: HashMap<String, (usize, usize)> = HashMap::new();

        for (ti, table) in tables.iter().enumerate() {
            if let Some(first) = table_keys.insert(table.ident.fold_key(), &table.name) {
                return Err(collision("table", &table.ident, first, &table.name));
            }

            let mut column_keys: HashMap<String, &str> = HashMap::new();
            column_keys.insert(SURROGATE_KEY.to_lowercase(), SURROGATE_KEY);
            column_keys.insert(COUNTRY_COLUMN.to_lowercase(), COUNTRY_COLUMN);

            for (fi, field) in table.fields.iter().enumerate() {
                let key = field.ident.fold_key();
                if let Some(first) = column_keys.insert(key.clone(), &field.name) {
                    return Err(collision("column", &field.ident, first, &field.name));
                }
                if field.is_year() {
                    continue;
                }
                if let Some((other_t, other_f)) = owners.insert(key, (ti, fi)) {
                    let first = &tables[other_t].fields[other_f].name;
                    return Err(collision("field", &field.ident, first, &field.name));
                }
            }
            if table.year().is_none() {
                return Err(SchemaError::MissingYear(table.name.clone()));
            }
            debug!(table = %table.ident, columns = table.fields.len(), "table schema");
        }

        Ok(Self { tables, owners })
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Every queryable field identifier, in table then column order.
    pub fn field_idents(&self) -> Vec<&Ident> {
        self.tables
            .iter()
            .flat_map(|t| t.fields.iter().filter(|f| !f.is_year()).map(|f| &f.ident))
            .collect()
    }

    /// The table owning `field`. Asking for a field that does not exist
    /// (the shared `Year` axis included) is a caller error.
    pub fn table_for(&self, field: &str) -> Result<&TableSchema, SchemaError> {
        self.resolve(field).map(|(t, _)| t)
    }

    /// Owning table and column schema for `field`.
    pub fn resolve(&self, field: &str) -> Result<(&TableSchema, &FieldSchema), SchemaError> {
        let (ti, fi) = self
            .owners
            .get(&field.to_lowercase())
            .copied()
            .ok_or_else(|| SchemaError::UnknownField(field.to_string()))?;
        let table = &self.tables[ti];
        Ok((table, &table.fields[fi]))
    }

    /// Check that a later country's tables line up with the bootstrap
    /// country: same tables in order, same raw field names by position.
    pub fn conform(&self, tables: &[IndicatorTable]) -> Result<(), IngestError> {
        if tables.len() != self.tables.len() {
            return Err(IngestError::structure(format!(
                "{} tables, schema has {}",
                tables.len(),
                self.tables.len()
            )));
        }
        for (found, expected) in tables.iter().zip(&self.tables) {
            if found.name != expected.name {
                return Err(IngestError::structure(format!(
                    "table {:?} where schema expects {:?}",
                    found.name, expected.name
                )));
            }
            if found.fields.len() != expected.fields.len() {
                return Err(IngestError::structure(format!(
                    "table {:?} has {} fields, schema has {}",
                    found.name,
                    found.fields.len(),
                    expected.fields.len()
                )));
            }
            for (pos, (f, e)) in found.fields.iter().zip(&expected.fields).enumerate() {
                if f.name != e.name {
                    return Err(IngestError::structure(format!(
                        "table {:?} field {}: {:?} where schema expects {:?}",
                        found.name, pos, f.name, e.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn collision(kind: &'static str, ident: &Ident, first: &str, second: &str) -> SchemaError {
    SchemaError::Collision {
        kind,
        ident: ident.to_string(),
        first: first.to_string(),
        second: second.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Field;

    fn table(name: &str, fields: &[&str]) -> IndicatorTable {
        IndicatorTable {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|f| Field {
                    name: f.to_string(),
                    values: vec!["1".into()],
                })
                .collect(),
        }
    }

    #[test]
    fn bootstrap_scenario() {
        let reg =
            SchemaRegistry::derive(&[table("Social Indicators", &["Population, total", "Year"])])
                .unwrap();
        let t = &reg.tables()[0];
        assert_eq!(t.ident.as_str(), "SocialIndicators");
        let cols: Vec<_> = t.fields.iter().map(|f| f.ident.as_str()).collect();
        assert_eq!(cols, ["Population,total", "Year"]);
        assert_eq!(reg.table_for("Population,total").unwrap().ident.as_str(), "SocialIndicators");
    }

    #[test]
    fn lookup_spans_tables() {
        let reg = SchemaRegistry::derive(&[
            table("Social Indicators", &["Population, total", "Year"]),
            table("Economic Indicators", &["GDP growth", "Year"]),
        ])
        .unwrap();
        assert_eq!(reg.table_for("GDPgrowth").unwrap().name, "Economic Indicators");
        let idents: Vec<_> = reg.field_idents().iter().map(|i| i.as_str()).collect();
        assert_eq!(idents, ["Population,total", "GDPgrowth"]);
    }

    #[test]
    fn unknown_and_shared_fields_are_caller_errors() {
        let reg = SchemaRegistry::derive(&[table("A", &["x", "Year"])]).unwrap();
        assert_eq!(
            reg.table_for("nope"),
            Err(SchemaError::UnknownField("nope".into()))
        );
        assert!(reg.table_for("Year").is_err());
    }

    #[test]
    fn colliding_table_names_fail() {
        let err = SchemaRegistry::derive(&[
            table("Social Indicators", &["a", "Year"]),
            table("Social indicators", &["b", "Year"]),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::Collision { kind: "table", .. }));
    }

    #[test]
    fn colliding_field_names_fail() {
        let within = SchemaRegistry::derive(&[table("A", &["GDP growth", "GDPgrowth", "Year"])]);
        assert!(matches!(within, Err(SchemaError::Collision { kind: "column", .. })));

        let across = SchemaRegistry::derive(&[
            table("A", &["GDP growth", "Year"]),
            table("B", &["GDP  growth", "Year"]),
        ]);
        assert!(matches!(across, Err(SchemaError::Collision { kind: "field", .. })));

        let reserved = SchemaRegistry::derive(&[table("A", &["Country", "Year"])]);
        assert!(matches!(reserved, Err(SchemaError::Collision { .. })));
    }

    #[test]
    fn conform_checks_shape_and_names() {
        let reg = SchemaRegistry::derive(&[table("A", &["x", "y", "Year"])]).unwrap();
        assert!(reg.conform(&[table("A", &["x", "y", "Year"])]).is_ok());
        assert!(reg.conform(&[table("A", &["x", "Year"])]).is_err());
        assert!(reg.conform(&[table("A", &["y", "x", "Year"])]).is_err());
        assert!(reg.conform(&[table("B", &["x", "y", "Year"])]).is_err());
        assert!(reg.conform(&[]).is_err());
    }

    #[test]
    fn every_table_needs_a_year_axis() {
        let err = SchemaRegistry::derive(&[table("A", &["x"])]).unwrap_err();
        assert_eq!(err, SchemaError::MissingYear("A".into()));
    }

    #[test]
    fn empty_bootstrap_fails() {
        assert_eq!(SchemaRegistry::derive(&[]), Err(SchemaError::Empty));
    }
}
