// src/duck/query.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::SchemaError;
use crate::process::YEAR_FIELD;
use crate::schema::ident::quote;
use crate::schema::{SchemaRegistry, TableSchema, COUNTRY_COLUMN, SURROGATE_KEY};

/// Row order of a tabular dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Country,
    Year,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "country" | "countries" => Ok(SortKey::Country),
            "year" | "years" => Ok(SortKey::Year),
            other => Err(format!("unknown sort key {:?} (country|year)", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Country => f.write_str("country"),
            SortKey::Year => f.write_str("year"),
        }
    }
}

/// SQL text plus the values bound to its `?` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<String>,
    /// Output column labels, in select order.
    pub columns: Vec<String>,
}

/// Builds read queries over the tables a [`SchemaRegistry`] describes.
/// Identifiers come from the registry and are quoted; countries are bound.
pub struct QueryBuilder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Country, year and one field for the requested countries, in storage
    /// order. `None` when no country was requested.
    pub fn series(&self, field: &str, countries: &[String]) -> Result<Option<Query>, SchemaError> {
        let (table, column) = self.registry.resolve(field)?;
        if countries.is_empty() {
            return Ok(None);
        }

        let t = table.ident.quoted();
        let sql = format!(
            "SELECT {t}.{country}, {t}.{year}, {t}.{col} FROM {t} \
             WHERE {t}.{country} IN ({marks}) ORDER BY {t}.{key}",
            country = quote(COUNTRY_COLUMN),
            year = quote(YEAR_FIELD),
            col = column.ident.quoted(),
            key = quote(SURROGATE_KEY),
            marks = placeholders(countries.len()),
        );

        Ok(Some(Query {
            sql,
            params: countries.to_vec(),
            columns: vec![
                COUNTRY_COLUMN.to_string(),
                YEAR_FIELD.to_string(),
                column.ident.to_string(),
            ],
        }))
    }

    /// Country, year and every requested field, joining the owning tables on
    /// their surrogate keys. `None` when no field or no country was requested.
    pub fn tabular(
        &self,
        fields: &[String],
        countries: &[String],
        sort: SortKey,
    ) -> Result<Option<Query>, SchemaError> {
        let resolved = fields
            .iter()
            .map(|f| self.registry.resolve(f))
            .collect::<Result<Vec<_>, _>>()?;
        if resolved.is_empty() || countries.is_empty() {
            return Ok(None);
        }

        // owning tables, first-seen order
        let mut tables: Vec<&TableSchema> = Vec::new();
        for (table, _) in &resolved {
            if !tables.iter().any(|t| t.ident == table.ident) {
                tables.push(table);
            }
        }

        let base = tables[0].ident.quoted();
        let country = quote(COUNTRY_COLUMN);
        let year = quote(YEAR_FIELD);
        let key = quote(SURROGATE_KEY);

        let mut select = vec![format!("{base}.{country}"), format!("{base}.{year}")];
        let mut columns = vec![COUNTRY_COLUMN.to_string(), YEAR_FIELD.to_string()];
        for (table, column) in &resolved {
            select.push(format!("{}.{}", table.ident.quoted(), column.ident.quoted()));
            columns.push(column.ident.to_string());
        }

        let mut from = base.clone();
        for table in &tables[1..] {
            let t = table.ident.quoted();
            from.push_str(&format!(" JOIN {t} ON {t}.{key} = {base}.{key}"));
        }

        let order = match sort {
            SortKey::Country => format!("{base}.{country}, {base}.{key}"),
            SortKey::Year => format!("{base}.{year}, {base}.{key}"),
        };

        let sql = format!(
            "SELECT {} FROM {} WHERE {base}.{country} IN ({}) ORDER BY {}",
            select.join(", "),
            from,
            placeholders(countries.len()),
            order,
        );

        Ok(Some(Query {
            sql,
            params: countries.to_vec(),
            columns,
        }))
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Field, IndicatorTable};

    fn registry() -> SchemaRegistry {
        let table = |name: &str, fields: &[&str]| IndicatorTable {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|f| Field {
                    name: f.to_string(),
                    values: vec![],
                })
                .collect(),
        };
        SchemaRegistry::derive(&[
            table("Social Indicators", &["Population, total", "Year"]),
            table("Economic Indicators", &["GDP growth", "Inflation", "Year"]),
        ])
        .unwrap()
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn series_query_binds_countries() {
        let reg = registry();
        let q = QueryBuilder::new(&reg)
            .series("Population,total", &strings(&["X", "Y"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            q.sql,
            r##"SELECT "SocialIndicators"."Country", "SocialIndicators"."Year", "SocialIndicators"."Population,total" FROM "SocialIndicators" WHERE "SocialIndicators"."Country" IN (?, ?) ORDER BY "SocialIndicators"."#""##
        );
        assert_eq!(q.params, ["X", "Y"]);
    }

    #[test]
    fn single_table_tabular_has_no_join() {
        let reg = registry();
        let q = QueryBuilder::new(&reg)
            .tabular(&strings(&["GDPgrowth", "Inflation"]), &strings(&["X"]), SortKey::Year)
            .unwrap()
            .unwrap();
        assert!(!q.sql.contains("JOIN"));
        assert!(q
            .sql
            .ends_with(r##"ORDER BY "EconomicIndicators"."Year", "EconomicIndicators"."#""##));
        assert_eq!(q.columns, ["Country", "Year", "GDPgrowth", "Inflation"]);
    }

    #[test]
    fn multi_table_tabular_joins_once_per_table() {
        let reg = registry();
        let q = QueryBuilder::new(&reg)
            .tabular(
                &strings(&["Population,total", "GDPgrowth", "Inflation"]),
                &strings(&["X", "Y"]),
                SortKey::Country,
            )
            .unwrap()
            .unwrap();
        assert_eq!(q.sql.matches(" JOIN ").count(), 1);
        assert!(q.sql.contains(
            r##"FROM "SocialIndicators" JOIN "EconomicIndicators" ON "EconomicIndicators"."#" = "SocialIndicators"."#""##
        ));
        assert!(q.sql.contains(r##""EconomicIndicators"."Inflation""##));
        assert!(q.sql.contains("ORDER BY \"SocialIndicators\".\"Country\""));
    }

    #[test]
    fn empty_selections_build_nothing() {
        let reg = registry();
        let qb = QueryBuilder::new(&reg);
        assert_eq!(qb.series("GDPgrowth", &[]).unwrap(), None);
        assert_eq!(qb.tabular(&[], &strings(&["X"]), SortKey::Country).unwrap(), None);
        assert_eq!(qb.tabular(&strings(&["GDPgrowth"]), &[], SortKey::Year).unwrap(), None);
    }

    #[test]
    fn unknown_field_is_an_error() {
        let reg = registry();
        let qb = QueryBuilder::new(&reg);
        assert!(matches!(
            qb.series("Nope", &strings(&["X"])),
            Err(SchemaError::UnknownField(_))
        ));
        assert!(qb
            .tabular(&strings(&["GDPgrowth", "Year"]), &strings(&["X"]), SortKey::Year)
            .is_err());
    }

    #[test]
    fn sort_key_parses_form_values() {
        assert_eq!("Countries".parse::<SortKey>().unwrap(), SortKey::Country);
        assert_eq!("year".parse::<SortKey>().unwrap(), SortKey::Year);
        assert!("month".parse::<SortKey>().is_err());
    }
}
