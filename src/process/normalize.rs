// src/process/normalize.rs

use super::raw_table::{Field, IndicatorTable, NormalizedField, NormalizedTable, Values};
use super::utils::clean_value;
use crate::error::IngestError;

/// Clean and type every value of one field. `Year` becomes integers,
/// everything else floats; missing markers become `None`.
pub fn normalize_field(field: &Field) -> Result<NormalizedField, IngestError> {
    let values = if field.is_year() {
        Values::Year(coerce_all(field, "integer", |s| s.parse::<i64>().ok())?)
    } else {
        Values::Measure(coerce_all(field, "float", |s| {
            s.parse::<f64>().ok().filter(|v| v.is_finite())
        })?)
    };
    Ok(NormalizedField {
        name: field.name.clone(),
        values,
    })
}

pub fn normalize_table(table: &IndicatorTable) -> Result<NormalizedTable, IngestError> {
    let fields = table
        .fields
        .iter()
        .map(normalize_field)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NormalizedTable {
        name: table.name.clone(),
        fields,
    })
}

pub fn normalize_tables(tables: &[IndicatorTable]) -> Result<Vec<NormalizedTable>, IngestError> {
    tables.iter().map(normalize_table).collect()
}

fn coerce_all<T>(
    field: &Field,
    expected: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>, IngestError> {
    field
        .values
        .iter()
        .map(|raw| match clean_value(raw) {
            None => Ok(None),
            Some(cleaned) => parse(&cleaned).map(Some).ok_or_else(|| IngestError::Coercion {
                field: field.name.clone(),
                value: raw.clone(),
                expected,
            }),
        })
        .collect()
}
