use serde::{Deserialize, Serialize};

/// Name of the synthetic field holding the reporting periods.
pub const YEAR_FIELD: &str = "Year";

/// One named time series as scraped: display name plus one raw cell per
/// reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub values: Vec<String>,
}

impl Field {
    pub fn is_year(&self) -> bool {
        self.name == YEAR_FIELD
    }
}

/// A group of fields under one section header of a country profile.
/// The last field is always the synthetic `Year` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorTable {
    /// Section header text, e.g. "Social Indicators".
    pub name: String,
    pub fields: Vec<Field>,
}

impl IndicatorTable {
    pub fn year(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_year())
    }
}

/// Typed values of one field after cleaning.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Year(Vec<Option<i64>>),
    Measure(Vec<Option<f64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedField {
    pub name: String,
    pub values: Values,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub name: String,
    pub fields: Vec<NormalizedField>,
}

impl NormalizedTable {
    pub fn periods(&self) -> usize {
        self.fields
            .iter()
            .find_map(|f| match &f.values {
                Values::Year(v) => Some(v.len()),
                Values::Measure(_) => None,
            })
            .unwrap_or(0)
    }
}
