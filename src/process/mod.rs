// src/process/mod.rs
pub mod extract;
pub mod normalize;
pub mod raw_table;
pub mod utils;

pub use extract::extract;
pub use normalize::{normalize_field, normalize_table, normalize_tables};
pub use raw_table::{
    Field, IndicatorTable, NormalizedField, NormalizedTable, Values, YEAR_FIELD,
};
pub use utils::{clean_text, clean_value};
