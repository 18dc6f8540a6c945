// src/schema/ident.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchemaError;

/// A table or column name derived from scraped text.
///
/// Construction rejects empty names and control characters; [`Ident::quoted`]
/// is the only way an identifier reaches SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ident(String);

impl Ident {
    pub fn new(raw: impl Into<String>) -> Result<Self, SchemaError> {
        let raw = raw.into();
        if raw.is_empty() || raw.chars().any(char::is_control) {
            return Err(SchemaError::InvalidIdent(raw));
        }
        Ok(Ident(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted SQL identifier with embedded quotes doubled.
    pub fn quoted(&self) -> String {
        quote(&self.0)
    }

    /// Comparison key: DuckDB resolves identifiers case-insensitively.
    pub fn fold_key(&self) -> String {
        self.0.to_lowercase()
    }
}

pub(crate) fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

impl TryFrom<String> for Ident {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ident::new(value)
    }
}

impl From<Ident> for String {
    fn from(value: Ident) -> Self {
        value.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "Social Indicators" → "SocialIndicators": drop spaces, uppercase the
/// character after each dropped space.
pub fn table_ident(display_name: &str) -> Result<Ident, SchemaError> {
    let mut out = String::with_capacity(display_name.len());
    let mut after_space = false;
    for ch in display_name.chars() {
        if ch == ' ' {
            after_space = true;
            continue;
        }
        if after_space {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        after_space = false;
    }
    Ident::new(out)
}

/// "GDP growth" → "GDPgrowth": drop every space.
pub fn field_ident(display_name: &str) -> Result<Ident, SchemaError> {
    Ident::new(display_name.chars().filter(|c| *c != ' ').collect::<String>())
}
