use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use super::registry::SchemaRegistry;
use super::types::TableSchema;

/// What a run hands to consumers: the schema and the countries that made it
/// into the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<TableSchema>,
    pub countries: Vec<String>,
}

impl Catalog {
    pub fn new(registry: &SchemaRegistry, countries: Vec<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            tables: registry.tables().to_vec(),
            countries,
        }
    }

    /// Rebuild (and re-validate) the registry this catalog was written from.
    pub fn registry(&self) -> Result<SchemaRegistry> {
        SchemaRegistry::from_tables(self.tables.clone()).context("catalog schema is invalid")
    }
}

/// Write `catalog` to `path` as pretty JSON, atomically.
pub fn write_catalog<P: AsRef<Path>>(path: P, catalog: &Catalog) -> Result<()> {
    // 1) Ensure the parent exists
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
    }

    // 2) Write to tmp file, then rename over original
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("catalog.json");
    let tmp_path: PathBuf = path.with_file_name(format!(".{}.tmp", file_name));
    let mut tmp = fs::File::create(&tmp_path)
        .with_context(|| format!("creating {:?}", tmp_path))?;

    // pretty-print with a trailing newline
    serde_json::to_writer_pretty(&mut tmp, catalog).context("serializing catalog")?;
    tmp.write_all(b"\n")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    Ok(())
}

pub fn read_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path = path.as_ref();
    let f = fs::File::open(path).with_context(|| format!("opening {:?}", path))?;
    serde_json::from_reader(f).with_context(|| format!("parsing {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Field, IndicatorTable};
    use tempfile::tempdir;

    #[test]
    fn catalog_round_trips_through_disk() {
        let registry = SchemaRegistry::derive(&[IndicatorTable {
            name: "Social Indicators".into(),
            fields: vec![
                Field {
                    name: "Population, total".into(),
                    values: vec!["10".into()],
                },
                Field {
                    name: "Year".into(),
                    values: vec!["2019".into()],
                },
            ],
        }])
        .unwrap();

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out").join("catalog.json");
        let catalog = Catalog::new(&registry, vec!["X".into()]);
        write_catalog(&path, &catalog).unwrap();

        let back = read_catalog(&path).unwrap();
        assert_eq!(back, catalog);
        assert_eq!(back.registry().unwrap(), registry);
    }

    #[test]
    fn tampered_identifier_is_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("catalog.json");
        fs::write(
            &path,
            r#"{"generated_at":"2024-01-01T00:00:00Z","countries":[],
                "tables":[{"name":"A","ident":"","fields":[]}]}"#,
        )
        .unwrap();
        assert!(read_catalog(&path).is_err());
    }
}
