pub mod ident;
pub mod registry;
pub mod types;
pub mod write;

pub use ident::{field_ident, table_ident, Ident};
pub use registry::{SchemaRegistry, COUNTRY_COLUMN, SURROGATE_KEY};
pub use types::{FieldSchema, TableSchema};
pub use write::{read_catalog, write_catalog, Catalog};
