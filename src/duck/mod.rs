pub mod query;
pub mod store;

pub use query::{Query, QueryBuilder, SortKey};
pub use store::{SeriesPoint, Store, TabularRow};
