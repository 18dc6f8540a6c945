pub mod config;
pub mod duck;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod schema;
