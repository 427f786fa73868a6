//! Store migration utilities.
//!
//! Two independent pipelines share this crate:
//! - `import_json`: JSON record files → like-named tables, insert-if-absent.
//! - `export_users`: legacy storefront accounts → normalized user records as JSON.

pub mod cli;
pub mod database_ops;
pub mod normalization;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}
