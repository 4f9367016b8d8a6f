//! Relational schema inference
//!
//! Scans every row to find the union of field names, widens each field to the
//! most general SQL type seen, and assigns safe, unique column names.

pub mod builder;
pub mod naming;

pub use builder::{SchemaBuilder, infer_schema};
pub use naming::{ColumnNamer, sanitize};
