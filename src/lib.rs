//! # jsonload - JSON to Postgres importer
//!
//! Takes an uploaded JSON document, infers a relational schema from every
//! record in it, and loads the records into a Postgres table inside a single
//! transaction.
//!
//! ## Modules
//!
//! - **document**: raw bytes to a parsed JSON value (single document or NDJSON)
//! - **normalize**: parsed value to a flat sequence of rows, unwrapping `records` arrays
//! - **schema**: full-scan type inference, type widening and column naming
//! - **load**: transactional `CREATE TABLE IF NOT EXISTS` + parameterized inserts
//! - **upload**: request validation and the end-to-end pipeline
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonload::normalize::RecordNormalizer;
//! use jsonload::schema::infer_schema;
//! use jsonload::{InferenceMode, SqlType};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), jsonload::ImportError> {
//! let document = json!([
//!     {"id": 1, "tag": "x"},
//!     {"id": 2, "tag": null},
//!     {"id": 3, "extra": {"k": 1}}
//! ]);
//!
//! let rows = RecordNormalizer::default().normalize(document)?;
//! let schema = infer_schema(&rows, InferenceMode::FullScan, "_generated_id");
//!
//! assert_eq!(schema.column("id").map(|c| c.sql_type), Some(SqlType::Integer));
//! assert_eq!(schema.column("tag").map(|c| c.sql_type), Some(SqlType::Text));
//! assert_eq!(schema.column("extra").map(|c| c.sql_type), Some(SqlType::Jsonb));
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod load;
pub mod normalize;
pub mod schema;
pub mod types;
pub mod upload;

// Re-export commonly used types for convenience
pub use document::DocumentFormat;
pub use error::{ImportError, LoadStage};
pub use load::{Connector, PgConnector, Session, SqlValue, TransactionalLoader};
pub use normalize::RecordNormalizer;
pub use schema::{SchemaBuilder, infer_schema};
pub use types::{ColumnSpec, ImportConfig, InferenceMode, Row, Schema, SqlType};
pub use upload::{ImportPlan, ImportReply, ImportResponse, ImportSummary, Importer, Upload, UploadRequest};

/// Import one upload into Postgres with the default configuration.
pub async fn import_to_postgres(request: UploadRequest) -> ImportReply {
    Importer::new(PgConnector, ImportConfig::default())
        .handle(request)
        .await
}
