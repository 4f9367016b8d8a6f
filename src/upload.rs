//! Request-level pipeline: validate the upload, parse, normalize, infer, load.
//!
//! Transport-agnostic: an HTTP handler (or the CLI) fills an [`UploadRequest`]
//! and serializes the returned [`ImportReply`].

use crate::document::{self, DocumentFormat};
use crate::error::ImportError;
use crate::load::{Connector, TransactionalLoader};
use crate::normalize::RecordNormalizer;
use crate::schema::infer_schema;
use crate::types::{ImportConfig, Row, Schema};
use serde::Serialize;
use tracing::instrument;

/// The three parts of an upload, each possibly missing
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<Vec<u8>>,
    pub connection_string: Option<String>,
    pub table_name: Option<String>,
    pub format: DocumentFormat,
}

/// An upload with every required part present
#[derive(Debug, Clone)]
pub struct Upload {
    pub file: Vec<u8>,
    pub connection_string: String,
    pub table_name: String,
    pub format: DocumentFormat,
}

impl UploadRequest {
    /// Empty strings and empty files count as missing.
    pub fn validate(self) -> Result<Upload, ImportError> {
        let file = self.file.filter(|f| !f.is_empty());
        let connection_string = self.connection_string.filter(|s| !s.trim().is_empty());
        let table_name = self.table_name.filter(|s| !s.trim().is_empty());

        match (file, connection_string, table_name) {
            (Some(file), Some(connection_string), Some(table_name)) => Ok(Upload {
                file,
                connection_string,
                table_name,
                format: self.format,
            }),
            _ => Err(ImportError::InputValidation),
        }
    }
}

/// Rows and schema derived from a document, before anything touches a database
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub rows: Vec<Row>,
    pub schema: Schema,
}

/// Outcome of a successful import
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub count: u64,
    pub schema: Schema,
}

/// Body sent back to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImportResponse {
    Success { success: bool, count: u64 },
    Failure { error: String },
}

/// Body plus HTTP-style status class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReply {
    pub status: u16,
    pub body: ImportResponse,
}

impl ImportReply {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

impl From<Result<ImportSummary, ImportError>> for ImportReply {
    fn from(result: Result<ImportSummary, ImportError>) -> Self {
        match result {
            Ok(summary) => ImportReply {
                status: 200,
                body: ImportResponse::Success {
                    success: true,
                    count: summary.count,
                },
            },
            Err(err) => ImportReply {
                status: err.status(),
                body: ImportResponse::Failure { error: err.to_string() },
            },
        }
    }
}

/// Runs uploads against a database through `C`
pub struct Importer<C> {
    connector: C,
    config: ImportConfig,
}

impl<C: Connector> Importer<C> {
    pub fn new(connector: C, config: ImportConfig) -> Self {
        Importer { connector, config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Parse, normalize and infer without touching the database.
    pub fn plan(&self, mut bytes: Vec<u8>, format: DocumentFormat) -> Result<ImportPlan, ImportError> {
        let document = document::parse(&mut bytes, format)?;
        let rows = RecordNormalizer::new(self.config.wrapper_field.as_str()).normalize(document)?;
        let schema = infer_schema(&rows, self.config.inference, &self.config.primary_key);
        Ok(ImportPlan { rows, schema })
    }

    /// Run a validated upload end to end.
    #[instrument(name = "import", skip_all, fields(table = %upload.table_name, bytes = upload.file.len()))]
    pub async fn import(&self, upload: Upload) -> Result<ImportSummary, ImportError> {
        let Upload {
            file,
            connection_string,
            table_name,
            format,
        } = upload;

        let plan = self.plan(file, format)?;

        let count = TransactionalLoader::new(&self.connector, &self.config.primary_key)
            .with_timeouts(self.config.connect_timeout, self.config.load_timeout)
            .load(&connection_string, &table_name, &plan.schema, &plan.rows)
            .await?;

        Ok(ImportSummary {
            count,
            schema: plan.schema,
        })
    }

    /// Validate, import, and map the outcome to a reply. Never fails.
    pub async fn handle(&self, request: UploadRequest) -> ImportReply {
        let result = match request.validate() {
            Ok(upload) => self.import(upload).await,
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            if e.is_client_error() {
                tracing::info!(error = %e, "Import rejected");
            } else {
                tracing::error!(error = %e, "Import failed");
            }
        }

        ImportReply::from(result)
    }
}
