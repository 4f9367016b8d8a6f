use std::fmt;
use thiserror::Error;

/// Boxed cause carried by [`ImportError::Load`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can end an import. Every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Missing file, connection string, or table name")]
    InputValidation,

    #[error("Invalid JSON file{}: {source}", line_suffix(.line))]
    Parse {
        line: Option<usize>,
        #[source]
        source: simd_json::Error,
    },

    #[error("{}", empty_message(.after_flatten))]
    EmptyInput { after_flatten: bool },

    #[error("Record at index {index} is not a JSON object")]
    RecordNotObject { index: usize },

    #[error("No columns could be inferred: every record is empty or all values are null")]
    SchemaEmpty,

    #[error("Failed to {stage}: {source}")]
    Load {
        stage: LoadStage,
        #[source]
        source: BoxError,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

fn empty_message(after_flatten: &bool) -> &'static str {
    if *after_flatten {
        "No records found in JSON"
    } else {
        "JSON array is empty"
    }
}

/// Where in the transactional load a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Connect,
    Begin,
    CreateTable,
    /// 1-based row number
    Insert(usize),
    Commit,
    /// The deadline passed before inserts finished; nothing was written
    Timeout,
    /// The deadline passed while waiting for COMMIT. The server may still have
    /// applied it, so the rows may or may not be in the table.
    CommitUnconfirmed,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Connect => f.write_str("connect to database"),
            LoadStage::Begin => f.write_str("begin transaction"),
            LoadStage::CreateTable => f.write_str("create table"),
            LoadStage::Insert(row) => write!(f, "insert row {row}"),
            LoadStage::Commit => f.write_str("commit transaction"),
            LoadStage::Timeout => f.write_str("finish load in time"),
            LoadStage::CommitUnconfirmed => {
                f.write_str("confirm commit in time (rows may have been committed)")
            }
        }
    }
}

impl ImportError {
    pub(crate) fn load(stage: LoadStage, source: impl Into<BoxError>) -> Self {
        ImportError::Load {
            stage,
            source: source.into(),
        }
    }

    /// HTTP-style status class: caller-correctable input problems are 400,
    /// destination failures are 500.
    pub fn status(&self) -> u16 {
        match self {
            ImportError::InputValidation
            | ImportError::Parse { .. }
            | ImportError::EmptyInput { .. }
            | ImportError::RecordNotObject { .. }
            | ImportError::SchemaEmpty => 400,
            ImportError::Load { .. } => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(ImportError::InputValidation.status(), 400);
        assert_eq!(ImportError::EmptyInput { after_flatten: false }.status(), 400);
        assert_eq!(ImportError::SchemaEmpty.status(), 400);

        let err = ImportError::load(LoadStage::Connect, "connection refused");
        assert_eq!(err.status(), 500);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_load_message_names_stage() {
        let err = ImportError::load(LoadStage::Insert(3), "value too long");
        assert_eq!(err.to_string(), "Failed to insert row 3: value too long");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_empty_input_messages() {
        assert_eq!(
            ImportError::EmptyInput { after_flatten: false }.to_string(),
            "JSON array is empty"
        );
        assert_eq!(
            ImportError::EmptyInput { after_flatten: true }.to_string(),
            "No records found in JSON"
        );
    }

    #[test]
    fn test_record_not_object_message_names_index() {
        assert_eq!(
            ImportError::RecordNotObject { index: 1 }.to_string(),
            "Record at index 1 is not a JSON object"
        );
    }

    #[test]
    fn test_unconfirmed_commit_message_warns() {
        let err = ImportError::load(LoadStage::CommitUnconfirmed, "deadline has elapsed");
        assert_eq!(
            err.to_string(),
            "Failed to confirm commit in time (rows may have been committed): deadline has elapsed"
        );
    }
}
