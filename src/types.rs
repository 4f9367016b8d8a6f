use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// One JSON record, loaded as one table row. Keys keep document order.
pub type Row = Map<String, Value>;

/// Column type inferred from the JSON values seen for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Integer,
    Double,
    Boolean,
    Jsonb,
    Text,
}

impl SqlType {
    /// Classify a single JSON value. `null` contributes no type.
    pub fn classify(value: &Value) -> Option<SqlType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(SqlType::Boolean),
            Value::Number(n) => {
                if n.is_i64() {
                    Some(SqlType::Integer)
                } else if n.is_u64() {
                    // Above i64::MAX, only representable as a float
                    Some(SqlType::Double)
                } else {
                    match n.as_f64() {
                        Some(f) if is_whole_i64(f) => Some(SqlType::Integer),
                        _ => Some(SqlType::Double),
                    }
                }
            }
            Value::String(_) => Some(SqlType::Text),
            Value::Array(_) | Value::Object(_) => Some(SqlType::Jsonb),
        }
    }

    /// Merge two types into the narrowest type that can hold both.
    ///
    /// JSONB absorbs everything, TEXT absorbs every other scalar, and the only
    /// numeric promotion is INTEGER + DOUBLE = DOUBLE. Booleans never mix with
    /// numbers.
    pub fn widen(self, other: SqlType) -> SqlType {
        use SqlType::*;

        match (self, other) {
            (Jsonb, _) | (_, Jsonb) => Jsonb,
            (Text, _) | (_, Text) => Text,
            (Integer, Integer) => Integer,
            (Double, Double) => Double,
            (Boolean, Boolean) => Boolean,
            (Integer, Double) | (Double, Integer) => Double,
            (Boolean, Integer) | (Boolean, Double) | (Integer, Boolean) | (Double, Boolean) => Text,
        }
    }

    /// Postgres type used in the table definition
    pub fn ddl(self) -> &'static str {
        match self {
            SqlType::Integer => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Jsonb => "JSONB",
            SqlType::Text => "TEXT",
        }
    }

    pub const ALL: [SqlType; 5] = [
        SqlType::Integer,
        SqlType::Double,
        SqlType::Boolean,
        SqlType::Jsonb,
        SqlType::Text,
    ];
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::Integer => "INTEGER",
            SqlType::Double => "DOUBLE",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Jsonb => "JSONB",
            SqlType::Text => "TEXT",
        };
        f.write_str(name)
    }
}

/// Whether a float holds a whole number that fits in an i64
pub(crate) fn is_whole_i64(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0
}

/// A single inferred column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Sanitized, collision-free column name
    pub name: String,

    pub sql_type: SqlType,

    /// The original JSON key, used to look the value up in each row
    pub source_key: String,
}

/// Ordered column set, in the order fields were first discovered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Schema { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// How many rows the inference engine looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceMode {
    /// Scan every row. Always correct for heterogeneous data.
    #[default]
    FullScan,

    /// Only look at the first N rows. Fields that first appear later are not
    /// loaded, and later values may not fit the inferred type. Discouraged.
    Sample(usize),
}

/// Configuration for one import
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Field that marks the wrapper pattern (`[{"records": [...]}, ...]`)
    pub wrapper_field: String,

    /// Name of the synthetic auto-incrementing primary key column
    pub primary_key: String,

    pub inference: InferenceMode,

    /// Upper bound on opening the database session
    pub connect_timeout: Duration,

    /// Upper bound on table creation, inserts and commit together
    pub load_timeout: Duration,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            wrapper_field: String::from("records"),
            primary_key: String::from("_generated_id"),
            inference: InferenceMode::FullScan,
            connect_timeout: Duration::from_secs(10),
            load_timeout: Duration::from_secs(300),
        }
    }
}
