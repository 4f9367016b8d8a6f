//! Streaming column accumulator
//!
//! Rows are fed one at a time; each key either opens a new column or widens
//! the type of the column it already owns. Nothing is materialized until
//! `build`, so the builder never revisits a row.

use crate::schema::naming::ColumnNamer;
use crate::types::{ColumnSpec, InferenceMode, Row, Schema, SqlType};
use std::collections::HashMap;
use tracing::instrument;

/// Accumulates the column set of a row sequence
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    columns: Vec<ColumnSpec>,
    // source key -> index into `columns`
    by_source: HashMap<String, usize>,
    namer: ColumnNamer,
    rows_seen: usize,
}

impl SchemaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder that will never hand out `name` to a data column
    pub fn with_reserved(name: &str) -> Self {
        let mut builder = Self::new();
        builder.namer.reserve(name);
        builder
    }

    /// Fold one row into the column set
    pub fn add_row(&mut self, row: &Row) {
        self.rows_seen += 1;

        for (key, value) in row.iter() {
            // Nulls say nothing about the type; a later row decides
            let Some(candidate) = SqlType::classify(value) else {
                continue;
            };

            match self.by_source.get(key) {
                Some(&idx) => {
                    let column = &mut self.columns[idx];
                    let widened = column.sql_type.widen(candidate);
                    if widened != column.sql_type {
                        tracing::debug!(
                            column = %column.name,
                            from = %column.sql_type,
                            to = %widened,
                            row = self.rows_seen,
                            "Widened column type"
                        );
                        column.sql_type = widened;
                    }
                }
                None => {
                    let name = self.namer.assign(key);
                    tracing::trace!(column = %name, sql_type = %candidate, "Discovered column");
                    self.by_source.insert(key.clone(), self.columns.len());
                    self.columns.push(ColumnSpec {
                        name,
                        sql_type: candidate,
                        source_key: key.clone(),
                    });
                }
            }
        }
    }

    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    pub fn build(self) -> Schema {
        Schema::new(self.columns)
    }
}

/// Infer the schema of a row sequence.
///
/// `reserved` names the synthetic primary key column so no data column can
/// take it.
#[instrument(name = "infer_schema", skip(rows), fields(rows = rows.len()))]
pub fn infer_schema(rows: &[Row], mode: InferenceMode, reserved: &str) -> Schema {
    let mut builder = SchemaBuilder::with_reserved(reserved);

    let scanned = match mode {
        InferenceMode::FullScan => rows,
        InferenceMode::Sample(n) => {
            let n = n.min(rows.len());
            if n < rows.len() {
                tracing::warn!(
                    sampled = n,
                    total = rows.len(),
                    "Inferring schema from a sample; fields that only appear in later rows will be dropped"
                );
            }
            &rows[..n]
        }
    };

    for row in scanned {
        builder.add_row(row);
    }

    let schema = builder.build();
    tracing::info!(columns = schema.len(), "Schema inference complete");
    schema
}
