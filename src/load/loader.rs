use crate::error::{ImportError, LoadStage};
use crate::load::session::{Connector, Session};
use crate::load::sql;
use crate::load::value::SqlValue;
use crate::types::{Row, Schema};
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::instrument;

/// Progress of one load, used for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Connected,
    TableEnsured,
    Inserting(usize),
    Committed,
    RolledBack,
}

/// Creates the destination table and inserts all rows in one transaction
pub struct TransactionalLoader<'a, C> {
    connector: &'a C,
    primary_key: &'a str,
    connect_timeout: Duration,
    load_timeout: Duration,
}

impl<'a, C: Connector> TransactionalLoader<'a, C> {
    pub fn new(connector: &'a C, primary_key: &'a str) -> Self {
        TransactionalLoader {
            connector,
            primary_key,
            connect_timeout: Duration::from_secs(10),
            load_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, load: Duration) -> Self {
        self.connect_timeout = connect;
        self.load_timeout = load;
        self
    }

    /// Load `rows` into `table`, returning the number of rows inserted.
    ///
    /// Either every row is committed or none is: any failure (including a
    /// timeout) rolls the transaction back before the error is returned, and
    /// the session is dropped on every path.
    #[instrument(name = "load", skip(self, descriptor, schema, rows), fields(columns = schema.len(), rows = rows.len()))]
    pub async fn load(
        &self,
        descriptor: &str,
        table: &str,
        schema: &Schema,
        rows: &[Row],
    ) -> Result<u64, ImportError> {
        trace_state(LoadState::Idle);
        if schema.is_empty() {
            return Err(ImportError::SchemaEmpty);
        }

        let create_sql = sql::create_table(table, self.primary_key, schema);
        let insert_sql = sql::insert_row(table, schema);

        let mut session = match timeout(self.connect_timeout, self.connector.connect(descriptor)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return Err(ImportError::load(LoadStage::Connect, e)),
            Err(elapsed) => return Err(ImportError::load(LoadStage::Connect, elapsed)),
        };
        trace_state(LoadState::Connected);

        // A failed BEGIN leaves nothing to roll back
        session
            .batch_execute("BEGIN")
            .await
            .map_err(|e| ImportError::load(LoadStage::Begin, e))?;

        let deadline = Instant::now() + self.load_timeout;

        let written = timeout_at(deadline, write_rows(&mut session, &create_sql, &insert_sql, schema, rows)).await;
        let result = match written {
            Ok(Ok(count)) => match timeout_at(deadline, session.batch_execute("COMMIT")).await {
                Ok(Ok(())) => Ok(count),
                Ok(Err(e)) => Err(ImportError::load(LoadStage::Commit, e)),
                Err(elapsed) => Err(ImportError::load(LoadStage::CommitUnconfirmed, elapsed)),
            },
            Ok(Err(e)) => Err(e),
            Err(elapsed) => Err(ImportError::load(LoadStage::Timeout, elapsed)),
        };

        match result {
            Ok(count) => {
                trace_state(LoadState::Committed);
                tracing::info!(table, rows = count, "Import committed");
                Ok(count)
            }
            Err(err) => {
                rollback(&mut session, self.connect_timeout).await;
                tracing::warn!(table, error = %err, "Import rolled back");
                Err(err)
            }
        }
    }
}

async fn write_rows<S: Session>(
    session: &mut S,
    create_sql: &str,
    insert_sql: &str,
    schema: &Schema,
    rows: &[Row],
) -> Result<u64, ImportError> {
    tracing::debug!(sql = create_sql, "Ensuring table");
    session
        .batch_execute(create_sql)
        .await
        .map_err(|e| ImportError::load(LoadStage::CreateTable, e))?;
    trace_state(LoadState::TableEnsured);

    let mut params = Vec::with_capacity(schema.len());
    for (idx, row) in rows.iter().enumerate() {
        trace_state(LoadState::Inserting(idx + 1));

        params.clear();
        params.extend(
            schema
                .columns()
                .iter()
                .map(|c| SqlValue::coerce(row.get(&c.source_key), c.sql_type)),
        );

        session
            .execute(insert_sql, &params)
            .await
            .map_err(|e| ImportError::load(LoadStage::Insert(idx + 1), e))?;
    }

    Ok(rows.len() as u64)
}

/// Best effort: the original error is what the caller needs to see. If the
/// rollback itself fails or stalls, dropping the session aborts the transaction.
async fn rollback<S: Session>(session: &mut S, limit: Duration) {
    match timeout(limit, session.batch_execute("ROLLBACK")).await {
        Ok(Ok(())) => trace_state(LoadState::RolledBack),
        Ok(Err(e)) => tracing::warn!(error = %e, "Rollback failed; dropping the connection"),
        Err(_) => tracing::warn!("Rollback timed out; dropping the connection"),
    }
}

fn trace_state(state: LoadState) {
    tracing::debug!(?state, "Load state");
}
