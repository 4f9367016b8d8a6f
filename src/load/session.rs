use crate::load::value::SqlValue;
use async_trait::async_trait;

/// One exclusively-owned database connection.
///
/// Dropping a session must release the underlying connection; an open
/// transaction is then abandoned by the server.
#[async_trait]
pub trait Session: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run one or more statements without parameters
    async fn batch_execute(&mut self, sql: &str) -> Result<(), Self::Error>;

    /// Run a single parameterized statement, returning the affected row count
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, Self::Error>;
}

/// Opens sessions from a caller-supplied connection descriptor
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    async fn connect(
        &self,
        descriptor: &str,
    ) -> Result<Self::Session, <Self::Session as Session>::Error>;
}
