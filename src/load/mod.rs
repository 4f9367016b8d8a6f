//! Transactional load into a Postgres-compatible database
//!
//! The loader talks to the database only through the [`Connector`] and
//! [`Session`] traits, so the same protocol runs against `tokio-postgres` in
//! production and against an in-memory double in tests.

pub mod loader;
pub mod postgres;
pub mod session;
pub mod sql;
pub mod value;

pub use loader::{LoadState, TransactionalLoader};
pub use postgres::{PgConnector, PgSession};
pub use session::{Connector, Session};
pub use value::SqlValue;
