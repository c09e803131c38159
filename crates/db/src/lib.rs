//! Document database driver boundary.
//!
//! Captures, as Rust traits, the external "database driver" interface this gateway depends on:
//! connecting to a session, running a raw query to obtain a [`Cursor`], and the cursor's
//! `listen`/`interface`/`close`/`err` operations. No concrete network client is implemented here
//! — only the trait boundary and, behind the `fixture` feature, an in-memory implementation used
//! by this workspace's own tests and, absent a production driver, by the `gatewayd` binary.
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

/// Connection options handed to [`Database::connect`].
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Address of the document database to connect to.
    pub address: String,

    /// Name of the database to connect as the default target.
    pub database: String,
}

/// Establishes [`Session`]s against a document database.
#[async_trait]
pub trait Database: Send + Sync {
    /// Connect to the document database, returning a session handle.
    async fn connect(&self, options: ConnectOptions) -> Result<Session>;
}

/// A connection to the document database, safe to share across concurrent requests.
///
/// Cloning a [`Session`] is cheap: it is a handle around a shared backend, mirroring how the
/// driver's own connection pool is expected to be reused across concurrent RPC tasks.
#[derive(Clone)]
pub struct Session(Arc<dyn SessionBackend>);

impl Session {
    /// Send a raw, already policy-checked query AST to the database and obtain a cursor.
    pub async fn raw_query(&self, term: &Value) -> Result<Box<dyn Cursor>> {
        self.0.raw_query(term).await
    }

    /// Ensure the target database exists, dropping and recreating it first if `reset` is set.
    pub async fn bootstrap(&self, database: &str, reset: bool) -> Result<()> {
        self.0.bootstrap(database, reset).await
    }
}

impl<T> From<T> for Session
where
    T: SessionBackend + 'static,
{
    fn from(value: T) -> Self {
        Session(Arc::new(value))
    }
}

/// Operations implemented by document database backends.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Send a raw query AST to the database and obtain a cursor.
    async fn raw_query(&self, term: &Value) -> Result<Box<dyn Cursor>>;

    /// Ensure the target database exists, dropping and recreating it first if `reset` is set.
    async fn bootstrap(&self, database: &str, reset: bool) -> Result<()>;
}

/// A database cursor yielding rows one-by-one; finite for normal queries, effectively infinite
/// for changefeeds.
///
/// Ownership of a `Box<dyn Cursor>` is exclusive: `spec.md` invariant I1 requires exactly one
/// owner (the Mediator for one-shot reads, a Stream Producer for streamed reads) and exactly one
/// `close()` call on every exit path.
#[async_trait]
pub trait Cursor: Send {
    /// Fetch the next row. Returns `None` at end of stream or after an error; check [`Cursor::err`]
    /// to distinguish the two.
    async fn try_next(&mut self) -> Option<Value>;

    /// Materialise all remaining rows into a single value, for one-shot (non-streamed) reads.
    async fn interface(&mut self) -> Result<Value>;

    /// Close the cursor. Idempotent.
    async fn close(&mut self);

    /// The error that ended the cursor, if any.
    fn err(&self) -> Option<&anyhow::Error>;
}

#[cfg(test)]
mod tests {
    use super::fixture::FixtureDatabase;
    use super::*;

    #[tokio::test]
    async fn bootstrap_creates_missing_database() {
        let db = FixtureDatabase::new();
        let session = db.connect(ConnectOptions {
            address: "localhost:28015".into(),
            database: "persist".into(),
        });
        let session = session.await.unwrap();
        assert!(!db.has_database("persist"));
        session.bootstrap("persist", false).await.unwrap();
        assert!(db.has_database("persist"));
    }

    #[tokio::test]
    async fn bootstrap_reset_recreates_database() {
        let db = FixtureDatabase::new();
        db.create_database("persist");
        db.mark_database_dirty("persist");
        let session = db
            .connect(ConnectOptions {
                address: "localhost:28015".into(),
                database: "persist".into(),
            })
            .await
            .unwrap();
        session.bootstrap("persist", true).await.unwrap();
        assert!(db.has_database("persist"));
        assert!(!db.is_database_dirty("persist"));
    }
}
