//! In-memory document database used by this workspace's own test suite.
//!
//! This is not a query engine: raw query ASTs are accepted but not interpreted. Instead, tests
//! queue up the response the next [`Session::raw_query`] call should return, the same way
//! `replicore-tasks`'s `TasksFixture`/`ReceivedTaskFixture` let tests script task delivery
//! without a real Message Queue behind them.
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::ConnectOptions;
use crate::Cursor;
use crate::Database;
use crate::Session;
use crate::SessionBackend;

/// Queued response for the next [`Session::raw_query`] call.
enum QueuedResponse {
    /// A finite set of rows, as would be returned by a plain table read.
    Rows(VecDeque<Value>),
    /// An initially-empty, long-lived cursor fed by the paired sender returned to the test.
    Changefeed(mpsc::UnboundedReceiver<Value>),
    /// The driver fails to run the query.
    Error(String),
}

#[derive(Default)]
struct State {
    databases: HashSet<String>,
    dirty: HashSet<String>,
    responses: VecDeque<QueuedResponse>,
}

/// An in-memory stand-in for a document database, for tests.
#[derive(Clone, Default)]
pub struct FixtureDatabase {
    state: Arc<Mutex<State>>,
}

impl FixtureDatabase {
    /// Create an empty fixture database with no databases and no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a finite set of rows to be returned as a materialisable cursor.
    pub fn queue_rows(&self, rows: Vec<Value>) {
        let mut state = self.state.lock().unwrap();
        state
            .responses
            .push_back(QueuedResponse::Rows(rows.into()));
    }

    /// Queue a changefeed-shaped cursor; returns the sender used to push change rows into it.
    pub fn queue_changefeed(&self) -> mpsc::UnboundedSender<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap();
        state.responses.push_back(QueuedResponse::Changefeed(rx));
        tx
    }

    /// Queue a driver failure for the next query.
    pub fn queue_error(&self, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.responses.push_back(QueuedResponse::Error(message.into()));
    }

    /// Pre-create a database, bypassing bootstrap.
    pub fn create_database(&self, name: &str) {
        self.state.lock().unwrap().databases.insert(name.to_string());
    }

    /// Mark a database as "dirty" so tests can observe whether a reset cleared it.
    pub fn mark_database_dirty(&self, name: &str) {
        self.state.lock().unwrap().dirty.insert(name.to_string());
    }

    /// Whether the given database currently exists.
    pub fn has_database(&self, name: &str) -> bool {
        self.state.lock().unwrap().databases.contains(name)
    }

    /// Whether the given database is marked dirty.
    pub fn is_database_dirty(&self, name: &str) -> bool {
        self.state.lock().unwrap().dirty.contains(name)
    }
}

#[async_trait]
impl Database for FixtureDatabase {
    async fn connect(&self, _options: ConnectOptions) -> Result<Session> {
        Ok(Session::from(FixtureSession {
            state: self.state.clone(),
        }))
    }
}

struct FixtureSession {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl SessionBackend for FixtureSession {
    async fn raw_query(&self, _term: &Value) -> Result<Box<dyn Cursor>> {
        let mut state = self.state.lock().unwrap();
        let response = state
            .responses
            .pop_front()
            .unwrap_or_else(|| QueuedResponse::Rows(VecDeque::new()));
        let cursor: Box<dyn Cursor> = match response {
            QueuedResponse::Rows(rows) => Box::new(FixtureCursor::Rows { rows, err: None }),
            QueuedResponse::Changefeed(rx) => Box::new(FixtureCursor::Changefeed { rx, err: None }),
            QueuedResponse::Error(message) => Box::new(FixtureCursor::Rows {
                rows: VecDeque::new(),
                err: Some(anyhow::anyhow!(message)),
            }),
        };
        Ok(cursor)
    }

    async fn bootstrap(&self, database: &str, reset: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if reset {
            state.databases.remove(database);
            state.dirty.remove(database);
        }
        state.databases.insert(database.to_string());
        Ok(())
    }
}

/// An in-memory cursor, either a finite row set or a changefeed fed by a channel.
enum FixtureCursor {
    Rows {
        rows: VecDeque<Value>,
        err: Option<anyhow::Error>,
    },
    Changefeed {
        rx: mpsc::UnboundedReceiver<Value>,
        err: Option<anyhow::Error>,
    },
}

#[async_trait]
impl Cursor for FixtureCursor {
    async fn try_next(&mut self) -> Option<Value> {
        match self {
            FixtureCursor::Rows { rows, .. } => rows.pop_front(),
            FixtureCursor::Changefeed { rx, .. } => rx.recv().await,
        }
    }

    async fn interface(&mut self) -> Result<Value> {
        match self {
            FixtureCursor::Rows { rows, .. } => {
                let drained: Vec<Value> = rows.drain(..).collect();
                Ok(Value::Array(drained))
            }
            FixtureCursor::Changefeed { rx, .. } => {
                let mut drained = Vec::new();
                while let Ok(value) = rx.try_recv() {
                    drained.push(value);
                }
                Ok(Value::Array(drained))
            }
        }
    }

    async fn close(&mut self) {
        if let FixtureCursor::Changefeed { rx, .. } = self {
            rx.close();
        }
    }

    fn err(&self) -> Option<&anyhow::Error> {
        match self {
            FixtureCursor::Rows { err, .. } => err.as_ref(),
            FixtureCursor::Changefeed { err, .. } => err.as_ref(),
        }
    }
}
