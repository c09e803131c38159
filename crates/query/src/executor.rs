//! Query Executor (`spec.md` §4.2).
use anyhow::Result;
use gateway_db::Cursor;
use gateway_db::Session;
use serde_json::Value;

/// Hands a validated raw AST to the database driver and returns the cursor it produces.
///
/// The executor does not distinguish streaming from non-streaming: that decision belongs to the
/// Query Mediator, which either materialises the cursor inline or hands it to a Stream Producer.
pub struct Executor {
    session: Session,
}

impl Executor {
    /// Build an executor bound to a database session.
    pub fn new(session: Session) -> Self {
        Executor { session }
    }

    /// Run a raw, policy-checked query AST and return its cursor.
    pub async fn execute(&self, term: &Value) -> Result<Box<dyn Cursor>> {
        self.session.raw_query(term).await
    }
}
