//! Error taxonomy for the brokered query gateway.
//!
//! Errors are classified by where they are observed: small `thiserror` structs for individual
//! conditions, and a [`MediatorError`] enum that additionally carries the RPC error code returned
//! to the broker caller.

/// A query AST referenced a database other than the one this gateway serves.
#[derive(Debug, thiserror::Error)]
#[error("invalid DB access: {requested}, allowed: {allowed}")]
pub struct InvalidDatabase {
    pub requested: String,
    pub allowed: String,
}

impl InvalidDatabase {
    pub fn new(requested: impl Into<String>, allowed: impl Into<String>) -> Self {
        InvalidDatabase {
            requested: requested.into(),
            allowed: allowed.into(),
        }
    }
}

/// A required RPC parameter was not supplied.
#[derive(Debug, thiserror::Error)]
#[error("missing '{0}' parameter")]
pub struct MissingParam(pub &'static str);

/// A changefeed term was submitted without a `pipeId`.
#[derive(Debug, thiserror::Error)]
#[error("Missing pipeId for a changefeed term")]
pub struct MissingPipeId;

/// Errors returned to the broker caller from the `query` RPC method.
///
/// [`MediatorError::code`] returns the numeric error code backends attach to the broker's task
/// error envelope.
#[derive(Debug, thiserror::Error)]
pub enum MediatorError {
    /// Parameters were missing or structurally invalid.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The query referenced a database other than the configured one.
    #[error(transparent)]
    InvalidDb(#[from] InvalidDatabase),

    /// The database driver failed to run the query.
    #[error("error on query: {0}")]
    RunningQuery(#[source] anyhow::Error),

    /// Materialising the cursor into an inline result failed.
    #[error("error on cursor: {0}")]
    OnCursor(#[source] anyhow::Error),

    /// Opening the transmit side of the streaming pipe failed.
    #[error("error on pipe: {0}")]
    OnPipe(#[source] anyhow::Error),
}

impl MediatorError {
    /// The RPC error code for this condition.
    ///
    /// `InvalidParams` has no assigned code in the wire protocol; callers that need one default
    /// it to `0`.
    pub fn code(&self) -> i32 {
        match self {
            MediatorError::InvalidParams(_) => 0,
            MediatorError::InvalidDb(_) => 1,
            MediatorError::RunningQuery(_) => 2,
            MediatorError::OnCursor(_) => 3,
            MediatorError::OnPipe(_) => 4,
        }
    }
}

impl From<MissingParam> for MediatorError {
    fn from(err: MissingParam) -> Self {
        MediatorError::InvalidParams(err.to_string())
    }
}

impl From<MissingPipeId> for MediatorError {
    fn from(err: MissingPipeId) -> Self {
        MediatorError::InvalidParams(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_db_message_names_both_databases() {
        let err = InvalidDatabase::new("other", "persist");
        let message = err.to_string();
        assert!(message.contains("other"));
        assert!(message.contains("persist"));
    }

    #[test]
    fn error_codes_match_spec() {
        assert_eq!(MediatorError::InvalidParams(String::new()).code(), 0);
        assert_eq!(
            MediatorError::from(InvalidDatabase::new("a", "b")).code(),
            1
        );
        assert_eq!(MediatorError::RunningQuery(anyhow::anyhow!("x")).code(), 2);
        assert_eq!(MediatorError::OnCursor(anyhow::anyhow!("x")).code(), 3);
        assert_eq!(MediatorError::OnPipe(anyhow::anyhow!("x")).code(), 4);
    }
}
