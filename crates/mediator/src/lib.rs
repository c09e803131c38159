//! Query Mediator: the single `query` RPC method this gateway exposes.
//!
//! Wires together the Policy Checker, Query Executor and Stream Producer behind one procedure:
//! validate parameters, check the AST against the configured database, execute it, then either
//! materialise the result inline or hand the cursor to a Producer and return immediately.
pub mod telemetry;

use gateway_broker::Broker;
use gateway_context::Context;
use gateway_db::Session;
use gateway_errors::MediatorError;
use gateway_errors::MissingParam;
use gateway_errors::MissingPipeId;
use gateway_query::Executor;
use gateway_query::Term;
use serde_json::json;
use serde_json::Value;

/// Default keepalive interval, in seconds, applied when the caller does not supply one.
const DEFAULT_KEEPALIVE_SECONDS: i64 = 30;

/// Result of a successful `query` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The query was materialised inline; this is its full result.
    Inline(Value),
    /// A Producer was spawned; this is the acknowledgment returned to the caller.
    Streaming { keepalive: i64 },
}

/// Handles the `query` RPC method against one configured database.
pub struct Mediator<B> {
    root: Context,
    session: Session,
    broker: B,
    allowed_db: String,
    pipe_length: usize,
}

impl<B: Broker + 'static> Mediator<B> {
    /// Build a mediator bound to a database session and a broker, serving only `allowed_db`.
    ///
    /// `root` is the process-wide context; each `query` invocation derives its own scoped
    /// context from it rather than mutating `root`.
    pub fn new(root: Context, session: Session, broker: B, allowed_db: impl Into<String>) -> Self {
        Mediator {
            root,
            session,
            broker,
            allowed_db: allowed_db.into(),
            pipe_length: 64,
        }
    }

    /// Handle one `query` invocation.
    pub async fn query(&self, params: &Value) -> Result<QueryOutcome, MediatorError> {
        let raw_term = params
            .get("term")
            .ok_or(MissingParam("term"))?
            .clone();
        let pipe_id = params
            .get("pipeId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let keepalive = params
            .get("keepalive")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_KEEPALIVE_SECONDS)
            .max(1);

        let context = self.root.derive_with(|builder| match &pipe_id {
            Some(pipe_id) => builder.log_values(slog::o!("pipe_id" => pipe_id.clone())),
            None => builder,
        });

        let term = Term::parse(&raw_term);
        let classification = gateway_policy::check(&term, &self.allowed_db)?;

        if classification.is_changefeed && pipe_id.is_none() {
            return Err(MissingPipeId.into());
        }

        let executor = Executor::new(self.session.clone());
        let mut cursor = executor
            .execute(&raw_term)
            .await
            .map_err(MediatorError::RunningQuery)?;

        let outcome = match pipe_id {
            None => {
                let value = cursor
                    .interface()
                    .await
                    .map_err(MediatorError::OnCursor)?;
                telemetry::QUERY_COUNT.with_label_values(&["inline"]).inc();
                QueryOutcome::Inline(value)
            }
            Some(pipe_id) => {
                let pipe_tx = self
                    .broker
                    .pipe_open(&pipe_id)
                    .await
                    .map_err(MediatorError::OnPipe)?;
                gateway_stream::spawn_producer(cursor, pipe_tx, keepalive as u64);
                slog::debug!(context.logger, "Spawned stream producer"; "keepalive" => keepalive);
                telemetry::QUERY_COUNT.with_label_values(&["stream"]).inc();
                QueryOutcome::Streaming { keepalive }
            }
        };

        Ok(outcome)
    }

    /// Create a pipe of this mediator's configured buffer length, for a client about to submit a
    /// changefeed query. Exposed for callers that need to mint a `pipeId` before calling
    /// [`Mediator::query`].
    pub async fn create_pipe(&self) -> anyhow::Result<(String, Box<dyn gateway_broker::PipeRx>)> {
        self.broker.pipe_create(self.pipe_length).await
    }
}

/// Serialise a [`QueryOutcome`] into the RPC reply value the broker transport expects.
pub fn outcome_to_value(outcome: QueryOutcome) -> Value {
    match outcome {
        QueryOutcome::Inline(value) => value,
        QueryOutcome::Streaming { keepalive } => json!({"keepalive": keepalive}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_broker::fixture::FixtureBroker;
    use gateway_db::fixture::FixtureDatabase;
    use gateway_db::ConnectOptions;
    use gateway_db::Database;
    use serde_json::json;

    async fn mediator_with(db: &FixtureDatabase) -> Mediator<FixtureBroker> {
        let session = db
            .connect(ConnectOptions {
                address: "localhost:28015".into(),
                database: "persist".into(),
            })
            .await
            .unwrap();
        Mediator::new(
            gateway_context::Context::fixture(),
            session,
            FixtureBroker::new(),
            "persist",
        )
    }

    #[tokio::test]
    async fn s1_policy_reject_surfaces_invalid_db() {
        let db = FixtureDatabase::new();
        let mediator = mediator_with(&db).await;
        let term = json!([gateway_query::type_tag::DB, ["other"]]);
        let err = mediator.query(&json!({"term": term})).await.unwrap_err();
        assert_eq!(err.code(), 1);
        assert!(err.to_string().contains("other"));
        assert!(err.to_string().contains("persist"));
    }

    #[tokio::test]
    async fn s2_inline_read_materialises_rows() {
        let db = FixtureDatabase::new();
        db.queue_rows(vec![json!({"hello": "world"}), json!({"hello": "earth"})]);
        let mediator = mediator_with(&db).await;
        let term = json!([2, ["test"]]);
        let outcome = mediator.query(&json!({"term": term})).await.unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::Inline(json!([{"hello": "world"}, {"hello": "earth"}]))
        );
    }

    #[tokio::test]
    async fn s3_changefeed_without_pipe_id_is_rejected() {
        let db = FixtureDatabase::new();
        let mediator = mediator_with(&db).await;
        let term = json!([gateway_query::type_tag::CHANGES, [[2, ["test"]]]]);
        let err = mediator.query(&json!({"term": term})).await.unwrap_err();
        assert_eq!(err.code(), 0);
        assert!(err.to_string().contains("pipeId"));
    }

    #[tokio::test]
    async fn s4_changefeed_with_pipe_id_acknowledges_and_streams() {
        let db = FixtureDatabase::new();
        let changefeed = db.queue_changefeed();
        let session = db
            .connect(ConnectOptions {
                address: "localhost:28015".into(),
                database: "persist".into(),
            })
            .await
            .unwrap();
        let broker = FixtureBroker::new();
        let mediator = Mediator::new(
            gateway_context::Context::fixture(),
            session,
            broker,
            "persist",
        );
        let (pipe_id, mut pipe_rx) = mediator.create_pipe().await.unwrap();

        let term = json!([gateway_query::type_tag::CHANGES, [[2, ["test"]]]]);
        let outcome = mediator
            .query(&json!({"term": term, "pipeId": pipe_id, "keepalive": 2}))
            .await
            .unwrap();
        assert_eq!(outcome, QueryOutcome::Streaming { keepalive: 2 });

        changefeed.send(json!({"new_val": {"id": 1}})).unwrap();
        let frame = pipe_rx.recv().await.unwrap();
        assert_eq!(frame.count, 1);
    }
}
