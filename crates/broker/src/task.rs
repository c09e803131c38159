//! Task RPC transport shape: one inbound invocation plus the handle used to reply to it.
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// One inbound RPC invocation, as delivered by the broker.
#[derive(Clone, Debug)]
pub struct Task {
    /// The RPC method name, e.g. `"query"`.
    pub method: String,
    /// Call parameters, as a JSON mapping.
    pub params: Value,
    /// How long the caller is willing to wait for a reply.
    pub timeout: Duration,
}

/// A source of inbound tasks, generalised over the concrete broker transport.
///
/// Mirrors the Mediator's role as the single registered method handler (`query`): the broker
/// delivers one [`Task`] plus a [`TaskReply`] handle per invocation, and does not multiplex
/// several RPC methods of its own.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Await the next task. Returns `None` once the broker connection is shut down.
    async fn next_task(&self) -> Option<(Task, TaskReply)>;
}

/// Handle used to send exactly one reply to a received [`Task`].
pub struct TaskReply(Box<dyn TaskReplyBackend>);

impl TaskReply {
    /// Reply with a successful result value.
    pub async fn ok(self, value: Value) {
        self.0.reply(Ok(value)).await
    }

    /// Reply with an error code and message.
    pub async fn err(self, code: i32, message: String) {
        self.0.reply(Err(TaskError { code, message })).await
    }
}

impl<T> From<T> for TaskReply
where
    T: TaskReplyBackend + 'static,
{
    fn from(value: T) -> Self {
        TaskReply(Box::new(value))
    }
}

/// An RPC error, as returned to the broker caller.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskError {
    pub code: i32,
    pub message: String,
}

/// Operations implemented by task-reply backends.
#[async_trait]
pub trait TaskReplyBackend: Send {
    async fn reply(self: Box<Self>, result: Result<Value, TaskError>);
}
