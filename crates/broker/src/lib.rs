//! Message broker transport boundary.
//!
//! Captures, as traits, the two transport capabilities a production broker client would need to
//! provide: delivering inbound RPC tasks ([`TaskSource`]) and creating/opening the
//! single-producer/single-consumer pipes used for streaming replies ([`Broker::pipe_create`],
//! [`Broker::pipe_open`]). No concrete network client is implemented here; behind the
//! `fixture` feature this crate ships an in-memory stand-in used by this workspace's own
//! tests and, absent a real broker to wire up, by the `gatewayd` binary itself.
use std::sync::Arc;

use async_trait::async_trait;

mod pipe;
mod task;

pub use pipe::PipeFrame;
pub use pipe::PipeRx;
pub use pipe::PipeTx;
pub use pipe::PipeTxBackend;
pub use task::Task;
pub use task::TaskError;
pub use task::TaskReply;
pub use task::TaskReplyBackend;
pub use task::TaskSource;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

/// Creates and opens the pipes a Stream Producer writes rows and keepalives onto.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Create a new pipe with a fixed-length buffer, returning its id and the receive side.
    async fn pipe_create(&self, length: usize) -> anyhow::Result<(String, Box<dyn PipeRx>)>;

    /// Open the transmit side of a previously created pipe.
    async fn pipe_open(&self, id: &str) -> anyhow::Result<PipeTx>;
}

#[async_trait]
impl<T: Broker + ?Sized> Broker for Arc<T> {
    async fn pipe_create(&self, length: usize) -> anyhow::Result<(String, Box<dyn PipeRx>)> {
        (**self).pipe_create(length).await
    }

    async fn pipe_open(&self, id: &str) -> anyhow::Result<PipeTx> {
        (**self).pipe_open(id).await
    }
}

#[async_trait]
impl<T: TaskSource + ?Sized> TaskSource for Arc<T> {
    async fn next_task(&self) -> Option<(Task, TaskReply)> {
        (**self).next_task().await
    }
}
