//! Broker pipe primitives: single-producer/single-consumer, fixed-length buffered channels with
//! a monotonically increasing per-message sequence number starting at 1.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// One frame delivered over a pipe's receive side.
#[derive(Clone, Debug, PartialEq)]
pub struct PipeFrame {
    /// Sequence number of this frame, starting at 1 and incrementing by one per write.
    pub count: i64,
    /// The frame body, as written by the transmit side.
    pub msg: Value,
}

/// Transmit handle for a pipe, obtained from [`crate::Broker::pipe_open`].
///
/// Cloning is cheap: it is a handle around a shared backend.
#[derive(Clone)]
pub struct PipeTx(Arc<dyn PipeTxBackend>);

impl PipeTx {
    /// Write one message to the pipe. Returns the sequence count assigned to this write.
    ///
    /// A write to a pipe with no live consumer (or a full buffer past its consumer's pace, for
    /// a bounded backend) fails; callers never retry a failed write.
    pub async fn write(&self, msg: Value) -> anyhow::Result<i64> {
        self.0.write(msg).await
    }
}

impl<T> From<T> for PipeTx
where
    T: PipeTxBackend + 'static,
{
    fn from(value: T) -> Self {
        PipeTx(Arc::new(value))
    }
}

/// Operations implemented by pipe transmit backends.
#[async_trait]
pub trait PipeTxBackend: Send + Sync {
    async fn write(&self, msg: Value) -> anyhow::Result<i64>;
}

/// Receive handle for a pipe, obtained from [`crate::Broker::pipe_create`].
///
/// Owned exclusively by one consumer at a time, matching the single-consumer contract of the
/// underlying broker pipe.
#[async_trait]
pub trait PipeRx: Send {
    /// Await the next frame. Returns `None` once the pipe's receive side is closed, whether by a
    /// peer disconnect or by a prior call to [`PipeRx::close`].
    async fn recv(&mut self) -> Option<PipeFrame>;

    /// Close the receive side. Idempotent.
    async fn close(&mut self);
}
