//! In-memory broker used by this workspace's own test suite and, absent a production broker
//! client to wire up, by the `gatewayd` binary's own serve loop.
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::Broker;
use crate::PipeFrame;
use crate::PipeRx;
use crate::PipeTx;
use crate::PipeTxBackend;
use crate::Task;
use crate::TaskError;
use crate::TaskReply;
use crate::TaskReplyBackend;
use crate::TaskSource;

#[derive(Clone)]
struct PipeEntry {
    sender: mpsc::Sender<PipeFrame>,
    next_count: Arc<Mutex<i64>>,
}

/// An in-memory broker: pipes are `tokio::sync::mpsc` channels, tasks are an internal queue fed
/// by [`FixtureBroker::submit_task`].
pub struct FixtureBroker {
    pipes: Mutex<HashMap<String, PipeEntry>>,
    next_pipe_id: Mutex<u64>,
    tasks_tx: mpsc::UnboundedSender<(Task, TaskReply)>,
    tasks_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(Task, TaskReply)>>,
}

impl FixtureBroker {
    pub fn new() -> Self {
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();
        FixtureBroker {
            pipes: Mutex::new(HashMap::new()),
            next_pipe_id: Mutex::new(0),
            tasks_tx,
            tasks_rx: tokio::sync::Mutex::new(tasks_rx),
        }
    }

    /// Submit an RPC task as a client would, awaiting its reply.
    pub async fn submit_task(
        &self,
        method: impl Into<String>,
        params: Value,
        timeout: Duration,
    ) -> anyhow::Result<Result<Value, TaskError>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let task = Task {
            method: method.into(),
            params,
            timeout,
        };
        let reply = TaskReply::from(FixtureTaskReply { reply_tx });
        self.tasks_tx
            .send((task, reply))
            .map_err(|_| anyhow::anyhow!("task source closed"))?;
        reply_rx
            .await
            .map_err(|_| anyhow::anyhow!("reply dropped without a response"))
    }
}

impl Default for FixtureBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for FixtureBroker {
    async fn pipe_create(&self, length: usize) -> anyhow::Result<(String, Box<dyn PipeRx>)> {
        let (sender, receiver) = mpsc::channel(length.max(1));
        let entry = PipeEntry {
            sender,
            next_count: Arc::new(Mutex::new(0)),
        };
        let id = {
            let mut next_id = self.next_pipe_id.lock().unwrap();
            *next_id += 1;
            format!("pipe-{}", *next_id)
        };
        self.pipes.lock().unwrap().insert(id.clone(), entry);
        Ok((id, Box::new(FixturePipeRx { receiver })))
    }

    async fn pipe_open(&self, id: &str) -> anyhow::Result<PipeTx> {
        let entry = self
            .pipes
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such pipe: {id}"))?;
        Ok(PipeTx::from(FixturePipeTx {
            sender: entry.sender,
            next_count: entry.next_count,
        }))
    }
}

#[async_trait]
impl TaskSource for FixtureBroker {
    async fn next_task(&self) -> Option<(Task, TaskReply)> {
        self.tasks_rx.lock().await.recv().await
    }
}

struct FixturePipeTx {
    sender: mpsc::Sender<PipeFrame>,
    next_count: Arc<Mutex<i64>>,
}

#[async_trait]
impl PipeTxBackend for FixturePipeTx {
    async fn write(&self, msg: Value) -> anyhow::Result<i64> {
        let count = {
            let mut next = self.next_count.lock().unwrap();
            *next += 1;
            *next
        };
        self.sender
            .send(PipeFrame { count, msg })
            .await
            .map_err(|_| anyhow::anyhow!("pipe has no live consumer"))?;
        Ok(count)
    }
}

struct FixturePipeRx {
    receiver: mpsc::Receiver<PipeFrame>,
}

#[async_trait]
impl PipeRx for FixturePipeRx {
    async fn recv(&mut self) -> Option<PipeFrame> {
        self.receiver.recv().await
    }

    async fn close(&mut self) {
        self.receiver.close();
    }
}

struct FixtureTaskReply {
    reply_tx: oneshot::Sender<Result<Value, TaskError>>,
}

#[async_trait]
impl TaskReplyBackend for FixtureTaskReply {
    async fn reply(self: Box<Self>, result: Result<Value, TaskError>) {
        let _ = self.reply_tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn pipe_frames_carry_increasing_counts() {
        let broker = FixtureBroker::new();
        let (id, mut rx) = broker.pipe_create(4).await.unwrap();
        let tx = broker.pipe_open(&id).await.unwrap();
        tx.write(json!({"a": 1})).await.unwrap();
        tx.write(json!({"a": 2})).await.unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(second.count, 2);
    }

    #[tokio::test]
    async fn closing_rx_fails_subsequent_writes() {
        let broker = FixtureBroker::new();
        let (id, mut rx) = broker.pipe_create(1).await.unwrap();
        let tx = broker.pipe_open(&id).await.unwrap();
        rx.close().await;
        assert!(tx.write(json!(null)).await.is_err());
    }

    #[tokio::test]
    async fn submit_task_round_trips_a_reply() {
        let broker = Arc::new(FixtureBroker::new());
        let handler = {
            let broker = broker.clone();
            tokio::spawn(async move {
                let (task, reply) = broker.next_task().await.unwrap();
                assert_eq!(task.method, "query");
                reply.ok(json!({"ok": true})).await;
            })
        };
        let result = broker
            .submit_task("query", json!({"term": null}), Duration::from_secs(1))
            .await
            .unwrap();
        handler.await.unwrap();
        assert_eq!(result.unwrap(), json!({"ok": true}));
    }
}
