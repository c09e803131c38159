//! Stream Consumer: the client-side receiver half of the streaming protocol.
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use gateway_broker::PipeRx;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::sync::Notify;

use crate::frame::parse_frame;
use crate::frame::ParsedFrame;

struct Inner {
    keepalive_seconds: u64,
    closed: AtomicBool,
    started: AtomicBool,
    last_error: StdMutex<Option<String>>,
    close_notify: Notify,
    pipe_rx: Mutex<Option<Box<dyn PipeRx>>>,
    rows_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    rows_rx: Mutex<mpsc::UnboundedReceiver<Value>>,
}

/// Binds a receive-side pipe and exposes rows delivered to it.
///
/// The background task that drives the pipe is started lazily on first use and is single-shot:
/// once the stream has terminated (by any of the protocol's own rules, or by [`Consumer::close`])
/// it never restarts.
pub struct Consumer {
    inner: Arc<Inner>,
}

impl Consumer {
    /// Bind a consumer to the receive side of a pipe. `keepalive_seconds` must match the
    /// keepalive interval the producer was configured with; the consumer allows one extra second
    /// of slack before timing out.
    pub fn new(pipe_rx: Box<dyn PipeRx>, keepalive_seconds: u64) -> Consumer {
        let (rows_tx, rows_rx) = mpsc::unbounded_channel();
        Consumer {
            inner: Arc::new(Inner {
                keepalive_seconds: keepalive_seconds.max(1),
                closed: AtomicBool::new(false),
                started: AtomicBool::new(false),
                last_error: StdMutex::new(None),
                close_notify: Notify::new(),
                pipe_rx: Mutex::new(Some(pipe_rx)),
                rows_tx: Mutex::new(Some(rows_tx)),
                rows_rx: Mutex::new(rows_rx),
            }),
        }
    }

    /// Await the next delivered row. Returns `None` once the stream has terminated, whatever the
    /// cause; inspect [`Consumer::last_error`] to distinguish a clean end from a fault.
    pub async fn next(&self) -> Option<Value> {
        self.ensure_started().await;
        let mut rx = self.inner.rows_rx.lock().await;
        rx.recv().await
    }

    /// Whether the stream has terminated, by any means.
    pub fn closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// The error the stream terminated with, if any. `None` for a clean, self-initiated close.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().unwrap().clone()
    }

    /// Close the consumer. Idempotent: a second call is a no-op and records no error.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.close_notify.notify_one();
        // If the background task never started there is nobody to observe the notification;
        // tear down directly so the consumer still reaches a terminal state.
        if let Some(mut pipe_rx) = self.inner.pipe_rx.lock().await.take() {
            pipe_rx.close().await;
        }
        self.inner.rows_tx.lock().await.take();
    }

    async fn ensure_started(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let pipe_rx = self.inner.pipe_rx.lock().await.take();
        let rows_tx = self.inner.rows_tx.lock().await.take();
        if let (Some(pipe_rx), Some(rows_tx)) = (pipe_rx, rows_tx) {
            let inner = self.inner.clone();
            tokio::spawn(run(inner, pipe_rx, rows_tx));
        }
    }
}

async fn run(inner: Arc<Inner>, mut pipe_rx: Box<dyn PipeRx>, rows_tx: mpsc::UnboundedSender<Value>) {
    let timeout = Duration::from_secs(inner.keepalive_seconds + 1);
    let timer = tokio::time::sleep(timeout);
    tokio::pin!(timer);
    let mut expected: i64 = 1;

    loop {
        tokio::select! {
            _ = inner.close_notify.notified() => {
                pipe_rx.close().await;
                break;
            }

            _ = &mut timer => {
                set_error(&inner, "Stream closed by keepalive");
                pipe_rx.close().await;
                break;
            }

            frame = pipe_rx.recv() => {
                match frame {
                    None => {
                        if !inner.closed.load(Ordering::SeqCst) {
                            set_error(&inner, "closed");
                        }
                        break;
                    }
                    Some(frame) => {
                        if frame.count != expected {
                            // `expected` is the next count we haven't seen yet; drops are
                            // measured from the last one we actually accepted.
                            let drops = frame.count - (expected - 1);
                            set_error(&inner, format!("{drops} drops"));
                            break;
                        }
                        expected += 1;
                        timer.as_mut().reset(tokio::time::Instant::now() + timeout);

                        match parse_frame(&frame.msg) {
                            ParsedFrame::Data(value) => {
                                let _ = rows_tx.send(value);
                            }
                            ParsedFrame::Keepalive => {}
                            ParsedFrame::Error(message) => {
                                set_error(&inner, format!("Stream closed by other peer: {message}"));
                                break;
                            }
                            ParsedFrame::Unknown => {}
                        }
                    }
                }
            }
        }
    }

    inner.closed.store(true, Ordering::SeqCst);
    // `rows_tx` drops here, closing the delivery channel so `next()` returns `None`.
}

fn set_error(inner: &Inner, message: impl Into<String>) {
    *inner.last_error.lock().unwrap() = Some(message.into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_broker::fixture::FixtureBroker;
    use gateway_broker::Broker;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_rows_in_order() {
        let broker = FixtureBroker::new();
        let (id, rx) = broker.pipe_create(8).await.unwrap();
        let tx = broker.pipe_open(&id).await.unwrap();
        let consumer = Consumer::new(rx, 30);

        tx.write(crate::frame::data_frame(json!({"n": 1}))).await.unwrap();
        tx.write(crate::frame::data_frame(json!({"n": 2}))).await.unwrap();

        assert_eq!(consumer.next().await, Some(json!({"n": 1})));
        assert_eq!(consumer.next().await, Some(json!({"n": 2})));
    }

    /// A [`PipeRx`] fed directly with pre-built frames, to inject sequence gaps the broker
    /// fixture's auto-incrementing counter would never produce on its own.
    struct ScriptedPipeRx {
        rx: mpsc::UnboundedReceiver<gateway_broker::PipeFrame>,
    }

    #[async_trait::async_trait]
    impl PipeRx for ScriptedPipeRx {
        async fn recv(&mut self) -> Option<gateway_broker::PipeFrame> {
            self.rx.recv().await
        }

        async fn close(&mut self) {
            self.rx.close();
        }
    }

    #[tokio::test]
    async fn sequence_gap_terminates_with_drop_count() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(gateway_broker::PipeFrame {
            count: 1,
            msg: crate::frame::data_frame(json!({"n": 1})),
        })
        .unwrap();
        tx.send(gateway_broker::PipeFrame {
            count: 2,
            msg: crate::frame::data_frame(json!({"n": 2})),
        })
        .unwrap();
        tx.send(gateway_broker::PipeFrame {
            count: 4,
            msg: crate::frame::data_frame(json!({"n": 4})),
        })
        .unwrap();

        let consumer = Consumer::new(Box::new(ScriptedPipeRx { rx }), 30);
        assert_eq!(consumer.next().await, Some(json!({"n": 1})));
        assert_eq!(consumer.next().await, Some(json!({"n": 2})));
        assert_eq!(consumer.next().await, None);
        assert_eq!(consumer.last_error(), Some("2 drops".to_string()));
    }

    #[tokio::test]
    async fn error_frame_terminates_with_peer_message() {
        let broker = FixtureBroker::new();
        let (id, rx) = broker.pipe_create(8).await.unwrap();
        let tx = broker.pipe_open(&id).await.unwrap();
        let consumer = Consumer::new(rx, 30);

        tx.write(crate::frame::error_frame("boom")).await.unwrap();
        assert_eq!(consumer.next().await, None);
        assert_eq!(
            consumer.last_error(),
            Some("Stream closed by other peer: boom".to_string())
        );
        assert!(consumer.closed());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_clears_without_error() {
        let broker = FixtureBroker::new();
        let (id, rx) = broker.pipe_create(8).await.unwrap();
        let _tx = broker.pipe_open(&id).await.unwrap();
        let consumer = Consumer::new(rx, 30);

        consumer.close().await;
        consumer.close().await;
        assert!(consumer.closed());
        assert_eq!(consumer.last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_timeout_terminates_stream() {
        let broker = FixtureBroker::new();
        let (id, rx) = broker.pipe_create(8).await.unwrap();
        let _tx = broker.pipe_open(&id).await.unwrap();
        let consumer = Consumer::new(rx, 1);

        assert_eq!(consumer.next().await, None);
        assert_eq!(
            consumer.last_error(),
            Some("Stream closed by keepalive".to_string())
        );
    }
}
