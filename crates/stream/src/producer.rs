//! Stream Producer: owns a `(cursor, pipe_tx, keepalive_seconds)` triple on a background task.
//!
//! The producer never retries a failed pipe write — a write failure means the consumer is gone —
//! and never logs or panics; failures are reported to the consumer via an ERROR frame when
//! possible, otherwise by silently letting the pipe close.
use std::time::Duration;

use gateway_broker::PipeTx;
use gateway_db::Cursor;

use crate::frame::data_frame;
use crate::frame::error_frame;
use crate::frame::keepalive_frame;

/// Spawn a producer task that drains `cursor` onto `pipe_tx`, closing the cursor exactly once on
/// exit regardless of which path ends the stream.
pub fn spawn(
    mut cursor: Box<dyn Cursor>,
    pipe_tx: PipeTx,
    keepalive_seconds: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(cursor.as_mut(), &pipe_tx, keepalive_seconds.max(1)).await;
        cursor.close().await;
    })
}

async fn run(cursor: &mut dyn Cursor, pipe_tx: &PipeTx, keepalive_seconds: u64) {
    let keepalive = Duration::from_secs(keepalive_seconds);
    let timer = tokio::time::sleep(keepalive);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            row = cursor.try_next() => {
                match row {
                    Some(row) => {
                        if pipe_tx.write(data_frame(row)).await.is_err() {
                            return;
                        }
                        timer.as_mut().reset(tokio::time::Instant::now() + keepalive);
                    }
                    None => {
                        if let Some(err) = cursor.err() {
                            // Best-effort: the consumer may already be gone.
                            let _ = pipe_tx.write(error_frame(&err.to_string())).await;
                        }
                        return;
                    }
                }
            }

            _ = &mut timer => {
                if pipe_tx.write(keepalive_frame()).await.is_err() {
                    return;
                }
                timer.as_mut().reset(tokio::time::Instant::now() + keepalive);
            }
        }
    }
}
