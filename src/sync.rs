//! Sync loop configuration and runtime types.
//!
//! The sync loop is the store's only writer of local state: it performs the
//! initial load, then holds the authority's push stream open and replaces
//! the snapshot wholesale on every received update. [`SyncConfig`] tunes
//! reconnection behaviour; [`SyncHandle`] controls a running loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_stream::StreamExt;

use crate::client::{DispatchClient, snapshot_from_proto};
use crate::proto;
use crate::views::SnapshotFan;

/// Configuration for sync loop behaviour.
///
/// Controls how the loop reconnects after the push stream drops. All
/// fields have sensible defaults accessible via [`SyncConfig::default()`].
///
/// Reconnection applies only to the push subscription -- a transport
/// concern. Mutations keep their at-most-one-attempt semantics regardless.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use firefight_sync::SyncConfig;
///
/// let config = SyncConfig {
///     reconnect_base_delay: Duration::from_millis(200),
///     ..SyncConfig::default()
/// };
/// assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base delay for exponential backoff on stream reconnection.
    ///
    /// After a stream error, the loop waits `reconnect_base_delay`, then
    /// twice that, and so on up to
    /// [`reconnect_max_delay`](SyncConfig::reconnect_max_delay). A
    /// successful resubscribe resets the backoff.
    ///
    /// Default: 1 second.
    pub reconnect_base_delay: Duration,

    /// Maximum delay between reconnection attempts.
    ///
    /// Default: 30 seconds.
    pub reconnect_max_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
        }
    }
}

/// Handle for controlling a running sync loop.
///
/// Dropping the handle does **not** stop the loop -- call
/// [`shutdown`](SyncHandle::shutdown) for graceful termination.
///
/// `Clone` is cheap: all fields are `Arc`-wrapped.
#[derive(Clone)]
pub struct SyncHandle {
    /// Sends `true` to signal the loop to stop.
    pub(crate) shutdown_tx: tokio::sync::watch::Sender<bool>,
    /// Set once the store holds authoritative state (initial load or any
    /// push applied).
    pub(crate) synced: Arc<AtomicBool>,
    /// The spawned background task. Wrapped in `Option` so it can be
    /// taken and awaited exactly once by [`shutdown`](SyncHandle::shutdown).
    pub(crate) task: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl SyncHandle {
    /// Returns `true` once the store holds authoritative state: the
    /// initial load succeeded, or at least one push has been applied.
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// Calling `shutdown` more than once is safe -- subsequent calls
    /// return immediately.
    pub async fn shutdown(&self) {
        // Ignore send errors: the receiver is gone if the task already
        // exited on its own.
        let _ = self.shutdown_tx.send(true);

        let task = self.task.lock().await.take();
        if let Some(join_handle) = task {
            if let Err(e) = join_handle.await {
                tracing::error!(error = %e, "sync loop task panicked");
            }
        }
    }
}

/// Result of consuming a push stream until it ends or errors. Used by the
/// outer reconnection loop to decide how to back off.
enum StreamOutcome {
    /// The stream ended cleanly (authority closed it).
    Ended,
    /// A stream error occurred and should trigger reconnection.
    Error(tonic::Status),
}

/// Run the sync loop.
///
/// This is the background task spawned by
/// [`SyncedStore::start_sync`](crate::SyncedStore::start_sync). It fetches
/// the initial snapshot once (a failure is logged and left to the push
/// channel to repair), then keeps a `SubscribeUpdates` stream open,
/// publishing every received snapshot through the fan. Reconnects with
/// exponential backoff and exits when signalled.
pub(crate) async fn run_sync_loop(
    client: DispatchClient,
    fan: Arc<SnapshotFan>,
    config: SyncConfig,
    synced: Arc<AtomicBool>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    // Initial load. One attempt only: if it fails, the views stay in
    // their empty default state until the first authority push arrives.
    match client.get_store().await {
        Ok(snapshot) => {
            synced.store(true, Ordering::Release);
            fan.publish(snapshot);
            tracing::info!("initial snapshot loaded");
        }
        Err(status) => {
            tracing::error!(error = %status, "initial snapshot load failed");
        }
    }

    let mut backoff_delay = config.reconnect_base_delay;

    loop {
        if *shutdown_rx.borrow() {
            return;
        }

        tracing::info!("sync loop: subscribing to authority pushes");
        let stream = match client.subscribe_updates().await {
            Ok(s) => {
                // Handshake succeeded; treat the connection as healthy.
                backoff_delay = config.reconnect_base_delay;
                s
            }
            Err(e) => {
                tracing::error!(error = %e, "sync loop: subscribe failed, will retry");
                tokio::select! {
                    _ = tokio::time::sleep(backoff_delay) => {}
                    _ = shutdown_rx.changed() => return,
                }
                backoff_delay = (backoff_delay * 2).min(config.reconnect_max_delay);
                continue;
            }
        };

        let outcome = {
            let stream_fut = process_stream(&fan, stream, &synced);
            tokio::pin!(stream_fut);

            loop {
                tokio::select! {
                    result = &mut stream_fut => break result,
                    _ = shutdown_rx.changed() => return,
                }
            }
        };

        match outcome {
            StreamOutcome::Ended => {
                // Clean close is treated as transient; resubscribe
                // immediately on the base delay.
                tracing::info!("sync loop: push stream closed, reconnecting");
            }
            StreamOutcome::Error(status) => {
                tracing::error!(error = %status, "sync loop: stream error, will reconnect");
                tokio::select! {
                    _ = tokio::time::sleep(backoff_delay) => {}
                    _ = shutdown_rx.changed() => return,
                }
                backoff_delay = (backoff_delay * 2).min(config.reconnect_max_delay);
            }
        }
    }
}

/// Publish every snapshot from a push stream until it ends or errors.
///
/// Factored out of [`run_sync_loop`] so that tests can provide a mock
/// stream without a live gRPC server.
async fn process_stream(
    fan: &SnapshotFan,
    mut stream: impl tokio_stream::Stream<Item = Result<proto::StoreSnapshot, tonic::Status>> + Unpin,
    synced: &AtomicBool,
) -> StreamOutcome {
    while let Some(result) = stream.next().await {
        match result {
            Ok(proto_snapshot) => {
                // A push carries complete state, so we are synced even if
                // the initial load failed. Set the flag before publishing
                // so observers woken by the publish see it.
                synced.store(true, Ordering::Release);
                fan.publish(snapshot_from_proto(proto_snapshot));
                tracing::debug!("sync loop: applied authority push");
            }
            Err(status) => return StreamOutcome::Error(status),
        }
    }
    StreamOutcome::Ended
}
