//! Mutation intent pipeline.
//!
//! Every (entity kind, mutation kind) pair is a *binding*: an unbounded
//! queue of intents drained by a dedicated worker task, one intent at a
//! time. Awaiting each remote call to completion before dequeuing the next
//! intent gives the two invariants the UI relies on: at most one call in
//! flight per binding, and submission order equals processing order.
//! Bindings are independent of each other -- a vehicle create and a staff
//! update may interleave on the wire.
//!
//! Failures are terminal for the intent: the call is logged and the intent
//! dropped, never retried. The operator notices the missing change and
//! resubmits.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, watch};

use crate::error::SyncError;

/// Process-wide count of in-flight remote calls, published as a boolean
/// `updating` signal for the UI's loading indicator.
///
/// The signal flips to `true` on the 0 -> 1 transition and back to `false`
/// on 1 -> 0, so overlapping calls from different bindings keep it high
/// until the last one resolves. Clearing is tied to guard drop, which makes
/// it unconditional on both the success and failure paths.
#[derive(Clone)]
pub(crate) struct InFlightGauge {
    count: Arc<AtomicUsize>,
    updating_tx: Arc<watch::Sender<bool>>,
}

impl InFlightGauge {
    /// Create a gauge and the receiver side of its `updating` signal.
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (updating_tx, updating_rx) = watch::channel(false);
        (
            Self {
                count: Arc::new(AtomicUsize::new(0)),
                updating_tx: Arc::new(updating_tx),
            },
            updating_rx,
        )
    }

    /// Mark one call as in flight. The returned guard clears it on drop.
    pub(crate) fn enter(&self) -> InFlightGuard {
        if self.count.fetch_add(1, Ordering::AcqRel) == 0 {
            self.updating_tx.send_replace(true);
        }
        InFlightGuard {
            gauge: self.clone(),
        }
    }
}

/// RAII marker for one in-flight remote call.
pub(crate) struct InFlightGuard {
    gauge: InFlightGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.gauge.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.gauge.updating_tx.send_replace(false);
        }
    }
}

/// Spawn the worker task for one mutation binding and return its intake.
///
/// The remote call is injected as a closure so the pipeline is independent
/// of the transport: the store wires bindings to
/// [`DispatchClient`](crate::DispatchClient) methods, tests inject
/// instrumented stubs.
///
/// The worker runs until every sender is dropped. A rejected call is
/// logged under the binding label and the intent discarded; the queue
/// then proceeds with the next intent.
pub(crate) fn spawn_binding<T, F, Fut>(
    binding: &'static str,
    gauge: InFlightGauge,
    mut call: F,
) -> mpsc::UnboundedSender<T>
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), SyncError>> + Send,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<T>();
    tokio::spawn(async move {
        while let Some(intent) = rx.recv().await {
            let _in_flight = gauge.enter();
            if let Err(err) = call(intent).await {
                tracing::error!(binding, error = %err, "mutation rejected, dropping intent");
            }
        }
        tracing::debug!(binding, "mutation queue closed");
    });
    tx
}

/// Enqueue an intent on a binding, swallowing queue-closed errors.
///
/// The queue only closes when the store (and with it the worker) has been
/// dropped, at which point there is nobody left to care about the intent;
/// the UI contract is that submission never surfaces an error.
pub(crate) fn submit<T>(binding: &'static str, tx: &mpsc::UnboundedSender<T>, intent: T) {
    if tx.send(intent).is_err() {
        tracing::error!(binding, "mutation queue closed, dropping intent");
    }
}
