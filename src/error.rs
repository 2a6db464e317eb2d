//! Crate-level error type for the synchronization layer.

/// Error produced at the boundary with the dispatch authority.
///
/// Mutation failures never reach store callers -- they are logged and
/// swallowed inside the pipeline (the operator resubmits). `SyncError`
/// therefore only surfaces from explicit lifecycle calls: connecting,
/// starting the sync loop, or issuing a direct RPC through
/// [`DispatchClient`](crate::DispatchClient).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The gRPC channel to the authority could not be established.
    #[error("failed to connect to dispatch authority: {0}")]
    Connect(#[from] tonic::transport::Error),

    /// The authority rejected a request or the transport failed mid-call.
    #[error("dispatch authority call failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// [`start_sync`](crate::SyncedStore::start_sync) was called while a
    /// sync loop is already running for this store instance.
    #[error("sync loop already started")]
    SyncAlreadyRunning,
}
