//! gRPC interceptor that injects a Bearer token into outgoing requests.
//!
//! Station deployments that expose the dispatch authority beyond localhost
//! front it with an authenticating proxy; this interceptor carries the
//! operator session token on every RPC.

use std::sync::{Arc, RwLock};

/// Injects a Bearer token from a shared, refreshable string.
///
/// The token is read on every intercepted request with a synchronous
/// `read()` lock because tonic interceptors are called synchronously.
/// Writing a new value into the lock rotates the credential without
/// reconnecting. An empty string means "no auth": no `authorization`
/// header is added.
///
/// # Panics
///
/// Panics if the inner [`RwLock`] is poisoned (a writer panicked while
/// holding the write lock). This is treated as an invariant violation.
#[derive(Clone)]
pub(crate) struct BearerInterceptor {
    /// Shared, refreshable token string. An empty string means "no auth".
    pub(crate) token: Arc<RwLock<String>>,
}

impl tonic::service::Interceptor for BearerInterceptor {
    fn call(&mut self, mut req: tonic::Request<()>) -> Result<tonic::Request<()>, tonic::Status> {
        let token = self.token.read().expect("token RwLock poisoned");
        if !token.is_empty() {
            let value = format!("Bearer {token}")
                .parse::<tonic::metadata::MetadataValue<_>>()
                .map_err(|_| tonic::Status::internal("invalid token characters"))?;
            req.metadata_mut().insert("authorization", value);
        }
        Ok(req)
    }
}
