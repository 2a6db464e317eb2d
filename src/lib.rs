//! Client-side synchronized entity store for the firefight dispatch
//! authority.
//!
//! Keeps an in-memory snapshot of the authority's entity collections
//! (occurrences, active occurrences, vehicles, staff, teams), forwards
//! operator mutations through strictly serialized per-binding queues, and
//! replaces local state wholesale on every authoritative push.

mod auth;
pub mod client;
pub use client::DispatchClient;
mod error;
pub use error::SyncError;
pub mod model;
pub use model::{
    ActiveOccurrence, Occurrence, Staff, StaffPermission, StaffRank, StaffState, StoreSnapshot,
    Team, TeamState, Vehicle, VehicleState,
};
mod mutation;
mod store;
pub use store::{SyncedStore, SyncedStoreBuilder};
mod sync;
pub use sync::{SyncConfig, SyncHandle};
mod views;

/// Generated gRPC bindings for the dispatch authority wire contract.
pub mod proto {
    tonic::include_proto!("firefight.v1");
}
