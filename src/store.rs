//! Top-level entry point that composes the client, mutation bindings,
//! snapshot fan, and sync loop into a single [`SyncedStore`] type.
//!
//! The store is opened via [`SyncedStoreBuilder`], which connects to the
//! dispatch authority's gRPC endpoint. One store instance is created at
//! application start and handed (by clone) to every consumer -- there is
//! no global singleton; all dependencies are constructor-injected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{broadcast, mpsc, watch};

use crate::client::DispatchClient;
use crate::error::SyncError;
use crate::model::{ActiveOccurrence, Occurrence, Staff, StoreSnapshot, Team, Vehicle};
use crate::mutation::{self, InFlightGauge, spawn_binding};
use crate::sync::{SyncConfig, SyncHandle, run_sync_loop};
use crate::views::SnapshotFan;

/// Buffered capacity of each created-identifier notification channel.
///
/// Creation is operator-paced; a lagging subscriber that misses more than
/// this many notifications only loses auto-selection, not data.
const CREATED_CHANNEL_CAPACITY: usize = 16;

/// Intake queues for the fifteen mutation bindings.
///
/// One field per (entity kind, mutation kind) pair, written out explicitly
/// so the full pipeline surface is visible in one place.
#[derive(Clone)]
struct Bindings {
    create_occurrence: mpsc::UnboundedSender<Occurrence>,
    update_occurrence: mpsc::UnboundedSender<Occurrence>,
    delete_occurrence: mpsc::UnboundedSender<String>,
    create_active_occurrence: mpsc::UnboundedSender<ActiveOccurrence>,
    update_active_occurrence: mpsc::UnboundedSender<ActiveOccurrence>,
    delete_active_occurrence: mpsc::UnboundedSender<String>,
    create_vehicle: mpsc::UnboundedSender<Vehicle>,
    update_vehicle: mpsc::UnboundedSender<Vehicle>,
    delete_vehicle: mpsc::UnboundedSender<String>,
    create_staff: mpsc::UnboundedSender<Staff>,
    update_staff: mpsc::UnboundedSender<Staff>,
    delete_staff: mpsc::UnboundedSender<String>,
    create_team: mpsc::UnboundedSender<Team>,
    update_team: mpsc::UnboundedSender<Team>,
    delete_team: mpsc::UnboundedSender<String>,
}

/// Per-kind side channels announcing authority-assigned identifiers.
#[derive(Clone)]
struct CreatedChannels {
    occurrence: broadcast::Sender<String>,
    active_occurrence: broadcast::Sender<String>,
    vehicle: broadcast::Sender<String>,
    staff: broadcast::Sender<String>,
    team: broadcast::Sender<String>,
}

impl CreatedChannels {
    fn new() -> Self {
        Self {
            occurrence: broadcast::channel(CREATED_CHANNEL_CAPACITY).0,
            active_occurrence: broadcast::channel(CREATED_CHANNEL_CAPACITY).0,
            vehicle: broadcast::channel(CREATED_CHANNEL_CAPACITY).0,
            staff: broadcast::channel(CREATED_CHANNEL_CAPACITY).0,
            team: broadcast::channel(CREATED_CHANNEL_CAPACITY).0,
        }
    }
}

/// Reactive, authority-synchronized entity store.
///
/// Holds the in-memory snapshot of every entity collection, accepts
/// mutation intents through `submit_*` methods, and exposes per-collection
/// views that re-emit only when their collection actually changed.
///
/// Reconciliation is push-driven: a submitted mutation only informs the
/// authority; the local snapshot changes when the authority pushes the
/// next authoritative state through the sync loop. Consequently the
/// `submit_*` methods return nothing -- a failed mutation is logged and
/// the UI simply observes that no change happened.
///
/// `Clone` is cheap -- all internal state is `Arc`-wrapped or a channel
/// handle.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use firefight_sync::SyncedStoreBuilder;
///
/// let store = SyncedStoreBuilder::new()
///     .endpoint("http://127.0.0.1:4770")
///     .open()
///     .await?;
/// let _sync = store.start_sync().await?;
///
/// let mut vehicles = store.vehicles();
/// while vehicles.changed().await.is_ok() {
///     println!("{} vehicles", vehicles.borrow().len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncedStore {
    client: DispatchClient,
    fan: Arc<SnapshotFan>,
    updating_rx: watch::Receiver<bool>,
    bindings: Bindings,
    created: CreatedChannels,
    sync_config: SyncConfig,
    sync_handle: Arc<tokio::sync::Mutex<Option<SyncHandle>>>,
}

// Manual `Debug`: the fan and binding queues carry no useful state to show.
impl fmt::Debug for SyncedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedStore")
            .field("client", &self.client)
            .finish()
    }
}

impl SyncedStore {
    /// Wire up the store around a connected client: snapshot fan, in-flight
    /// gauge, created channels, and one worker task per mutation binding.
    ///
    /// Must be called from within a tokio runtime (workers are spawned
    /// here).
    fn new_with(client: DispatchClient, sync_config: SyncConfig) -> Self {
        let fan = Arc::new(SnapshotFan::new());
        let (gauge, updating_rx) = InFlightGauge::new();
        let created = CreatedChannels::new();

        let bindings = Bindings {
            create_occurrence: {
                let client = client.clone();
                let created = created.occurrence.clone();
                spawn_binding("create_occurrence", gauge.clone(), move |o: Occurrence| {
                    let client = client.clone();
                    let created = created.clone();
                    async move {
                        let assigned_id = client.create_occurrence(&o).await?;
                        tracing::info!(occurrence_id = %assigned_id, "occurrence created");
                        let _ = created.send(assigned_id);
                        Ok(())
                    }
                })
            },
            update_occurrence: {
                let client = client.clone();
                spawn_binding("update_occurrence", gauge.clone(), move |o: Occurrence| {
                    let client = client.clone();
                    async move {
                        client.update_occurrence(&o).await?;
                        Ok(())
                    }
                })
            },
            delete_occurrence: {
                let client = client.clone();
                spawn_binding("delete_occurrence", gauge.clone(), move |id: String| {
                    let client = client.clone();
                    async move {
                        client.delete_occurrence(&id).await?;
                        Ok(())
                    }
                })
            },
            create_active_occurrence: {
                let client = client.clone();
                let created = created.active_occurrence.clone();
                spawn_binding(
                    "create_active_occurrence",
                    gauge.clone(),
                    move |a: ActiveOccurrence| {
                        let client = client.clone();
                        let created = created.clone();
                        async move {
                            let assigned_id = client.create_active_occurrence(&a).await?;
                            tracing::info!(occurrence_id = %assigned_id, "active occurrence opened");
                            let _ = created.send(assigned_id);
                            Ok(())
                        }
                    },
                )
            },
            update_active_occurrence: {
                let client = client.clone();
                spawn_binding(
                    "update_active_occurrence",
                    gauge.clone(),
                    move |a: ActiveOccurrence| {
                        let client = client.clone();
                        async move {
                            client.update_active_occurrence(&a).await?;
                            Ok(())
                        }
                    },
                )
            },
            delete_active_occurrence: {
                let client = client.clone();
                spawn_binding(
                    "delete_active_occurrence",
                    gauge.clone(),
                    move |id: String| {
                        let client = client.clone();
                        async move {
                            client.delete_active_occurrence(&id).await?;
                            Ok(())
                        }
                    },
                )
            },
            create_vehicle: {
                let client = client.clone();
                let created = created.vehicle.clone();
                spawn_binding("create_vehicle", gauge.clone(), move |v: Vehicle| {
                    let client = client.clone();
                    let created = created.clone();
                    async move {
                        let assigned_id = client.create_vehicle(&v).await?;
                        tracing::info!(vehicle_id = %assigned_id, "vehicle created");
                        let _ = created.send(assigned_id);
                        Ok(())
                    }
                })
            },
            update_vehicle: {
                let client = client.clone();
                spawn_binding("update_vehicle", gauge.clone(), move |v: Vehicle| {
                    let client = client.clone();
                    async move {
                        client.update_vehicle(&v).await?;
                        Ok(())
                    }
                })
            },
            delete_vehicle: {
                let client = client.clone();
                spawn_binding("delete_vehicle", gauge.clone(), move |id: String| {
                    let client = client.clone();
                    async move {
                        client.delete_vehicle(&id).await?;
                        Ok(())
                    }
                })
            },
            create_staff: {
                let client = client.clone();
                let created = created.staff.clone();
                spawn_binding("create_staff", gauge.clone(), move |s: Staff| {
                    let client = client.clone();
                    let created = created.clone();
                    async move {
                        let assigned_id = client.create_staff(&s).await?;
                        tracing::info!(staff_id = %assigned_id, "staff member created");
                        let _ = created.send(assigned_id);
                        Ok(())
                    }
                })
            },
            update_staff: {
                let client = client.clone();
                spawn_binding("update_staff", gauge.clone(), move |s: Staff| {
                    let client = client.clone();
                    async move {
                        client.update_staff(&s).await?;
                        Ok(())
                    }
                })
            },
            delete_staff: {
                let client = client.clone();
                spawn_binding("delete_staff", gauge.clone(), move |id: String| {
                    let client = client.clone();
                    async move {
                        client.delete_staff(&id).await?;
                        Ok(())
                    }
                })
            },
            create_team: {
                let client = client.clone();
                let created = created.team.clone();
                spawn_binding("create_team", gauge.clone(), move |t: Team| {
                    let client = client.clone();
                    let created = created.clone();
                    async move {
                        let assigned_id = client.create_team(&t).await?;
                        tracing::info!(team_id = %assigned_id, "team created");
                        let _ = created.send(assigned_id);
                        Ok(())
                    }
                })
            },
            update_team: {
                let client = client.clone();
                spawn_binding("update_team", gauge.clone(), move |t: Team| {
                    let client = client.clone();
                    async move {
                        client.update_team(&t).await?;
                        Ok(())
                    }
                })
            },
            delete_team: {
                let client = client.clone();
                spawn_binding("delete_team", gauge, move |id: String| {
                    let client = client.clone();
                    async move {
                        client.delete_team(&id).await?;
                        Ok(())
                    }
                })
            },
        };

        Self {
            client,
            fan,
            updating_rx,
            bindings,
            created,
            sync_config,
            sync_handle: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Start the sync loop in the background.
    ///
    /// Fetches the initial snapshot, then subscribes to authority pushes
    /// and replaces local state on each one. Can only be called once per
    /// store instance -- a second call returns an error without spawning
    /// another loop.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SyncAlreadyRunning`] if a sync loop is already
    /// active.
    pub async fn start_sync(&self) -> Result<SyncHandle, SyncError> {
        let mut guard = self.sync_handle.lock().await;
        if guard.is_some() {
            return Err(SyncError::SyncAlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let synced = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_sync_loop(
            self.client.clone(),
            self.fan.clone(),
            self.sync_config.clone(),
            synced.clone(),
            shutdown_rx,
        ));

        let handle = SyncHandle {
            shutdown_tx,
            synced,
            task: Arc::new(tokio::sync::Mutex::new(Some(task))),
        };

        *guard = Some(handle.clone());
        Ok(handle)
    }

    /// Current full snapshot, re-emitted when any collection changes.
    pub fn snapshot(&self) -> watch::Receiver<StoreSnapshot> {
        self.fan.snapshot()
    }

    /// Occurrence-template collection, re-emitted only when it changes.
    pub fn occurrences(&self) -> watch::Receiver<HashMap<String, Occurrence>> {
        self.fan.occurrences()
    }

    /// Active-occurrence collection, re-emitted only when it changes.
    pub fn active_occurrences(&self) -> watch::Receiver<HashMap<String, ActiveOccurrence>> {
        self.fan.active_occurrences()
    }

    /// Vehicle collection, re-emitted only when it changes.
    pub fn vehicles(&self) -> watch::Receiver<HashMap<String, Vehicle>> {
        self.fan.vehicles()
    }

    /// Staff collection, re-emitted only when it changes.
    pub fn staff(&self) -> watch::Receiver<HashMap<String, Staff>> {
        self.fan.staff()
    }

    /// Team collection, re-emitted only when it changes.
    pub fn teams(&self) -> watch::Receiver<HashMap<String, Team>> {
        self.fan.teams()
    }

    /// `true` while any mutation round-trip is outstanding. Drives the
    /// UI's loading indicator.
    pub fn updating(&self) -> watch::Receiver<bool> {
        self.updating_rx.clone()
    }

    /// Identifiers the authority assigned to created occurrences.
    ///
    /// Lets callers react to their own creation (e.g. auto-select the new
    /// entity) without diffing the snapshot stream.
    pub fn occurrence_created(&self) -> broadcast::Receiver<String> {
        self.created.occurrence.subscribe()
    }

    /// Identifiers the authority assigned to opened active occurrences.
    pub fn active_occurrence_created(&self) -> broadcast::Receiver<String> {
        self.created.active_occurrence.subscribe()
    }

    /// Identifiers the authority assigned to created vehicles.
    pub fn vehicle_created(&self) -> broadcast::Receiver<String> {
        self.created.vehicle.subscribe()
    }

    /// Identifiers the authority assigned to created staff members.
    pub fn staff_created(&self) -> broadcast::Receiver<String> {
        self.created.staff.subscribe()
    }

    /// Identifiers the authority assigned to created teams.
    pub fn team_created(&self) -> broadcast::Receiver<String> {
        self.created.team.subscribe()
    }

    /// Enqueue creation of an occurrence template. The `internal_id` field
    /// is ignored; the authority assigns one and announces it on
    /// [`occurrence_created`](Self::occurrence_created).
    pub fn submit_create_occurrence(&self, occurrence: Occurrence) {
        mutation::submit(
            "create_occurrence",
            &self.bindings.create_occurrence,
            occurrence,
        );
    }

    /// Enqueue an update of an existing occurrence template.
    pub fn submit_update_occurrence(&self, occurrence: Occurrence) {
        mutation::submit(
            "update_occurrence",
            &self.bindings.update_occurrence,
            occurrence,
        );
    }

    /// Enqueue deletion of an occurrence template.
    pub fn submit_delete_occurrence(&self, occurrence_id: impl Into<String>) {
        mutation::submit(
            "delete_occurrence",
            &self.bindings.delete_occurrence,
            occurrence_id.into(),
        );
    }

    /// Enqueue opening of an active occurrence. The authority assigns the
    /// identifier and stamps the creation time.
    pub fn submit_create_active_occurrence(&self, incident: ActiveOccurrence) {
        mutation::submit(
            "create_active_occurrence",
            &self.bindings.create_active_occurrence,
            incident,
        );
    }

    /// Enqueue an update of an active occurrence.
    pub fn submit_update_active_occurrence(&self, incident: ActiveOccurrence) {
        mutation::submit(
            "update_active_occurrence",
            &self.bindings.update_active_occurrence,
            incident,
        );
    }

    /// Enqueue closing of an active occurrence.
    pub fn submit_delete_active_occurrence(&self, occurrence_id: impl Into<String>) {
        mutation::submit(
            "delete_active_occurrence",
            &self.bindings.delete_active_occurrence,
            occurrence_id.into(),
        );
    }

    /// Enqueue creation of a vehicle.
    pub fn submit_create_vehicle(&self, vehicle: Vehicle) {
        mutation::submit("create_vehicle", &self.bindings.create_vehicle, vehicle);
    }

    /// Enqueue an update of a vehicle.
    pub fn submit_update_vehicle(&self, vehicle: Vehicle) {
        mutation::submit("update_vehicle", &self.bindings.update_vehicle, vehicle);
    }

    /// Enqueue deletion of a vehicle.
    pub fn submit_delete_vehicle(&self, vehicle_id: impl Into<String>) {
        mutation::submit(
            "delete_vehicle",
            &self.bindings.delete_vehicle,
            vehicle_id.into(),
        );
    }

    /// Enqueue creation of a staff member.
    pub fn submit_create_staff(&self, member: Staff) {
        mutation::submit("create_staff", &self.bindings.create_staff, member);
    }

    /// Enqueue an update of a staff member.
    pub fn submit_update_staff(&self, member: Staff) {
        mutation::submit("update_staff", &self.bindings.update_staff, member);
    }

    /// Enqueue deletion of a staff member.
    pub fn submit_delete_staff(&self, staff_id: impl Into<String>) {
        mutation::submit(
            "delete_staff",
            &self.bindings.delete_staff,
            staff_id.into(),
        );
    }

    /// Enqueue creation of a team.
    pub fn submit_create_team(&self, team: Team) {
        mutation::submit("create_team", &self.bindings.create_team, team);
    }

    /// Enqueue an update of a team.
    pub fn submit_update_team(&self, team: Team) {
        mutation::submit("update_team", &self.bindings.update_team, team);
    }

    /// Enqueue deletion of a team.
    pub fn submit_delete_team(&self, team_id: impl Into<String>) {
        mutation::submit("delete_team", &self.bindings.delete_team, team_id.into());
    }

    /// Ask the authority to broadcast a dispatch alert for an occurrence.
    ///
    /// Fire-and-forget: the call runs in the background and a failure is
    /// logged, not surfaced. Shares the mutation pipeline's
    /// discard-on-failure policy but not its queues -- alerts are not
    /// entity mutations and never wait behind one.
    pub fn broadcast_alert(
        &self,
        occurrence_id: impl Into<String>,
        staff_ids: Vec<String>,
        vehicle_ids: Vec<String>,
    ) {
        let client = self.client.clone();
        let occurrence_id = occurrence_id.into();
        tokio::spawn(async move {
            if let Err(status) = client
                .broadcast_alert(&occurrence_id, &staff_ids, &vehicle_ids)
                .await
            {
                tracing::error!(error = %status, "alert broadcast failed");
            }
        });
    }
}

/// Builder for configuring and opening a [`SyncedStore`].
///
/// Collects configuration -- endpoint URL, optional Bearer token, sync
/// tuning -- then connects to the authority on
/// [`open`](SyncedStoreBuilder::open).
///
/// # Examples
///
/// ```no_run
/// use firefight_sync::SyncedStoreBuilder;
///
/// # async fn example() -> Result<(), firefight_sync::SyncError> {
/// let store = SyncedStoreBuilder::new()
///     .endpoint("http://127.0.0.1:4770")
///     .open()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SyncedStoreBuilder {
    endpoint: Option<String>,
    auth_token: Option<Arc<std::sync::RwLock<String>>>,
    sync_config: SyncConfig,
}

impl SyncedStoreBuilder {
    /// Create a new builder with no configuration.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            sync_config: SyncConfig::default(),
        }
    }

    /// Set the authority's gRPC endpoint URL.
    ///
    /// Defaults to `http://127.0.0.1:4770`, the authority's loopback port.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Set a shared Bearer token for authenticated connections.
    ///
    /// The token is read on every outgoing RPC, so writing a new value
    /// into the lock rotates credentials without reconnecting. An empty
    /// string behaves as unauthenticated.
    pub fn auth_token(mut self, token: Arc<std::sync::RwLock<String>>) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// Set the sync loop configuration (reconnect backoff tuning).
    ///
    /// If not called, [`SyncConfig::default()`] is used.
    pub fn sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// Connect to the authority and build the [`SyncedStore`].
    ///
    /// Establishes the gRPC channel and spawns the mutation workers. The
    /// sync loop is not started here -- call
    /// [`SyncedStore::start_sync`] once the store is wired into the
    /// application.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Connect`] if the gRPC connection fails.
    pub async fn open(self) -> Result<SyncedStore, SyncError> {
        let endpoint = self.endpoint.as_deref().unwrap_or("http://127.0.0.1:4770");

        let client = match self.auth_token {
            Some(token) => DispatchClient::connect_with_token(endpoint, token).await?,
            None => DispatchClient::connect(endpoint).await?,
        };

        Ok(SyncedStore::new_with(client, self.sync_config))
    }
}

impl Default for SyncedStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::model::VehicleState;
    use crate::proto::dispatch_store_client::DispatchStoreClient;

    /// Build a store around a lazy (non-connecting) channel. Remote calls
    /// fail fast, which is all these tests need.
    fn mock_store() -> SyncedStore {
        let channel = tonic::transport::Endpoint::from_static("http://[::1]:1").connect_lazy();
        let client = DispatchClient::from_inner(DispatchStoreClient::new(channel));
        SyncedStore::new_with(client, SyncConfig::default())
    }

    #[test]
    fn builder_without_auth_token_has_none() {
        let builder = SyncedStoreBuilder::new();
        assert!(builder.auth_token.is_none());
    }

    #[tokio::test]
    async fn builder_connect_returns_err_when_no_server() {
        let result = SyncedStoreBuilder::new()
            .endpoint("http://127.0.0.1:1")
            .open()
            .await;
        assert!(
            result.is_err(),
            "open should fail when no server is listening on port 1"
        );
    }

    #[tokio::test]
    async fn start_sync_twice_returns_already_running() {
        let store = mock_store();
        let handle = store
            .start_sync()
            .await
            .expect("first start_sync should succeed");

        let second = store.start_sync().await;
        assert!(matches!(second, Err(SyncError::SyncAlreadyRunning)));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn views_start_in_their_empty_default_state() {
        let store = mock_store();
        assert_eq!(*store.snapshot().borrow(), StoreSnapshot::default());
        assert!(store.vehicles().borrow().is_empty());
        assert!(store.staff().borrow().is_empty());
        assert!(store.teams().borrow().is_empty());
        assert!(!*store.updating().borrow());
    }

    #[tokio::test]
    async fn failed_create_emits_no_created_notification() {
        let store = mock_store();
        let mut created = store.vehicle_created();

        store.submit_create_vehicle(Vehicle {
            label: "VB-12".to_string(),
            state: VehicleState::Available,
            ..Default::default()
        });

        // The lazy channel rejects the call, so nothing may arrive.
        let result = tokio::time::timeout(Duration::from_millis(300), created.recv()).await;
        assert!(
            result.is_err(),
            "a rejected create must not announce an identifier"
        );
    }

    #[tokio::test]
    async fn submissions_never_surface_errors() {
        let store = mock_store();

        // All of these hit a dead endpoint; the contract is that the
        // caller never sees it.
        store.submit_create_occurrence(Occurrence::default());
        store.submit_update_staff(Staff::default());
        store.submit_delete_team("t-9");
        store.broadcast_alert("o-1", vec!["s-1".to_string()], vec!["v-1".to_string()]);

        // The pipeline must drain back to idle.
        let mut updating = store.updating();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if !*updating.borrow_and_update() {
                    // Give queued intents a chance to start before
                    // concluding the pipeline is idle.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    if !*updating.borrow() {
                        break;
                    }
                }
                let _ = updating.changed().await;
            }
        })
        .await
        .expect("pipeline should drain");
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = mock_store();
        let cloned = store.clone();
        assert!(Arc::ptr_eq(&store.fan, &cloned.fan));
        assert!(Arc::ptr_eq(&store.sync_handle, &cloned.sync_handle));
    }
}
