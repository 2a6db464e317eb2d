//! Thin, typed wrapper around the tonic-generated `DispatchStoreClient`.
//!
//! Provides ergonomic async methods that accept and return the crate's
//! model types so that the mutation pipeline and sync loop never import
//! tonic internals directly. Proto/model conversion lives here: entities
//! arriving in a pushed snapshot that cannot be decoded (unknown enum
//! value, missing payload) are skipped with a warning rather than failing
//! the whole snapshot.

use std::fmt;
use std::sync::{Arc, RwLock};

use tonic::transport::Channel;

use crate::auth::BearerInterceptor;
use crate::model::{
    ActiveOccurrence, Occurrence, Staff, StaffPermission, StaffRank, StaffState, StoreSnapshot,
    Team, TeamState, Vehicle, VehicleState,
};
use crate::proto;
use crate::proto::dispatch_store_client::DispatchStoreClient;

/// Plain (unauthenticated) gRPC client type alias.
type PlainClient = DispatchStoreClient<Channel>;

/// Authenticated gRPC client with Bearer token interceptor.
type AuthClient =
    DispatchStoreClient<tonic::service::interceptor::InterceptedService<Channel, BearerInterceptor>>;

/// Internal transport enum supporting both plain and authenticated channels.
enum ClientInner {
    /// Unauthenticated channel.
    Plain(PlainClient),
    /// Channel with a [`BearerInterceptor`] injecting an `Authorization` header.
    Auth(AuthClient),
}

// --- proto/model conversion ---

fn vehicle_state_to_proto(state: VehicleState) -> proto::VehicleState {
    match state {
        VehicleState::Available => proto::VehicleState::Available,
        VehicleState::Dispatched => proto::VehicleState::Dispatched,
        VehicleState::Unavailable => proto::VehicleState::Unavailable,
    }
}

fn vehicle_state_from_proto(raw: i32) -> Option<VehicleState> {
    match proto::VehicleState::try_from(raw).ok()? {
        proto::VehicleState::Unspecified => None,
        proto::VehicleState::Available => Some(VehicleState::Available),
        proto::VehicleState::Dispatched => Some(VehicleState::Dispatched),
        proto::VehicleState::Unavailable => Some(VehicleState::Unavailable),
    }
}

fn staff_state_to_proto(state: StaffState) -> proto::StaffState {
    match state {
        StaffState::Available => proto::StaffState::Available,
        StaffState::Dispatched => proto::StaffState::Dispatched,
        StaffState::Inactive => proto::StaffState::Inactive,
        StaffState::SickLeave => proto::StaffState::SickLeave,
        StaffState::Unavailable => proto::StaffState::Unavailable,
    }
}

fn staff_state_from_proto(raw: i32) -> Option<StaffState> {
    match proto::StaffState::try_from(raw).ok()? {
        proto::StaffState::Unspecified => None,
        proto::StaffState::Available => Some(StaffState::Available),
        proto::StaffState::Dispatched => Some(StaffState::Dispatched),
        proto::StaffState::Inactive => Some(StaffState::Inactive),
        proto::StaffState::SickLeave => Some(StaffState::SickLeave),
        proto::StaffState::Unavailable => Some(StaffState::Unavailable),
    }
}

fn staff_rank_to_proto(rank: StaffRank) -> proto::StaffRank {
    match rank {
        StaffRank::Unknown => proto::StaffRank::Unknown,
        StaffRank::Rank0 => proto::StaffRank::Rank0,
        StaffRank::Rank1 => proto::StaffRank::Rank1,
        StaffRank::Rank2 => proto::StaffRank::Rank2,
        StaffRank::Rank3 => proto::StaffRank::Rank3,
        StaffRank::Rank4 => proto::StaffRank::Rank4,
        StaffRank::Rank5 => proto::StaffRank::Rank5,
        StaffRank::Rank6 => proto::StaffRank::Rank6,
        StaffRank::Rank7 => proto::StaffRank::Rank7,
        StaffRank::Rank8 => proto::StaffRank::Rank8,
    }
}

fn staff_rank_from_proto(raw: i32) -> Option<StaffRank> {
    // Unlike the state enums, rank 0 on the wire is a real value: the
    // original data model predates the sync protocol and uses "unknown"
    // as a legitimate rank for unranked members.
    match proto::StaffRank::try_from(raw).ok()? {
        proto::StaffRank::Unknown => Some(StaffRank::Unknown),
        proto::StaffRank::Rank0 => Some(StaffRank::Rank0),
        proto::StaffRank::Rank1 => Some(StaffRank::Rank1),
        proto::StaffRank::Rank2 => Some(StaffRank::Rank2),
        proto::StaffRank::Rank3 => Some(StaffRank::Rank3),
        proto::StaffRank::Rank4 => Some(StaffRank::Rank4),
        proto::StaffRank::Rank5 => Some(StaffRank::Rank5),
        proto::StaffRank::Rank6 => Some(StaffRank::Rank6),
        proto::StaffRank::Rank7 => Some(StaffRank::Rank7),
        proto::StaffRank::Rank8 => Some(StaffRank::Rank8),
    }
}

fn staff_permission_to_proto(permission: StaffPermission) -> proto::StaffPermission {
    match permission {
        StaffPermission::All => proto::StaffPermission::All,
        StaffPermission::Shift => proto::StaffPermission::Shift,
        StaffPermission::Own => proto::StaffPermission::Own,
        StaffPermission::None => proto::StaffPermission::None,
    }
}

fn staff_permission_from_proto(raw: i32) -> Option<StaffPermission> {
    match proto::StaffPermission::try_from(raw).ok()? {
        proto::StaffPermission::Unspecified => None,
        proto::StaffPermission::All => Some(StaffPermission::All),
        proto::StaffPermission::Shift => Some(StaffPermission::Shift),
        proto::StaffPermission::Own => Some(StaffPermission::Own),
        proto::StaffPermission::None => Some(StaffPermission::None),
    }
}

fn team_state_to_proto(state: TeamState) -> proto::TeamState {
    match state {
        TeamState::Available => proto::TeamState::Available,
        TeamState::Dispatched => proto::TeamState::Dispatched,
        TeamState::Unavailable => proto::TeamState::Unavailable,
    }
}

fn team_state_from_proto(raw: i32) -> Option<TeamState> {
    match proto::TeamState::try_from(raw).ok()? {
        proto::TeamState::Unspecified => None,
        proto::TeamState::Available => Some(TeamState::Available),
        proto::TeamState::Dispatched => Some(TeamState::Dispatched),
        proto::TeamState::Unavailable => Some(TeamState::Unavailable),
    }
}

/// Convert an [`Occurrence`] to its wire representation.
pub fn occurrence_to_proto(occurrence: &Occurrence) -> proto::Occurrence {
    proto::Occurrence {
        internal_id: occurrence.internal_id.clone(),
        name: occurrence.name.clone(),
        image: occurrence.image.clone(),
    }
}

/// Decode a wire [`proto::Occurrence`].
pub fn occurrence_from_proto(p: proto::Occurrence) -> Occurrence {
    Occurrence {
        internal_id: p.internal_id,
        name: p.name,
        image: p.image,
    }
}

/// Convert an [`ActiveOccurrence`] to its wire representation.
pub fn active_occurrence_to_proto(incident: &ActiveOccurrence) -> proto::ActiveOccurrence {
    proto::ActiveOccurrence {
        internal_id: incident.internal_id.clone(),
        occurrence_id: incident.occurrence_id.clone(),
        creation_time: incident.creation_time,
        address: incident.address.clone(),
        description: incident.description.clone(),
        reference_point: incident.reference_point.clone(),
        codu_number: incident.codu_number.clone(),
        vmer_siv: incident.vmer_siv,
        vehicle_ids: incident.vehicle_ids.clone(),
        staff_ids: incident.staff_ids.clone(),
        vehicle_assignment_map: incident
            .vehicle_assignment_map
            .iter()
            .map(|(vehicle_id, staff_ids)| {
                (
                    vehicle_id.clone(),
                    proto::VehicleAssignment {
                        staff_ids: staff_ids.clone(),
                    },
                )
            })
            .collect(),
    }
}

/// Decode a wire [`proto::ActiveOccurrence`].
pub fn active_occurrence_from_proto(p: proto::ActiveOccurrence) -> ActiveOccurrence {
    ActiveOccurrence {
        internal_id: p.internal_id,
        occurrence_id: p.occurrence_id,
        creation_time: p.creation_time,
        address: p.address,
        description: p.description,
        reference_point: p.reference_point,
        codu_number: p.codu_number,
        vmer_siv: p.vmer_siv,
        vehicle_ids: p.vehicle_ids,
        staff_ids: p.staff_ids,
        vehicle_assignment_map: p
            .vehicle_assignment_map
            .into_iter()
            .map(|(vehicle_id, assignment)| (vehicle_id, assignment.staff_ids))
            .collect(),
    }
}

/// Convert a [`Vehicle`] to its wire representation.
pub fn vehicle_to_proto(vehicle: &Vehicle) -> proto::Vehicle {
    proto::Vehicle {
        internal_id: vehicle.internal_id.clone(),
        label: vehicle.label.clone(),
        license_plate: vehicle.license_plate.clone(),
        capacity: vehicle.capacity,
        image: vehicle.image.clone(),
        state: vehicle_state_to_proto(vehicle.state) as i32,
    }
}

/// Decode a wire [`proto::Vehicle`]. Returns `None` if the state enum
/// carries an unknown or unspecified value.
pub fn vehicle_from_proto(p: proto::Vehicle) -> Option<Vehicle> {
    Some(Vehicle {
        state: vehicle_state_from_proto(p.state)?,
        internal_id: p.internal_id,
        label: p.label,
        license_plate: p.license_plate,
        capacity: p.capacity,
        image: p.image,
    })
}

/// Convert a [`Staff`] to its wire representation.
pub fn staff_to_proto(member: &Staff) -> proto::Staff {
    proto::Staff {
        internal_id: member.internal_id.clone(),
        label: member.label.clone(),
        name: member.name.clone(),
        national_id: member.national_id.clone(),
        rank: staff_rank_to_proto(member.rank) as i32,
        permission: staff_permission_to_proto(member.permission) as i32,
        image: member.image.clone(),
        state: staff_state_to_proto(member.state) as i32,
    }
}

/// Decode a wire [`proto::Staff`]. Returns `None` if any enum field
/// carries an unknown or unspecified value.
pub fn staff_from_proto(p: proto::Staff) -> Option<Staff> {
    Some(Staff {
        rank: staff_rank_from_proto(p.rank)?,
        permission: staff_permission_from_proto(p.permission)?,
        state: staff_state_from_proto(p.state)?,
        internal_id: p.internal_id,
        label: p.label,
        name: p.name,
        national_id: p.national_id,
        image: p.image,
    })
}

/// Convert a [`Team`] to its wire representation.
pub fn team_to_proto(team: &Team) -> proto::Team {
    proto::Team {
        internal_id: team.internal_id.clone(),
        label: team.label.clone(),
        staff_ids: team.staff_ids.clone(),
        state: team_state_to_proto(team.state) as i32,
    }
}

/// Decode a wire [`proto::Team`]. Returns `None` if the state enum
/// carries an unknown or unspecified value.
pub fn team_from_proto(p: proto::Team) -> Option<Team> {
    Some(Team {
        state: team_state_from_proto(p.state)?,
        internal_id: p.internal_id,
        label: p.label,
        staff_ids: p.staff_ids,
    })
}

/// Convert a [`StoreSnapshot`] to its wire representation.
pub fn snapshot_to_proto(snapshot: &StoreSnapshot) -> proto::StoreSnapshot {
    proto::StoreSnapshot {
        occurrences: snapshot
            .occurrences
            .iter()
            .map(|(id, o)| (id.clone(), occurrence_to_proto(o)))
            .collect(),
        active_occurrences: snapshot
            .active_occurrences
            .iter()
            .map(|(id, a)| (id.clone(), active_occurrence_to_proto(a)))
            .collect(),
        vehicles: snapshot
            .vehicles
            .iter()
            .map(|(id, v)| (id.clone(), vehicle_to_proto(v)))
            .collect(),
        staff: snapshot
            .staff
            .iter()
            .map(|(id, s)| (id.clone(), staff_to_proto(s)))
            .collect(),
        teams: snapshot
            .teams
            .iter()
            .map(|(id, t)| (id.clone(), team_to_proto(t)))
            .collect(),
    }
}

/// Decode a wire [`proto::StoreSnapshot`] into the in-memory model.
///
/// Entities that fail to decode are dropped with a `tracing::warn!` so a
/// single malformed record cannot poison the whole push. This is the
/// guard-don't-throw policy: readers of a map simply never see the entry.
pub fn snapshot_from_proto(p: proto::StoreSnapshot) -> StoreSnapshot {
    let mut snapshot = StoreSnapshot {
        occurrences: p
            .occurrences
            .into_iter()
            .map(|(id, o)| (id, occurrence_from_proto(o)))
            .collect(),
        active_occurrences: p
            .active_occurrences
            .into_iter()
            .map(|(id, a)| (id, active_occurrence_from_proto(a)))
            .collect(),
        ..StoreSnapshot::default()
    };

    for (id, vehicle) in p.vehicles {
        match vehicle_from_proto(vehicle) {
            Some(vehicle) => {
                snapshot.vehicles.insert(id, vehicle);
            }
            None => tracing::warn!(vehicle_id = %id, "skipping vehicle with unknown state"),
        }
    }
    for (id, member) in p.staff {
        match staff_from_proto(member) {
            Some(member) => {
                snapshot.staff.insert(id, member);
            }
            None => tracing::warn!(staff_id = %id, "skipping staff with unknown enum field"),
        }
    }
    for (id, team) in p.teams {
        match team_from_proto(team) {
            Some(team) => {
                snapshot.teams.insert(id, team);
            }
            None => tracing::warn!(team_id = %id, "skipping team with unknown state"),
        }
    }

    snapshot
}

/// Typed gRPC client for the dispatch authority.
///
/// Wraps the tonic-generated [`DispatchStoreClient`] and exposes ergonomic
/// async methods that accept model types. Supports both plain and
/// authenticated (Bearer token) transports via an internal enum. Clone is
/// cheap because the inner transport is wrapped in an [`Arc`].
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use firefight_sync::DispatchClient;
///
/// let client = DispatchClient::connect("http://127.0.0.1:4770").await?;
/// let snapshot = client.get_store().await?;
/// println!("{} vehicles", snapshot.vehicles.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DispatchClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for DispatchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match *self.inner {
            ClientInner::Plain(_) => "Plain",
            ClientInner::Auth(_) => "Auth",
        };
        f.debug_struct("DispatchClient")
            .field("transport", &variant)
            .finish()
    }
}

/// Expands to one unary call: clones the inner tonic client (cheap -- it
/// wraps an Arc'd channel), dispatches on the transport variant, and
/// unwraps the response.
macro_rules! unary {
    ($self:ident, $method:ident, $request:expr) => {{
        let request = $request;
        match $self.inner.as_ref() {
            ClientInner::Plain(c) => c.clone().$method(request).await?,
            ClientInner::Auth(c) => c.clone().$method(request).await?,
        }
    }};
}

impl DispatchClient {
    /// Connect to the dispatch authority at the given endpoint.
    ///
    /// Creates an unauthenticated (plain) connection. For authenticated
    /// connections, use [`connect_with_token`](Self::connect_with_token).
    ///
    /// # Errors
    ///
    /// Returns [`tonic::transport::Error`] if the channel cannot be
    /// established.
    pub async fn connect(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        let client = DispatchStoreClient::connect(endpoint.to_string()).await?;
        Ok(Self {
            inner: Arc::new(ClientInner::Plain(client)),
        })
    }

    /// Connect with Bearer token authentication.
    ///
    /// The token is read from the shared [`RwLock`] on every outgoing RPC;
    /// writing a new value into the lock rotates the credential without
    /// reconnecting. An empty token string behaves as unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::transport::Error`] if the channel cannot be
    /// established.
    pub async fn connect_with_token(
        endpoint: &str,
        token: Arc<RwLock<String>>,
    ) -> Result<Self, tonic::transport::Error> {
        let channel = tonic::transport::Endpoint::from_shared(endpoint.to_string())?
            .connect()
            .await?;
        let interceptor = BearerInterceptor { token };
        let client = DispatchStoreClient::with_interceptor(channel, interceptor);
        Ok(Self {
            inner: Arc::new(ClientInner::Auth(client)),
        })
    }

    /// Construct a `DispatchClient` from a pre-built [`DispatchStoreClient`].
    ///
    /// Used in tests to create clients with lazy or mock channels.
    #[cfg(test)]
    pub(crate) fn from_inner(inner: DispatchStoreClient<Channel>) -> Self {
        Self {
            inner: Arc::new(ClientInner::Plain(inner)),
        }
    }

    /// Check whether this client uses an authenticated transport.
    #[cfg(test)]
    pub(crate) fn is_auth(&self) -> bool {
        matches!(*self.inner, ClientInner::Auth(_))
    }

    /// Fetch the full current snapshot from the authority.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn get_store(&self) -> Result<StoreSnapshot, tonic::Status> {
        let response = unary!(self, get_store, proto::Empty {});
        Ok(snapshot_from_proto(response.into_inner()))
    }

    /// Submit a new occurrence template. The authority assigns and returns
    /// the identifier; the submitted `internal_id` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn create_occurrence(&self, occurrence: &Occurrence) -> Result<String, tonic::Status> {
        let request = proto::CreateOccurrenceRequest {
            occurrence: Some(occurrence_to_proto(occurrence)),
        };
        let response = unary!(self, create_occurrence, request);
        Ok(response.into_inner().assigned_id)
    }

    /// Replace an existing occurrence template.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn update_occurrence(&self, occurrence: &Occurrence) -> Result<(), tonic::Status> {
        let request = proto::UpdateOccurrenceRequest {
            occurrence: Some(occurrence_to_proto(occurrence)),
        };
        unary!(self, update_occurrence, request);
        Ok(())
    }

    /// Delete an occurrence template by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn delete_occurrence(&self, occurrence_id: &str) -> Result<(), tonic::Status> {
        let request = proto::DeleteOccurrenceRequest {
            occurrence_id: occurrence_id.to_string(),
        };
        unary!(self, delete_occurrence, request);
        Ok(())
    }

    /// Open a new active occurrence. The authority assigns and returns the
    /// identifier and stamps the creation time.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn create_active_occurrence(
        &self,
        incident: &ActiveOccurrence,
    ) -> Result<String, tonic::Status> {
        let request = proto::CreateActiveOccurrenceRequest {
            occurrence: Some(active_occurrence_to_proto(incident)),
        };
        let response = unary!(self, create_active_occurrence, request);
        Ok(response.into_inner().assigned_id)
    }

    /// Replace an existing active occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn update_active_occurrence(
        &self,
        incident: &ActiveOccurrence,
    ) -> Result<(), tonic::Status> {
        let request = proto::UpdateActiveOccurrenceRequest {
            occurrence: Some(active_occurrence_to_proto(incident)),
        };
        unary!(self, update_active_occurrence, request);
        Ok(())
    }

    /// Close (delete) an active occurrence by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn delete_active_occurrence(&self, occurrence_id: &str) -> Result<(), tonic::Status> {
        let request = proto::DeleteActiveOccurrenceRequest {
            occurrence_id: occurrence_id.to_string(),
        };
        unary!(self, delete_active_occurrence, request);
        Ok(())
    }

    /// Register a new vehicle. The authority assigns and returns the
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn create_vehicle(&self, vehicle: &Vehicle) -> Result<String, tonic::Status> {
        let request = proto::CreateVehicleRequest {
            vehicle: Some(vehicle_to_proto(vehicle)),
        };
        let response = unary!(self, create_vehicle, request);
        Ok(response.into_inner().assigned_id)
    }

    /// Replace an existing vehicle record.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn update_vehicle(&self, vehicle: &Vehicle) -> Result<(), tonic::Status> {
        let request = proto::UpdateVehicleRequest {
            vehicle: Some(vehicle_to_proto(vehicle)),
        };
        unary!(self, update_vehicle, request);
        Ok(())
    }

    /// Delete a vehicle by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn delete_vehicle(&self, vehicle_id: &str) -> Result<(), tonic::Status> {
        let request = proto::DeleteVehicleRequest {
            vehicle_id: vehicle_id.to_string(),
        };
        unary!(self, delete_vehicle, request);
        Ok(())
    }

    /// Register a new staff member. The authority assigns and returns the
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn create_staff(&self, member: &Staff) -> Result<String, tonic::Status> {
        let request = proto::CreateStaffRequest {
            staff: Some(staff_to_proto(member)),
        };
        let response = unary!(self, create_staff, request);
        Ok(response.into_inner().assigned_id)
    }

    /// Replace an existing staff record.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn update_staff(&self, member: &Staff) -> Result<(), tonic::Status> {
        let request = proto::UpdateStaffRequest {
            staff: Some(staff_to_proto(member)),
        };
        unary!(self, update_staff, request);
        Ok(())
    }

    /// Delete a staff member by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn delete_staff(&self, staff_id: &str) -> Result<(), tonic::Status> {
        let request = proto::DeleteStaffRequest {
            staff_id: staff_id.to_string(),
        };
        unary!(self, delete_staff, request);
        Ok(())
    }

    /// Register a new team. The authority assigns and returns the
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn create_team(&self, team: &Team) -> Result<String, tonic::Status> {
        let request = proto::CreateTeamRequest {
            team: Some(team_to_proto(team)),
        };
        let response = unary!(self, create_team, request);
        Ok(response.into_inner().assigned_id)
    }

    /// Replace an existing team record.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn update_team(&self, team: &Team) -> Result<(), tonic::Status> {
        let request = proto::UpdateTeamRequest {
            team: Some(team_to_proto(team)),
        };
        unary!(self, update_team, request);
        Ok(())
    }

    /// Delete a team by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors.
    pub async fn delete_team(&self, team_id: &str) -> Result<(), tonic::Status> {
        let request = proto::DeleteTeamRequest {
            team_id: team_id.to_string(),
        };
        unary!(self, delete_team, request);
        Ok(())
    }

    /// Subscribe to authoritative snapshot pushes.
    ///
    /// Returns a streaming response yielding complete
    /// [`proto::StoreSnapshot`] messages. The stream remains open until the
    /// authority closes it or the client drops the stream.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] if the initial RPC handshake fails.
    pub async fn subscribe_updates(
        &self,
    ) -> Result<tonic::Streaming<proto::StoreSnapshot>, tonic::Status> {
        let response = unary!(self, subscribe_updates, proto::Empty {});
        Ok(response.into_inner())
    }

    /// Ask the authority to broadcast a dispatch alert.
    ///
    /// # Errors
    ///
    /// Returns [`tonic::Status`] on transport or server-side errors. Callers
    /// going through the store's fire-and-forget wrapper get the
    /// discard-on-failure behaviour instead.
    pub async fn broadcast_alert(
        &self,
        occurrence_id: &str,
        staff_ids: &[String],
        vehicle_ids: &[String],
    ) -> Result<(), tonic::Status> {
        let request = proto::AlertRequest {
            occurrence_id: occurrence_id.to_string(),
            staff_ids: staff_ids.to_vec(),
            vehicle_ids: vehicle_ids.to_vec(),
        };
        unary!(self, broadcast_alert, request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vehicle() -> Vehicle {
        Vehicle {
            internal_id: "v-1".to_string(),
            label: "VUCI-01".to_string(),
            license_plate: Some("AA-01-BB".to_string()),
            capacity: Some(6),
            image: "vuci.png".to_string(),
            state: VehicleState::Dispatched,
        }
    }

    fn sample_staff() -> Staff {
        Staff {
            internal_id: "s-1".to_string(),
            label: "117".to_string(),
            name: "Maria Santos".to_string(),
            national_id: "12345678".to_string(),
            rank: StaffRank::Rank3,
            permission: StaffPermission::All,
            image: "s.png".to_string(),
            state: StaffState::Available,
        }
    }

    // --- conversion tests ---

    #[test]
    fn vehicle_roundtrips_through_proto() {
        let vehicle = sample_vehicle();
        let decoded =
            vehicle_from_proto(vehicle_to_proto(&vehicle)).expect("decode should succeed");
        assert_eq!(decoded, vehicle);
    }

    #[test]
    fn staff_roundtrips_through_proto() {
        let member = sample_staff();
        let decoded = staff_from_proto(staff_to_proto(&member)).expect("decode should succeed");
        assert_eq!(decoded, member);
    }

    #[test]
    fn unknown_rank_roundtrips_as_wire_zero() {
        // Rank "unknown" is proto value 0 but still a legitimate value,
        // unlike the state enums where 0 means unspecified.
        let member = Staff {
            rank: StaffRank::Unknown,
            ..sample_staff()
        };
        let proto = staff_to_proto(&member);
        assert_eq!(proto.rank, 0);
        let decoded = staff_from_proto(proto).expect("decode should succeed");
        assert_eq!(decoded.rank, StaffRank::Unknown);
    }

    #[test]
    fn unspecified_vehicle_state_fails_decode() {
        let mut proto = vehicle_to_proto(&sample_vehicle());
        proto.state = 0;
        assert!(vehicle_from_proto(proto).is_none());
    }

    #[test]
    fn out_of_range_state_fails_decode() {
        let mut proto = vehicle_to_proto(&sample_vehicle());
        proto.state = 99;
        assert!(vehicle_from_proto(proto).is_none());
    }

    #[test]
    fn active_occurrence_roundtrips_assignment_map() {
        let mut incident = ActiveOccurrence {
            internal_id: "a-1".to_string(),
            occurrence_id: "o-1".to_string(),
            creation_time: Some(1_700_000_000_000),
            address: Some("Rua do Quartel 12".to_string()),
            vmer_siv: Some(true),
            vehicle_ids: vec!["v-1".to_string()],
            staff_ids: vec!["s-1".to_string()],
            ..Default::default()
        };
        incident
            .vehicle_assignment_map
            .insert("v-1".to_string(), vec!["s-1".to_string()]);

        let decoded = active_occurrence_from_proto(active_occurrence_to_proto(&incident));
        assert_eq!(decoded, incident);
    }

    #[test]
    fn snapshot_decode_drops_only_malformed_entries() {
        let mut proto_snapshot = proto::StoreSnapshot::default();
        proto_snapshot
            .vehicles
            .insert("v-ok".to_string(), vehicle_to_proto(&sample_vehicle()));
        let mut bad = vehicle_to_proto(&sample_vehicle());
        bad.state = 42;
        proto_snapshot.vehicles.insert("v-bad".to_string(), bad);
        proto_snapshot
            .staff
            .insert("s-1".to_string(), staff_to_proto(&sample_staff()));

        let snapshot = snapshot_from_proto(proto_snapshot);
        assert!(snapshot.vehicles.contains_key("v-ok"));
        assert!(
            !snapshot.vehicles.contains_key("v-bad"),
            "malformed vehicle should be dropped, not decoded"
        );
        assert!(snapshot.staff.contains_key("s-1"));
    }

    #[test]
    fn snapshot_roundtrips_through_proto() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.occurrences.insert(
            "o-1".to_string(),
            Occurrence {
                internal_id: "o-1".to_string(),
                name: "Incêndio urbano".to_string(),
                image: "fire.png".to_string(),
            },
        );
        snapshot
            .vehicles
            .insert("v-1".to_string(), sample_vehicle());
        snapshot.staff.insert("s-1".to_string(), sample_staff());
        snapshot.teams.insert(
            "t-1".to_string(),
            Team {
                internal_id: "t-1".to_string(),
                label: "1".to_string(),
                staff_ids: vec!["s-1".to_string()],
                state: TeamState::Available,
            },
        );

        let decoded = snapshot_from_proto(snapshot_to_proto(&snapshot));
        assert_eq!(decoded, snapshot);
    }

    // --- transport variant tests ---

    /// Build a mock `DispatchClient` with a lazy (non-connecting) channel.
    fn mock_plain_client() -> DispatchClient {
        let channel = tonic::transport::Endpoint::from_static("http://[::1]:1").connect_lazy();
        DispatchClient::from_inner(DispatchStoreClient::new(channel))
    }

    fn mock_auth_client(token: &str) -> DispatchClient {
        let channel = tonic::transport::Endpoint::from_static("http://[::1]:1").connect_lazy();
        let interceptor = BearerInterceptor {
            token: Arc::new(std::sync::RwLock::new(token.to_string())),
        };
        let inner = DispatchStoreClient::with_interceptor(channel, interceptor);
        DispatchClient {
            inner: Arc::new(ClientInner::Auth(inner)),
        }
    }

    #[tokio::test]
    async fn from_inner_creates_plain_variant() {
        assert!(!mock_plain_client().is_auth());
    }

    #[tokio::test]
    async fn auth_transport_is_reported_in_debug() {
        let debug_str = format!("{:?}", mock_plain_client());
        assert!(debug_str.contains("Plain"));

        let debug_str = format!("{:?}", mock_auth_client("tok"));
        assert!(debug_str.contains("Auth"));
    }

    #[tokio::test]
    async fn clone_shares_the_same_transport() {
        let client = mock_plain_client();
        let cloned = client.clone();
        assert!(Arc::ptr_eq(&client.inner, &cloned.inner));
    }
}
