//! Domain entity types and the snapshot aggregate.
//!
//! These are the in-memory shapes the store distributes to subscribers.
//! Identifiers are opaque strings assigned by the dispatch authority; a
//! blank `internal_id` on a submitted entity means "not yet assigned".
//! No I/O occurs here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A reusable incident-type template (e.g. "structure fire").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub internal_id: String,
    pub name: String,
    /// Display image reference, resolved by the presentation layer.
    pub image: String,
}

/// A live, in-progress incident with assigned vehicles and staff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOccurrence {
    pub internal_id: String,
    /// The [`Occurrence`] template this incident was opened from.
    pub occurrence_id: String,
    /// Milliseconds since the Unix epoch, stamped by the authority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_point: Option<String>,
    /// CODU (emergency medical dispatch) case number, free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codu_number: Option<String>,
    /// Whether a VMER/SIV medical unit was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmer_siv: Option<bool>,
    pub vehicle_ids: Vec<String>,
    pub staff_ids: Vec<String>,
    /// Crew roster: vehicle id to the staff ids riding on it.
    pub vehicle_assignment_map: HashMap<String, Vec<String>>,
}

/// Operational state of a vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VehicleState {
    #[default]
    Available,
    Dispatched,
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub internal_id: String,
    /// Short call-sign shown on cards (e.g. "VUCI-01").
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    /// Crew seats, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    pub image: String,
    pub state: VehicleState,
}

/// Availability state of a staff member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaffState {
    #[default]
    Available,
    Dispatched,
    Inactive,
    SickLeave,
    Unavailable,
}

/// Ordinal rank ladder. `Rank0` is the most senior (commander); `Rank8`
/// the most junior (trainee). `Unknown` sorts after every real rank.
///
/// The `Ord` impl follows declaration order, so `Rank0 < Rank8 < Unknown`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum StaffRank {
    Rank0,
    Rank1,
    Rank2,
    Rank3,
    Rank4,
    Rank5,
    Rank6,
    Rank7,
    Rank8,
    #[default]
    Unknown,
}

/// How much of the dispatch record a staff member may see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaffPermission {
    /// Full access to all information.
    All,
    /// Records relating to the member's shift.
    Shift,
    /// Only the member's own occurrences.
    Own,
    #[default]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub internal_id: String,
    /// Short label shown on cards (typically a badge number).
    pub label: String,
    /// Full name.
    pub name: String,
    pub national_id: String,
    pub rank: StaffRank,
    pub permission: StaffPermission,
    pub image: String,
    pub state: StaffState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamState {
    #[default]
    Available,
    Dispatched,
    Unavailable,
}

/// A standing crew of staff members dispatched as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub internal_id: String,
    pub label: String,
    pub staff_ids: Vec<String>,
    pub state: TeamState,
}

/// Immutable aggregate of every entity collection at one instant.
///
/// The authority is the only producer of snapshots: the store replaces its
/// copy wholesale on every push and never patches individual maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub occurrences: HashMap<String, Occurrence>,
    pub active_occurrences: HashMap<String, ActiveOccurrence>,
    pub vehicles: HashMap<String, Vehicle>,
    pub staff: HashMap<String, Staff>,
    pub teams: HashMap<String, Team>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_serializes_with_camel_case_wire_names() {
        let member = Staff {
            internal_id: "s-1".to_string(),
            label: "117".to_string(),
            name: "Maria Santos".to_string(),
            national_id: "12345678".to_string(),
            rank: StaffRank::Rank5,
            permission: StaffPermission::Shift,
            image: "s-1.png".to_string(),
            state: StaffState::SickLeave,
        };

        let value = serde_json::to_value(&member).expect("serialization should succeed");
        assert_eq!(value["internalId"], "s-1");
        assert_eq!(value["nationalId"], "12345678");
        assert_eq!(value["rank"], "rank5");
        assert_eq!(value["state"], "sickLeave");
        assert_eq!(value["permission"], "shift");
    }

    #[test]
    fn active_occurrence_omits_absent_optional_fields() {
        let incident = ActiveOccurrence {
            internal_id: "a-1".to_string(),
            occurrence_id: "o-1".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&incident).expect("serialization should succeed");
        let obj = value.as_object().expect("should be an object");
        assert!(!obj.contains_key("address"));
        assert!(!obj.contains_key("coduNumber"));
        assert!(obj.contains_key("vehicleIds"));
    }

    #[test]
    fn active_occurrence_roundtrips_assignment_map() {
        let mut incident = ActiveOccurrence {
            internal_id: "a-2".to_string(),
            occurrence_id: "o-1".to_string(),
            vehicle_ids: vec!["v-1".to_string()],
            staff_ids: vec!["s-1".to_string(), "s-2".to_string()],
            ..Default::default()
        };
        incident.vehicle_assignment_map.insert(
            "v-1".to_string(),
            vec!["s-1".to_string(), "s-2".to_string()],
        );

        let json = serde_json::to_string(&incident).expect("serialization should succeed");
        let back: ActiveOccurrence =
            serde_json::from_str(&json).expect("deserialization should succeed");
        assert_eq!(back, incident);
    }

    #[test]
    fn rank_ordinal_puts_commander_first_and_unknown_last() {
        assert!(StaffRank::Rank0 < StaffRank::Rank1);
        assert!(StaffRank::Rank8 < StaffRank::Unknown);

        let mut ranks = vec![StaffRank::Unknown, StaffRank::Rank4, StaffRank::Rank0];
        ranks.sort();
        assert_eq!(
            ranks,
            vec![StaffRank::Rank0, StaffRank::Rank4, StaffRank::Unknown]
        );
    }

    #[test]
    fn default_snapshot_is_empty() {
        let snapshot = StoreSnapshot::default();
        assert!(snapshot.occurrences.is_empty());
        assert!(snapshot.active_occurrences.is_empty());
        assert!(snapshot.vehicles.is_empty());
        assert!(snapshot.staff.is_empty());
        assert!(snapshot.teams.is_empty());
    }

    #[test]
    fn vehicle_state_uses_camel_case_values() {
        assert_eq!(
            serde_json::to_value(VehicleState::Dispatched).unwrap(),
            "dispatched"
        );
        let state: VehicleState = serde_json::from_str("\"unavailable\"").unwrap();
        assert_eq!(state, VehicleState::Unavailable);
    }
}
