//! Snapshot distribution and derived per-collection views.
//!
//! One master watch channel carries the whole [`StoreSnapshot`]; five
//! per-kind channels carry the individual collections. Publishing runs a
//! structural comparison per kind, so a subscriber of (say) the staff view
//! is only woken when the staff map actually changed, not on every push
//! triggered by unrelated kinds.

use std::collections::HashMap;

use tokio::sync::watch;

use crate::model::{ActiveOccurrence, Occurrence, Staff, StoreSnapshot, Team, Vehicle};

/// Fans an incoming snapshot out to the master channel and the per-kind
/// derived channels.
///
/// The fan is the single writer of all six channels; everything else holds
/// receivers. Replacement is wholesale: entities absent from the incoming
/// snapshot disappear from the views.
pub(crate) struct SnapshotFan {
    snapshot_tx: watch::Sender<StoreSnapshot>,
    occurrences_tx: watch::Sender<HashMap<String, Occurrence>>,
    active_occurrences_tx: watch::Sender<HashMap<String, ActiveOccurrence>>,
    vehicles_tx: watch::Sender<HashMap<String, Vehicle>>,
    staff_tx: watch::Sender<HashMap<String, Staff>>,
    teams_tx: watch::Sender<HashMap<String, Team>>,
}

impl SnapshotFan {
    /// Create a fan whose channels all start empty.
    pub(crate) fn new() -> Self {
        Self {
            snapshot_tx: watch::channel(StoreSnapshot::default()).0,
            occurrences_tx: watch::channel(HashMap::new()).0,
            active_occurrences_tx: watch::channel(HashMap::new()).0,
            vehicles_tx: watch::channel(HashMap::new()).0,
            staff_tx: watch::channel(HashMap::new()).0,
            teams_tx: watch::channel(HashMap::new()).0,
        }
    }

    /// Replace the current snapshot and update every derived view.
    ///
    /// Each channel is only signalled when its value structurally changed,
    /// which is what keeps redundant pushes from waking subscribers.
    pub(crate) fn publish(&self, snapshot: StoreSnapshot) {
        update_if_changed(&self.occurrences_tx, &snapshot.occurrences);
        update_if_changed(&self.active_occurrences_tx, &snapshot.active_occurrences);
        update_if_changed(&self.vehicles_tx, &snapshot.vehicles);
        update_if_changed(&self.staff_tx, &snapshot.staff);
        update_if_changed(&self.teams_tx, &snapshot.teams);
        update_if_changed(&self.snapshot_tx, &snapshot);
    }

    pub(crate) fn snapshot(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub(crate) fn occurrences(&self) -> watch::Receiver<HashMap<String, Occurrence>> {
        self.occurrences_tx.subscribe()
    }

    pub(crate) fn active_occurrences(&self) -> watch::Receiver<HashMap<String, ActiveOccurrence>> {
        self.active_occurrences_tx.subscribe()
    }

    pub(crate) fn vehicles(&self) -> watch::Receiver<HashMap<String, Vehicle>> {
        self.vehicles_tx.subscribe()
    }

    pub(crate) fn staff(&self) -> watch::Receiver<HashMap<String, Staff>> {
        self.staff_tx.subscribe()
    }

    pub(crate) fn teams(&self) -> watch::Receiver<HashMap<String, Team>> {
        self.teams_tx.subscribe()
    }
}

/// Replace the channel value only when it structurally differs from `next`.
fn update_if_changed<T: Clone + PartialEq>(tx: &watch::Sender<T>, next: &T) {
    tx.send_if_modified(|current| {
        if current == next {
            false
        } else {
            *current = next.clone();
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StaffRank, VehicleState};

    fn vehicle(id: &str, label: &str) -> Vehicle {
        Vehicle {
            internal_id: id.to_string(),
            label: label.to_string(),
            state: VehicleState::Available,
            ..Default::default()
        }
    }

    fn staff(id: &str, name: &str) -> Staff {
        Staff {
            internal_id: id.to_string(),
            name: name.to_string(),
            rank: StaffRank::Rank6,
            ..Default::default()
        }
    }

    fn populated_snapshot() -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::default();
        snapshot.occurrences.insert(
            "o-1".to_string(),
            Occurrence {
                internal_id: "o-1".to_string(),
                name: "Incêndio florestal".to_string(),
                image: "forest.png".to_string(),
            },
        );
        snapshot.active_occurrences.insert(
            "a-1".to_string(),
            ActiveOccurrence {
                internal_id: "a-1".to_string(),
                occurrence_id: "o-1".to_string(),
                vehicle_ids: vec!["v-1".to_string()],
                ..Default::default()
            },
        );
        snapshot
            .vehicles
            .insert("v-1".to_string(), vehicle("v-1", "VFCI-02"));
        snapshot
            .staff
            .insert("s-1".to_string(), staff("s-1", "João Costa"));
        snapshot.teams.insert(
            "t-1".to_string(),
            Team {
                internal_id: "t-1".to_string(),
                label: "2".to_string(),
                staff_ids: vec!["s-1".to_string()],
                ..Default::default()
            },
        );
        snapshot
    }

    #[test]
    fn publish_projects_every_kind_exactly() {
        let fan = SnapshotFan::new();
        let snapshot = populated_snapshot();
        fan.publish(snapshot.clone());

        assert_eq!(*fan.snapshot().borrow(), snapshot);
        assert_eq!(*fan.occurrences().borrow(), snapshot.occurrences);
        assert_eq!(
            *fan.active_occurrences().borrow(),
            snapshot.active_occurrences
        );
        assert_eq!(*fan.vehicles().borrow(), snapshot.vehicles);
        assert_eq!(*fan.staff().borrow(), snapshot.staff);
        assert_eq!(*fan.teams().borrow(), snapshot.teams);
    }

    #[test]
    fn identical_push_does_not_wake_subscribers() {
        let fan = SnapshotFan::new();
        fan.publish(populated_snapshot());

        // New receivers consider the current value seen.
        let staff_rx = fan.staff();
        let snapshot_rx = fan.snapshot();

        fan.publish(populated_snapshot());
        assert!(
            !staff_rx.has_changed().unwrap(),
            "structurally identical push must not re-emit"
        );
        assert!(!snapshot_rx.has_changed().unwrap());
    }

    #[test]
    fn unrelated_kind_change_does_not_wake_other_views() {
        let fan = SnapshotFan::new();
        fan.publish(populated_snapshot());

        let staff_rx = fan.staff();
        let vehicles_rx = fan.vehicles();

        let mut next = populated_snapshot();
        next.vehicles
            .insert("v-2".to_string(), vehicle("v-2", "ABSC-01"));
        fan.publish(next);

        assert!(
            vehicles_rx.has_changed().unwrap(),
            "the changed kind must emit"
        );
        assert!(
            !staff_rx.has_changed().unwrap(),
            "an untouched kind must stay quiet"
        );
    }

    #[test]
    fn replacement_is_wholesale() {
        let fan = SnapshotFan::new();
        fan.publish(populated_snapshot());
        assert_eq!(fan.vehicles().borrow().len(), 1);

        // An empty authoritative snapshot empties every view; nothing
        // lingers from the previous state.
        fan.publish(StoreSnapshot::default());
        assert!(fan.vehicles().borrow().is_empty());
        assert!(fan.staff().borrow().is_empty());
        assert!(fan.teams().borrow().is_empty());
        assert!(fan.occurrences().borrow().is_empty());
        assert!(fan.active_occurrences().borrow().is_empty());
    }
}
