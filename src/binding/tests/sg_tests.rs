//! Tests for the SG store.

use composer_api::{EntityId, SgSnapshot};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::binding::{BindingState, BindingStore, SgBindings};

fn ids(values: &[i64]) -> Vec<EntityId> {
    values.iter().copied().map(EntityId::from).collect()
}

#[test]
fn test_hydrate_wire_shape() {
    let mut store = SgBindings::new();
    store
        .hydrate_json(json!({"sgIds": [4, 2, 9], "confirmed": [2]}))
        .unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(store.state(&EntityId::from(2)), BindingState::Confirmed);
    assert_eq!(store.state(&EntityId::from(9)), BindingState::Selected);
    assert_eq!(store.state(&EntityId::from(1)), BindingState::Absent);
}

#[test]
fn test_hydrate_repairs_invariant() {
    let mut store = SgBindings::new();
    store.hydrate(SgSnapshot {
        sg_ids: ids(&[1, 2, 2, 3]),
        confirmed: ids(&[2, 2, 7]),
    });

    assert_eq!(
        store.snapshot(),
        SgSnapshot {
            sg_ids: ids(&[1, 2, 3]),
            confirmed: ids(&[2]),
        }
    );
}

#[test]
fn test_entries_keep_selection_order() {
    let mut store = SgBindings::new();
    for n in [5, 1, 3] {
        store.toggle_by_interaction(&EntityId::from(n));
    }
    store.toggle_by_interaction(&EntityId::from(1));

    let entries = store.entries();
    assert_eq!(
        entries,
        vec![
            (EntityId::from(5), BindingState::Selected),
            (EntityId::from(1), BindingState::Confirmed),
            (EntityId::from(3), BindingState::Selected),
        ]
    );
}

#[test]
fn test_remove_confirmed_clears_both_lists() {
    let mut store = SgBindings::new();
    let x = EntityId::from(6);
    store.toggle_by_interaction(&x);
    store.toggle_confirmed_by_checkbox(&x);
    assert!(store.remove(&x));

    assert_eq!(store.snapshot(), SgSnapshot::default());
}

#[test]
fn test_snapshot_serializes_wire_names() {
    let mut store = SgBindings::new();
    store.toggle_by_interaction(&EntityId::from(11));
    store.toggle_by_interaction(&EntityId::from(11));
    store.toggle_by_interaction(&EntityId::from(12));

    assert_eq!(
        store.snapshot_json().unwrap(),
        json!({"sgIds": [11, 12], "confirmed": [11]})
    );
}
