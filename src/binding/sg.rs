//! SG bindings: a selected id list with a parallel confirmed list.

use std::collections::HashSet;
use std::sync::Arc;

use composer_api::{EntityId, EntityKind, SgSnapshot};

use super::{BindingState, BindingStore};

/// SG binding store.
///
/// Invariant: every confirmed id is also selected, and neither list holds
/// duplicates. Selection order is kept for the list view.
#[derive(Debug, Clone, Default)]
pub struct SgBindings {
    selected: Arc<Vec<EntityId>>,
    confirmed: Arc<Vec<EntityId>>,
}

impl SgBindings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn is_selected(&self, id: &EntityId) -> bool {
        self.selected.contains(id)
    }

    fn is_confirmed(&self, id: &EntityId) -> bool {
        self.confirmed.contains(id)
    }
}

impl BindingStore for SgBindings {
    type Snapshot = SgSnapshot;

    const KIND: EntityKind = EntityKind::Sg;

    fn state(&self, id: &EntityId) -> BindingState {
        if !self.is_selected(id) {
            BindingState::Absent
        } else if self.is_confirmed(id) {
            BindingState::Confirmed
        } else {
            BindingState::Selected
        }
    }

    fn insert(&mut self, id: &EntityId) {
        if !self.is_selected(id) {
            Arc::make_mut(&mut self.selected).push(id.clone());
        }
    }

    fn set_confirmed(&mut self, id: &EntityId, confirmed: bool) -> bool {
        if !self.is_selected(id) {
            return false;
        }
        match (self.is_confirmed(id), confirmed) {
            (false, true) => Arc::make_mut(&mut self.confirmed).push(id.clone()),
            (true, false) => Arc::make_mut(&mut self.confirmed).retain(|c| c != id),
            _ => {}
        }
        true
    }

    fn remove(&mut self, id: &EntityId) -> bool {
        if !self.is_selected(id) {
            return false;
        }
        Arc::make_mut(&mut self.selected).retain(|s| s != id);
        if self.is_confirmed(id) {
            Arc::make_mut(&mut self.confirmed).retain(|c| c != id);
        }
        true
    }

    fn hydrate(&mut self, snapshot: SgSnapshot) {
        let mut seen = HashSet::new();
        let selected: Vec<EntityId> = snapshot
            .sg_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut confirmed = Vec::new();
        let mut seen_confirmed = HashSet::new();
        for id in snapshot.confirmed {
            if !seen.contains(&id) {
                log::warn!("Dropping confirmed SG {} that is not selected", id);
            } else if seen_confirmed.insert(id.clone()) {
                confirmed.push(id);
            }
        }

        self.selected = Arc::new(selected);
        self.confirmed = Arc::new(confirmed);
    }

    fn clear(&mut self) {
        self.selected = Arc::default();
        self.confirmed = Arc::default();
    }

    fn snapshot(&self) -> SgSnapshot {
        SgSnapshot {
            sg_ids: self.selected.to_vec(),
            confirmed: self.confirmed.to_vec(),
        }
    }

    fn entries(&self) -> Vec<(EntityId, BindingState)> {
        self.selected
            .iter()
            .map(|id| (id.clone(), self.state(id)))
            .collect()
    }

    fn len(&self) -> usize {
        self.selected.len()
    }
}
