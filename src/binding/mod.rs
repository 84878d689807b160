//! Binding selection and confirmation.
//!
//! A binding ties a route to the candidate entities the operator picked.
//! Each entity is in one of three states, and the two store variants (LSA and
//! SG) only differ in how they represent them. The click cycle and the
//! checkbox toggle are written once, on top of a handful of primitives.

mod classification;
mod lsa;
mod sg;

pub use classification::{ClassificationCatalog, ClassificationField};
pub use lsa::{LsaBinding, LsaBindings};
pub use sg::SgBindings;

use composer_api::{EntityId, EntityKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::constants::colors;

/// Binding state of one entity on the current route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingState {
    /// Not bound to the route
    Absent,
    /// Proposed by the operator, not yet vouched for
    Selected,
    /// Selected and confirmed by the operator
    Confirmed,
}

impl BindingState {
    /// Whether the entity is part of the binding at all.
    pub fn is_selected(&self) -> bool {
        !matches!(self, BindingState::Absent)
    }

    /// Whether the operator confirmed the entity.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BindingState::Confirmed)
    }

    /// Map color for this state.
    pub fn color(&self) -> BindingColor {
        match self {
            BindingState::Absent => BindingColor::Red,
            BindingState::Selected => BindingColor::Yellow,
            BindingState::Confirmed => BindingColor::Green,
        }
    }
}

/// Color of a candidate geometry on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingColor {
    Red,
    Yellow,
    Green,
}

impl BindingColor {
    /// RGB triple handed to the renderer.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            BindingColor::Red => colors::UNSELECTED,
            BindingColor::Yellow => colors::SELECTED,
            BindingColor::Green => colors::CONFIRMED,
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            BindingColor::Red => "red",
            BindingColor::Yellow => "yellow",
            BindingColor::Green => "green",
        }
    }
}

/// Errors raised by binding stores.
#[derive(Debug, Error)]
pub enum BindingError {
    /// Server snapshot did not match the expected shape
    #[error("Malformed binding snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Classification value is not part of the fetched enumeration
    #[error("Unknown {field} id {pk}")]
    UnknownClassification {
        /// Which classification was set
        field: ClassificationField,
        /// The rejected primary key
        pk: i64,
    },
}

/// A set of route-scoped entity bindings with selection/confirmation
/// semantics.
///
/// Implementors provide the primitives; the interaction state machines are
/// provided methods. Every operation is synchronous and accepts any id.
pub trait BindingStore {
    /// Wire shape of the full binding set, as fetched and submitted.
    type Snapshot: Serialize + DeserializeOwned;

    /// Entity kind this store binds.
    const KIND: EntityKind;

    /// Current state of an entity.
    fn state(&self, id: &EntityId) -> BindingState;

    /// Add an entity as selected and unconfirmed. No-op if present.
    fn insert(&mut self, id: &EntityId);

    /// Set the confirmation flag of a present entity.
    /// Returns false if the entity is absent.
    fn set_confirmed(&mut self, id: &EntityId, confirmed: bool) -> bool;

    /// Remove an entity regardless of its confirmation.
    /// Returns false if it was absent.
    fn remove(&mut self, id: &EntityId) -> bool;

    /// Replace the contents with a server snapshot.
    fn hydrate(&mut self, snapshot: Self::Snapshot);

    /// Drop all bindings.
    fn clear(&mut self);

    /// Full binding set in the submit wire shape.
    fn snapshot(&self) -> Self::Snapshot;

    /// Bound entities with their state, in list order.
    fn entries(&self) -> Vec<(EntityId, BindingState)>;

    /// Number of bound entities.
    fn len(&self) -> usize;

    /// Check if nothing is bound.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classification value of a bound entity. Only LSA bindings carry
    /// classifications.
    fn classification(&self, _id: &EntityId, _field: ClassificationField) -> Option<i64> {
        None
    }

    /// Map color of an entity.
    fn color(&self, id: &EntityId) -> BindingColor {
        self.state(id).color()
    }

    /// Map click: absent → selected → confirmed → absent.
    fn toggle_by_interaction(&mut self, id: &EntityId) -> BindingState {
        match self.state(id) {
            BindingState::Absent => self.insert(id),
            BindingState::Selected => {
                self.set_confirmed(id, true);
            }
            BindingState::Confirmed => {
                self.remove(id);
            }
        }
        let next = self.state(id);
        log::debug!("{} {} clicked -> {:?}", Self::KIND.name(), id, next);
        next
    }

    /// List checkbox: flips confirmation, never changes membership.
    /// Absent entities are left untouched.
    fn toggle_confirmed_by_checkbox(&mut self, id: &EntityId) -> BindingState {
        match self.state(id) {
            BindingState::Absent => {
                log::debug!(
                    "Checkbox toggle on unbound {} {} ignored",
                    Self::KIND.name(),
                    id
                );
            }
            BindingState::Selected => {
                self.set_confirmed(id, true);
            }
            BindingState::Confirmed => {
                self.set_confirmed(id, false);
            }
        }
        self.state(id)
    }

    /// Hydrate from raw JSON. A malformed snapshot empties the store and is
    /// reported to the caller.
    fn hydrate_json(&mut self, value: serde_json::Value) -> Result<(), BindingError> {
        match serde_json::from_value::<Self::Snapshot>(value) {
            Ok(snapshot) => {
                self.hydrate(snapshot);
                log::info!("Hydrated {} {} bindings", self.len(), Self::KIND.name());
                Ok(())
            }
            Err(e) => {
                self.clear();
                log::warn!("Discarding malformed {} snapshot: {}", Self::KIND.name(), e);
                Err(BindingError::Malformed(e))
            }
        }
    }

    /// Snapshot as raw JSON for submission.
    fn snapshot_json(&self) -> Result<serde_json::Value, BindingError> {
        Ok(serde_json::to_value(self.snapshot())?)
    }
}

#[cfg(test)]
mod tests;
