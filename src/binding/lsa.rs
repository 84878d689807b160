//! LSA bindings: an id-keyed map of per-binding records.

use std::collections::BTreeMap;
use std::sync::Arc;

use composer_api::{EntityId, EntityKind, LsaBindingDto, LsaSnapshot};

use super::{BindingError, BindingState, BindingStore, ClassificationCatalog, ClassificationField};

/// One LSA bound to the route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LsaBinding {
    /// Operator vouched for the binding
    pub confirmed: bool,
    /// Constellation classification (enumeration pk)
    pub corresponding_constellation: Option<i64>,
    /// Route error classification (enumeration pk)
    pub corresponding_route_error: Option<i64>,
}

impl LsaBinding {
    /// Value of a classification field.
    pub fn classification(&self, field: ClassificationField) -> Option<i64> {
        match field {
            ClassificationField::Constellation => self.corresponding_constellation,
            ClassificationField::RouteError => self.corresponding_route_error,
        }
    }

    fn state(&self) -> BindingState {
        if self.confirmed {
            BindingState::Confirmed
        } else {
            BindingState::Selected
        }
    }
}

impl From<LsaBindingDto> for LsaBinding {
    fn from(dto: LsaBindingDto) -> Self {
        Self {
            confirmed: dto.confirmed,
            corresponding_constellation: dto.corresponding_constellation,
            corresponding_route_error: dto.corresponding_route_error,
        }
    }
}

impl From<&LsaBinding> for LsaBindingDto {
    fn from(binding: &LsaBinding) -> Self {
        Self {
            confirmed: binding.confirmed,
            corresponding_constellation: binding.corresponding_constellation,
            corresponding_route_error: binding.corresponding_route_error,
        }
    }
}

/// LSA binding store.
///
/// Clones share structure. Each mutation copies the outer map only when it
/// is shared and replaces the touched record, so a clone handed out earlier
/// never changes.
#[derive(Debug, Clone, Default)]
pub struct LsaBindings {
    bindings: Arc<BTreeMap<EntityId, Arc<LsaBinding>>>,
}

impl LsaBindings {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record of a bound LSA.
    pub fn get(&self, id: &EntityId) -> Option<&LsaBinding> {
        self.bindings.get(id).map(Arc::as_ref)
    }

    /// Set or clear a classification of a bound LSA.
    ///
    /// Returns `Ok(false)` when the LSA is not bound. A value that is not in
    /// the fetched enumeration is rejected.
    pub fn set_classification(
        &mut self,
        id: &EntityId,
        field: ClassificationField,
        value: Option<i64>,
        catalog: &ClassificationCatalog,
    ) -> Result<bool, BindingError> {
        if let Some(pk) = value.filter(|pk| !catalog.contains(field, *pk)) {
            return Err(BindingError::UnknownClassification { field, pk });
        }

        let Some(current) = self.bindings.get(id) else {
            log::debug!("Classification on unbound LSA {} ignored", id);
            return Ok(false);
        };
        if current.classification(field) == value {
            return Ok(true);
        }

        let mut updated = LsaBinding::clone(current);
        match field {
            ClassificationField::Constellation => updated.corresponding_constellation = value,
            ClassificationField::RouteError => updated.corresponding_route_error = value,
        }
        Arc::make_mut(&mut self.bindings).insert(id.clone(), Arc::new(updated));
        log::debug!("LSA {} {} = {:?}", id, field.field_name(), value);
        Ok(true)
    }
}

impl BindingStore for LsaBindings {
    type Snapshot = LsaSnapshot;

    const KIND: EntityKind = EntityKind::Lsa;

    fn state(&self, id: &EntityId) -> BindingState {
        self.bindings
            .get(id)
            .map_or(BindingState::Absent, |b| b.state())
    }

    fn insert(&mut self, id: &EntityId) {
        if !self.bindings.contains_key(id) {
            Arc::make_mut(&mut self.bindings).insert(id.clone(), Arc::new(LsaBinding::default()));
        }
    }

    fn set_confirmed(&mut self, id: &EntityId, confirmed: bool) -> bool {
        let Some(current) = self.bindings.get(id) else {
            return false;
        };
        if current.confirmed != confirmed {
            let updated = LsaBinding {
                confirmed,
                ..LsaBinding::clone(current)
            };
            Arc::make_mut(&mut self.bindings).insert(id.clone(), Arc::new(updated));
        }
        true
    }

    fn remove(&mut self, id: &EntityId) -> bool {
        if !self.bindings.contains_key(id) {
            return false;
        }
        Arc::make_mut(&mut self.bindings).remove(id).is_some()
    }

    fn hydrate(&mut self, snapshot: LsaSnapshot) {
        self.bindings = Arc::new(
            snapshot
                .into_iter()
                .map(|(id, dto)| (id, Arc::new(LsaBinding::from(dto))))
                .collect(),
        );
    }

    fn clear(&mut self) {
        self.bindings = Arc::default();
    }

    fn snapshot(&self) -> LsaSnapshot {
        self.bindings
            .iter()
            .map(|(id, b)| (id.clone(), LsaBindingDto::from(b.as_ref())))
            .collect()
    }

    fn entries(&self) -> Vec<(EntityId, BindingState)> {
        self.bindings
            .iter()
            .map(|(id, b)| (id.clone(), b.state()))
            .collect()
    }

    fn len(&self) -> usize {
        self.bindings.len()
    }

    fn classification(&self, id: &EntityId, field: ClassificationField) -> Option<i64> {
        self.get(id).and_then(|b| b.classification(field))
    }
}
