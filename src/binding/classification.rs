//! Constellation and route error classifications of LSA bindings.

use std::collections::BTreeMap;
use std::fmt;

use composer_api::{EnumEntry, EnumKind};

/// Which classification of an LSA binding is being set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationField {
    /// `corresponding_constellation`
    Constellation,
    /// `corresponding_route_error`
    RouteError,
}

impl ClassificationField {
    /// Both fields, in display order.
    pub const ALL: [ClassificationField; 2] =
        [ClassificationField::Constellation, ClassificationField::RouteError];

    /// Enumeration backing this field.
    pub fn enum_kind(&self) -> EnumKind {
        match self {
            ClassificationField::Constellation => EnumKind::Constellation,
            ClassificationField::RouteError => EnumKind::RouteError,
        }
    }

    /// Wire field name on the binding.
    pub fn field_name(&self) -> &'static str {
        match self {
            ClassificationField::Constellation => "corresponding_constellation",
            ClassificationField::RouteError => "corresponding_route_error",
        }
    }
}

impl From<EnumKind> for ClassificationField {
    fn from(kind: EnumKind) -> Self {
        match kind {
            EnumKind::Constellation => ClassificationField::Constellation,
            EnumKind::RouteError => ClassificationField::RouteError,
        }
    }
}

impl fmt::Display for ClassificationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationField::Constellation => f.write_str("constellation"),
            ClassificationField::RouteError => f.write_str("route error"),
        }
    }
}

/// Fetched constellations and route errors, keyed by primary key.
///
/// A list that has not arrived yet is `None`; values cannot be validated
/// against it and are rejected.
#[derive(Debug, Clone, Default)]
pub struct ClassificationCatalog {
    constellations: Option<BTreeMap<i64, EnumEntry>>,
    route_errors: Option<BTreeMap<i64, EnumEntry>>,
}

impl ClassificationCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fetched enumeration list.
    pub fn load(&mut self, field: ClassificationField, entries: Vec<EnumEntry>) {
        let map: BTreeMap<i64, EnumEntry> = entries.into_iter().map(|e| (e.pk, e)).collect();
        log::debug!("Loaded {} {} entries", map.len(), field);
        *self.slot_mut(field) = Some(map);
    }

    /// Whether the list for `field` has arrived.
    pub fn is_loaded(&self, field: ClassificationField) -> bool {
        self.slot(field).is_some()
    }

    /// Whether `pk` is a known entry of `field`.
    pub fn contains(&self, field: ClassificationField, pk: i64) -> bool {
        self.slot(field).is_some_and(|map| map.contains_key(&pk))
    }

    /// Look up an entry.
    pub fn get(&self, field: ClassificationField, pk: i64) -> Option<&EnumEntry> {
        self.slot(field).and_then(|map| map.get(&pk))
    }

    /// Entries of `field` in key order. Empty while not loaded.
    pub fn entries(&self, field: ClassificationField) -> Vec<&EnumEntry> {
        self.slot(field)
            .map(|map| map.values().collect())
            .unwrap_or_default()
    }

    /// Display label of a value, `"-"` for none.
    pub fn label(&self, field: ClassificationField, value: Option<i64>) -> String {
        match value {
            None => "-".to_string(),
            Some(pk) => self
                .get(field, pk)
                .map(|entry| entry.fields.name.clone())
                .unwrap_or_else(|| format!("#{}", pk)),
        }
    }

    /// Forget both lists.
    pub fn clear(&mut self) {
        self.constellations = None;
        self.route_errors = None;
    }

    fn slot(&self, field: ClassificationField) -> Option<&BTreeMap<i64, EnumEntry>> {
        match field {
            ClassificationField::Constellation => self.constellations.as_ref(),
            ClassificationField::RouteError => self.route_errors.as_ref(),
        }
    }

    fn slot_mut(&mut self, field: ClassificationField) -> &mut Option<BTreeMap<i64, EnumEntry>> {
        match field {
            ClassificationField::Constellation => &mut self.constellations,
            ClassificationField::RouteError => &mut self.route_errors,
        }
    }
}
