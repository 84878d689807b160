//! Tooltip metadata cache.
//!
//! Holds the metadata of a single entity. A hover on the cached entity is
//! answered immediately; a hover on any other entity reports `Pending` and
//! starts exactly one fetch. When fetches for different entities overlap,
//! whichever completes last owns the slot.

use std::collections::{HashMap, HashSet};

use composer_api::EntityId;

/// Starts metadata fetches for the cache.
pub trait MetadataSource {
    /// Begin fetching metadata of `id`. The result is delivered later
    /// through [`MetadataCache::complete`].
    fn fetch_metadata(&mut self, id: &EntityId);
}

/// Answer of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Metadata of the requested entity
    Fresh(serde_json::Value),
    /// Not available yet; a fetch is in flight
    Pending,
    /// The last fetch for this entity failed; see [`MetadataCache::retry`]
    Failed(String),
}

/// Single-slot metadata cache.
#[derive(Debug, Default)]
pub struct MetadataCache {
    /// The one cached entry
    slot: Option<(EntityId, serde_json::Value)>,
    /// Entities with a fetch in flight
    in_flight: HashSet<EntityId>,
    /// Entities whose last fetch failed, with the error message
    failed: HashMap<EntityId, String>,
}

impl MetadataCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `id`, starting a fetch through `source` on a miss.
    pub fn get(&mut self, id: &EntityId, source: &mut dyn MetadataSource) -> CacheLookup {
        if let Some((cached_id, data)) = &self.slot {
            if cached_id == id {
                return CacheLookup::Fresh(data.clone());
            }
        }

        if let Some(message) = self.failed.get(id) {
            return CacheLookup::Failed(message.clone());
        }

        if self.in_flight.insert(id.clone()) {
            log::debug!("🔍 Metadata miss for {}, fetching", id);
            source.fetch_metadata(id);
        }
        CacheLookup::Pending
    }

    /// Cached metadata of `id`, without fetching.
    pub fn peek(&self, id: &EntityId) -> Option<&serde_json::Value> {
        self.slot
            .as_ref()
            .filter(|(cached_id, _)| cached_id == id)
            .map(|(_, data)| data)
    }

    /// Deliver the result of a fetch.
    ///
    /// Success replaces the slot. Failure leaves the slot as it is and marks
    /// `id` failed until [`retry`](Self::retry) is called.
    pub fn complete(&mut self, id: &EntityId, result: Result<serde_json::Value, String>) {
        self.in_flight.remove(id);
        match result {
            Ok(data) => {
                self.failed.remove(id);
                self.slot = Some((id.clone(), data));
            }
            Err(message) => {
                log::warn!("Metadata fetch for {} failed: {}", id, message);
                self.failed.insert(id.clone(), message);
            }
        }
    }

    /// Forget a failure so the next lookup fetches again.
    /// Returns true if `id` had failed.
    pub fn retry(&mut self, id: &EntityId) -> bool {
        self.failed.remove(id).is_some()
    }

    /// Forget every failure.
    pub fn retry_all(&mut self) -> usize {
        let count = self.failed.len();
        self.failed.clear();
        count
    }

    /// Whether a fetch for `id` is outstanding.
    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.in_flight.contains(id)
    }

    /// Drop the slot, failures and in-flight bookkeeping.
    pub fn clear(&mut self) {
        self.slot = None;
        self.in_flight.clear();
        self.failed.clear();
    }
}

/// The fields a tooltip shows for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TooltipSummary {
    /// Entity primary key
    pub pk: Option<String>,
    /// `fields.lane_type`
    pub lane_type: Option<String>,
    /// `fields.signal_group_id`
    pub signal_group_id: Option<String>,
}

impl TooltipSummary {
    /// Extract the tooltip fields from raw metadata. Missing fields stay
    /// `None`; numbers are rendered as text.
    pub fn from_metadata(data: &serde_json::Value) -> Self {
        fn text(value: Option<&serde_json::Value>) -> Option<String> {
            match value? {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            }
        }

        let fields = data.get("fields");
        Self {
            pk: text(data.get("pk")),
            lane_type: text(fields.and_then(|f| f.get("lane_type"))),
            signal_group_id: text(fields.and_then(|f| f.get("signal_group_id"))),
        }
    }

    /// Heading line, e.g. `SG 42`.
    pub fn title(&self, kind: composer_api::EntityKind) -> String {
        format!("{} {}", kind.name(), self.pk.as_deref().unwrap_or("?"))
    }

    /// Detail line, e.g. `KFZ/Radfahrer, SG hamburg/271_23`.
    pub fn detail(&self) -> String {
        format!(
            "{}, SG {}",
            self.lane_type.as_deref().unwrap_or("-"),
            self.signal_group_id.as_deref().unwrap_or("-")
        )
    }
}
