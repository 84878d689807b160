//! In-memory backend and dispatcher for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use composer_api::{
    ApiError, Backend, CrossingDto, EntityId, EntityKind, EnumEntry, EnumFields, EnumKind,
    HealthCheckEntry, HealthSide, NextRouteDto, RegionDto, RouteId, SerializedBinding,
};

use crate::fetch::{Dispatcher, FetchRequest, FetchResult, Ticket};

#[derive(Default)]
struct FakeState {
    bindings: serde_json::Value,
    route_region: Option<RegionDto>,
    crossings: Vec<CrossingDto>,
    next_route: Option<RouteId>,
    entity_regions: BTreeMap<EntityId, RegionDto>,
    metadata: BTreeMap<EntityId, serde_json::Value>,
    enumerations: BTreeMap<&'static str, Vec<EnumEntry>>,
    stats: BTreeMap<(&'static str, i64), Vec<SerializedBinding>>,
    health: BTreeMap<&'static str, Vec<HealthCheckEntry>>,
    submitted: Vec<(RouteId, Option<String>, serde_json::Value)>,
    fail_next: usize,
    calls: usize,
}

/// Backend answering from canned data.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

fn enum_key(kind: EnumKind) -> &'static str {
    match kind {
        EnumKind::Constellation => "constellation",
        EnumKind::RouteError => "route_error",
    }
}

fn side_key(side: HealthSide) -> &'static str {
    match side {
        HealthSide::Files => "files",
        HealthSide::Database => "database",
    }
}

pub fn region(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> RegionDto {
    RegionDto {
        min_x,
        min_y,
        max_x,
        max_y,
    }
}

pub fn enum_entry(pk: i64, name: &str) -> EnumEntry {
    EnumEntry {
        pk,
        fields: EnumFields {
            name: name.to_string(),
            description: String::new(),
            custom_id: String::new(),
        },
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_bindings(&self, value: serde_json::Value) {
        self.with(|s| s.bindings = value);
    }

    pub fn set_route_region(&self, region: RegionDto) {
        self.with(|s| s.route_region = Some(region));
    }

    pub fn set_crossings(&self, crossings: Vec<CrossingDto>) {
        self.with(|s| s.crossings = crossings);
    }

    pub fn set_next_route(&self, next: Option<RouteId>) {
        self.with(|s| s.next_route = next);
    }

    pub fn set_entity_region(&self, id: EntityId, region: RegionDto) {
        self.with(|s| {
            s.entity_regions.insert(id, region);
        });
    }

    pub fn set_metadata(&self, id: EntityId, value: serde_json::Value) {
        self.with(|s| {
            s.metadata.insert(id, value);
        });
    }

    pub fn set_enumeration(&self, kind: EnumKind, entries: Vec<EnumEntry>) {
        self.with(|s| {
            s.enumerations.insert(enum_key(kind), entries);
        });
    }

    pub fn set_stats(&self, kind: EnumKind, pk: i64, bindings: Vec<SerializedBinding>) {
        self.with(|s| {
            s.stats.insert((enum_key(kind), pk), bindings);
        });
    }

    pub fn set_health(&self, side: HealthSide, entries: Vec<HealthCheckEntry>) {
        self.with(|s| {
            s.health.insert(side_key(side), entries);
        });
    }

    /// Make the next `n` calls fail with HTTP 503.
    pub fn fail_next(&self, n: usize) {
        self.with(|s| s.fail_next = n);
    }

    pub fn submitted(&self) -> Vec<(RouteId, Option<String>, serde_json::Value)> {
        self.with(|s| s.submitted.clone())
    }

    pub fn calls(&self) -> usize {
        self.with(|s| s.calls)
    }

    fn call<T>(
        &self,
        url: &str,
        f: impl FnOnce(&mut FakeState) -> Option<T>,
    ) -> Result<T, ApiError> {
        self.with(|s| {
            s.calls += 1;
            if s.fail_next > 0 {
                s.fail_next -= 1;
                return Err(ApiError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
            f(s).ok_or_else(|| ApiError::Status {
                url: url.to_string(),
                status: 404,
            })
        })
    }
}

impl Backend for FakeBackend {
    fn bindings(
        &self,
        _route: &RouteId,
        _show_duplicates: bool,
    ) -> Result<serde_json::Value, ApiError> {
        self.call("bindings", |s| Some(s.bindings.clone()))
    }

    fn submit_bindings(
        &self,
        route: &RouteId,
        map_data: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<(), ApiError> {
        self.call("submit", |s| {
            s.submitted
                .push((route.clone(), map_data.map(str::to_string), body.clone()));
            Some(())
        })
    }

    fn route_region(&self, _route: &RouteId) -> Result<RegionDto, ApiError> {
        self.call("route_region", |s| s.route_region)
    }

    fn route_crossings(&self, _route: &RouteId) -> Result<Vec<CrossingDto>, ApiError> {
        self.call("crossings", |s| Some(s.crossings.clone()))
    }

    fn next_route(&self, _route: &RouteId) -> Result<NextRouteDto, ApiError> {
        self.call("next", |s| {
            Some(NextRouteDto {
                next_route: s.next_route.clone(),
            })
        })
    }

    fn entity_region(&self, _kind: EntityKind, id: &EntityId) -> Result<RegionDto, ApiError> {
        self.call("entity_region", |s| s.entity_regions.get(id).copied())
    }

    fn entity_metadata(
        &self,
        _kind: EntityKind,
        id: &EntityId,
    ) -> Result<serde_json::Value, ApiError> {
        self.call("metadata", |s| s.metadata.get(id).cloned())
    }

    fn enumeration(&self, kind: EnumKind) -> Result<Vec<EnumEntry>, ApiError> {
        self.call("enumeration", |s| {
            Some(s.enumerations.get(enum_key(kind)).cloned().unwrap_or_default())
        })
    }

    fn enumeration_stats(
        &self,
        kind: EnumKind,
        pk: i64,
    ) -> Result<Vec<SerializedBinding>, ApiError> {
        self.call("stats", |s| {
            Some(s.stats.get(&(enum_key(kind), pk)).cloned().unwrap_or_default())
        })
    }

    fn health_check(
        &self,
        side: HealthSide,
        _map_data: Option<&str>,
    ) -> Result<Vec<HealthCheckEntry>, ApiError> {
        self.call("health", |s| {
            Some(s.health.get(side_key(side)).cloned().unwrap_or_default())
        })
    }
}

/// Dispatcher that only records requests. Tests decide when and how each
/// one completes.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub queue: Vec<(Ticket, FetchRequest)>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every queued request.
    pub fn drain(&mut self) -> Vec<(Ticket, FetchRequest)> {
        std::mem::take(&mut self.queue)
    }

    /// Run every queued request against `backend`, in dispatch order.
    pub fn run_all(&mut self, backend: &dyn Backend) -> Vec<FetchResult> {
        self.drain()
            .into_iter()
            .map(|(ticket, request)| FetchResult::run(ticket, request, backend))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&FetchRequest) -> bool) -> usize {
        self.queue.iter().filter(|(_, r)| pred(r)).count()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&mut self, ticket: Ticket, request: FetchRequest) {
        self.queue.push((ticket, request));
    }
}
