//! Fetch requests and their results.

use composer_api::{
    ApiError, Backend, CrossingDto, EntityId, EntityKind, EnumEntry, EnumKind, HealthCheckEntry,
    HealthSide, NextRouteDto, RegionDto, RouteId, SerializedBinding,
};

/// Tag attached to every dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket {
    /// Composer session that issued the request
    pub session: u64,
    /// Sequence number within the session
    pub seq: u64,
}

/// One backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    /// Current bindings of a route
    Bindings {
        route: RouteId,
        show_duplicates: bool,
    },
    /// Replace the bindings of a route
    Submit {
        route: RouteId,
        map_data: Option<String>,
        body: serde_json::Value,
    },
    /// Extent of a route
    RouteRegion { route: RouteId },
    /// Crossings near a route
    Crossings { route: RouteId },
    /// The route after this one
    NextRoute { route: RouteId },
    /// Extent of one entity
    EntityRegion { kind: EntityKind, id: EntityId },
    /// Tooltip metadata of one entity
    Metadata { kind: EntityKind, id: EntityId },
    /// Constellation or route error list
    Enumeration(EnumKind),
    /// Bindings tagged with one enumeration entry
    EnumerationStats { kind: EnumKind, pk: i64 },
    /// File store vs database diff
    HealthCheck {
        side: HealthSide,
        map_data: Option<String>,
    },
}

impl FetchRequest {
    /// Short description for logs and error notices.
    pub fn label(&self) -> String {
        match self {
            FetchRequest::Bindings { route, .. } => format!("bindings of route {}", route),
            FetchRequest::Submit { route, .. } => format!("submit of route {}", route),
            FetchRequest::RouteRegion { route } => format!("region of route {}", route),
            FetchRequest::Crossings { route } => format!("crossings of route {}", route),
            FetchRequest::NextRoute { route } => format!("route after {}", route),
            FetchRequest::EntityRegion { kind, id } => format!("region of {} {}", kind.name(), id),
            FetchRequest::Metadata { kind, id } => format!("metadata of {} {}", kind.name(), id),
            FetchRequest::Enumeration(EnumKind::Constellation) => "constellations".to_string(),
            FetchRequest::Enumeration(EnumKind::RouteError) => "route errors".to_string(),
            FetchRequest::EnumerationStats { kind, pk } => match kind {
                EnumKind::Constellation => format!("bindings of constellation {}", pk),
                EnumKind::RouteError => format!("bindings of route error {}", pk),
            },
            FetchRequest::HealthCheck { side, .. } => match side {
                HealthSide::Files => "file store health check".to_string(),
                HealthSide::Database => "database health check".to_string(),
            },
        }
    }

    /// Run the request against a backend. Blocks for the duration of the call.
    pub fn execute(&self, backend: &dyn Backend) -> Result<FetchOutcome, ApiError> {
        Ok(match self {
            FetchRequest::Bindings {
                route,
                show_duplicates,
            } => FetchOutcome::Bindings(backend.bindings(route, *show_duplicates)?),
            FetchRequest::Submit {
                route,
                map_data,
                body,
            } => {
                backend.submit_bindings(route, map_data.as_deref(), body)?;
                FetchOutcome::Submitted
            }
            FetchRequest::RouteRegion { route } => {
                FetchOutcome::Region(backend.route_region(route)?)
            }
            FetchRequest::Crossings { route } => {
                FetchOutcome::Crossings(backend.route_crossings(route)?)
            }
            FetchRequest::NextRoute { route } => {
                FetchOutcome::NextRoute(backend.next_route(route)?)
            }
            FetchRequest::EntityRegion { kind, id } => {
                FetchOutcome::Region(backend.entity_region(*kind, id)?)
            }
            FetchRequest::Metadata { kind, id } => {
                FetchOutcome::Metadata(backend.entity_metadata(*kind, id)?)
            }
            FetchRequest::Enumeration(kind) => {
                FetchOutcome::Enumeration(backend.enumeration(*kind)?)
            }
            FetchRequest::EnumerationStats { kind, pk } => {
                FetchOutcome::Stats(backend.enumeration_stats(*kind, *pk)?)
            }
            FetchRequest::HealthCheck { side, map_data } => {
                FetchOutcome::Health(backend.health_check(*side, map_data.as_deref())?)
            }
        })
    }
}

/// Successful response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Raw binding snapshot; the store decodes it
    Bindings(serde_json::Value),
    /// Route or entity extent
    Region(RegionDto),
    /// Crossings near the route
    Crossings(Vec<CrossingDto>),
    /// Next route lookup
    NextRoute(NextRouteDto),
    /// Entity metadata
    Metadata(serde_json::Value),
    /// Enumeration list
    Enumeration(Vec<EnumEntry>),
    /// Bindings tagged with one enumeration entry
    Stats(Vec<SerializedBinding>),
    /// Health check diff
    Health(Vec<HealthCheckEntry>),
    /// Submit accepted
    Submitted,
}

/// A finished request, as drained from the worker.
#[derive(Debug)]
pub struct FetchResult {
    /// Ticket the request was dispatched with
    pub ticket: Ticket,
    /// The request itself, kept for correlation and retry
    pub request: FetchRequest,
    /// Response payload or failure
    pub outcome: Result<FetchOutcome, ApiError>,
}

impl FetchResult {
    /// Build a result by running `request` on the calling thread.
    pub fn run(ticket: Ticket, request: FetchRequest, backend: &dyn Backend) -> Self {
        let outcome = request.execute(backend);
        Self {
            ticket,
            request,
            outcome,
        }
    }
}
