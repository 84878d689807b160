//! Wire types exchanged with the composer backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, RouteId};

/// Axis-aligned extent as the backend reports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionDto {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A signalised crossing near the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingDto {
    /// Crossing identifier (traffic light id)
    pub id: EntityId,
    /// Number of signal groups belonging to the crossing
    pub sgs: u32,
    /// `[min_x, min_y, max_x, max_y]`
    pub extent: [f64; 4],
}

/// Response of the "next route" lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextRouteDto {
    /// The following route, `null` when the current route is the last one
    pub next_route: Option<RouteId>,
}

/// Fields of a constellation or route error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom_id: String,
}

/// One entry of an enumeration list (`[{pk, fields}]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub pk: i64,
    pub fields: EnumFields,
}

/// Per-LSA binding state on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LsaBindingDto {
    pub confirmed: bool,
    #[serde(default)]
    pub corresponding_constellation: Option<i64>,
    #[serde(default)]
    pub corresponding_route_error: Option<i64>,
}

/// LSA binding snapshot: an object keyed by LSA id.
pub type LsaSnapshot = BTreeMap<EntityId, LsaBindingDto>;

/// SG binding snapshot: selected ids with a parallel confirmed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SgSnapshot {
    #[serde(rename = "sgIds")]
    pub sg_ids: Vec<EntityId>,
    pub confirmed: Vec<EntityId>,
}

/// Fields of a serialized binding as listed by the stats endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingFields {
    pub route: RouteId,
    pub lsa: EntityId,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub corresponding_constellation: Option<i64>,
    #[serde(default)]
    pub corresponding_route_error: Option<i64>,
}

/// A binding as produced by the backend's model serializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBinding {
    pub pk: i64,
    pub fields: BindingFields,
}

/// Binding reference inside a health check report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthBinding {
    pub id: i64,
    pub route: RouteId,
    pub lsa: EntityId,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One row of a health check diff.
///
/// `present` is true when the binding exists on the other side but differs,
/// false when it is missing there entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckEntry {
    pub present: bool,
    pub binding: HealthBinding,
}
