//! Backend contract for the binding composer.
//!
//! Wire types, endpoint construction and a blocking HTTP client for the
//! composer REST API. The backend owns persistence and reconciliation; this
//! crate only knows the request and response shapes.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod ids;
pub mod types;

pub use client::{Backend, HttpBackend};
pub use endpoints::{EntityKind, EnumKind, Endpoints, HealthSide, encode_query, parse_query};
pub use error::ApiError;
pub use ids::{EntityId, RouteId};
pub use types::{
    BindingFields, CrossingDto, EnumEntry, EnumFields, HealthBinding, HealthCheckEntry,
    LsaBindingDto, LsaSnapshot, NextRouteDto, RegionDto, SerializedBinding, SgSnapshot,
};
