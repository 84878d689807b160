//! Blocking backend client.
//!
//! Requests are issued from a background worker thread, so a blocking client
//! keeps the call sites simple. Every request is bounded by the client
//! timeout; a hung backend surfaces as [`ApiError::Transport`].

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use web_time::Instant;

use crate::endpoints::{EntityKind, EnumKind, Endpoints, HealthSide};
use crate::error::ApiError;
use crate::ids::{EntityId, RouteId};
use crate::types::{
    CrossingDto, EnumEntry, HealthCheckEntry, NextRouteDto, RegionDto, SerializedBinding,
};

/// Default timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Operations the composer needs from the backend.
///
/// Binding snapshots are passed as raw JSON because their shape depends on
/// the binding variant; the store decodes them.
pub trait Backend: Send + Sync {
    /// Current bindings of a route.
    fn bindings(&self, route: &RouteId, show_duplicates: bool)
    -> Result<serde_json::Value, ApiError>;

    /// Replace the bindings of a route.
    fn submit_bindings(
        &self,
        route: &RouteId,
        map_data: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<(), ApiError>;

    /// Extent of a route.
    fn route_region(&self, route: &RouteId) -> Result<RegionDto, ApiError>;

    /// Crossings near a route.
    fn route_crossings(&self, route: &RouteId) -> Result<Vec<CrossingDto>, ApiError>;

    /// The route following `route`.
    fn next_route(&self, route: &RouteId) -> Result<NextRouteDto, ApiError>;

    /// Extent of a single entity.
    fn entity_region(&self, kind: EntityKind, id: &EntityId) -> Result<RegionDto, ApiError>;

    /// Descriptive metadata of a single entity.
    fn entity_metadata(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<serde_json::Value, ApiError>;

    /// All constellations or all route errors.
    fn enumeration(&self, kind: EnumKind) -> Result<Vec<EnumEntry>, ApiError>;

    /// Bindings tagged with one enumeration entry.
    fn enumeration_stats(
        &self,
        kind: EnumKind,
        pk: i64,
    ) -> Result<Vec<SerializedBinding>, ApiError>;

    /// Diff between the file store and the database store.
    fn health_check(
        &self,
        side: HealthSide,
        map_data: Option<&str>,
    ) -> Result<Vec<HealthCheckEntry>, ApiError>;
}

/// [`Backend`] over HTTP.
pub struct HttpBackend {
    client: Client,
    endpoints: Endpoints,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url` with the given timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let endpoints = Endpoints::new(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        log::info!("Backend client for {} (timeout {:?})", base_url, timeout);
        Ok(Self { client, endpoints })
    }

    /// The endpoint builder in use.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn check(url: &Url, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let started = Instant::now();
        let transport = |source| ApiError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url.clone()).send().map_err(transport)?;
        let response = Self::check(&url, response)?;
        let body = response.text().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        log::debug!(
            "GET {} -> {} bytes in {:?}",
            url,
            body.len(),
            started.elapsed()
        );
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl Backend for HttpBackend {
    fn bindings(
        &self,
        route: &RouteId,
        show_duplicates: bool,
    ) -> Result<serde_json::Value, ApiError> {
        self.get_json(self.endpoints.route_bindings(route, show_duplicates)?)
    }

    fn submit_bindings(
        &self,
        route: &RouteId,
        map_data: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<(), ApiError> {
        let url = self.endpoints.submit_bindings(route, map_data)?;
        let payload = serde_json::to_string(body)?;
        let started = Instant::now();
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        Self::check(&url, response)?;
        log::info!("POST {} succeeded in {:?}", url, started.elapsed());
        Ok(())
    }

    fn route_region(&self, route: &RouteId) -> Result<RegionDto, ApiError> {
        self.get_json(self.endpoints.route_region(route)?)
    }

    fn route_crossings(&self, route: &RouteId) -> Result<Vec<CrossingDto>, ApiError> {
        self.get_json(self.endpoints.route_crossings(route)?)
    }

    fn next_route(&self, route: &RouteId) -> Result<NextRouteDto, ApiError> {
        self.get_json(self.endpoints.next_route(route)?)
    }

    fn entity_region(&self, kind: EntityKind, id: &EntityId) -> Result<RegionDto, ApiError> {
        self.get_json(self.endpoints.entity_region(kind, id)?)
    }

    fn entity_metadata(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<serde_json::Value, ApiError> {
        self.get_json(self.endpoints.entity_metadata(kind, id)?)
    }

    fn enumeration(&self, kind: EnumKind) -> Result<Vec<EnumEntry>, ApiError> {
        self.get_json(self.endpoints.enumeration(kind)?)
    }

    fn enumeration_stats(
        &self,
        kind: EnumKind,
        pk: i64,
    ) -> Result<Vec<SerializedBinding>, ApiError> {
        self.get_json(self.endpoints.enumeration_stats(kind, pk)?)
    }

    fn health_check(
        &self,
        side: HealthSide,
        map_data: Option<&str>,
    ) -> Result<Vec<HealthCheckEntry>, ApiError> {
        self.get_json(self.endpoints.health_check(side, map_data)?)
    }
}
