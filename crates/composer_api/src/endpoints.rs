//! URL construction for the composer REST API.

use reqwest::Url;

use crate::error::ApiError;
use crate::ids::{EntityId, RouteId};

/// Path prefix of every composer endpoint below the backend base URL.
pub const API_PREFIX: &str = "composer/api/";

/// Kind of candidate entity, as it appears in entity URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Lane signal area
    Lsa,
    /// Signal group
    Sg,
}

impl EntityKind {
    /// URL path segment for this kind.
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::Lsa => "lsa",
            EntityKind::Sg => "sg",
        }
    }

    /// Display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Lsa => "LSA",
            EntityKind::Sg => "SG",
        }
    }
}

/// Which enumeration a stats or list request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumKind {
    Constellation,
    RouteError,
}

impl EnumKind {
    fn path_segment(&self) -> &'static str {
        match self {
            EnumKind::Constellation => "constellation",
            EnumKind::RouteError => "route_error",
        }
    }
}

/// Which store a health check compares against the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthSide {
    /// Bindings in `.json` files but not (or different) in the database
    Files,
    /// Bindings in the database but not (or different) in `.json` files
    Database,
}

impl HealthSide {
    fn path_segment(&self) -> &'static str {
        match self {
            HealthSide::Files => "files",
            HealthSide::Database => "database",
        }
    }
}

/// Builds endpoint URLs relative to a backend base URL.
///
/// Ids are pushed as single path segments, so characters such as `/`, `?`
/// and `#` are percent-encoded and cannot leave the endpoint they belong to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    api: Url,
}

impl Endpoints {
    /// Create endpoints for a backend such as `http://localhost:8000`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{base}: not a base URL")));
        }
        let api = base
            .join(API_PREFIX)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        Ok(Self { api })
    }

    fn path(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ApiError::InvalidUrl(format!(
                "invalid path segment {bad:?} below {}",
                self.api
            )));
        }
        let mut url = self.api.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{}: not a base URL", self.api)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn with_map_data(mut url: Url, map_data: Option<&str>) -> Url {
        if let Some(map_data) = map_data {
            url.query_pairs_mut().append_pair("map_data", map_data);
        }
        url
    }

    /// `GET route/{id}/bindings?show_duplicates=..`
    pub fn route_bindings(&self, route: &RouteId, show_duplicates: bool) -> Result<Url, ApiError> {
        let mut url = self.path(&["route", route.as_str(), "bindings"])?;
        url.query_pairs_mut()
            .append_pair("show_duplicates", if show_duplicates { "true" } else { "false" });
        Ok(url)
    }

    /// `POST route/{id}/bindings[?map_data=..]`
    pub fn submit_bindings(
        &self,
        route: &RouteId,
        map_data: Option<&str>,
    ) -> Result<Url, ApiError> {
        let url = self.path(&["route", route.as_str(), "bindings"])?;
        Ok(Self::with_map_data(url, map_data))
    }

    /// `GET route/{id}/region`
    pub fn route_region(&self, route: &RouteId) -> Result<Url, ApiError> {
        self.path(&["route", route.as_str(), "region"])
    }

    /// `GET route/{id}/crossings`
    pub fn route_crossings(&self, route: &RouteId) -> Result<Url, ApiError> {
        self.path(&["route", route.as_str(), "crossings"])
    }

    /// `GET route/{id}/next`
    pub fn next_route(&self, route: &RouteId) -> Result<Url, ApiError> {
        self.path(&["route", route.as_str(), "next"])
    }

    /// `GET {kind}/{id}/region`
    pub fn entity_region(&self, kind: EntityKind, id: &EntityId) -> Result<Url, ApiError> {
        self.path(&[kind.path_segment(), id.as_str(), "region"])
    }

    /// `GET {kind}/{id}/metadata`
    pub fn entity_metadata(&self, kind: EntityKind, id: &EntityId) -> Result<Url, ApiError> {
        self.path(&[kind.path_segment(), id.as_str(), "metadata"])
    }

    /// `GET constellation` or `GET route_error`
    pub fn enumeration(&self, kind: EnumKind) -> Result<Url, ApiError> {
        self.path(&[kind.path_segment()])
    }

    /// `GET constellation/{pk}/stats` or `GET route_error/{pk}/stats`
    pub fn enumeration_stats(&self, kind: EnumKind, pk: i64) -> Result<Url, ApiError> {
        self.path(&[kind.path_segment(), &pk.to_string(), "stats"])
    }

    /// `GET health_check/bindings/{files|database}[?map_data=..]`
    pub fn health_check(&self, side: HealthSide, map_data: Option<&str>) -> Result<Url, ApiError> {
        let url = self.path(&["health_check", "bindings", side.path_segment()])?;
        Ok(Self::with_map_data(url, map_data))
    }
}

/// Decode a form-encoded query string such as `?route_id=4&lsa_id=`.
///
/// A leading `?` is ignored. Keys without `=` get an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.trim().trim_start_matches('?');
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return Vec::new();
    };
    url.set_query(Some(query));
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Encode key/value pairs into a query string without the leading `?`.
pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return String::new();
    };
    url.query_pairs_mut().extend_pairs(pairs);
    url.query().unwrap_or_default().to_string()
}
