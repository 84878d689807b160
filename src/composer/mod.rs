//! The composer: one route, its candidate entities and the operator's
//! bindings.
//!
//! The composer owns the binding store, the camera, the crossing list and
//! the tooltip cache. It never blocks: backend calls go out through a
//! [`Dispatcher`] and come back through [`Composer::apply`], which drops
//! results that belong to an earlier mount.

mod view;

pub use view::{ComposerView, CrossingRow, EntityRow, Notice, NoticeLevel, SubmitStatus};

use std::collections::HashSet;
use std::time::Duration;

use composer_api::{
    ApiError, CrossingDto, EntityId, EntityKind, EnumKind, RouteId, encode_query,
};
use thiserror::Error;

use crate::animation::{AnimationHandle, CancelToken, FrameSource, IntervalFrames, TripProgress};
use crate::binding::{
    BindingError, BindingState, BindingStore, ClassificationCatalog, ClassificationField,
    LsaBindings,
};
use crate::config::ComposerConfig;
use crate::fetch::{Dispatcher, FetchOutcome, FetchRequest, FetchResult, FetchWorker, Ticket};
use crate::metadata_cache::{CacheLookup, MetadataCache, MetadataSource};
use crate::model::{Region, Viewport};
use crate::viewport_fit;

/// Errors returned by composer operations.
#[derive(Debug, Error)]
pub enum ComposerError {
    /// A submission is in flight
    #[error("A submission is in progress")]
    Locked,

    /// No route is mounted
    #[error("No route is mounted")]
    NotMounted,

    /// The route's bindings have not been loaded yet
    #[error("The bindings of this route are not loaded")]
    NotLoaded,

    /// The crossing is not near the mounted route
    #[error("Unknown crossing {0}")]
    UnknownCrossing(EntityId),

    /// The binding store rejected the change
    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Where the host should go after a successful advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// The next route
    pub route_id: RouteId,
}

impl Navigation {
    /// Query string of the target, `?route_id={next}`.
    pub fn query(&self) -> String {
        format!("?{}", encode_query(&[("route_id", self.route_id.as_str())]))
    }

    /// Relative link to the composer page of the target.
    pub fn href(&self) -> String {
        format!("/composer{}", self.query())
    }

    /// Session config for the target route.
    pub fn config(&self) -> ComposerConfig {
        ComposerConfig::new(self.route_id.clone())
    }
}

/// Creates the frame source of each mounted route's trip animation.
type FrameFactory = Box<dyn Fn() -> Box<dyn FrameSource + Send>>;

/// Dispatcher plus the bookkeeping that tags requests with tickets.
struct Outbox<D> {
    dispatcher: D,
    session: u64,
    next_seq: u64,
    outstanding: HashSet<u64>,
}

impl<D: Dispatcher> Outbox<D> {
    fn send(&mut self, request: FetchRequest) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            session: self.session,
            seq: self.next_seq,
        };
        self.outstanding.insert(ticket.seq);
        self.dispatcher.dispatch(ticket, request);
        ticket
    }
}

/// Metadata fetches for the tooltip cache, routed through the outbox.
struct MetadataRequests<'a, D> {
    outbox: &'a mut Outbox<D>,
    kind: EntityKind,
}

impl<D: Dispatcher> MetadataSource for MetadataRequests<'_, D> {
    fn fetch_metadata(&mut self, id: &EntityId) {
        self.outbox.send(FetchRequest::Metadata {
            kind: self.kind,
            id: id.clone(),
        });
    }
}

/// Route binding composer, generic over the binding variant and the way
/// requests are run.
pub struct Composer<S: BindingStore, D: Dispatcher> {
    config: Option<ComposerConfig>,
    store: S,
    catalog: ClassificationCatalog,
    viewport: Viewport,
    cache: MetadataCache,
    crossings: Vec<CrossingDto>,
    selected_crossing: Option<EntityId>,
    outbox: Outbox<D>,
    bindings_loaded: bool,
    /// The bindings were decoded into the store; edits and submit are
    /// refused until then
    bindings_hydrated: bool,
    /// An explicit region request moved the camera; the route region must
    /// not override it
    region_requested: bool,
    submit: SubmitStatus,
    advancing: bool,
    notices: Vec<Notice>,
    /// Reads that failed and can be sent again
    failed: Vec<FetchRequest>,
    navigation: Option<Navigation>,
    frames: FrameFactory,
    /// Trip animation of the mounted route
    animation: Option<AnimationHandle>,
}

impl<S: BindingStore + Default, D: Dispatcher> Composer<S, D> {
    /// Create an unmounted composer.
    pub fn new(dispatcher: D) -> Self {
        Self {
            config: None,
            store: S::default(),
            catalog: ClassificationCatalog::new(),
            viewport: Viewport::default(),
            cache: MetadataCache::new(),
            crossings: Vec::new(),
            selected_crossing: None,
            outbox: Outbox {
                dispatcher,
                session: 0,
                next_seq: 0,
                outstanding: HashSet::new(),
            },
            bindings_loaded: false,
            bindings_hydrated: false,
            region_requested: false,
            submit: SubmitStatus::Idle,
            advancing: false,
            notices: Vec::new(),
            failed: Vec::new(),
            navigation: None,
            frames: Box::new(|| -> Box<dyn FrameSource + Send> {
                Box::new(IntervalFrames::default())
            }),
            animation: None,
        }
    }

    /// Use `frames` to pace the trip animation of every later mount.
    pub fn with_frames<F, Src>(mut self, frames: F) -> Self
    where
        F: Fn() -> Src + 'static,
        Src: FrameSource + Send + 'static,
    {
        self.frames = Box::new(move || -> Box<dyn FrameSource + Send> { Box::new(frames()) });
        self
    }

    /// Load a route. Any previous session is discarded and its pending
    /// results will be dropped on arrival.
    pub fn mount(&mut self, config: ComposerConfig) {
        self.outbox.session += 1;
        self.outbox.outstanding.clear();
        self.reset();
        log::info!(
            "📂 Mounting {} composer for route {} (session {})",
            S::KIND.name(),
            config.route_id,
            self.outbox.session
        );

        let route = config.route_id.clone();
        self.outbox.send(FetchRequest::Bindings {
            route: route.clone(),
            show_duplicates: config.show_duplicates,
        });
        self.outbox.send(FetchRequest::RouteRegion {
            route: route.clone(),
        });
        self.outbox.send(FetchRequest::Crossings { route });
        if S::KIND == EntityKind::Lsa {
            self.outbox
                .send(FetchRequest::Enumeration(EnumKind::Constellation));
            self.outbox.send(FetchRequest::Enumeration(EnumKind::RouteError));
        }
        self.config = Some(config);

        self.animation = match AnimationHandle::spawn((self.frames)()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Trip animation not started: {}", e);
                None
            }
        };
    }

    /// Tear down the session. Results still in flight are dropped.
    pub fn unmount(&mut self) {
        if let Some(config) = self.config.take() {
            log::info!("Unmounting composer for route {}", config.route_id);
        }
        self.outbox.outstanding.clear();
        self.cache.clear();
        self.animation = None;
    }

    fn reset(&mut self) {
        self.animation = None;
        self.store = S::default();
        self.catalog.clear();
        self.viewport = Viewport::with_size(self.viewport.width, self.viewport.height);
        self.cache.clear();
        self.crossings.clear();
        self.selected_crossing = None;
        self.bindings_loaded = false;
        self.bindings_hydrated = false;
        self.region_requested = false;
        self.submit = SubmitStatus::Idle;
        self.advancing = false;
        self.notices.clear();
        self.failed.clear();
        self.navigation = None;
    }
}

impl<S: BindingStore, D: Dispatcher> Composer<S, D> {
    /// Whether a route is mounted.
    pub fn is_mounted(&self) -> bool {
        self.config.is_some()
    }

    /// Session config, if mounted.
    pub fn config(&self) -> Option<&ComposerConfig> {
        self.config.as_ref()
    }

    /// The binding store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetched enumerations.
    pub fn catalog(&self) -> &ClassificationCatalog {
        &self.catalog
    }

    /// Current camera.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The request runner.
    pub fn dispatcher(&self) -> &D {
        &self.outbox.dispatcher
    }

    /// The request runner, mutably.
    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.outbox.dispatcher
    }

    /// Number of requests of this session not yet applied.
    pub fn outstanding(&self) -> usize {
        self.outbox.outstanding.len()
    }

    fn mounted(&self) -> Result<&ComposerConfig, ComposerError> {
        self.config.as_ref().ok_or(ComposerError::NotMounted)
    }

    /// A submit or advance is in flight.
    fn is_locked(&self) -> bool {
        self.submit == SubmitStatus::InFlight || self.advancing
    }

    fn ensure_editable(&self) -> Result<(), ComposerError> {
        self.mounted()?;
        if self.is_locked() {
            return Err(ComposerError::Locked);
        }
        if !self.bindings_hydrated {
            return Err(ComposerError::NotLoaded);
        }
        Ok(())
    }

    /// Cancellation token of the running trip animation.
    pub fn animation_token(&self) -> Option<CancelToken> {
        self.animation.as_ref().map(|a| a.token().clone())
    }

    /// Current trip animation position, `None` when unmounted.
    pub fn trip_progress(&self) -> Option<TripProgress> {
        self.animation.as_ref().map(AnimationHandle::progress)
    }

    /// Map click on a candidate geometry.
    pub fn click_entity(&mut self, id: &EntityId) -> Result<BindingState, ComposerError> {
        self.ensure_editable()?;
        Ok(self.store.toggle_by_interaction(id))
    }

    /// List checkbox click.
    pub fn toggle_checkbox(&mut self, id: &EntityId) -> Result<BindingState, ComposerError> {
        self.ensure_editable()?;
        Ok(self.store.toggle_confirmed_by_checkbox(id))
    }

    /// List remove button. Returns false if the entity was not bound.
    pub fn remove(&mut self, id: &EntityId) -> Result<bool, ComposerError> {
        self.ensure_editable()?;
        let removed = self.store.remove(id);
        if removed {
            log::debug!("Removed {} {}", S::KIND.name(), id);
        }
        Ok(removed)
    }

    /// Move the camera to a region.
    pub fn show_region(&mut self, region: &Region) -> Viewport {
        if region.is_finite() {
            self.region_requested = true;
        }
        self.viewport = viewport_fit::fit(&self.viewport, region);
        self.viewport
    }

    /// List item click: fetch the entity's own extent and move the camera
    /// there once it arrives.
    pub fn focus_entity(&mut self, id: &EntityId) -> Result<(), ComposerError> {
        self.mounted()?;
        self.outbox.send(FetchRequest::EntityRegion {
            kind: S::KIND,
            id: id.clone(),
        });
        Ok(())
    }

    /// Crossing bar click.
    pub fn select_crossing(&mut self, id: &EntityId) -> Result<Viewport, ComposerError> {
        let region = self
            .crossings
            .iter()
            .find(|c| &c.id == id)
            .map(Region::from)
            .ok_or_else(|| ComposerError::UnknownCrossing(id.clone()))?;
        self.selected_crossing = Some(id.clone());
        Ok(self.show_region(&region))
    }

    /// Tooltip lookup for a hovered entity.
    pub fn hover(&mut self, id: &EntityId) -> CacheLookup {
        if !self.is_mounted() {
            return CacheLookup::Pending;
        }
        let mut source = MetadataRequests {
            outbox: &mut self.outbox,
            kind: S::KIND,
        };
        self.cache.get(id, &mut source)
    }

    /// The map canvas changed size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = self.viewport.resized(width, height);
    }

    /// Send the bindings to the backend. Controls stay locked until the
    /// result is applied.
    pub fn submit(&mut self) -> Result<(), ComposerError> {
        self.ensure_editable()?;
        let config = self.mounted()?;
        let request = FetchRequest::Submit {
            route: config.route_id.clone(),
            map_data: config.map_data.clone(),
            body: self.store.snapshot_json()?,
        };
        log::info!(
            "Submitting {} {} bindings for route {}",
            self.store.len(),
            S::KIND.name(),
            config.route_id
        );
        self.outbox.send(request);
        self.submit = SubmitStatus::InFlight;
        Ok(())
    }

    /// Ask for the route after this one. The target becomes available
    /// through [`take_navigation`](Self::take_navigation).
    pub fn advance(&mut self) -> Result<(), ComposerError> {
        let route = self.mounted()?.route_id.clone();
        if self.is_locked() {
            return Err(ComposerError::Locked);
        }
        self.outbox.send(FetchRequest::NextRoute { route });
        self.advancing = true;
        Ok(())
    }

    /// Send every failed read again and forget failed tooltip lookups, so
    /// the next hover fetches them. Returns the number of requests sent.
    pub fn retry_failed(&mut self) -> usize {
        if !self.is_mounted() {
            return 0;
        }
        let failed = std::mem::take(&mut self.failed);
        let count = failed.len();
        let forgotten = self.cache.retry_all();
        if forgotten > 0 {
            log::debug!("Forgot {} failed tooltip lookups", forgotten);
        }
        for request in failed {
            let key = request.label();
            self.notices.retain(|n| n.key != key);
            log::info!("Retrying {}", key);
            self.outbox.send(request);
        }
        count
    }

    /// Navigation target produced by a successful advance.
    pub fn take_navigation(&mut self) -> Option<Navigation> {
        self.navigation.take()
    }

    /// Apply a finished request. Returns false if the result was dropped
    /// because it belongs to another session.
    pub fn apply(&mut self, result: FetchResult) -> bool {
        let FetchResult {
            ticket,
            request,
            outcome,
        } = result;

        if !self.is_mounted() || ticket.session != self.outbox.session {
            log::debug!(
                "Dropping stale result for {} (session {}, current {})",
                request.label(),
                ticket.session,
                self.outbox.session
            );
            return false;
        }
        self.outbox.outstanding.remove(&ticket.seq);

        match outcome {
            Ok(outcome) => self.apply_outcome(request, outcome),
            Err(e) => self.apply_failure(request, e),
        }
        true
    }

    fn apply_outcome(&mut self, request: FetchRequest, outcome: FetchOutcome) {
        match (request, outcome) {
            (request @ FetchRequest::Bindings { .. }, FetchOutcome::Bindings(value)) => {
                self.bindings_loaded = true;
                match self.store.hydrate_json(value) {
                    Ok(()) => self.bindings_hydrated = true,
                    Err(e) => {
                        let key = request.label();
                        self.push_notice(Notice::error(
                            key.clone(),
                            format!("Could not read the {}: {}", key, e),
                        ));
                        self.failed.push(request);
                    }
                }
                self.focus_configured_entity();
            }
            (FetchRequest::RouteRegion { .. }, FetchOutcome::Region(region)) => {
                if self.region_requested {
                    log::debug!("Route region arrived after an explicit region, ignored");
                } else {
                    self.viewport = viewport_fit::fit(&self.viewport, &Region::from(region));
                }
            }
            (FetchRequest::EntityRegion { .. }, FetchOutcome::Region(region)) => {
                self.show_region(&Region::from(region));
            }
            (FetchRequest::Crossings { .. }, FetchOutcome::Crossings(crossings)) => {
                log::debug!("{} crossings near the route", crossings.len());
                self.crossings = crossings;
            }
            (FetchRequest::Enumeration(kind), FetchOutcome::Enumeration(entries)) => {
                self.catalog.load(ClassificationField::from(kind), entries);
            }
            (FetchRequest::Metadata { id, .. }, FetchOutcome::Metadata(value)) => {
                self.cache.complete(&id, Ok(value));
            }
            (FetchRequest::Submit { map_data, .. }, FetchOutcome::Submitted) => {
                self.submit = SubmitStatus::Succeeded;
                let label = map_data.as_deref().unwrap_or(crate::constants::DEFAULT_MAP_DATA_LABEL);
                self.push_notice(Notice::success(
                    "submit",
                    format!("Route bindings submitted ({})", label),
                ));
            }
            (FetchRequest::NextRoute { .. }, FetchOutcome::NextRoute(next)) => {
                self.advancing = false;
                match next.next_route {
                    Some(route_id) => {
                        log::info!("Next route is {}", route_id);
                        self.navigation = Some(Navigation { route_id });
                    }
                    None => {
                        self.push_notice(Notice::info("next_route", "No further route"));
                    }
                }
            }
            (request, outcome) => {
                log::warn!(
                    "Unexpected response to {}: {:?}",
                    request.label(),
                    outcome
                );
            }
        }
    }

    fn apply_failure(&mut self, request: FetchRequest, error: ApiError) {
        log::warn!("Request for {} failed: {}", request.label(), error);
        match request {
            FetchRequest::Metadata { id, .. } => {
                self.cache.complete(&id, Err(error.to_string()));
            }
            FetchRequest::Submit { .. } => {
                self.submit = SubmitStatus::Failed(error.to_string());
                self.push_notice(Notice::error(
                    "submit",
                    format!("Submitting the bindings failed: {}", error),
                ));
            }
            FetchRequest::NextRoute { .. } => {
                self.advancing = false;
                self.push_notice(Notice::error(
                    "next_route",
                    format!("Could not find the next route: {}", error),
                ));
            }
            request => {
                if matches!(request, FetchRequest::Bindings { .. }) {
                    self.bindings_loaded = true;
                }
                let key = request.label();
                let message = if error.is_transient() {
                    format!("Loading {} failed: {}, retry to send it again", key, error)
                } else {
                    format!("Loading {} failed: {}", key, error)
                };
                self.push_notice(Notice::error(key.clone(), message));
                self.failed.push(request);
            }
        }
    }

    fn focus_configured_entity(&mut self) {
        if S::KIND != EntityKind::Lsa {
            return;
        }
        let Some(id) = self.config.as_ref().and_then(|c| c.lsa_id.clone()) else {
            return;
        };
        log::debug!("Focusing configured LSA {}", id);
        self.outbox.send(FetchRequest::EntityRegion { kind: S::KIND, id });
    }

    fn push_notice(&mut self, notice: Notice) {
        self.notices.retain(|n| n.key != notice.key);
        self.notices.push(notice);
    }

    /// Drop every notice.
    pub fn dismiss_notices(&mut self) {
        self.notices.clear();
    }

    /// Derived state for drawing.
    pub fn view(&self) -> ComposerView {
        let rows = self
            .store
            .entries()
            .into_iter()
            .map(|(id, state)| EntityRow::build(&self.store, &self.catalog, id, state))
            .collect();
        let crossings = self
            .crossings
            .iter()
            .map(|c| CrossingRow::build(c, self.selected_crossing.as_ref()))
            .collect();
        let label = self
            .config
            .as_ref()
            .map_or(crate::constants::DEFAULT_MAP_DATA_LABEL, |c| c.map_data_label());

        ComposerView {
            kind: S::KIND,
            route_id: self.config.as_ref().map(|c| c.route_id.clone()),
            rows,
            crossings,
            viewport: self.viewport,
            satellite_url: viewport_fit::satellite_url(&self.viewport),
            loading: !self.outbox.outstanding.is_empty(),
            bindings_loaded: self.bindings_loaded,
            submit: self.submit.clone(),
            locked: self.is_locked(),
            editable: self.bindings_hydrated && !self.is_locked(),
            trip_progress: self.trip_progress().map(|p| p.value()),
            submit_label: format!("Submit Route Bindings ({})", label),
            notices: self.notices.clone(),
        }
    }
}

impl<D: Dispatcher> Composer<LsaBindings, D> {
    /// Set a classification of a bound LSA from the fetched enumerations.
    pub fn set_classification(
        &mut self,
        id: &EntityId,
        field: ClassificationField,
        value: Option<i64>,
    ) -> Result<bool, ComposerError> {
        self.ensure_editable()?;
        Ok(self
            .store
            .set_classification(id, field, value, &self.catalog)?)
    }
}

impl<S: BindingStore> Composer<S, FetchWorker> {
    /// Apply every result the worker has finished. Returns how many were
    /// applied to this session.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(result) = self.outbox.dispatcher.take_one_result() {
            if self.apply(result) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until every request of this session is applied or `timeout`
    /// passes without a result. Returns false on timeout.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        while !self.outbox.outstanding.is_empty() {
            match self.outbox.dispatcher.wait_result(timeout) {
                Some(result) => {
                    self.apply(result);
                }
                None => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests;
