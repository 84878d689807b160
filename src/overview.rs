//! Overview of all bindings across routes.
//!
//! Lists every constellation and route error with the bindings tagged by it,
//! and shows the two health check reports that compare the `.json` file store
//! with the database.

use std::collections::{HashMap, HashSet};

use composer_api::{
    EnumEntry, EnumKind, HealthCheckEntry, HealthSide, SerializedBinding, encode_query,
};

use crate::constants::{DEFAULT_MAP_DATA_LABEL, colors};
use crate::fetch::{Dispatcher, FetchOutcome, FetchRequest, FetchResult, Ticket};

/// A binding listed below an enumeration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRow {
    /// `Route: {route} - LSA: {lsa}`
    pub title: String,
    /// `Binding-ID: {pk}`
    pub subtitle: String,
    /// Row tint by confirmation
    pub tint: &'static str,
    /// Composer link focusing the bound LSA
    pub link: String,
}

impl BindingRow {
    fn build(binding: &SerializedBinding) -> Self {
        let fields = &binding.fields;
        Self {
            title: format!("Route: {} - LSA: {}", fields.route, fields.lsa),
            subtitle: format!("Binding-ID: {}", binding.pk),
            tint: if fields.confirmed {
                colors::OVERVIEW_CONFIRMED
            } else {
                colors::OVERVIEW_UNCONFIRMED
            },
            link: format!(
                "composer?{}",
                encode_query(&[
                    ("route_id", fields.route.as_str()),
                    ("lsa_id", fields.lsa.as_str())
                ])
            ),
        }
    }
}

/// A constellation or route error with its binding count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub kind: EnumKind,
    pub pk: i64,
    /// `{custom_id} - Count: {n} - {name}`
    pub title: String,
    pub description: String,
    /// Number of tagged bindings, zero until the stats arrive
    pub count: usize,
    pub expanded: bool,
    /// Tagged bindings; empty unless expanded
    pub bindings: Vec<BindingRow>,
}

/// One row of a health check report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRow {
    /// e.g. `Not in database: Route: 4 - LSA: 17`
    pub title: String,
    /// `Binding-ID: {id}`
    pub subtitle: String,
    /// Yellow when different, red when missing
    pub tint: &'static str,
}

impl HealthRow {
    fn build(side: HealthSide, entry: &HealthCheckEntry) -> Self {
        let label = match (side, entry.present) {
            (HealthSide::Files, true) => "Different in database:",
            (HealthSide::Files, false) => "Not in database:",
            (HealthSide::Database, true) => "Different in .json files:",
            (HealthSide::Database, false) => "Not in .json files:",
        };
        Self {
            title: format!(
                "{} Route: {} - LSA: {}",
                label, entry.binding.route, entry.binding.lsa
            ),
            subtitle: format!("Binding-ID: {}", entry.binding.id),
            tint: if entry.present {
                colors::HEALTH_DIFFERENT
            } else {
                colors::HEALTH_MISSING
            },
        }
    }
}

/// Everything the overview page draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewView {
    /// Page heading with the dataset label
    pub title: String,
    /// Some request is outstanding; refresh and health check buttons are
    /// disabled
    pub loading: bool,
    pub constellations: Vec<EntryRow>,
    pub route_errors: Vec<EntryRow>,
    /// In `.json` files but missing or different in the database
    pub files_report: Vec<HealthRow>,
    /// In the database but missing or different in `.json` files
    pub database_report: Vec<HealthRow>,
    /// Failed requests
    pub errors: Vec<String>,
}

/// Overview page state.
pub struct Overview<D: Dispatcher> {
    map_data: Option<String>,
    dispatcher: D,
    generation: u64,
    next_seq: u64,
    outstanding: HashSet<u64>,
    constellations: Vec<EnumEntry>,
    route_errors: Vec<EnumEntry>,
    stats: HashMap<(EnumKind, i64), Vec<SerializedBinding>>,
    /// Stats requests still outstanding per enumeration
    pending_stats: HashMap<EnumKind, usize>,
    expanded: HashSet<(EnumKind, i64)>,
    files_report: Vec<HealthCheckEntry>,
    database_report: Vec<HealthCheckEntry>,
    errors: Vec<String>,
}

impl<D: Dispatcher> Overview<D> {
    /// Create the overview for a dataset (`None` is the default dataset).
    pub fn new(dispatcher: D, map_data: Option<String>) -> Self {
        Self {
            map_data,
            dispatcher,
            generation: 0,
            next_seq: 0,
            outstanding: HashSet::new(),
            constellations: Vec::new(),
            route_errors: Vec::new(),
            stats: HashMap::new(),
            pending_stats: HashMap::new(),
            expanded: HashSet::new(),
            files_report: Vec::new(),
            database_report: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The request runner, mutably.
    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    fn send(&mut self, request: FetchRequest) {
        self.next_seq += 1;
        let ticket = Ticket {
            session: self.generation,
            seq: self.next_seq,
        };
        self.outstanding.insert(ticket.seq);
        self.dispatcher.dispatch(ticket, request);
    }

    /// Reload both enumerations, their stats and both health checks.
    /// Results of an earlier refresh that are still in flight are dropped.
    pub fn refresh(&mut self) {
        self.generation += 1;
        self.outstanding.clear();
        self.pending_stats.clear();
        self.errors.clear();
        log::info!("🔄 Refreshing binding overview");
        self.send(FetchRequest::Enumeration(EnumKind::Constellation));
        self.send(FetchRequest::Enumeration(EnumKind::RouteError));
    }

    /// Run the file store health check.
    pub fn check_files(&mut self) {
        self.send(FetchRequest::HealthCheck {
            side: HealthSide::Files,
            map_data: self.map_data.clone(),
        });
    }

    /// Run the database health check.
    pub fn check_database(&mut self) {
        self.send(FetchRequest::HealthCheck {
            side: HealthSide::Database,
            map_data: self.map_data.clone(),
        });
    }

    /// Expand or collapse the binding list of an entry.
    pub fn toggle_expanded(&mut self, kind: EnumKind, pk: i64) -> bool {
        let key = (kind, pk);
        if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        }
    }

    /// Whether a request is outstanding.
    pub fn is_loading(&self) -> bool {
        !self.outstanding.is_empty()
    }

    /// Apply a finished request. Returns false if it belongs to an earlier
    /// refresh.
    pub fn apply(&mut self, result: FetchResult) -> bool {
        let FetchResult {
            ticket,
            request,
            outcome,
        } = result;
        if ticket.session != self.generation || !self.outstanding.remove(&ticket.seq) {
            log::debug!("Dropping stale overview result for {}", request.label());
            return false;
        }

        match (request, outcome) {
            (FetchRequest::Enumeration(kind), Ok(FetchOutcome::Enumeration(entries))) => {
                self.load_enumeration(kind, entries);
            }
            (FetchRequest::EnumerationStats { kind, pk }, Ok(FetchOutcome::Stats(bindings))) => {
                self.stats.insert((kind, pk), bindings);
                self.stats_done(kind);
            }
            (FetchRequest::HealthCheck { side, .. }, Ok(FetchOutcome::Health(entries))) => {
                log::info!("{:?} health check: {} findings", side, entries.len());
                match side {
                    HealthSide::Files => self.files_report = entries,
                    HealthSide::Database => self.database_report = entries,
                }
            }
            (request, Ok(outcome)) => {
                log::warn!("Unexpected response to {}: {:?}", request.label(), outcome);
            }
            (request, Err(e)) => {
                log::warn!("Overview request for {} failed: {}", request.label(), e);
                self.errors
                    .push(format!("Loading {} failed: {}", request.label(), e));
                if let FetchRequest::EnumerationStats { kind, .. } = request {
                    self.stats_done(kind);
                }
            }
        }
        true
    }

    fn load_enumeration(&mut self, kind: EnumKind, entries: Vec<EnumEntry>) {
        self.stats.retain(|(k, _), _| *k != kind);
        let pks: Vec<i64> = entries.iter().map(|e| e.pk).collect();
        match kind {
            EnumKind::Constellation => self.constellations = entries,
            EnumKind::RouteError => self.route_errors = entries,
        }
        if pks.is_empty() {
            return;
        }
        self.pending_stats.insert(kind, pks.len());
        for pk in pks {
            self.send(FetchRequest::EnumerationStats { kind, pk });
        }
    }

    fn stats_done(&mut self, kind: EnumKind) {
        let Some(pending) = self.pending_stats.get_mut(&kind) else {
            return;
        };
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.pending_stats.remove(&kind);
            self.check_files();
            self.check_database();
        }
    }

    fn entry_rows(&self, kind: EnumKind, entries: &[EnumEntry]) -> Vec<EntryRow> {
        entries
            .iter()
            .map(|entry| {
                let bindings = self.stats.get(&(kind, entry.pk));
                let count = bindings.map_or(0, Vec::len);
                let expanded = self.expanded.contains(&(kind, entry.pk));
                EntryRow {
                    kind,
                    pk: entry.pk,
                    title: format!(
                        "{} - Count: {} - {}",
                        entry.fields.custom_id, count, entry.fields.name
                    ),
                    description: entry.fields.description.clone(),
                    count,
                    expanded,
                    bindings: match bindings {
                        Some(list) if expanded => list.iter().map(BindingRow::build).collect(),
                        _ => Vec::new(),
                    },
                }
            })
            .collect()
    }

    /// Derived state for drawing.
    pub fn view(&self) -> OverviewView {
        OverviewView {
            title: format!(
                "Overview of the created bindings ({}):",
                self.map_data.as_deref().unwrap_or(DEFAULT_MAP_DATA_LABEL)
            ),
            loading: self.is_loading(),
            constellations: self.entry_rows(EnumKind::Constellation, &self.constellations),
            route_errors: self.entry_rows(EnumKind::RouteError, &self.route_errors),
            files_report: self
                .files_report
                .iter()
                .map(|e| HealthRow::build(HealthSide::Files, e))
                .collect(),
            database_report: self
                .database_report
                .iter()
                .map(|e| HealthRow::build(HealthSide::Database, e))
                .collect(),
            errors: self.errors.clone(),
        }
    }
}

impl Overview<crate::fetch::FetchWorker> {
    /// Block until nothing is outstanding or `timeout` passes without a
    /// result. Returns false on timeout.
    pub fn settle(&mut self, timeout: std::time::Duration) -> bool {
        while self.is_loading() {
            match self.dispatcher.wait_result(timeout) {
                Some(result) => {
                    self.apply(result);
                }
                None => return false,
            }
        }
        true
    }
}
