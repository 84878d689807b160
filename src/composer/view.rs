//! Derived state handed to the presentation layer.
//!
//! Everything here is recomputed from the composer on demand and owns its
//! data, so a view can outlive the next mutation.

use composer_api::{CrossingDto, EntityId, EntityKind, RouteId};

use crate::binding::{
    BindingColor, BindingState, BindingStore, ClassificationCatalog, ClassificationField,
};
use crate::constants::colors;
use crate::model::Viewport;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Neutral information, e.g. "no further route"
    Info,
    /// An action completed
    Success,
    /// A request failed
    Error,
}

/// A message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// What the notice is about; a newer notice with the same key replaces
    /// the older one
    pub key: String,
    /// Severity
    pub level: NoticeLevel,
    /// Human readable text
    pub message: String,
}

impl Notice {
    pub fn info(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// State of the last submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmitStatus {
    /// Nothing submitted yet in this session
    #[default]
    Idle,
    /// Waiting for the backend; controls are locked
    InFlight,
    /// The backend accepted the bindings
    Succeeded,
    /// The backend rejected the bindings or could not be reached
    Failed(String),
}

/// One bound entity in the side list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub id: EntityId,
    pub state: BindingState,
    pub color: BindingColor,
    /// Checkbox tint
    pub tint: &'static str,
    /// Constellation label (LSA only)
    pub constellation: Option<String>,
    /// Route error label (LSA only)
    pub route_error: Option<String>,
}

impl EntityRow {
    pub(crate) fn build<S: BindingStore>(
        store: &S,
        catalog: &ClassificationCatalog,
        id: EntityId,
        state: BindingState,
    ) -> Self {
        let label = |field| {
            (S::KIND == EntityKind::Lsa)
                .then(|| catalog.label(field, store.classification(&id, field)))
        };
        Self {
            constellation: label(ClassificationField::Constellation),
            route_error: label(ClassificationField::RouteError),
            tint: if state.is_confirmed() {
                colors::CHECKBOX_CONFIRMED
            } else {
                colors::CHECKBOX_UNCONFIRMED
            },
            color: state.color(),
            state,
            id,
        }
    }
}

/// A crossing in the crossing bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossingRow {
    pub id: EntityId,
    /// Signal groups of the crossing
    pub sgs: u32,
    /// Last crossing the operator jumped to
    pub selected: bool,
}

impl CrossingRow {
    pub(crate) fn build(crossing: &CrossingDto, selected: Option<&EntityId>) -> Self {
        Self {
            id: crossing.id.clone(),
            sgs: crossing.sgs,
            selected: selected == Some(&crossing.id),
        }
    }
}

/// Everything the presentation layer needs to draw the composer.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerView {
    /// Entity kind being bound
    pub kind: EntityKind,
    /// Mounted route, `None` when unmounted
    pub route_id: Option<RouteId>,
    /// Bound entities in list order
    pub rows: Vec<EntityRow>,
    /// Crossings near the route
    pub crossings: Vec<CrossingRow>,
    /// Current camera
    pub viewport: Viewport,
    /// Satellite link for the camera center
    pub satellite_url: String,
    /// Some request is outstanding
    pub loading: bool,
    /// The bindings request has been answered
    pub bindings_loaded: bool,
    /// Last submission
    pub submit: SubmitStatus,
    /// A submit or advance is in flight; mutations are rejected
    pub locked: bool,
    /// The bindings are loaded and nothing is in flight, so the operator
    /// may edit and submit
    pub editable: bool,
    /// Trip animation position in `[0, 120)`, `None` when unmounted
    pub trip_progress: Option<f32>,
    /// Caption of the submit button, e.g. `Submit Route Bindings (osm)`
    pub submit_label: String,
    /// Notices, oldest first
    pub notices: Vec<Notice>,
}

impl ComposerView {
    /// Row of an entity, if bound.
    pub fn row(&self, id: &EntityId) -> Option<&EntityRow> {
        self.rows.iter().find(|row| &row.id == id)
    }

    /// Notices of the given level.
    pub fn notices_of(&self, level: NoticeLevel) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |n| n.level == level)
    }

    /// Whether any error notice is shown.
    pub fn has_errors(&self) -> bool {
        self.notices_of(NoticeLevel::Error).next().is_some()
    }
}
