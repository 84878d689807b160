//! Line commands of the interactive composer session and text rendering of
//! the composer and overview views.

use std::fmt::Write as _;

use composer_api::EntityId;
use thiserror::Error;

use crate::binding::ClassificationField;
use crate::composer::{ComposerView, NoticeLevel, SubmitStatus};
use crate::metadata_cache::{CacheLookup, TooltipSummary};
use crate::overview::{EntryRow, OverviewView};

/// One operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Map click on an entity
    Click(EntityId),
    /// List checkbox of an entity
    Check(EntityId),
    /// List remove button
    Remove(EntityId),
    /// Move the camera to an entity
    Focus(EntityId),
    /// Move the camera to a crossing
    Crossing(EntityId),
    /// Tooltip of an entity
    Hover(EntityId),
    /// Set or clear an LSA classification
    Classify {
        id: EntityId,
        field: ClassificationField,
        value: Option<i64>,
    },
    /// List constellations and route errors
    Catalog,
    /// Resize the map canvas
    Resize(u32, u32),
    Submit,
    /// Go to the next route
    Next,
    /// Send failed requests again
    Retry,
    /// Print the current state
    Show,
    Help,
    Quit,
}

/// A line that is not a valid command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("'{0}' expects {1}")]
    Usage(&'static str, &'static str),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
}

/// Help text of the interactive session.
pub const HELP: &str = "\
Commands:
  click <id>                 map click (add, confirm, remove)
  check <id>                 toggle confirmation of a bound entity
  remove <id>                remove a bound entity
  focus <id>                 move the camera to an entity
  crossing <id>              move the camera to a crossing
  hover <id>                 show the tooltip of an entity
  class <id> constellation|error <pk|none>
                             set an LSA classification
  catalog                    list constellations and route errors
  resize <width> <height>    resize the map canvas
  submit                     submit the bindings
  next                       go to the next route
  retry                      retry failed requests
  show                       print the current state
  quit";

impl SessionCommand {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?;
        let args: Vec<&str> = words.collect();

        let id = |usage: &'static str| -> Result<EntityId, CommandError> {
            match args.as_slice() {
                [id] => Ok(EntityId::from(*id)),
                _ => Err(CommandError::Usage(usage, "one id")),
            }
        };

        match name.to_lowercase().as_str() {
            "click" | "c" => Ok(Self::Click(id("click")?)),
            "check" | "x" => Ok(Self::Check(id("check")?)),
            "remove" | "rm" => Ok(Self::Remove(id("remove")?)),
            "focus" | "f" => Ok(Self::Focus(id("focus")?)),
            "crossing" => Ok(Self::Crossing(id("crossing")?)),
            "hover" | "h" => Ok(Self::Hover(id("hover")?)),
            "class" => match args.as_slice() {
                [id, field, value] => Ok(Self::Classify {
                    id: EntityId::from(*id),
                    field: parse_field(field)?,
                    value: parse_optional_pk(value)?,
                }),
                _ => Err(CommandError::Usage(
                    "class",
                    "an id, constellation|error and a pk or none",
                )),
            },
            "catalog" => Ok(Self::Catalog),
            "resize" => match args.as_slice() {
                [w, h] => Ok(Self::Resize(parse_number(w)?, parse_number(h)?)),
                _ => Err(CommandError::Usage("resize", "a width and a height")),
            },
            "submit" => Ok(Self::Submit),
            "next" => Ok(Self::Next),
            "retry" => Ok(Self::Retry),
            "show" | "ls" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_field(word: &str) -> Result<ClassificationField, CommandError> {
    match word {
        "constellation" | "c" => Ok(ClassificationField::Constellation),
        "error" | "route_error" | "e" => Ok(ClassificationField::RouteError),
        _ => Err(CommandError::Usage("class", "constellation or error")),
    }
}

fn parse_optional_pk(word: &str) -> Result<Option<i64>, CommandError> {
    if word == "none" || word == "-" {
        Ok(None)
    } else {
        parse_number(word).map(Some)
    }
}

fn parse_number<T: std::str::FromStr>(word: &str) -> Result<T, CommandError> {
    word.parse()
        .map_err(|_| CommandError::InvalidNumber(word.to_string()))
}

/// Render the composer view as text.
pub fn render_composer(view: &ComposerView) -> String {
    let mut out = String::new();
    let route = view
        .route_id
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let _ = writeln!(out, "Route {} ({} bindings)", route, view.kind.name());
    if view.loading {
        let _ = writeln!(out, "  loading...");
    } else if !view.editable && !view.locked {
        let _ = writeln!(out, "  read only until the bindings load, try 'retry'");
    }

    if view.rows.is_empty() {
        let _ = writeln!(out, "  no {} bound", view.kind.name());
    }
    for row in &view.rows {
        let mark = if row.state.is_confirmed() { "x" } else { " " };
        let _ = write!(out, "  [{}] {} {} ({})", mark, view.kind.name(), row.id, row.color.name());
        if let (Some(constellation), Some(route_error)) = (&row.constellation, &row.route_error) {
            let _ = write!(out, " constellation: {} error: {}", constellation, route_error);
        }
        out.push('\n');
    }

    if !view.crossings.is_empty() {
        let crossings: Vec<String> = view
            .crossings
            .iter()
            .map(|c| {
                let marker = if c.selected { "*" } else { "" };
                format!("{}{} ({} SGs)", marker, c.id, c.sgs)
            })
            .collect();
        let _ = writeln!(out, "  crossings: {}", crossings.join(", "));
    }

    let vp = &view.viewport;
    let _ = writeln!(
        out,
        "  camera: {:.6}, {:.6} zoom {:.2} ({}x{})",
        vp.latitude, vp.longitude, vp.zoom, vp.width, vp.height
    );
    let _ = writeln!(out, "  satellite: {}", view.satellite_url);
    if let Some(progress) = view.trip_progress {
        let _ = writeln!(out, "  trip: {:.0}", progress);
    }

    let status = match &view.submit {
        SubmitStatus::Idle => None,
        SubmitStatus::InFlight => Some("submitting...".to_string()),
        SubmitStatus::Succeeded => Some("submitted".to_string()),
        SubmitStatus::Failed(e) => Some(format!("submit failed: {}", e)),
    };
    let _ = match status {
        Some(status) => writeln!(out, "  [{}] {}", view.submit_label, status),
        None => writeln!(out, "  [{}]", view.submit_label),
    };

    for notice in &view.notices {
        let prefix = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        let _ = writeln!(out, "  {}: {}", prefix, notice.message);
    }
    out
}

/// Render a tooltip lookup as text.
pub fn render_tooltip(kind: composer_api::EntityKind, lookup: &CacheLookup) -> String {
    match lookup {
        CacheLookup::Fresh(data) => {
            let summary = TooltipSummary::from_metadata(data);
            format!("{}\n{}", summary.title(kind), summary.detail())
        }
        CacheLookup::Pending => "loading...".to_string(),
        CacheLookup::Failed(message) => format!("unavailable: {} (retry to fetch again)", message),
    }
}

fn render_entries(out: &mut String, heading: &str, rows: &[EntryRow]) {
    let _ = writeln!(out, "{}", heading);
    for row in rows {
        let _ = writeln!(out, "  {}", row.title);
        if !row.description.is_empty() {
            let _ = writeln!(out, "    {}", row.description);
        }
        for binding in &row.bindings {
            let _ = writeln!(out, "    {} ({}) {}", binding.title, binding.subtitle, binding.link);
        }
    }
}

/// Render the overview as text.
pub fn render_overview(view: &OverviewView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    render_entries(&mut out, "Constellations", &view.constellations);
    render_entries(&mut out, "Route Errors", &view.route_errors);

    let _ = writeln!(
        out,
        "Bindings in .json files but not in database (or different in database)"
    );
    for row in &view.files_report {
        let _ = writeln!(out, "  {} ({})", row.title, row.subtitle);
    }
    let _ = writeln!(
        out,
        "Bindings in database but not in .json files (or different in .json files)"
    );
    for row in &view.database_report {
        let _ = writeln!(out, "  {} ({})", row.title, row.subtitle);
    }
    for error in &view.errors {
        let _ = writeln!(out, "error: {}", error);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            SessionCommand::parse("click 12"),
            Ok(SessionCommand::Click(EntityId::from(12)))
        );
        assert_eq!(
            SessionCommand::parse("  CHECK  abc "),
            Ok(SessionCommand::Check(EntityId::new("abc")))
        );
        assert_eq!(SessionCommand::parse("q"), Ok(SessionCommand::Quit));
        assert_eq!(
            SessionCommand::parse("resize 800 600"),
            Ok(SessionCommand::Resize(800, 600))
        );
    }

    #[test]
    fn test_parse_classification() {
        assert_eq!(
            SessionCommand::parse("class 7 constellation 3"),
            Ok(SessionCommand::Classify {
                id: EntityId::from(7),
                field: ClassificationField::Constellation,
                value: Some(3),
            })
        );
        assert_eq!(
            SessionCommand::parse("class 7 error none"),
            Ok(SessionCommand::Classify {
                id: EntityId::from(7),
                field: ClassificationField::RouteError,
                value: None,
            })
        );
        assert_eq!(
            SessionCommand::parse("class 7 error x"),
            Err(CommandError::InvalidNumber("x".to_string()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SessionCommand::parse("   "), Err(CommandError::Empty));
        assert!(matches!(
            SessionCommand::parse("click"),
            Err(CommandError::Usage("click", _))
        ));
        assert!(matches!(
            SessionCommand::parse("dance"),
            Err(CommandError::Unknown(_))
        ));
    }

    #[test]
    fn test_render_tooltip_states() {
        let kind = composer_api::EntityKind::Sg;
        assert_eq!(render_tooltip(kind, &CacheLookup::Pending), "loading...");
        let fresh = CacheLookup::Fresh(serde_json::json!({
            "pk": 5,
            "fields": {"lane_type": "KFZ", "signal_group_id": "hamburg/1"}
        }));
        assert_eq!(render_tooltip(kind, &fresh), "SG 5\nKFZ, SG hamburg/1");
    }
}
