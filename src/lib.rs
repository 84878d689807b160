//! LSA Composer - route binding editor
//!
//! Binds candidate entities (lane signal areas or signal groups) to a route
//! and submits the bindings to the composer backend. Includes the binding
//! overview with its consistency report.

pub mod animation;
pub mod binding;
pub mod cli;
pub mod composer;
pub mod config;
pub mod constants;
pub mod fetch;
pub mod metadata_cache;
pub mod model;
pub mod overview;
pub mod viewport_fit;

#[cfg(test)]
mod test_support;

pub use binding::{BindingColor, BindingState, BindingStore, LsaBindings, SgBindings};
pub use composer::{Composer, ComposerError, ComposerView, Navigation};
pub use config::{AppSettings, ComposerConfig, ConfigError};
pub use fetch::{Dispatcher, FetchWorker};
pub use overview::{Overview, OverviewView};
