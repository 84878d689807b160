//! Data models for the composer.

mod region;
mod viewport;

pub use region::Region;
pub use viewport::Viewport;
