//! Camera state of the map view.

use crate::constants::camera;

/// Camera parameters of the map.
///
/// Owned by the composer; changed only by fitting a region or by a resize of
/// the host view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Initial camera with the given screen size.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            longitude: camera::INITIAL_LONGITUDE,
            latitude: camera::INITIAL_LATITUDE,
            zoom: camera::INITIAL_ZOOM,
            pitch: 0.0,
            bearing: 0.0,
            width,
            height,
        }
    }

    /// Same camera with a new screen size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..*self
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::with_size(camera::DEFAULT_WIDTH, camera::DEFAULT_HEIGHT)
    }
}
