//! Global constants for the composer.

use std::time::Duration;

/// Camera constants for the map viewport.
pub mod camera {
    /// Padding kept free around a fitted region, in pixels, on every side
    pub const FIT_PADDING: f64 = 100.0;
    /// Upper zoom bound after fitting a region
    pub const MAX_FIT_ZOOM: f64 = 18.0;
    /// Web Mercator tile size in pixels at zoom 0
    pub const TILE_SIZE: f64 = 512.0;
    /// Latitude limit of the Web Mercator projection
    pub const MAX_LATITUDE: f64 = 85.051_129;

    /// Initial camera longitude (Hamburg)
    pub const INITIAL_LONGITUDE: f64 = 9.993682;
    /// Initial camera latitude (Hamburg)
    pub const INITIAL_LATITUDE: f64 = 53.551086;
    /// Initial camera zoom
    pub const INITIAL_ZOOM: f64 = 12.0;

    /// Default viewport width when the host does not report one
    pub const DEFAULT_WIDTH: u32 = 1280;
    /// Default viewport height when the host does not report one
    pub const DEFAULT_HEIGHT: u32 = 800;

    /// Altitude of the satellite view link, in meters
    pub const SATELLITE_ALTITUDE_M: u32 = 250;
}

/// Trip-path animation constants.
pub mod animation {
    use std::time::Duration;

    /// Progress wraps back to zero at this value
    pub const CYCLE_LENGTH: f32 = 120.0;
    /// Progress added per frame
    pub const STEP: f32 = 0.5;
    /// Frame interval of the background animation loop (about 60 Hz)
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
}

/// Binding colors on the map, RGB.
pub mod colors {
    /// Candidate that is not selected
    pub const UNSELECTED: [u8; 3] = [255, 0, 0];
    /// Selected but not confirmed
    pub const SELECTED: [u8; 3] = [255, 255, 0];
    /// Selected and confirmed
    pub const CONFIRMED: [u8; 3] = [0, 255, 0];

    /// List checkbox tint for a confirmed binding
    pub const CHECKBOX_CONFIRMED: &str = "#27ae60";
    /// List checkbox tint for an unconfirmed binding
    pub const CHECKBOX_UNCONFIRMED: &str = "#fed330";

    /// Overview row tint for a confirmed binding
    pub const OVERVIEW_CONFIRMED: &str = "#8bc34a";
    /// Overview row tint for an unconfirmed binding
    pub const OVERVIEW_UNCONFIRMED: &str = "#ffeb3b";
    /// Health check row tint: present on both sides but different
    pub const HEALTH_DIFFERENT: &str = "#fff89c";
    /// Health check row tint: missing on the other side
    pub const HEALTH_MISSING: &str = "#ff8080";
}

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Number of threads running backend requests concurrently
pub const FETCH_THREADS: usize = 4;

/// Dataset label shown when no `map_data` selector is configured
pub const DEFAULT_MAP_DATA_LABEL: &str = "osm";
