//! Region-to-camera mathematics.
//!
//! Fits a geographic bounding box into the map viewport using the Web
//! Mercator projection, extracted for testability and reusability.

use std::f64::consts::{FRAC_PI_4, PI};

use crate::constants::camera;
use crate::model::{Region, Viewport};

/// Parameters of a region fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Pixels kept free on every side of the fitted region
    pub padding: f64,
    /// Zoom is clamped to this value
    pub max_zoom: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding: camera::FIT_PADDING,
            max_zoom: camera::MAX_FIT_ZOOM,
        }
    }
}

/// Project longitude/latitude to world pixels at zoom 0 (y grows northward).
pub fn lng_lat_to_world(longitude: f64, latitude: f64) -> (f64, f64) {
    let lambda = longitude.to_radians();
    let phi = latitude
        .clamp(-camera::MAX_LATITUDE, camera::MAX_LATITUDE)
        .to_radians();
    let x = camera::TILE_SIZE * (lambda + PI) / (2.0 * PI);
    let y = camera::TILE_SIZE * (PI + (FRAC_PI_4 + phi * 0.5).tan().ln()) / (2.0 * PI);
    (x, y)
}

/// Inverse of [`lng_lat_to_world`].
pub fn world_to_lng_lat(x: f64, y: f64) -> (f64, f64) {
    let lambda = x / camera::TILE_SIZE * 2.0 * PI - PI;
    let phi = 2.0 * ((y / camera::TILE_SIZE * 2.0 * PI - PI).exp().atan() - FRAC_PI_4);
    (lambda.to_degrees(), phi.to_degrees())
}

/// Fit `region` into the viewport with the default padding and zoom bound.
pub fn fit(current: &Viewport, region: &Region) -> Viewport {
    fit_with(current, region, FitOptions::default())
}

/// Fit `region` into the viewport.
///
/// Only longitude, latitude and zoom change; pitch, bearing and the screen
/// size are carried over. The result depends only on the region and the
/// screen size, so fitting the same region again is a no-op.
///
/// Zero-area regions have no finite fitting scale and get `max_zoom`.
/// Non-finite regions leave the viewport unchanged.
pub fn fit_with(current: &Viewport, region: &Region, options: FitOptions) -> Viewport {
    if !region.is_finite() {
        log::warn!("Ignoring non-finite region {:?}", region);
        return *current;
    }

    // North-west and south-east corners in world space
    let (west, north) = lng_lat_to_world(region.min_x, region.max_y);
    let (east, south) = lng_lat_to_world(region.max_x, region.min_y);

    let size_x = (east - west).abs();
    let size_y = (north - south).abs();

    // Padded target area; keep at least one pixel so the scale stays positive
    let target_w = (f64::from(current.width) - 2.0 * options.padding).max(1.0);
    let target_h = (f64::from(current.height) - 2.0 * options.padding).max(1.0);

    let scale_x = if size_x > 0.0 { target_w / size_x } else { f64::INFINITY };
    let scale_y = if size_y > 0.0 { target_h / size_y } else { f64::INFINITY };
    let scale = scale_x.min(scale_y);

    let zoom = if scale.is_finite() {
        scale.log2().min(options.max_zoom)
    } else {
        options.max_zoom
    };

    let (longitude, latitude) = world_to_lng_lat((west + east) / 2.0, (north + south) / 2.0);

    log::debug!(
        "Fit region ({:.5}, {:.5})-({:.5}, {:.5}) -> center ({:.5}, {:.5}) zoom {:.2}",
        region.min_x,
        region.min_y,
        region.max_x,
        region.max_y,
        longitude,
        latitude,
        zoom
    );

    Viewport {
        longitude,
        latitude,
        zoom,
        ..*current
    }
}

/// Satellite view link for the current camera center.
pub fn satellite_url(viewport: &Viewport) -> String {
    let round = |v: f64| (v * 1e8).round() / 1e8;
    format!(
        "https://www.google.com/maps/@{},{},{}m/data=!3m1!1e3",
        round(viewport.latitude),
        round(viewport.longitude),
        camera::SATELLITE_ALTITUDE_M
    )
}
