//! Geographic bounding regions used to request camera focus.

use composer_api::{CrossingDto, RegionDto};

/// Axis-aligned bounding box in geographic coordinates (x = longitude,
/// y = latitude).
///
/// Regions are transient: created by whoever wants to focus a geometry and
/// consumed once by the viewport fitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Region {
    /// Create a region, normalizing swapped corners.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Create a zero-area region around a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Whether all four coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Whether the region has zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.min_x == self.max_x || self.min_y == self.max_y
    }

    /// Check if a point lies inside the region (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl From<RegionDto> for Region {
    fn from(dto: RegionDto) -> Self {
        Self::new(dto.min_x, dto.min_y, dto.max_x, dto.max_y)
    }
}

impl From<&CrossingDto> for Region {
    fn from(crossing: &CrossingDto) -> Self {
        let [min_x, min_y, max_x, max_y] = crossing.extent;
        Self::new(min_x, min_y, max_x, max_y)
    }
}
