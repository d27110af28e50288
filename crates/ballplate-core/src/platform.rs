use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Half-width of the canonical platform square, in platform units.
pub const PLATFORM_HALF_EXTENT: f64 = 64.0;

/// Number of bins per axis used when quantizing a platform position.
pub const PLATFORM_GRID_BINS: usize = 32;

/// The four physical corners of the platform, in correspondence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateCorner {
    SouthWest,
    NorthWest,
    NorthEast,
    SouthEast,
}

impl PlateCorner {
    pub const ALL: [PlateCorner; 4] = [
        PlateCorner::SouthWest,
        PlateCorner::NorthWest,
        PlateCorner::NorthEast,
        PlateCorner::SouthEast,
    ];

    /// Metric coordinate of this corner on the canonical square.
    ///
    /// Image rows grow downwards, so "south" is `+y`.
    pub fn canonical(self) -> Point2<f64> {
        let e = PLATFORM_HALF_EXTENT;
        match self {
            PlateCorner::SouthWest => Point2::new(-e, e),
            PlateCorner::NorthWest => Point2::new(-e, -e),
            PlateCorner::NorthEast => Point2::new(e, -e),
            PlateCorner::SouthEast => Point2::new(e, e),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlateCorner::SouthWest => "SW",
            PlateCorner::NorthWest => "NW",
            PlateCorner::NorthEast => "NE",
            PlateCorner::SouthEast => "SE",
        }
    }

    /// Canonical coordinates of all four corners in `ALL` order.
    pub fn canonical_square() -> [Point2<f64>; 4] {
        Self::ALL.map(Self::canonical)
    }
}

/// Target position on the canonical platform square.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformPosition {
    pub x: f64,
    pub y: f64,
    pub valid: bool,
}

impl PlatformPosition {
    pub fn new(x: f64, y: f64, valid: bool) -> Self {
        Self { x, y, valid }
    }

    /// Clamp both coordinates to `[-64, 64]`.
    pub fn clamped(self) -> Self {
        let e = PLATFORM_HALF_EXTENT;
        Self {
            x: self.x.clamp(-e, e),
            y: self.y.clamp(-e, e),
            valid: self.valid,
        }
    }

    pub fn as_point(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Quantize into a `PLATFORM_GRID_BINS x PLATFORM_GRID_BINS` grid.
    ///
    /// Returns `(column, row)`; the position is clamped first.
    pub fn grid_bin(&self) -> (usize, usize) {
        let c = self.clamped();
        let bin_size = 2.0 * PLATFORM_HALF_EXTENT / PLATFORM_GRID_BINS as f64;
        let last = PLATFORM_GRID_BINS - 1;
        let bin = |v: f64| (((v + PLATFORM_HALF_EXTENT) / bin_size).floor() as usize).min(last);
        (bin(c.x), bin(c.y))
    }
}
