//! Pixel to platform coordinate mapping.

use ballplate_core::{homography_from_4pt, Homography, PlateCorner, PlatformPosition};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Platform-space view of one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformMapping {
    /// Pixel to platform transform.
    pub homography: Homography,
    /// Target position, clamped to the platform square.
    pub position: PlatformPosition,
    /// Corner centroids mapped into platform coordinates, for diagnostics.
    pub corners: [Point2<f64>; 4],
    /// A zero homogeneous coordinate forced a fallback to a previous value.
    pub degenerate: bool,
}

/// Estimate the pixel to platform homography from four corner centroids
/// ordered like `PlateCorner::ALL`.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
pub fn estimate_platform_homography(corner_pixels: &[Point2<f64>; 4]) -> Option<Homography> {
    homography_from_4pt(corner_pixels, &PlateCorner::canonical_square())
}

/// Map the target and the corners into platform coordinates.
///
/// Without a target the previous coordinates are kept and the result is
/// marked invalid. A zero homogeneous coordinate keeps the previous value.
pub fn map_to_platform(
    homography: Homography,
    corner_pixels: &[Point2<f64>; 4],
    target_pixel: Option<Point2<f64>>,
    previous: PlatformPosition,
) -> PlatformMapping {
    let mut degenerate = false;

    let position = match target_pixel {
        Some(px) => {
            let (p, fallback) = homography.apply_or(px, previous.as_point());
            degenerate |= fallback;
            PlatformPosition::new(p.x, p.y, true)
        }
        None => PlatformPosition::new(previous.x, previous.y, false),
    }
    .clamped();

    let canonical = PlateCorner::canonical_square();
    let corners = std::array::from_fn(|i| {
        let (p, fallback) = homography.apply_or(corner_pixels[i], canonical[i]);
        degenerate |= fallback;
        p
    });

    PlatformMapping {
        homography,
        position,
        corners,
        degenerate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn pixels() -> [Point2<f64>; 4] {
        [
            Point2::new(20.0, 460.0),
            Point2::new(60.0, 20.0),
            Point2::new(600.0, 30.0),
            Point2::new(630.0, 470.0),
        ]
    }

    #[test]
    fn corners_map_onto_canonical_square() {
        let px = pixels();
        let h = estimate_platform_homography(&px).expect("homography");
        let m = map_to_platform(h, &px, None, PlatformPosition::default());
        for (got, want) in m.corners.iter().zip(PlateCorner::canonical_square()) {
            assert_relative_eq!(got.x, want.x, epsilon = 1e-8);
            assert_relative_eq!(got.y, want.y, epsilon = 1e-8);
        }
        assert!(!m.degenerate);
    }

    #[test]
    fn missing_target_keeps_previous_coordinates() {
        let px = pixels();
        let h = estimate_platform_homography(&px).expect("homography");
        let prev = PlatformPosition::new(-7.0, 3.0, true);
        let m = map_to_platform(h, &px, None, prev);
        assert_eq!(m.position, PlatformPosition::new(-7.0, 3.0, false));
    }

    #[test]
    fn target_is_clamped() {
        let px = pixels();
        let h = estimate_platform_homography(&px).expect("homography");
        // well outside the plate, to the right
        let target = Some(Point2::new(900.0, 240.0));
        let m = map_to_platform(h, &px, target, PlatformPosition::default());
        assert!(m.position.valid);
        assert_eq!(m.position.x, 64.0);
    }

    #[test]
    fn zero_w_target_keeps_previous_value() {
        let h = Homography::new(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, -100.0,
        ));
        let prev = PlatformPosition::new(5.0, 6.0, true);
        let m = map_to_platform(h, &pixels(), Some(Point2::new(10.0, 100.0)), prev);
        assert!(m.degenerate);
        assert_eq!((m.position.x, m.position.y), (5.0, 6.0));
        assert!(m.position.valid);
    }
}
