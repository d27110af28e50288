use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Map `p` through H.
    ///
    /// Returns `None` when the homogeneous coordinate is exactly zero; callers
    /// keep their previous mapped value in that case.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        if w == 0.0 {
            return None;
        }
        Some(Point2::new(v[0] / w, v[1] / w))
    }

    /// Map `p`, falling back to `previous` on a zero homogeneous coordinate.
    ///
    /// The flag is `true` when the fallback was taken.
    pub fn apply_or(&self, p: Point2<f64>, previous: Point2<f64>) -> (Point2<f64>, bool) {
        match self.apply(p) {
            Some(q) => (q, false),
            None => (previous, true),
        }
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

// Any three of the four points (in normalized coordinates) spanning a
// vanishing triangle makes the 4-point system singular.
fn has_collinear_triple(pts: &[Point2<f64>; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (a, b, c) = (pts[i], pts[j], pts[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        cross.abs() < 1e-9
    })
}

// Translate to the centroid and scale so the mean distance is sqrt(2).
fn normalize_points4(pts: &[Point2<f64>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts.map(|p| {
        let v = t * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0], v[1])
    });
    (out, t)
}

/// Compute H such that `dst ~ H * src` from exactly four correspondences.
///
/// Returns `None` for degenerate configurations (repeated or collinear
/// points) where the linear system is singular.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    // Unknowns [h11 h12 h13 h21 h22 h23 h31 h32], h33 = 1:
    // h11 x + h12 y + h13 - u h31 x - u h32 y = u
    // h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let (src_n, t_src) = normalize_points4(src);
    let (dst_n, t_dst) = normalize_points4(dst);
    if has_collinear_triple(&src_n) || has_collinear_triple(&dst_n) {
        return None;
    }

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = r0 + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    let h = h / s;
    if h.determinant().abs() < 1e-12 {
        return None;
    }

    Some(Homography::new(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlateCorner;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "{a:?} vs {b:?}"
        );
    }

    fn pixel_corners() -> [Point2<f64>; 4] {
        [
            Point2::new(40.0, 440.0),
            Point2::new(70.0, 30.0),
            Point2::new(580.0, 45.0),
            Point2::new(610.0, 455.0),
        ]
    }

    #[test]
    fn maps_pixel_corners_onto_canonical_square() {
        let src = pixel_corners();
        let dst = PlateCorner::canonical_square();
        let h = homography_from_4pt(&src, &dst).expect("homography");
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(h.apply(*s).expect("finite w"), *d, 1e-8);
        }
    }

    #[test]
    fn inverse_round_trip_reproduces_pixels() {
        let src = pixel_corners();
        let dst = PlateCorner::canonical_square();
        let h = homography_from_4pt(&src, &dst).expect("homography");
        let inv = h.inverse().expect("invertible");
        for (s, d) in src.iter().zip(dst.iter()) {
            let back = inv.apply(*d).expect("finite w");
            assert_close(back, *s, 1e-6);
        }
    }

    #[test]
    fn recovers_known_projective_matrix() {
        let gt = Homography::new(Matrix3::new(
            0.9, 0.05, 12.0, //
            -0.02, 1.1, -7.0, //
            1e-4, -2e-4, 1.0,
        ));
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(200.0, 10.0),
            Point2::new(190.0, 220.0),
            Point2::new(-5.0, 180.0),
        ];
        let dst = src.map(|p| gt.apply(p).expect("finite w"));
        let est = homography_from_4pt(&src, &dst).expect("homography");
        let sample = Point2::new(77.0, 133.0);
        assert_close(
            est.apply(sample).expect("finite w"),
            gt.apply(sample).expect("finite w"),
            1e-6,
        );
    }

    #[test]
    fn collinear_points_are_rejected() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        assert!(homography_from_4pt(&src, &PlateCorner::canonical_square()).is_none());
    }

    #[test]
    fn repeated_points_are_rejected() {
        let p = Point2::new(10.0, 10.0);
        let src = [p, p, Point2::new(100.0, 10.0), Point2::new(10.0, 100.0)];
        assert!(homography_from_4pt(&src, &PlateCorner::canonical_square()).is_none());
    }

    #[test]
    fn zero_w_keeps_previous_value() {
        let h = Homography::new(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 0.0, -5.0,
        ));
        assert!(h.apply(Point2::new(5.0, 2.0)).is_none());
        let prev = Point2::new(3.0, -4.0);
        let (q, degenerate) = h.apply_or(Point2::new(5.0, 2.0), prev);
        assert!(degenerate);
        assert_eq!(q, prev);
    }
}
