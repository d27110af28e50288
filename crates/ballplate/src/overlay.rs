//! Diagnostic renderings of a [`PlateObservation`].
//!
//! - [`render_overlay`]: the camera frame with labeled blobs, the corner
//!   polygon and corner/target markers.
//! - [`render_platform_view`]: a top-down view of the platform square with
//!   the mapped corners and target.

use ballplate_core::{PlateCorner, RgbImageView, PLATFORM_HALF_EXTENT};
use ballplate_vision::PlateObservation;
use image::{Rgb, RgbImage};
use nalgebra::Point2;

const CORNER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const TARGET_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const POLYGON_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const GRID_COLOR: Rgb<u8> = Rgb([60, 60, 60]);

/// Margin around the platform square in the top-down view, pixels.
pub const PLATFORM_VIEW_MARGIN: u32 = 36;

/// Deterministic colour for a component label.
pub fn label_color(label: u32) -> Rgb<u8> {
    let h = label.wrapping_mul(0x9E37_79B1).rotate_left(7);
    let [a, b, c, _] = h.to_le_bytes();
    Rgb([a | 0x40, b | 0x40, c | 0x40])
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(img: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, color: Rgb<u8>) {
    let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_cross(img: &mut RgbImage, p: Point2<f64>, arm: i64, color: Rgb<u8>) {
    let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
    for d in -arm..=arm {
        put(img, cx + d, cy, color);
        put(img, cx, cy + d, color);
    }
}

fn draw_disc(img: &mut RgbImage, p: Point2<f64>, radius: i64, color: Rgb<u8>) {
    let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

fn draw_polygon(img: &mut RgbImage, pts: &[Point2<f64>], color: Rgb<u8>) {
    for (i, &a) in pts.iter().enumerate() {
        draw_line(img, a, pts[(i + 1) % pts.len()], color);
    }
}

/// Draw `obs` on top of the frame it was computed from.
///
/// Candidate blob pixels are tinted with [`label_color`]; the assigned
/// corners are joined in `SW, NW, NE, SE` order.
pub fn render_overlay(frame: &RgbImageView<'_>, obs: &PlateObservation) -> RgbImage {
    let mut img = RgbImage::from_fn(frame.width as u32, frame.height as u32, |x, y| {
        let i = (y as usize * frame.width + x as usize) * 3;
        match frame.data.get(i..i + 3) {
            Some(px) => Rgb([px[0] / 2, px[1] / 2, px[2] / 2]),
            None => Rgb([0, 0, 0]),
        }
    });

    for blob in &obs.correspondence.candidates {
        let color = label_color(blob.label);
        for &[x, y] in &blob.pixels {
            put(&mut img, i64::from(x), i64::from(y), color);
        }
    }

    if let Some(corners) = obs.correspondence.corner_points() {
        draw_polygon(&mut img, &corners, POLYGON_COLOR);
        for p in corners {
            draw_cross(&mut img, p, 6, CORNER_COLOR);
        }
    }
    if let Some(target) = obs.target_pixel() {
        draw_disc(&mut img, target, 4, TARGET_COLOR);
    }
    img
}

fn to_view(p: Point2<f64>) -> Point2<f64> {
    let shift = PLATFORM_HALF_EXTENT + f64::from(PLATFORM_VIEW_MARGIN);
    Point2::new(p.x + shift, p.y + shift)
}

/// Top-down platform view, `+y` pointing down (south).
///
/// Empty square and grid when the observation has no mapping.
pub fn render_platform_view(obs: &PlateObservation) -> RgbImage {
    let side = (2.0 * PLATFORM_HALF_EXTENT) as u32 + 2 * PLATFORM_VIEW_MARGIN;
    let mut img = RgbImage::from_pixel(side, side, Rgb([20, 20, 20]));

    let step = 2.0 * PLATFORM_HALF_EXTENT / 8.0;
    for i in 0..=8 {
        let v = -PLATFORM_HALF_EXTENT + step * f64::from(i);
        draw_line(
            &mut img,
            to_view(Point2::new(v, -PLATFORM_HALF_EXTENT)),
            to_view(Point2::new(v, PLATFORM_HALF_EXTENT)),
            GRID_COLOR,
        );
        draw_line(
            &mut img,
            to_view(Point2::new(-PLATFORM_HALF_EXTENT, v)),
            to_view(Point2::new(PLATFORM_HALF_EXTENT, v)),
            GRID_COLOR,
        );
    }
    let square = PlateCorner::canonical_square().map(to_view);
    draw_polygon(&mut img, &square, POLYGON_COLOR);

    if let Some(mapping) = &obs.mapping {
        for p in mapping.corners {
            draw_cross(&mut img, to_view(p), 5, CORNER_COLOR);
        }
        if mapping.position.valid {
            draw_disc(&mut img, to_view(mapping.position.as_point()), 4, TARGET_COLOR);
        }
    }
    img
}
