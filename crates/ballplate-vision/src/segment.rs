//! Two-band HSV thresholding.

use ballplate_core::{rgb_to_hsv, BinaryMask, HsvImage, RgbImageView};

use crate::params::HsvThresholds;

#[inline]
fn in_range(value: u8, bounds: [u8; 2]) -> bool {
    bounds[0] <= value && value <= bounds[1]
}

#[inline]
fn band_hit(hsv: [u8; 3], hue: [u8; 2], t: &HsvThresholds) -> u8 {
    if in_range(hsv[0], hue) && in_range(hsv[1], t.s) && in_range(hsv[2], t.v) {
        255
    } else {
        0
    }
}

/// Classify one HSV pixel.
///
/// Each band produces a 0/255 response; the responses are averaged and the
/// result re-thresholded at zero, which is a logical OR of the two bands.
#[inline]
pub fn classify_hsv(hsv: [u8; 3], t: &HsvThresholds) -> bool {
    let m1 = band_hit(hsv, t.h1, t) as u16;
    let m2 = band_hit(hsv, t.h2, t) as u16;
    (m1 + m2) / 2 > 0
}

/// Foreground mask of an HSV frame.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(w = hsv.width, h = hsv.height)))]
pub fn segment_hsv(hsv: &HsvImage, t: &HsvThresholds) -> BinaryMask {
    let mut mask = BinaryMask::new(hsv.width, hsv.height);
    for (flag, p) in mask.flags_mut().iter_mut().zip(hsv.pixels()) {
        *flag = classify_hsv(p, t);
    }
    mask
}

/// Foreground mask of an RGB frame, converting to HSV on the fly.
///
/// Pixels missing from a short buffer stay background.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(w = rgb.width, h = rgb.height)))]
pub fn segment_rgb(rgb: &RgbImageView<'_>, t: &HsvThresholds) -> BinaryMask {
    let mut mask = BinaryMask::new(rgb.width, rgb.height);
    for (flag, px) in mask.flags_mut().iter_mut().zip(rgb.data.chunks_exact(3)) {
        *flag = classify_hsv(rgb_to_hsv(px[0], px[1], px[2]), t);
    }
    mask
}
