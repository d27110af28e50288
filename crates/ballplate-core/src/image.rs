//! Borrowed RGB views, HSV rasters and binary masks.
//!
//! HSV follows the 8-bit convention used by most camera tooling: hue is
//! halved into `0..=179`, saturation and value span `0..=255`.

/// Row-major, interleaved RGB8 view (`len = width * height * 3`).
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl RgbImageView<'_> {
    /// `true` when the buffer length matches the declared dimensions.
    pub fn is_consistent(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(3))
            .is_some_and(|n| n == self.data.len())
    }
}

/// Convert one RGB8 sample into 8-bit HSV (`H` in `0..=179`).
#[inline]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };

    let h = if diff <= 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let h_half = (h / 2.0).round() as u16;
    let h_half = if h_half >= 180 { 0 } else { h_half as u8 };

    [h_half, s.round().min(255.0) as u8, v as u8]
}

/// Owned HSV raster, interleaved `[h, s, v]` per pixel.
#[derive(Clone, Debug)]
pub struct HsvImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl HsvImage {
    /// Convert a full RGB frame.
    pub fn from_rgb(src: &RgbImageView<'_>) -> Self {
        let mut data = Vec::with_capacity(src.width * src.height * 3);
        for px in src.data.chunks_exact(3) {
            data.extend_from_slice(&rgb_to_hsv(px[0], px[1], px[2]));
        }
        Self {
            width: src.width,
            height: src.height,
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Iterate `[h, s, v]` triples in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }
}

/// Per-pixel foreground flag with the dimensions of its source frame.
///
/// The flag buffer always holds exactly `width * height` entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl BinaryMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Wrap a row-major flag buffer, or `None` if its length is not
    /// `width * height`.
    pub fn from_flags(width: usize, height: usize, data: Vec<bool>) -> Option<Self> {
        let len = width.checked_mul(height)?;
        (len == data.len()).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major flags.
    pub fn flags(&self) -> &[bool] {
        &self.data
    }

    /// Mutable row-major flags; the length is fixed.
    pub fn flags_mut(&mut self) -> &mut [bool] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.data[y * self.width + x] = value;
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Mark every pixel inside the axis-aligned rectangle `[x0, x1) x [y0, y1)`.
    ///
    /// The rectangle is clipped to the mask bounds.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        for y in y0.min(y1)..y1 {
            for x in x0.min(x1)..x1 {
                self.set(x, y, true);
            }
        }
    }
}
