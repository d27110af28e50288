//! 4-connected component labeling.

use std::collections::VecDeque;

use ballplate_core::BinaryMask;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::params::LabelParams;

/// Inclusive pixel bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    fn seed(x: u32, y: u32) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
        }
    }

    fn grow(&mut self, x: u32, y: u32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }
}

/// One connected foreground component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Component id, unique within one labeling pass (starts at 1).
    pub label: u32,
    pub count: usize,
    /// Mean pixel coordinate.
    pub centroid: Point2<f64>,
    pub bbox: BoundingBox,
    /// Member pixels as `[x, y]`, in discovery order.
    #[serde(skip)]
    pub pixels: Vec<[u32; 2]>,
}

/// Label every 4-connected foreground component of `mask`.
///
/// Components with `count <= params.min_blob_size` are dropped. Output order
/// follows the raster position of each component's first pixel.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(w = mask.width(), h = mask.height())))]
pub fn label_components(mask: &BinaryMask, params: &LabelParams) -> Vec<Blob> {
    let (w, h) = (mask.width(), mask.height());
    let flags = mask.flags();
    let mut labels = vec![0u32; w * h];
    let mut queue = VecDeque::new();
    let mut blobs = Vec::new();
    let mut next_label = 1u32;

    for start in 0..w * h {
        if !flags[start] || labels[start] != 0 {
            continue;
        }

        let label = next_label;
        next_label += 1;
        labels[start] = label;
        queue.push_back(start);

        let (sx, sy) = ((start % w) as u32, (start / w) as u32);
        let mut bbox = BoundingBox::seed(sx, sy);
        let mut pixels = Vec::new();
        let (mut sum_x, mut sum_y) = (0.0f64, 0.0f64);

        while let Some(idx) = queue.pop_front() {
            let (x, y) = (idx % w, idx / w);
            pixels.push([x as u32, y as u32]);
            bbox.grow(x as u32, y as u32);
            sum_x += x as f64;
            sum_y += y as f64;

            let mut visit = |n: usize| {
                if flags[n] && labels[n] == 0 {
                    labels[n] = label;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        let count = pixels.len();
        if count <= params.min_blob_size {
            continue;
        }
        let n = count as f64;
        blobs.push(Blob {
            label,
            count,
            centroid: Point2::new(sum_x / n, sum_y / n),
            bbox,
            pixels,
        });
    }

    log::trace!("labeled {} components above size {}", blobs.len(), params.min_blob_size);
    blobs
}
