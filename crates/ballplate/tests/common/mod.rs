#![allow(dead_code)]

use ballplate::{CameraIntrinsics, Frame, RuntimeConfig, StereoCalibration, StereoExtrinsics};

pub const W: usize = 160;
pub const H: usize = 120;
// Passes the default thresholds: H ~ 69, S ~ 128, V = 140.
pub const MARKER_RGB: [u8; 3] = [70, 140, 90];

pub struct Canvas {
    pub data: Vec<u8>,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            data: vec![0u8; W * H * 3],
        }
    }

    /// Paint `[x0, x0 + w) x [y0, y0 + h)`.
    pub fn rect(&mut self, x0: usize, y0: usize, w: usize, h: usize) -> &mut Self {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let i = (y * W + x) * 3;
                self.data[i..i + 3].copy_from_slice(&MARKER_RGB);
            }
        }
        self
    }

    pub fn frame(&self, stamp: f64) -> Frame {
        Frame {
            width: W,
            height: H,
            data: self.data.clone(),
            stamp,
        }
    }
}

/// Four corner markers (40, 35, 30, 25 px) and a 20 px target whose left
/// edge sits at `target_x`.
pub fn plate_canvas(target_x: usize) -> Canvas {
    let mut c = Canvas::new();
    c.rect(2, 112, 8, 5)
        .rect(48, 2, 7, 5)
        .rect(104, 2, 6, 5)
        .rect(152, 112, 5, 5)
        .rect(target_x, 32, 4, 5);
    c
}

pub fn camera() -> CameraIntrinsics {
    CameraIntrinsics {
        fx: 200.0,
        fy: 200.0,
        cx: 80.0,
        cy: 60.0,
        w: W,
        h: H,
    }
}

pub fn config() -> RuntimeConfig {
    RuntimeConfig::new(StereoCalibration {
        left: camera(),
        right: camera(),
        extrinsics: StereoExtrinsics {
            ql: vec![0.0; 8],
            qr: vec![0.0; 8],
            ..StereoExtrinsics::default()
        },
    })
}
