//! Core types and utilities for ball-on-plate localization.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete image decoder or actuator driver: frames arrive as
//! borrowed RGB views and everything downstream works on plain buffers and
//! `nalgebra` points.

mod homography;
mod image;
mod logger;
mod platform;

pub use homography::{homography_from_4pt, Homography};
pub use image::{rgb_to_hsv, BinaryMask, HsvImage, RgbImageView};
pub use platform::{PlateCorner, PlatformPosition, PLATFORM_GRID_BINS, PLATFORM_HALF_EXTENT};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, set_cycle_context};
