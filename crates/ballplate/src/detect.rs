//! Single-image helpers on top of `image::RgbImage`.

use std::path::Path;

use ballplate_core::{PlatformPosition, RgbImageView};
use ballplate_vision::{PlateDetector, PlateDetectorParams, PlateObservation, VisionError};

use crate::collab::Frame;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("failed to load {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: ::image::ImageError,
    },
    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Borrow an `image::RgbImage` as the core view type.
pub fn rgb_view(img: &::image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Decode any supported image file into RGB8.
pub fn load_rgb(path: &Path) -> Result<::image::RgbImage, DetectError> {
    let img = ::image::open(path).map_err(|source| DetectError::Load {
        path: path.display().to_string(),
        source,
    })?;
    Ok(img.into_rgb8())
}

/// Wrap a decoded image as a timestamped [`Frame`].
pub fn frame_from_image(img: ::image::RgbImage, stamp: f64) -> Frame {
    Frame {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
        stamp,
    }
}

/// Run the single-frame pipeline on an RGB image with no previous position.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_plate(
    img: &::image::RgbImage,
    params: PlateDetectorParams,
) -> Result<PlateObservation, VisionError> {
    PlateDetector::new(params).detect(&rgb_view(img), PlatformPosition::default())
}
