use ballplate_core::{Homography, PlatformPosition, RgbImageView};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::correspond::{resolve_correspondence, Correspondence};
use crate::error::VisionError;
use crate::label::label_components;
use crate::mapper::{estimate_platform_homography, map_to_platform, PlatformMapping};
use crate::params::PlateDetectorParams;
use crate::segment::segment_rgb;

/// Outcome of running the vision pipeline on one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateObservation {
    pub width: usize,
    pub height: usize,
    /// Foreground pixels after thresholding.
    pub foreground_pixels: usize,
    /// Components that survived the size filter.
    pub blob_count: usize,
    pub correspondence: Correspondence,
    /// Present when four corners were assigned and the homography solved.
    pub mapping: Option<PlatformMapping>,
}

impl PlateObservation {
    pub fn corners_found(&self) -> usize {
        self.correspondence.corners.len()
    }

    pub fn homography(&self) -> Option<&Homography> {
        self.mapping.as_ref().map(|m| &m.homography)
    }

    pub fn position(&self) -> Option<PlatformPosition> {
        self.mapping.as_ref().map(|m| m.position)
    }

    pub fn target_pixel(&self) -> Option<Point2<f64>> {
        self.correspondence.target_blob().map(|b| b.centroid)
    }

    pub fn is_degenerate(&self) -> bool {
        self.mapping.as_ref().is_some_and(|m| m.degenerate)
    }
}

/// Segment, label, correspond and map one RGB frame.
pub struct PlateDetector {
    params: PlateDetectorParams,
}

impl PlateDetector {
    pub fn new(params: PlateDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlateDetectorParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut PlateDetectorParams {
        &mut self.params
    }

    /// Run the full single-frame pipeline.
    ///
    /// `previous` is the last known platform position; it is reused when the
    /// target is missing or its mapping is degenerate.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(w = frame.width, h = frame.height)))]
    pub fn detect(
        &self,
        frame: &RgbImageView<'_>,
        previous: PlatformPosition,
    ) -> Result<PlateObservation, VisionError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(VisionError::EmptyFrame {
                width: frame.width,
                height: frame.height,
            });
        }
        if !frame.is_consistent() {
            return Err(VisionError::BufferSizeMismatch {
                width: frame.width,
                height: frame.height,
                len: frame.data.len(),
            });
        }

        let mask = segment_rgb(frame, &self.params.thresholds);
        let blobs = label_components(&mask, &self.params.label);
        let blob_count = blobs.len();
        let correspondence = resolve_correspondence(
            blobs,
            frame.width,
            frame.height,
            &self.params.correspondence,
        );

        let mapping = correspondence.corner_points().and_then(|corners| {
            let h = estimate_platform_homography(&corners)?;
            Some(map_to_platform(
                h,
                &corners,
                correspondence.target_blob().map(|b| b.centroid),
                previous,
            ))
        });

        if correspondence.is_complete() && mapping.is_none() {
            log::trace!("corner centroids are degenerate, homography skipped");
        }

        Ok(PlateObservation {
            width: frame.width,
            height: frame.height,
            foreground_pixels: mask.count(),
            blob_count,
            correspondence,
            mapping,
        })
    }
}
