//! Single-frame vision pipeline for a ball-on-plate rig.
//!
//! Stages, each usable on its own:
//! - [`segment_rgb`]: two-band HSV threshold into a [`BinaryMask`](ballplate_core::BinaryMask).
//! - [`label_components`]: 4-connected labeling with a minimum component size.
//! - [`resolve_correspondence`]: largest blobs to plate corners plus one target.
//! - [`map_to_platform`]: corner homography and clamped target position.
//!
//! [`PlateDetector`] chains them for one RGB frame.

mod correspond;
mod detector;
mod error;
mod label;
mod mapper;
mod params;
mod segment;

pub use correspond::{
    reference_anchors, resolve_correspondence, select_candidates, CornerAssignment,
    Correspondence,
};
pub use detector::{PlateDetector, PlateObservation};
pub use error::VisionError;
pub use label::{label_components, Blob, BoundingBox};
pub use mapper::{estimate_platform_homography, map_to_platform, PlatformMapping};
pub use params::{
    AssignmentMode, CorrespondenceParams, HsvThresholds, LabelParams, PlateDetectorParams,
    ThresholdBound,
};
pub use segment::{classify_hsv, segment_hsv, segment_rgb};
