/// Errors returned by the plate detector.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VisionError {
    #[error("frame is empty ({width}x{height})")]
    EmptyFrame { width: usize, height: usize },
    #[error("frame buffer holds {len} bytes, expected {width}x{height}x3")]
    BufferSizeMismatch {
        width: usize,
        height: usize,
        len: usize,
    },
}
