use thiserror::Error;

/// Failure inside a rasterizer or while reading its output back
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("graphics device unavailable: {0}")]
    Device(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("raster readback failed: {0}")]
    Readback(String),

    #[error("raster is {actual_width}x{actual_height} ({actual_len} bytes), expected {width}x{height} RGBA")]
    Decode {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
        actual_len: usize,
    },
}

/// Failure while assembling frames into a sheet
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("no frames to compose")]
    NoFrames,

    #[error("frame {index} is {width}x{height}, expected {resolution}x{resolution}")]
    FrameSize {
        index: usize,
        width: u32,
        height: u32,
        resolution: u32,
    },

    #[error("sheet of {cols}x{rows} cells at {resolution}px exceeds image limits")]
    TooLarge { cols: u32, rows: u32, resolution: u32 },

    #[error("failed to encode sprite sheet: {0}")]
    Encode(#[from] image::ImageError),
}

/// Failure of a whole capture run
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid capture parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to prepare render surface: {0}")]
    Surface(#[source] RenderError),

    #[error("failed to capture frame {index}: {source}")]
    FrameCapture {
        index: usize,
        #[source]
        source: RenderError,
    },

    #[error("sprite sheet creation failed: {0}")]
    SheetComposition(#[from] SheetError),
}

impl CaptureError {
    /// Index of the frame that aborted the run, if any
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            CaptureError::FrameCapture { index, .. } => Some(*index),
            _ => None,
        }
    }
}
