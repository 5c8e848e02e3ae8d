//! Error type shared by every fallible operation in the crate.
//!
//! Per-frame paths never return these to the host: the effect logs the error and
//! falls back to passing the frame through. Setup paths (device creation, kernel
//! loading, headless runs) propagate them with `?`.

/// Centralized error type for pixelation operations.
#[derive(thiserror::Error, Debug)]
pub enum PixelateError {
    /// No compute kernel was supplied; the effect stays disabled.
    #[error("no compute kernel configured")]
    MissingKernel,

    /// The kernel source failed to parse as WGSL.
    #[error("kernel source failed to parse: {0}")]
    KernelParse(String),

    /// No entry point with the requested name exists in the kernel module.
    #[error("kernel entry point '{0}' not found")]
    EntryPointNotFound(String),

    /// The named entry point exists but is not a compute shader.
    #[error("entry point '{0}' is not a compute kernel")]
    NotCompute(String),

    /// The GPU rejected the kernel module or its pipeline.
    #[error("kernel pipeline creation failed: {0}")]
    Pipeline(String),

    /// Creating a GPU resource failed (out of memory or validation).
    #[error("failed to allocate {label} ({width}x{height}): {reason}")]
    Allocation {
        label: &'static str,
        width: u32,
        height: u32,
        reason: String,
    },

    /// Adapter or device acquisition failed.
    #[error("device error: {0}")]
    Device(String),

    /// Mapping a readback buffer failed.
    #[error("readback error: {0}")]
    Readback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PixelateError {
    pub fn device<T: ToString>(msg: T) -> Self {
        PixelateError::Device(msg.to_string())
    }

    pub fn readback<T: ToString>(msg: T) -> Self {
        PixelateError::Readback(msg.to_string())
    }
}

/// Result type alias for pixelation operations.
pub type PixelateResult<T> = Result<T, PixelateError>;
