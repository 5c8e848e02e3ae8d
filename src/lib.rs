//! # Pixelate
//!
//! **Screen-space pixelation for wgpu render pipelines.**
//!
//! A compute kernel collapses every `block_size x block_size` cell of a rendered
//! frame to a single colour. The effect plugs into a host pipeline through the
//! [`ScreenEffect`] lifecycle (`prepare`, `apply`, `release`); this crate ships
//! two hosts, a [`RenderGraph`] node for windowed rendering and a headless
//! runner for images.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pixelate::*;
//!
//! let gpu = GpuContext::headless(640, 480)?;
//! let mut effect = PixelateEffect::with_builtin_kernel(PixelateConfig::default().with_block_size(8))?;
//!
//! let image = image::open("frame.png")?.to_rgba8();
//! let (blocky, outcome) = headless::process_image(&gpu, &mut effect, &image)?;
//! assert!(outcome.is_pixelated());
//! blocky.save("blocky.png")?;
//! # Ok::<(), PixelateError>(())
//! ```
//!
//! ## Failure model
//!
//! Setup (device creation, kernel loading) returns [`PixelateResult`]. Nothing
//! on the per-frame path does: a missing kernel, an unresolvable entry point or
//! a failed scratch allocation passes the frame through unmodified and is
//! logged once.

mod app;
mod blit;
mod config;
mod dispatch;
mod effect;
mod effect_pass;
mod error;
mod gpu;
pub mod headless;
mod hot_kernel;
mod input;
mod kernel;
pub mod reference;
mod render_graph;
mod scratch;

pub use app::run_viewer;
pub use blit::BlitPass;
pub use config::{BlockSize, PixelateConfig, ViewerConfig};
pub use dispatch::DispatchSize;
pub use effect::{
    FrameOutcome, FramePlan, KernelStatus, OutputDescriptor, PassthroughReason, PixelateEffect,
    ScreenEffect, plan_frame,
};
pub use effect_pass::{EffectPass, SCENE_WGSL, ScreenUniforms};
pub use error::{PixelateError, PixelateResult};
pub use gpu::{GpuContext, HEADLESS_FORMAT};
pub use hot_kernel::HotKernel;
pub use input::Input;
pub use kernel::{
    ComputeKernel, DEFAULT_KERNEL_NAME, KernelEntry, KernelParams, PIXELATE_WGSL, ResolvedKernel,
};
pub use render_graph::{
    EffectNode, FrameImage, PixelateNode, RenderContext, RenderGraph, RenderGraphBuilder,
    RenderNode, RenderTarget, ViewKind,
};
pub use scratch::{GpuScratchAllocator, SCRATCH_FORMAT, ScratchAllocator, ScratchBuffer, ScratchTexture};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
