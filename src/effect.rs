//! The pixelation effect and the lifecycle hosts drive it through.
//!
//! A host calls [`ScreenEffect::prepare`] with its output description before a
//! frame, [`ScreenEffect::apply`] once per frame with the source and destination
//! images, and [`ScreenEffect::release`] when the output goes away. The render
//! graph's [`PixelateNode`](crate::PixelateNode) and the
//! [`headless`](crate::headless) runner are two such hosts.
//!
//! # States
//!
//! ```text
//!   Uninitialized ──(kernel resolves)──▶ Ready
//!        ▲                                 │
//!        └──(kernel name/source changes)───┘
//! ```
//!
//! In `Uninitialized` every frame passes through unmodified. An effect created
//! without a kernel never leaves it. Resolution failures are retried on the next
//! `prepare`.
//!
//! Per-frame failures never reach the host: they are logged once per change of
//! outcome and the frame is passed through.

use crate::blit::BlitPass;
use crate::config::{BlockSize, PixelateConfig};
use crate::dispatch::DispatchSize;
use crate::error::{PixelateError, PixelateResult};
use crate::gpu::GpuContext;
use crate::kernel::{ComputeKernel, KernelEntry, KernelParams, ResolvedKernel};
use crate::render_graph::{FrameImage, RenderContext, ViewKind};
use crate::scratch::{GpuScratchAllocator, ScratchBuffer, ScratchTexture};

/// Size and format of the host's output, known before a frame is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl OutputDescriptor {
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }

    /// Describe an existing frame.
    pub fn of(frame: &FrameImage) -> Self {
        Self::new(frame.width(), frame.height(), frame.format())
    }

    /// Describe the GPU context's configured output.
    pub fn of_gpu(gpu: &GpuContext) -> Self {
        Self::new(gpu.width(), gpu.height(), gpu.format())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Lifecycle of a screen-space effect driven by a host pipeline.
pub trait ScreenEffect {
    /// Called before each frame with the host's output description.
    ///
    /// An error means the next `apply` will pass the frame through. Hosts may
    /// ignore it; `apply` falls back on its own.
    fn prepare(&mut self, gpu: &GpuContext, output: &OutputDescriptor) -> PixelateResult<()>;

    /// Write the processed `source` into `destination`.
    fn apply(
        &mut self,
        ctx: &mut RenderContext,
        source: FrameImage,
        destination: FrameImage,
    ) -> FrameOutcome;

    /// Free per-output GPU resources. The next `prepare` recreates them.
    fn release(&mut self);
}

/// Why a frame was passed through instead of pixelated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// No kernel was configured; the effect is off for its lifetime.
    Disabled,
    /// The kernel entry point could not be resolved.
    KernelUnavailable,
    /// The frame belongs to a preview view.
    PreviewView,
    /// The host turned the effect off.
    Bypassed,
    /// The frame has no pixels.
    EmptyFrame,
    /// Source and destination sizes differ.
    SizeMismatch,
    /// The scratch target could not be allocated.
    ScratchUnavailable,
}

/// What a call to [`ScreenEffect::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Pixelated(DispatchSize),
    Passthrough(PassthroughReason),
}

impl FrameOutcome {
    pub fn is_pixelated(&self) -> bool {
        matches!(self, FrameOutcome::Pixelated(_))
    }
}

/// Whether a usable kernel entry point is available.
#[derive(Debug, Clone, Copy)]
pub enum KernelStatus<'a> {
    Missing,
    Unresolved,
    Ready(&'a KernelEntry),
}

/// What the effect will do with a frame, decided before any GPU work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePlan {
    Dispatch(DispatchSize),
    Passthrough(PassthroughReason),
}

/// Decide how to handle a `width x height` frame.
pub fn plan_frame(
    kernel: KernelStatus,
    view: ViewKind,
    bypass: bool,
    width: u32,
    height: u32,
    block: BlockSize,
) -> FramePlan {
    let entry = match kernel {
        KernelStatus::Missing => return FramePlan::Passthrough(PassthroughReason::Disabled),
        KernelStatus::Unresolved => {
            return FramePlan::Passthrough(PassthroughReason::KernelUnavailable);
        }
        KernelStatus::Ready(entry) => entry,
    };

    if bypass {
        return FramePlan::Passthrough(PassthroughReason::Bypassed);
    }
    if view == ViewKind::Preview {
        return FramePlan::Passthrough(PassthroughReason::PreviewView);
    }

    let groups = DispatchSize::for_frame(width, height, block, entry.workgroup_size());
    if groups.is_empty() {
        return FramePlan::Passthrough(PassthroughReason::EmptyFrame);
    }
    FramePlan::Dispatch(groups)
}

enum EffectState {
    Uninitialized,
    Ready(ResolvedKernel),
}

/// Screen-space pixelation driven by a compute kernel.
///
/// # Example
///
/// ```no_run
/// use pixelate::{ComputeKernel, GpuContext, OutputDescriptor, PixelateConfig, PixelateEffect, ScreenEffect};
///
/// let gpu = GpuContext::headless(800, 600)?;
/// let kernel = ComputeKernel::builtin()?;
/// let mut effect = PixelateEffect::new(PixelateConfig::default().with_block_size(8), Some(kernel));
/// effect.prepare(&gpu, &OutputDescriptor::of_gpu(&gpu))?;
/// assert!(effect.is_ready());
/// # Ok::<(), pixelate::PixelateError>(())
/// ```
pub struct PixelateEffect {
    config: PixelateConfig,
    kernel: Option<ComputeKernel>,
    state: EffectState,
    scratch: ScratchBuffer<ScratchTexture>,
    blit: Option<BlitPass>,
    bypass: bool,
    last_failure: Option<String>,
    last_outcome: Option<FrameOutcome>,
}

impl PixelateEffect {
    /// Create an effect. With `kernel: None` the effect is disabled for its
    /// lifetime and every frame passes through.
    pub fn new(config: PixelateConfig, kernel: Option<ComputeKernel>) -> Self {
        if kernel.is_none() {
            log::warn!("no compute kernel configured, pixelation disabled");
        }

        Self {
            config,
            kernel,
            state: EffectState::Uninitialized,
            scratch: ScratchBuffer::new(),
            blit: None,
            bypass: false,
            last_failure: None,
            last_outcome: None,
        }
    }

    /// Create an effect using the built-in kernel.
    pub fn with_builtin_kernel(config: PixelateConfig) -> PixelateResult<Self> {
        Ok(Self::new(config, Some(ComputeKernel::builtin()?)))
    }

    pub fn config(&self) -> &PixelateConfig {
        &self.config
    }

    pub fn block_size(&self) -> BlockSize {
        self.config.block_size
    }

    /// Change the block size. Takes effect on the next frame.
    pub fn set_block_size(&mut self, block_size: impl Into<BlockSize>) {
        self.config.block_size = block_size.into();
    }

    /// Change the kernel entry point. The next `prepare` resolves it.
    pub fn set_kernel_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.config.kernel_name {
            self.config.kernel_name = name;
            self.state = EffectState::Uninitialized;
        }
    }

    /// Replace the kernel module (for example after a hot reload).
    pub fn set_kernel(&mut self, kernel: Option<ComputeKernel>) {
        self.kernel = kernel;
        self.state = EffectState::Uninitialized;
        self.last_failure = None;
    }

    /// Pass frames through unmodified while `true`.
    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// `true` once a kernel entry point has been resolved into a pipeline.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, EffectState::Ready(_))
    }

    /// How many times the scratch target has been (re)allocated.
    pub fn scratch_reallocations(&self) -> u64 {
        self.scratch.reallocations()
    }

    /// Dimensions of the current scratch target.
    pub fn scratch_size(&self) -> Option<(u32, u32)> {
        self.scratch.size()
    }

    fn kernel_status(&self) -> KernelStatus<'_> {
        match (&self.kernel, &self.state) {
            (None, _) => KernelStatus::Missing,
            (Some(_), EffectState::Uninitialized) => KernelStatus::Unresolved,
            (Some(_), EffectState::Ready(resolved)) => KernelStatus::Ready(resolved.entry()),
        }
    }

    /// Resolve the configured entry point if not already resolved.
    fn ensure_resolved(&mut self, gpu: &GpuContext) -> PixelateResult<()> {
        if self.is_ready() {
            return Ok(());
        }
        let kernel = self.kernel.as_ref().ok_or(PixelateError::MissingKernel)?;

        match kernel.resolve(gpu, &self.config.kernel_name) {
            Ok(resolved) => {
                self.state = EffectState::Ready(resolved);
                self.last_failure = None;
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                if self.last_failure.as_deref() != Some(message.as_str()) {
                    log::warn!("kernel unavailable, passing frames through: {}", message);
                    self.last_failure = Some(message);
                }
                Err(err)
            }
        }
    }

    fn ensure_blit(&mut self, gpu: &GpuContext, format: wgpu::TextureFormat) {
        if self.blit.as_ref().map(BlitPass::format) != Some(format) {
            self.blit = Some(BlitPass::new(gpu, format));
        }
    }

    /// Copy `source` to `destination` unchanged.
    ///
    /// Uses a texture copy when the two are copy-compatible, which is exact;
    /// otherwise a nearest-sampled blit.
    fn passthrough(&mut self, ctx: &mut RenderContext, source: FrameImage, destination: FrameImage) {
        if source.width() == 0 || source.height() == 0 {
            return;
        }

        let copyable = source.format() == destination.format()
            && source.size() == destination.size()
            && source.usage().contains(wgpu::TextureUsages::COPY_SRC)
            && destination.usage().contains(wgpu::TextureUsages::COPY_DST);

        if copyable {
            ctx.encoder.copy_texture_to_texture(
                source.texture.as_image_copy(),
                destination.texture.as_image_copy(),
                source.texture.size(),
            );
            return;
        }

        self.ensure_blit(ctx.gpu, destination.format());
        if let Some(blit) = &self.blit {
            blit.blit(ctx.gpu, ctx.encoder, source.view, destination.view);
        }
    }

    /// Record the kernel dispatch and the scratch-to-destination blit.
    ///
    /// Returns `false`, recording nothing, unless the kernel is resolved and the
    /// scratch target and blit pipeline exist.
    fn record_dispatch(
        &self,
        ctx: &mut RenderContext,
        source: FrameImage,
        destination: FrameImage,
        groups: DispatchSize,
    ) -> bool {
        let (EffectState::Ready(kernel), Some(scratch), Some(blit)) =
            (&self.state, self.scratch.get(), &self.blit)
        else {
            return false;
        };

        let params = KernelParams::new(self.config.block_size.get(), source.width(), source.height());
        kernel.dispatch(ctx.gpu, ctx.encoder, source.view, &scratch.view, params, groups);
        blit.blit_with_sampler(ctx.gpu, ctx.encoder, &scratch.view, &scratch.sampler, destination.view);
        true
    }

    fn record_outcome(&mut self, outcome: FrameOutcome) {
        if self.last_outcome == Some(outcome) {
            return;
        }
        match outcome {
            FrameOutcome::Pixelated(groups) => {
                log::debug!("pixelating at {} ({:?} workgroups)", self.config.block_size, groups);
            }
            FrameOutcome::Passthrough(
                PassthroughReason::Bypassed | PassthroughReason::PreviewView | PassthroughReason::EmptyFrame,
            ) => {
                log::debug!("frame passed through: {:?}", outcome);
            }
            FrameOutcome::Passthrough(reason) => {
                log::warn!("frame passed through: {:?}", reason);
            }
        }
        self.last_outcome = Some(outcome);
    }
}

impl ScreenEffect for PixelateEffect {
    fn prepare(&mut self, gpu: &GpuContext, output: &OutputDescriptor) -> PixelateResult<()> {
        self.ensure_blit(gpu, output.format);
        self.ensure_resolved(gpu)?;

        if output.is_empty() {
            return Ok(());
        }
        let mut allocator = GpuScratchAllocator::new(gpu);
        self.scratch
            .ensure(&mut allocator, output.width, output.height)
            .map(|_| ())
    }

    fn apply(
        &mut self,
        ctx: &mut RenderContext,
        source: FrameImage,
        destination: FrameImage,
    ) -> FrameOutcome {
        // Hosts that skip `prepare` still get a resolution attempt.
        if self.kernel.is_some() && !self.is_ready() {
            let _ = self.ensure_resolved(ctx.gpu);
        }

        let (width, height) = source.size();
        let plan = if source.size() != destination.size() {
            FramePlan::Passthrough(PassthroughReason::SizeMismatch)
        } else {
            plan_frame(
                self.kernel_status(),
                ctx.view,
                self.bypass,
                width,
                height,
                self.config.block_size,
            )
        };

        let outcome = match plan {
            FramePlan::Passthrough(reason) => {
                self.passthrough(ctx, source, destination);
                FrameOutcome::Passthrough(reason)
            }
            FramePlan::Dispatch(groups) => {
                let mut allocator = GpuScratchAllocator::new(ctx.gpu);
                let ensured = self.scratch.ensure(&mut allocator, width, height).map(|_| ());
                match ensured {
                    Err(err) => {
                        log::warn!("{}", err);
                        self.passthrough(ctx, source, destination);
                        FrameOutcome::Passthrough(PassthroughReason::ScratchUnavailable)
                    }
                    Ok(()) => {
                        self.ensure_blit(ctx.gpu, destination.format());
                        if self.record_dispatch(ctx, source, destination, groups) {
                            FrameOutcome::Pixelated(groups)
                        } else {
                            self.passthrough(ctx, source, destination);
                            FrameOutcome::Passthrough(PassthroughReason::ScratchUnavailable)
                        }
                    }
                }
            }
        };

        self.record_outcome(outcome);
        outcome
    }

    fn release(&mut self) {
        self.scratch.release();
        self.blit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> KernelEntry {
        ComputeKernel::builtin()
            .unwrap()
            .find_kernel("Pixelate")
            .unwrap()
    }

    #[test]
    fn missing_kernel_passes_through() {
        let plan = plan_frame(KernelStatus::Missing, ViewKind::Game, false, 800, 600, BlockSize::DEFAULT);
        assert_eq!(plan, FramePlan::Passthrough(PassthroughReason::Disabled));
    }

    #[test]
    fn unresolved_kernel_passes_through() {
        let plan = plan_frame(KernelStatus::Unresolved, ViewKind::Game, false, 800, 600, BlockSize::DEFAULT);
        assert_eq!(plan, FramePlan::Passthrough(PassthroughReason::KernelUnavailable));
    }

    #[test]
    fn preview_views_are_skipped() {
        let entry = entry();
        let plan = plan_frame(KernelStatus::Ready(&entry), ViewKind::Preview, false, 800, 600, BlockSize::DEFAULT);
        assert_eq!(plan, FramePlan::Passthrough(PassthroughReason::PreviewView));
    }

    #[test]
    fn bypass_wins_over_dispatch() {
        let entry = entry();
        let plan = plan_frame(KernelStatus::Ready(&entry), ViewKind::Game, true, 800, 600, BlockSize::DEFAULT);
        assert_eq!(plan, FramePlan::Passthrough(PassthroughReason::Bypassed));
    }

    #[test]
    fn ready_kernel_dispatches_with_reflected_group_size() {
        let entry = entry();
        let plan = plan_frame(KernelStatus::Ready(&entry), ViewKind::Game, false, 801, 600, BlockSize::new(40));
        assert_eq!(plan, FramePlan::Dispatch(DispatchSize { x: 3, y: 2, z: 1 }));
    }

    #[test]
    fn empty_frame_is_not_dispatched() {
        let entry = entry();
        let plan = plan_frame(KernelStatus::Ready(&entry), ViewKind::Game, false, 0, 0, BlockSize::DEFAULT);
        assert_eq!(plan, FramePlan::Passthrough(PassthroughReason::EmptyFrame));
    }

    #[test]
    fn effect_without_kernel_reports_missing() {
        let effect = PixelateEffect::new(PixelateConfig::default(), None);
        assert!(!effect.is_ready());
        assert!(matches!(effect.kernel_status(), KernelStatus::Missing));
    }

    #[test]
    fn live_tuning_clamps_and_renaming_resets_state() {
        let mut effect = PixelateEffect::with_builtin_kernel(PixelateConfig::default()).unwrap();
        effect.set_block_size(99);
        assert_eq!(effect.block_size().get(), 40);

        effect.set_kernel_name("Other");
        assert_eq!(effect.config().kernel_name, "Other");
        assert!(matches!(effect.kernel_status(), KernelStatus::Unresolved));
    }

    #[test]
    fn output_descriptor_detects_empty_output() {
        let desc = OutputDescriptor::new(0, 600, wgpu::TextureFormat::Rgba8Unorm);
        assert!(desc.is_empty());
        assert!(!OutputDescriptor::new(1, 1, wgpu::TextureFormat::Rgba8Unorm).is_empty());
    }

    #[test]
    fn missing_scratch_records_no_dispatch() {
        let Ok(gpu) = GpuContext::headless(16, 16) else {
            return;
        };
        let mut effect = PixelateEffect::with_builtin_kernel(PixelateConfig::default()).unwrap();
        effect
            .prepare(&gpu, &OutputDescriptor::new(16, 16, crate::gpu::HEADLESS_FORMAT))
            .unwrap();
        assert!(effect.is_ready());
        effect.release();

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: 16,
                height: 16,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: crate::gpu::HEADLESS_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let frame = FrameImage::new(&texture, &view);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let mut ctx = RenderContext {
            gpu: &gpu,
            encoder: &mut encoder,
            time: 0.0,
            view: ViewKind::Game,
        };
        let groups = DispatchSize::for_frame(16, 16, BlockSize::DEFAULT, [8, 8, 1]);
        assert!(!effect.record_dispatch(&mut ctx, frame, frame, groups));
    }
}
