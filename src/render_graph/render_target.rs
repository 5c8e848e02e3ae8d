//! Render targets, frame handles and the execution context for the render graph.

use crate::gpu::GpuContext;

/// Which kind of view a frame is rendered for.
///
/// Screen effects only run for [`ViewKind::Game`]. Preview views (thumbnails,
/// editor-style inspection views) receive the unprocessed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    Game,
    Preview,
}

/// A borrowed frame texture: the texture for size/format/usage queries and a
/// view for binding.
#[derive(Clone, Copy)]
pub struct FrameImage<'a> {
    pub texture: &'a wgpu::Texture,
    pub view: &'a wgpu::TextureView,
}

impl<'a> FrameImage<'a> {
    pub fn new(texture: &'a wgpu::Texture, view: &'a wgpu::TextureView) -> Self {
        Self { texture, view }
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    pub fn usage(&self) -> wgpu::TextureUsages {
        self.texture.usage()
    }
}

/// An off-screen render target used for intermediate pass results.
///
/// Render targets can be rendered to (color attachment), sampled from (texture
/// binding) and copied from, so a screen effect may either sample them or copy
/// them verbatim.
///
/// The render graph manages two of these as ping-pong buffers and resizes them
/// when the output dimensions change.
pub struct RenderTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used for render pass attachments and shader sampling.
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Creates a new render target matching the current output dimensions and format.
    ///
    /// # Arguments
    ///
    /// * `gpu` - The GPU context providing device and output configuration
    /// * `label` - Debug label for the texture (visible in GPU debuggers like RenderDoc)
    pub fn new(gpu: &GpuContext, label: &str) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width: gpu.width(),
            height: gpu.height(),
        }
    }

    /// Checks if the target dimensions match the output and recreates if needed.
    ///
    /// Called at the start of each frame to handle window resizes.
    pub fn ensure_size(&mut self, gpu: &GpuContext, label: &str) {
        if self.width != gpu.width() || self.height != gpu.height() {
            *self = Self::new(gpu, label);
        }
    }

    /// Borrow this target as a frame image.
    pub fn frame(&self) -> FrameImage<'_> {
        FrameImage::new(&self.texture, &self.view)
    }
}

/// Execution context passed to each render node during graph traversal.
///
/// Created fresh for each frame. The `'a` lifetime ties all references to the
/// frame's scope, so nodes cannot hold onto them beyond the current frame.
pub struct RenderContext<'a> {
    /// GPU context providing access to device, queue, and configuration.
    pub gpu: &'a GpuContext,
    /// Command encoder for recording commands. Nodes append to it in order.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Elapsed time in seconds since application start.
    pub time: f32,
    /// The kind of view this frame is rendered for.
    pub view: ViewKind,
}
