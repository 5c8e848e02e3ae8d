//! The main render graph and builder for composing render pipelines.

use crate::error::{PixelateError, PixelateResult};
use crate::gpu::GpuContext;
use crate::render_graph::{FrameImage, RenderContext, RenderNode, RenderTarget, ViewKind};

const TARGET_A: &str = "RenderGraph Target A";
const TARGET_B: &str = "RenderGraph Target B";

/// Builder for constructing render graphs with a fluent API.
///
/// Nodes execute in insertion order. The first node receives no input
/// (`input` is `None`), while subsequent nodes receive the previous
/// node's output. The final node renders directly to the screen.
///
/// ```ignore
/// let graph = RenderGraph::builder()
///     .node(EffectNode::new(scene))         // First: render scene
///     .node(PixelateNode::new(effect))      // Then: pixelate to screen
///     .build(&gpu);
/// ```
pub struct RenderGraphBuilder {
    nodes: Vec<Box<dyn RenderNode>>,
}

impl RenderGraphBuilder {
    /// Creates a new empty render graph builder.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds a render node to the graph.
    pub fn node<N: RenderNode + 'static>(mut self, node: N) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    /// Builds the render graph, allocating ping-pong buffers at the current
    /// output size.
    pub fn build(self, gpu: &GpuContext) -> RenderGraph {
        RenderGraph {
            nodes: self.nodes,
            target_a: RenderTarget::new(gpu, TARGET_A),
            target_b: RenderTarget::new(gpu, TARGET_B),
        }
    }
}

impl Default for RenderGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A composable render graph that executes a chain of render passes.
///
/// For multi-pass rendering, the graph uses two intermediate render targets
/// (ping-pong buffers). Each pass alternates between reading from one buffer
/// and writing to the other, with the final pass writing directly to the screen.
///
/// ```text
/// Pass 0: None → Target A
/// Pass 1: Target A → Target B
/// Pass 2: Target B → Screen
/// ```
///
/// For single-node graphs, no intermediate buffers are used.
pub struct RenderGraph {
    nodes: Vec<Box<dyn RenderNode>>,
    target_a: RenderTarget,
    target_b: RenderTarget,
}

impl RenderGraph {
    /// Creates a new render graph builder.
    pub fn builder() -> RenderGraphBuilder {
        RenderGraphBuilder::new()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks all nodes for hot-reload changes.
    ///
    /// Called automatically by [`execute`](Self::execute).
    pub fn check_hot_reload(&mut self, gpu: &GpuContext) {
        for node in &mut self.nodes {
            node.check_hot_reload(gpu);
        }
    }

    /// Executes the render graph and presents to the window surface.
    ///
    /// Returns [`PixelateError::Device`] when there is no surface or the
    /// surface texture cannot be acquired. A lost or outdated surface is
    /// reconfigured so the next frame can succeed.
    pub fn execute(&mut self, gpu: &GpuContext, time: f32, view: ViewKind) -> PixelateResult<()> {
        self.check_hot_reload(gpu);

        self.target_a.ensure_size(gpu, TARGET_A);
        self.target_b.ensure_size(gpu, TARGET_B);

        let surface = gpu
            .surface
            .as_ref()
            .ok_or_else(|| PixelateError::device("render graph has no surface to present to"))?;

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.reconfigure();
                return Err(PixelateError::device("surface lost, reconfigured"));
            }
            Err(err) => return Err(PixelateError::device(err)),
        };
        let screen_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("RenderGraph Encoder"),
            });

        {
            let mut ctx = RenderContext {
                gpu,
                encoder: &mut encoder,
                time,
                view,
            };
            let screen = FrameImage::new(&output.texture, &screen_view);
            self.run_nodes(&mut ctx, screen);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn run_nodes(&mut self, ctx: &mut RenderContext, screen: FrameImage) {
        let Self {
            nodes,
            target_a,
            target_b,
        } = self;
        let node_count = nodes.len();

        let mut current_input: Option<FrameImage> = None;
        for (i, node) in nodes.iter_mut().enumerate() {
            let is_last = i == node_count - 1;
            let ping = if i % 2 == 0 { target_a.frame() } else { target_b.frame() };
            let target = if is_last { screen } else { ping };

            node.execute(ctx, target, current_input);

            if !is_last {
                current_input = Some(ping);
            }
        }
    }

    /// Releases per-output resources held by every node.
    pub fn release(&mut self) {
        for node in &mut self.nodes {
            node.release();
        }
    }
}
