//! Render node hosting a [`ScreenEffect`] such as the pixelation effect.

use std::cell::RefCell;
use std::rc::Rc;

use crate::effect::{OutputDescriptor, PixelateEffect, ScreenEffect};
use crate::gpu::GpuContext;
use crate::hot_kernel::HotKernel;
use crate::render_graph::{FrameImage, RenderContext, RenderNode};

/// Runs a [`PixelateEffect`] on the previous node's output.
///
/// The effect is shared through `Rc<RefCell<_>>` so the application can tune
/// it (block size, bypass) between frames while the graph owns the node.
/// Placed first in a graph it has no input; it then clears its target and
/// warns once.
///
/// ```ignore
/// let effect = Rc::new(RefCell::new(PixelateEffect::with_builtin_kernel(config)?));
/// let graph = RenderGraph::builder()
///     .node(EffectNode::new(EffectPass::scene(&gpu)))
///     .node(PixelateNode::new(effect.clone()))
///     .build(&gpu);
///
/// effect.borrow_mut().set_block_size(12);
/// ```
pub struct PixelateNode {
    effect: Rc<RefCell<PixelateEffect>>,
    hot: Option<HotKernel>,
    missing_input_reported: bool,
}

impl PixelateNode {
    pub fn new(effect: Rc<RefCell<PixelateEffect>>) -> Self {
        Self {
            effect,
            hot: None,
            missing_input_reported: false,
        }
    }

    /// Reload the effect's kernel whenever `hot`'s file changes.
    pub fn with_hot_kernel(mut self, hot: HotKernel) -> Self {
        self.hot = Some(hot);
        self
    }

    /// Returns `true` the first time in a run of frames without an input.
    fn report_missing_input(&mut self, has_input: bool) -> bool {
        let report = !has_input && !self.missing_input_reported;
        self.missing_input_reported = !has_input;
        report
    }
}

impl RenderNode for PixelateNode {
    fn execute(&mut self, ctx: &mut RenderContext, target: FrameImage, input: Option<FrameImage>) {
        if self.report_missing_input(input.is_some()) {
            log::warn!("pixelate node has no input; place it after a node that renders the scene");
        }
        let Some(input) = input else {
            clear(ctx, target);
            return;
        };

        let mut effect = self.effect.borrow_mut();
        // Failures are logged by the effect, which passes the frame through.
        let _ = effect.prepare(ctx.gpu, &OutputDescriptor::of(&target));
        effect.apply(ctx, input, target);
    }

    fn check_hot_reload(&mut self, _gpu: &GpuContext) {
        if let Some(kernel) = self.hot.as_mut().and_then(HotKernel::poll) {
            self.effect.borrow_mut().set_kernel(Some(kernel));
        }
    }

    fn release(&mut self) {
        self.effect.borrow_mut().release();
    }
}

/// Clear `target` to opaque black.
fn clear(ctx: &mut RenderContext, target: FrameImage) {
    ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Pixelate Node Clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target.view,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
}
