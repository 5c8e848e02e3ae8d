//! Render node for full-screen shader effects.

use crate::effect_pass::EffectPass;
use crate::render_graph::{FrameImage, RenderContext, RenderNode};

/// Render node for full-screen shader effects.
///
/// `EffectNode` wraps an [`EffectPass`] for use in a render graph. It ignores
/// its input and is typically the first node, producing the frame later nodes
/// process.
///
/// ```ignore
/// let graph = RenderGraph::builder()
///     .node(EffectNode::new(EffectPass::scene(&gpu)).with_clear(wgpu::Color::BLUE))
///     .build(&gpu);
/// ```
pub struct EffectNode {
    pub effect: EffectPass,
    /// Clear color for the render target. `None` means load existing contents.
    pub clear_color: Option<wgpu::Color>,
}

impl EffectNode {
    /// Creates a new effect node with default black clear color.
    pub fn new(effect: EffectPass) -> Self {
        Self {
            effect,
            clear_color: Some(wgpu::Color::BLACK),
        }
    }

    pub fn with_clear(mut self, color: wgpu::Color) -> Self {
        self.clear_color = Some(color);
        self
    }

    /// Disables clearing, preserving existing target contents.
    pub fn no_clear(mut self) -> Self {
        self.clear_color = None;
        self
    }
}

impl RenderNode for EffectNode {
    fn execute(&mut self, ctx: &mut RenderContext, target: FrameImage, _input: Option<FrameImage>) {
        let load_op = match self.clear_color {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let mut render_pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Effect Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.effect.render(
            ctx.gpu,
            &mut render_pass,
            target.width(),
            target.height(),
            ctx.time,
        );
    }
}
