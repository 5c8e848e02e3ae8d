//! The core render node trait for the render graph.

use crate::gpu::GpuContext;
use crate::render_graph::{FrameImage, RenderContext};

/// Trait for render graph nodes that can execute rendering operations.
///
/// Each node receives the previous pass's output (if any) and writes to a
/// target frame.
///
/// # Execution Flow
///
/// 1. `check_hot_reload()` is called once per frame for all nodes
/// 2. `execute()` is called in sequence, with ping-pong buffer management
/// 3. The final node renders directly to the output
/// 4. `release()` is called when the graph is torn down
///
/// # Implementing Custom Nodes
///
/// ```ignore
/// struct InvertNode {
///     pass: BlitPass,
/// }
///
/// impl RenderNode for InvertNode {
///     fn execute(&mut self, ctx: &mut RenderContext, target: FrameImage, input: Option<FrameImage>) {
///         if let Some(input) = input {
///             self.pass.blit(ctx.gpu, ctx.encoder, input.view, target.view);
///         }
///     }
/// }
/// ```
pub trait RenderNode {
    /// Executes this node's rendering operations.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Render context with GPU access, encoder, time, and view kind
    /// * `target` - Frame to render into (either intermediate buffer or output)
    /// * `input` - Previous pass output, or `None` for the first node in the graph
    fn execute(&mut self, ctx: &mut RenderContext, target: FrameImage, input: Option<FrameImage>);

    /// Called once per frame before `execute()` to check for hot-reload changes.
    ///
    /// The default implementation does nothing.
    fn check_hot_reload(&mut self, _gpu: &GpuContext) {}

    /// Frees per-output GPU resources. The default implementation does nothing.
    fn release(&mut self) {}
}
