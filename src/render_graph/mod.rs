//! Composable render graph for chaining the scene and screen effects.
//!
//! Nodes run in order with automatic ping-pong buffer management: each node
//! reads the previous node's output and writes its own target, and the last
//! node writes the window surface.
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────┐
//! │  EffectNode │───▶│ PixelateNode │───▶│   Screen    │
//! │  (Scene)    │    │              │    │  (Final)    │
//! └─────────────┘    └──────────────┘    └─────────────┘
//!       │
//!       ▼
//!   Target A
//! ```
//!
//! - [`EffectNode`]: full-screen shader effects (the animated test scene)
//! - [`PixelateNode`]: hosts a [`PixelateEffect`](crate::PixelateEffect)
//!
//! ```ignore
//! let mut graph = RenderGraph::builder()
//!     .node(EffectNode::new(EffectPass::scene(&gpu)))
//!     .node(PixelateNode::new(effect.clone()))
//!     .build(&gpu);
//!
//! graph.execute(&gpu, time, ViewKind::Game)?;
//! ```

mod effect_nodes;
mod graph;
mod pixelate_node;
mod render_node;
mod render_target;

pub use effect_nodes::EffectNode;
pub use graph::{RenderGraph, RenderGraphBuilder};
pub use pixelate_node::PixelateNode;
pub use render_node::RenderNode;
pub use render_target::{FrameImage, RenderContext, RenderTarget, ViewKind};
