//! The interactive viewer: a winit window showing an animated scene through
//! the pixelation effect.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::ViewerConfig;
use crate::effect::PixelateEffect;
use crate::effect_pass::EffectPass;
use crate::error::{PixelateError, PixelateResult};
use crate::gpu::GpuContext;
use crate::hot_kernel::HotKernel;
use crate::input::Input;
use crate::kernel::ComputeKernel;
use crate::render_graph::{EffectNode, PixelateNode, RenderGraph, ViewKind};

/// Open a window showing the animated test scene through the pixelation
/// effect.
///
/// Controls: Up/Down or the mouse wheel change the block size, `P` toggles
/// the effect, `Escape` quits. With `kernel: None` the scene is shown
/// unprocessed. With a [`HotKernel`], edits to its file are picked up live.
///
/// ```no_run
/// use pixelate::{ComputeKernel, ViewerConfig, run_viewer};
///
/// run_viewer(ViewerConfig::new().size(1280, 720), Some(ComputeKernel::builtin()?), None)?;
/// # Ok::<(), pixelate::PixelateError>(())
/// ```
pub fn run_viewer(
    config: ViewerConfig,
    kernel: Option<ComputeKernel>,
    hot: Option<HotKernel>,
) -> PixelateResult<()> {
    let event_loop = EventLoop::new().map_err(PixelateError::device)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::Pending { config, kernel, hot };
    event_loop.run_app(&mut app).map_err(PixelateError::device)?;

    match app {
        ViewerApp::Finished(Some(err)) => Err(err),
        _ => Ok(()),
    }
}

enum ViewerApp {
    Pending {
        config: ViewerConfig,
        kernel: Option<ComputeKernel>,
        hot: Option<HotKernel>,
    },
    Running(Box<Viewer>),
    Finished(Option<PixelateError>),
}

struct Viewer {
    window: Arc<Window>,
    gpu: GpuContext,
    graph: RenderGraph,
    effect: Rc<RefCell<PixelateEffect>>,
    input: Input,
    base_title: String,
    title: String,
    start_time: Instant,
}

impl Viewer {
    fn start(
        event_loop: &ActiveEventLoop,
        config: ViewerConfig,
        kernel: Option<ComputeKernel>,
        hot: Option<HotKernel>,
    ) -> PixelateResult<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(PixelateError::device)?,
        );
        let gpu = GpuContext::new(window.clone())?;

        let effect = Rc::new(RefCell::new(PixelateEffect::new(config.effect.clone(), kernel)));
        let mut node = PixelateNode::new(Rc::clone(&effect));
        if let Some(hot) = hot {
            log::info!("watching {} for kernel changes", hot.path().display());
            node = node.with_hot_kernel(hot);
        }

        let graph = RenderGraph::builder()
            .node(EffectNode::new(EffectPass::scene(&gpu)))
            .node(node)
            .build(&gpu);

        let mut viewer = Self {
            window,
            gpu,
            graph,
            effect,
            input: Input::new(),
            base_title: config.title,
            title: String::new(),
            start_time: Instant::now(),
        };
        viewer.update_title();
        Ok(viewer)
    }

    fn update_title(&mut self) {
        let effect = self.effect.borrow();
        let state = if effect.bypass() { ", off" } else { "" };
        let title = format!("{} ({}{})", self.base_title, effect.block_size(), state);
        drop(effect);

        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }

    /// Apply this frame's controls. Returns `false` when the viewer should quit.
    fn handle_controls(&mut self) -> bool {
        if self.input.key_pressed(KeyCode::Escape) {
            return false;
        }

        let steps = self.input.block_steps();
        let toggle = self.input.key_pressed(KeyCode::KeyP);
        {
            let mut effect = self.effect.borrow_mut();
            let mut block = effect.block_size();
            for _ in 0..steps.unsigned_abs() {
                block = if steps > 0 { block.step_up() } else { block.step_down() };
            }
            if block != effect.block_size() {
                log::info!("block size {}", block);
                effect.set_block_size(block);
            }
            if toggle {
                let bypass = !effect.bypass();
                log::info!("pixelation {}", if bypass { "off" } else { "on" });
                effect.set_bypass(bypass);
            }
        }

        self.update_title();
        true
    }

    fn redraw(&mut self) {
        let time = self.start_time.elapsed().as_secs_f32();
        if let Err(err) = self.graph.execute(&self.gpu, time, ViewKind::Game) {
            log::warn!("frame skipped: {}", err);
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self, ViewerApp::Pending { .. }) {
            return;
        }
        let ViewerApp::Pending { config, kernel, hot } =
            std::mem::replace(self, ViewerApp::Finished(None))
        else {
            return;
        };

        *self = match Viewer::start(event_loop, config, kernel, hot) {
            Ok(viewer) => ViewerApp::Running(Box::new(viewer)),
            Err(err) => {
                event_loop.exit();
                ViewerApp::Finished(Some(err))
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ViewerApp::Running(viewer) = self else {
            return;
        };

        viewer.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                viewer.graph.release();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                viewer.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if !viewer.handle_controls() {
                    viewer.graph.release();
                    event_loop.exit();
                    return;
                }
                viewer.redraw();
                viewer.input.begin_frame();
                viewer.window.request_redraw();
            }
            _ => {}
        }
    }
}
