use anyhow::{Context, Result};
use ouroboros::self_referencing;
use signband_model::ViewportSize;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::winit_events;
use crate::input::{InputFrame, InputState};

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "signband".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Requests the app can make from inside `on_frame`.
///
/// They take effect once the callback has returned.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    title: Option<String>,
}

impl RuntimeCtx {
    /// Replaces the window title. The last call in a frame wins.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }
}

/// Runs one window whose content is redrawn every display refresh.
pub struct Runtime;

impl Runtime {
    /// Blocks until the window closes or the app exits.
    ///
    /// A window or GPU initialization failure ends the loop and is returned here.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut host = Host {
            config,
            gpu_init,
            app,
            entry: None,
            init_error: None,
            exiting: false,
            shut_down: false,
        };

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        host.init_error.map_or(Ok(()), Err)
    }
}

/// Window, its GPU context, and the input gathered for it.
///
/// `Gpu` borrows the window for the surface lifetime, so both live in one
/// self-referencing struct.
#[self_referencing]
struct WindowEntry {
    input: InputState,
    input_frame: InputFrame,
    frame_index: u64,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl WindowEntry {
    fn open(event_loop: &ActiveEventLoop, config: &RuntimeConfig, gpu_init: GpuInit) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        WindowEntryTryBuilder {
            input: InputState::default(),
            input_frame: InputFrame::default(),
            frame_index: 0,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")
    }

    fn id(&self) -> WindowId {
        self.with_window(|w| w.id())
    }

    fn request_redraw(&self) {
        self.with_window(|w| w.request_redraw());
    }
}

struct Host<A: App> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    init_error: Option<anyhow::Error>,
    exiting: bool,
    shut_down: bool,
}

impl<A: App> Host<A> {
    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        event_loop.exit();
    }

    /// Calls `on_exit`, then drops the GPU context and window. Runs once.
    fn shutdown(&mut self) {
        if std::mem::replace(&mut self.shut_down, true) {
            return;
        }
        self.app.on_exit();
        self.entry = None;
        log::info!("runtime shut down");
    }

    fn resize(&mut self, size: ViewportSize) {
        let Some(entry) = self.entry.as_mut() else { return };
        if entry.with_gpu_mut(|gpu| gpu.resize(size)) {
            let app = &mut self.app;
            entry.with_gpu(|gpu| app.on_resized(gpu, size));
        }
        entry.request_redraw();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else { return };
        let app = &mut self.app;
        let mut runtime = RuntimeCtx::default();

        let control = entry.with_mut(|fields| {
            *fields.frame_index += 1;
            let control = {
                let mut ctx = FrameCtx {
                    window: WindowCtx { window: fields.window },
                    gpu: fields.gpu,
                    input: fields.input,
                    input_frame: fields.input_frame,
                    frame_index: *fields.frame_index,
                    runtime: &mut runtime,
                };
                app.on_frame(&mut ctx)
            };
            fields.input_frame.clear();
            control
        });

        if let Some(title) = runtime.title.take() {
            entry.with_window(|w| w.set_title(&title));
        }
        if control == AppControl::Exit {
            self.exit(event_loop);
        }
    }
}

impl<A: App> ApplicationHandler for Host<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.shut_down {
            return;
        }

        match WindowEntry::open(event_loop, &self.config, self.gpu_init.clone()) {
            Ok(entry) => {
                let app = &mut self.app;
                entry.with_gpu(|gpu| app.on_resized(gpu, gpu.size()));
                entry.request_redraw();
                self.entry = Some(entry);
            }
            Err(e) => {
                log::error!("failed to open window: {e:#}");
                self.init_error = Some(e);
                self.exit(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);

        // The band never stops moving; FIFO present paces the loop.
        if let Some(entry) = self.entry.as_ref() {
            entry.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        let Some(entry) = self.entry.as_mut() else { return };
        if entry.id() != window_id {
            return;
        }

        entry.with_mut(|fields| {
            if let Some(input) = winit_events::translate(fields.window.scale_factor(), &event) {
                fields.input.apply(fields.input_frame, input);
            }
        });
        if self.app.on_window_event(&event) == AppControl::Exit {
            self.exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),
            WindowEvent::Resized(size) => self.resize(ViewportSize::new(size.width, size.height)),
            WindowEvent::ScaleFactorChanged { .. } => {
                let Some(inner) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) else {
                    return;
                };
                self.resize(ViewportSize::new(inner.width, inner.height));
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
