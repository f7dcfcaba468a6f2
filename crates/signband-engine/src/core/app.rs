use signband_model::ViewportSize;
use winit::event::WindowEvent;

use crate::device::Gpu;

use super::ctx::FrameCtx;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Callbacks the runtime drives. Only `on_frame` is required.
pub trait App {
    /// Raw window events, after input has been recorded for the next frame.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// The surface now has a new non-zero physical size. Also called once when
    /// the window opens.
    fn on_resized(&mut self, gpu: &Gpu<'_>, size: ViewportSize) {
        let _ = (gpu, size);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// The loop is ending; GPU resources are still alive.
    fn on_exit(&mut self) {}
}
