use std::sync::mpsc::{Receiver, TryRecvError};

use signband_engine::core::{App, AppControl, FrameCtx};
use signband_engine::device::Gpu;
use signband_engine::input::Key;
use signband_engine::paint::Color;
use signband_engine::render::SignScene;
use signband_engine::window::RuntimeCtx;
use signband_model::{AnimationLoop, RecordSequence, SceneConfig, ViewportSize};

use crate::detail;
use crate::loader::LoaderEvent;

/// Host application: feeds loaded records into the scene and reports hovers.
pub struct StudioApp {
    scene: SignScene,
    animation: AnimationLoop,
    clear: Color,

    records: RecordSequence,
    batches: Receiver<LoaderEvent>,
    loader_done: bool,
    needs_rebuild: bool,

    initialized: bool,
    /// Sequence index of the hovered or navigated record. Indices are stable
    /// because the sequence is append-only, and unlike ids they are unique.
    selected: Option<usize>,
}

impl StudioApp {
    pub fn new(config: SceneConfig, seed: u64, batches: Receiver<LoaderEvent>) -> Self {
        let animation = AnimationLoop::new(config.animation.speed);
        let clear = Color::from_hex(config.style.clear_color);
        Self {
            scene: SignScene::new(config, seed, ViewportSize::new(1, 1)),
            animation,
            clear,
            records: RecordSequence::new(),
            batches,
            loader_done: false,
            needs_rebuild: false,
            initialized: false,
            selected: None,
        }
    }

    fn drain_loader(&mut self) {
        if self.loader_done {
            return;
        }
        loop {
            match self.batches.try_recv() {
                Ok(LoaderEvent::Batch(batch)) => {
                    let appended = self.records.append(batch);
                    log::info!("received {appended} records ({} total)", self.records.len());
                    self.needs_rebuild |= appended > 0;
                }
                Ok(LoaderEvent::Done { total }) => {
                    log::info!("record loader finished: {total} records");
                    self.loader_done = true;
                }
                Ok(LoaderEvent::Failed(reason)) => {
                    log::error!("record loader failed: {reason}");
                    self.loader_done = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.loader_done {
                        log::warn!("record loader exited without finishing");
                    }
                    self.loader_done = true;
                    break;
                }
            }
        }
    }

    fn rebuild(&mut self, device: &wgpu::Device) {
        self.needs_rebuild = false;
        match self.scene.rebuild(device, self.records.records()) {
            Ok(()) => {
                // Rebuild drops the target; indices are stable, so restore it.
                if let Some(index) = self.selected {
                    self.scene.set_target(index);
                }
            }
            Err(err) => log::error!(
                "rebuild rejected, keeping {} instances: {err}",
                self.scene.instances().len()
            ),
        }
    }

    fn select(&mut self, index: Option<usize>, runtime: &mut RuntimeCtx) {
        let record = index.and_then(|i| self.records.get(i).map(|r| (i, r)));
        let index = record.map(|(i, _)| i);
        if index == self.selected {
            return;
        }

        match record {
            Some((i, r)) => {
                log::info!("{}", detail::describe(i, r));
                self.scene.set_target(i);
            }
            None => self.scene.clear_target(),
        }
        runtime.set_title(detail::window_title(record, self.records.len()));
        self.selected = index;
    }

    fn handle_keys(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        let frame = ctx.input_frame;
        let next = if frame.key_pressed(Key::Escape) {
            Some(None)
        } else if frame.key_pressed(Key::ArrowRight) {
            Some(self.records.step(self.selected, true))
        } else if frame.key_pressed(Key::ArrowLeft) {
            Some(self.records.step(self.selected, false))
        } else {
            None
        };

        if let Some(index) = next {
            self.select(index, ctx.runtime);
        }
    }

    /// Re-picks under the pointer. A failed readback ends the session.
    fn update_hover(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(pointer) = ctx.input.pointer else {
            self.select(None, ctx.runtime);
            return AppControl::Continue;
        };

        let hit = {
            let rctx = ctx.render_ctx();
            self.scene.pick(&rctx, pointer)
        };
        match hit {
            Ok(hit) => {
                self.select(hit.map(|h| h.index), ctx.runtime);
                AppControl::Continue
            }
            Err(err) => {
                log::error!("picking failed: {err}");
                AppControl::Exit
            }
        }
    }
}

impl App for StudioApp {
    fn on_resized(&mut self, gpu: &Gpu<'_>, size: ViewportSize) {
        if self.scene.resize(gpu.device(), size) {
            log::debug!("scene resized to {}x{}", size.width, size.height);
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if !self.initialized {
            self.scene.static_init(&ctx.render_ctx());
            self.initialized = true;
        }

        self.drain_loader();
        if self.needs_rebuild {
            self.rebuild(ctx.gpu.device());
        }

        self.handle_keys(ctx);

        if let Some(phase) = self.animation.tick() {
            self.scene.set_phase(phase);
        }

        let scene = &mut self.scene;
        let control = ctx.render(self.clear, |rctx, target| scene.render(rctx, target));
        if control == AppControl::Exit {
            return control;
        }

        if ctx.input_frame.pointer_changed {
            return self.update_hover(ctx);
        }
        AppControl::Continue
    }

    fn on_exit(&mut self) {
        self.animation.stop();
        log::info!(
            "exiting after {} frames with {} records",
            self.animation.ticks(),
            self.records.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use signband_model::InputRecord;

    use super::*;

    fn app_with(ids: &[&str]) -> StudioApp {
        let (_tx, rx) = mpsc::channel();
        let mut app = StudioApp::new(SceneConfig::default(), 1, rx);
        app.records.append(ids.iter().map(|id| InputRecord::new(*id)).collect());
        app
    }

    #[test]
    fn duplicate_id_is_selected_at_its_own_index() {
        let mut app = app_with(&["a", "b", "a"]);
        let mut runtime = RuntimeCtx::default();

        app.select(Some(0), &mut runtime);
        assert_eq!(app.selected, Some(0));

        app.select(Some(2), &mut runtime);
        assert_eq!(app.selected, Some(2));

        assert_eq!(app.records.step(app.selected, false), Some(1));
    }

    #[test]
    fn unknown_index_clears_the_selection() {
        let mut app = app_with(&["a", "b"]);
        let mut runtime = RuntimeCtx::default();

        app.select(Some(1), &mut runtime);
        app.select(Some(5), &mut runtime);
        assert_eq!(app.selected, None);
        assert_eq!(app.scene.target(), None);
    }
}
