use anyhow::Result;
use log::{debug, info};

use crate::{controls::OrbitControls, entity::Scene};

pub trait FrameRenderer {
    fn render(&mut self, scene: &Scene) -> Result<()>;
}

pub trait FrameScheduler {
    /// Requests one more tick on the next display refresh.
    fn schedule_next_frame(&self);
}

impl FrameScheduler for winit::window::Window {
    fn schedule_next_frame(&self) {
        self.request_redraw();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    drift_per_frame: f64,
    frame_count: u64,
}

impl FrameLoop {
    pub fn new(drift_per_frame: f64) -> Self {
        Self {
            state: LoopState::Running,
            drift_per_frame,
            frame_count: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            info!("Stopping frame loop after {} frames", self.frame_count);
        }
        self.state = LoopState::Stopped;
    }

    /// Runs one frame: controls, drift, render, then schedules the next tick.
    /// Does nothing once stopped.
    pub fn tick(
        &mut self,
        scene: &mut Scene,
        controls: &mut OrbitControls,
        renderer: &mut impl FrameRenderer,
        scheduler: &impl FrameScheduler,
    ) -> Result<()> {
        if self.state == LoopState::Stopped {
            return Ok(());
        }

        controls.update(&mut scene.camera);
        scene.particle_field.spin(self.drift_per_frame);
        renderer.render(scene)?;

        self.frame_count += 1;
        if self.frame_count % 600 == 0 {
            debug!("Rendered {} frames", self.frame_count);
        }

        scheduler.schedule_next_frame();
        Ok(())
    }
}
