use anyhow::Result;
use glam::{vec2, Vec3};
use log::{info, warn};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, VirtualKeyCode},
    event_loop::EventLoopProxy,
    window::Window,
};

use crate::{
    config::{ModelSettings, Settings},
    controls::{OrbitControls, PointerButton},
    entity::{Camera, Lights, Scene},
    frame_loop::{FrameLoop, LoopState},
    model::{Model, ModelLoader},
    renderer::Renderer,
    starfield::ParticleField,
    texture::SpriteImage,
    window::HasSize,
};

#[derive(Debug)]
pub enum AppEvent {
    ModelLoaded(Result<Model, String>),
}

/// Places a freshly loaded model and attaches it, or records the failure.
/// Returns the attached model so the caller can upload it.
pub fn attach_loaded_model<'a>(
    scene: &'a mut Scene,
    settings: &ModelSettings,
    result: Result<Model, String>,
) -> Option<&'a Model> {
    match result {
        Ok(mut model) => {
            model.transform.position = settings.position;
            model.transform.scale = Vec3::splat(settings.scale);
            if let Err(e) = scene.attach_model(model) {
                warn!("Ignoring loaded model: {}", e);
                return None;
            }
            scene.model.model()
        }
        Err(reason) => {
            warn!("Model failed to load, continuing without it: {}", reason);
            scene.fail_model(reason);
            None
        }
    }
}

pub struct App {
    window: Window,
    settings: Settings,
    scene: Scene,
    controls: OrbitControls,
    renderer: Renderer,
    frame_loop: FrameLoop,
}

impl App {
    pub async fn new(window: Window, settings: Settings) -> Result<Self> {
        let viewport = window.size();

        let camera = Camera::new(&settings.camera, viewport);
        info!(
            "Camera aspect ratio {} for viewport {}x{} ({:?})",
            camera.aspect_ratio, viewport.width, viewport.height, settings.camera.aspect_mode
        );

        let scene = Scene::new(
            camera,
            Lights::new(&settings.lights),
            ParticleField::new(&settings.star_field),
        );
        let controls = OrbitControls::new(&scene.camera, &settings.controls);

        let sprite = SpriteImage::load_or_fallback(&settings.star_field.sprite_path);
        let renderer = Renderer::new(&window, viewport, &scene, &sprite).await?;

        let frame_loop = FrameLoop::new(settings.star_field.drift_per_frame);

        Ok(Self {
            window,
            settings,
            scene,
            controls,
            renderer,
            frame_loop,
        })
    }

    pub fn load_model(&self, loader: &ModelLoader, proxy: EventLoopProxy<AppEvent>) {
        loader.load(self.settings.model.path.clone(), move |result| {
            let event = AppEvent::ModelLoaded(result.map_err(|e| e.to_string()));
            if proxy.send_event(event).is_err() {
                warn!("Event loop closed before the model finished loading");
            }
        });
    }

    pub fn on_model_loaded(&mut self, result: Result<Model, String>) {
        if let Some(model) = attach_loaded_model(&mut self.scene, &self.settings.model, result) {
            self.renderer.upload_model(model);
            info!("Model attached to scene");
        }
    }

    pub fn start(&self) {
        self.window.request_redraw();
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.state() == LoopState::Running
    }

    pub fn stop(&mut self) {
        self.frame_loop.stop();
    }

    pub fn on_resize(&mut self, size: PhysicalSize<u32>) {
        self.renderer.resize(size.into());
    }

    pub fn on_mouse_input(&mut self, state: ElementState, button: MouseButton) {
        let button = match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            _ => return,
        };
        match state {
            ElementState::Pressed => self.controls.pointer_down(button),
            ElementState::Released => self.controls.pointer_up(button),
        }
    }

    pub fn on_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        let height = self.window.size().height as f32;
        self.controls.pointer_moved(
            vec2(position.x as f32, position.y as f32),
            height,
            &self.scene.camera,
        );
    }

    pub fn on_mouse_scroll(&mut self, delta: MouseScrollDelta) {
        let y = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y as f32 / 60.0,
        };
        self.controls.scroll(y);
    }

    pub fn on_key_up(&mut self, keycode: VirtualKeyCode) {
        if keycode == VirtualKeyCode::Escape {
            self.stop();
        }
    }

    pub fn render(&mut self) -> Result<()> {
        self.frame_loop.tick(
            &mut self.scene,
            &mut self.controls,
            &mut self.renderer,
            &self.window,
        )
    }
}
