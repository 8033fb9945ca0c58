use std::path::PathBuf;

use glam::{vec3, Vec3};

/// How the camera aspect ratio is derived from the viewport at startup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AspectMode {
    /// height / height, which is always 1.0. Matches the scene this app reproduces.
    HeightOverHeight,
    WidthOverHeight,
}

#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub aspect_mode: AspectMode,
}

#[derive(Debug, Clone)]
pub struct LightSettings {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub point_color: Vec3,
    pub point_intensity: f32,
    pub point_position: Vec3,
}

#[derive(Debug, Clone)]
pub struct ControlsSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

#[derive(Debug, Clone)]
pub struct StarFieldSettings {
    pub count: u32,
    pub extent: f32,
    pub point_size: f32,
    pub size_attenuation: bool,
    /// Radians added to the field's yaw on every frame.
    pub drift_per_frame: f64,
    pub sprite_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub position: Vec3,
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub window: WindowSettings,
    pub camera: CameraSettings,
    pub lights: LightSettings,
    pub controls: ControlsSettings,
    pub star_field: StarFieldSettings,
    pub model: ModelSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings {
                title: "Starfield".to_owned(),
                width: 1280,
                height: 720,
            },
            camera: CameraSettings {
                fov: 75.,
                near: 0.1,
                far: 1000.,
                position: vec3(0., 0., 3.),
                aspect_mode: AspectMode::HeightOverHeight,
            },
            lights: LightSettings {
                ambient_color: Vec3::ONE,
                ambient_intensity: 2.,
                point_color: Vec3::ONE,
                point_intensity: 2.,
                point_position: Vec3::ZERO,
            },
            controls: ControlsSettings {
                enable_damping: true,
                damping_factor: 0.05,
                rotate_speed: 1.,
                zoom_speed: 1.,
                pan_speed: 1.,
                min_distance: 0.,
                max_distance: f32::INFINITY,
            },
            star_field: StarFieldSettings {
                count: 15_000,
                extent: 50.,
                point_size: 0.5,
                size_attenuation: true,
                drift_per_frame: -0.0001,
                sprite_path: PathBuf::from("assets/textures/particles/star.png"),
            },
            model: ModelSettings {
                path: PathBuf::from("assets/scene.gltf"),
                position: Vec3::ZERO,
                scale: 0.0014,
            },
        }
    }
}
