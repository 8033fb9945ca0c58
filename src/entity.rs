use glam::{Quat, Vec3};

use crate::{
    config::{CameraSettings, LightSettings},
    model::Model,
    starfield::ParticleField,
    window::Size,
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(settings: &CameraSettings, viewport: Size) -> Self {
        Self {
            position: settings.position,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: settings.fov,
            aspect_ratio: viewport.aspect_ratio(settings.aspect_mode),
            near: settings.near,
            far: settings.far,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub point: PointLight,
}

impl Lights {
    pub fn new(settings: &LightSettings) -> Self {
        Self {
            ambient: AmbientLight {
                color: settings.ambient_color,
                intensity: settings.ambient_intensity,
            },
            point: PointLight {
                color: settings.point_color,
                intensity: settings.point_intensity,
                position: settings.point_position,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum ModelSlot {
    Pending,
    Attached(Model),
    Failed(String),
}

impl ModelSlot {
    pub fn model(&self) -> Option<&Model> {
        match self {
            Self::Attached(model) => Some(model),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("A model is already attached to the scene")]
    ModelAlreadyAttached,
}

#[derive(Debug)]
pub struct Scene {
    pub camera: Camera,
    pub lights: Lights,
    pub particle_field: ParticleField,
    pub model: ModelSlot,
}

impl Scene {
    pub fn new(camera: Camera, lights: Lights, particle_field: ParticleField) -> Self {
        Self {
            camera,
            lights,
            particle_field,
            model: ModelSlot::Pending,
        }
    }

    pub fn attach_model(&mut self, model: Model) -> Result<(), SceneError> {
        if let ModelSlot::Attached(_) = self.model {
            return Err(SceneError::ModelAlreadyAttached);
        }
        self.model = ModelSlot::Attached(model);
        Ok(())
    }

    /// Records a failed load. Has no effect once a model is attached.
    pub fn fail_model(&mut self, reason: impl Into<String>) {
        if let ModelSlot::Attached(_) = self.model {
            return;
        }
        self.model = ModelSlot::Failed(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AspectMode, Settings},
        model::{Mesh, Model},
    };

    fn scene() -> Scene {
        let settings = Settings::default();
        Scene::new(
            Camera::new(&settings.camera, Size::new(800, 600)),
            Lights::new(&settings.lights),
            ParticleField::with_positions(&settings.star_field, vec![0.; 3]),
        )
    }

    fn model(name: &str) -> Model {
        Model::new(vec![Mesh {
            name: name.to_owned(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            colors: vec![Vec3::ONE; 3],
            indices: vec![0, 1, 2],
        }])
    }

    #[test]
    fn camera_uses_literal_aspect_ratio() {
        let settings = Settings::default();
        let camera = Camera::new(&settings.camera, Size::new(800, 600));
        assert_eq!(camera.aspect_ratio, 1.0);
        assert_eq!(camera.fov, 75.);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.);
        assert_eq!(camera.position, Vec3::new(0., 0., 3.));
    }

    #[test]
    fn camera_can_use_viewport_aspect_ratio() {
        let mut settings = Settings::default();
        settings.camera.aspect_mode = AspectMode::WidthOverHeight;
        let camera = Camera::new(&settings.camera, Size::new(800, 600));
        assert!((camera.aspect_ratio - 800. / 600.).abs() < 1e-6);
    }

    #[test]
    fn model_is_absent_until_attached() {
        let mut scene = scene();
        assert!(scene.model.model().is_none());

        scene.attach_model(model("first")).unwrap();
        assert_eq!(scene.model.model().unwrap().meshes[0].name, "first");
    }

    #[test]
    fn model_is_attached_at_most_once() {
        let mut scene = scene();
        scene.attach_model(model("first")).unwrap();

        let result = scene.attach_model(model("second"));
        assert!(matches!(result, Err(SceneError::ModelAlreadyAttached)));
        assert_eq!(scene.model.model().unwrap().meshes[0].name, "first");
    }

    #[test]
    fn failure_is_observable_and_does_not_replace_attached_model() {
        let mut scene = scene();
        scene.fail_model("not found");
        assert!(matches!(&scene.model, ModelSlot::Failed(reason) if reason == "not found"));

        scene.attach_model(model("late")).unwrap();
        scene.fail_model("ignored");
        assert!(scene.model.model().is_some());
    }
}
