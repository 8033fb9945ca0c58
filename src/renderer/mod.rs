use glam::Mat4;

use crate::entity::{Camera, Transform};

mod model;
mod render_target;
#[allow(clippy::module_inception)]
mod renderer;
mod starfield;

pub use renderer::Renderer;

pub trait CameraExt {
    fn proj_matrix(&self) -> Mat4;
    fn view_matrix(&self) -> Mat4;
}

impl CameraExt for Camera {
    fn proj_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect_ratio, self.near, self.far)
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }
}

pub trait TransformExt {
    fn model_matrix(&self) -> Mat4;
}

impl TransformExt for Transform {
    fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::{config::Settings, window::Size};

    #[test]
    fn origin_projects_to_screen_centre() {
        let camera = Camera::new(&Settings::default().camera, Size::new(800, 600));
        let clip = camera.proj_matrix() * camera.view_matrix() * Vec3::ZERO.extend(1.);
        let ndc = clip.truncate() / clip.w;

        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0. && ndc.z < 1.);
    }

    #[test]
    fn model_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            position: Vec3::new(1., 0., 0.),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.),
        };
        let p = transform.model_matrix().transform_point3(Vec3::X);

        assert!(p.abs_diff_eq(Vec3::new(1., 0., -2.), 1e-5));
    }
}
