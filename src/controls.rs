use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec2, Vec3};
use log::trace;

use crate::{config::ControlsSettings, entity::Camera};

const EPS: f32 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DragState {
    None,
    Rotate,
    Pan,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

/// Orbits the camera around a target point.
///
/// Input handlers only accumulate pending motion; [`OrbitControls::update`]
/// applies it to the camera once per frame. With damping enabled only a
/// fraction of the pending motion is applied per update and the remainder
/// decays, so the camera keeps drifting after input stops.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    drag: DragState,
    last_pointer: Option<Vec2>,
    viewport_height: f32,
    spherical_delta: SphericalDelta,
    pan_offset: Vec3,
    scale: f32,
}

impl OrbitControls {
    pub fn new(camera: &Camera, settings: &ControlsSettings) -> Self {
        Self {
            target: camera.target,
            enable_damping: settings.enable_damping,
            damping_factor: settings.damping_factor,
            rotate_speed: settings.rotate_speed,
            zoom_speed: settings.zoom_speed,
            pan_speed: settings.pan_speed,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            drag: DragState::None,
            last_pointer: None,
            viewport_height: 1.,
            spherical_delta: SphericalDelta::default(),
            pan_offset: Vec3::ZERO,
            scale: 1.,
        }
    }

    pub fn pointer_down(&mut self, button: PointerButton) {
        self.drag = match button {
            PointerButton::Primary => DragState::Rotate,
            PointerButton::Secondary => DragState::Pan,
        };
    }

    pub fn pointer_up(&mut self, button: PointerButton) {
        let released = match button {
            PointerButton::Primary => DragState::Rotate,
            PointerButton::Secondary => DragState::Pan,
        };
        if self.drag == released {
            self.drag = DragState::None;
        }
    }

    pub fn pointer_moved(&mut self, position: Vec2, viewport_height: f32, camera: &Camera) {
        self.viewport_height = viewport_height.max(1.);
        let last = self.last_pointer.replace(position);
        let delta = match last {
            Some(last) => position - last,
            None => return,
        };

        match self.drag {
            DragState::Rotate => self.rotate(delta),
            DragState::Pan => self.pan(delta, camera),
            DragState::None => (),
        }
    }

    /// Positive `delta` zooms in.
    pub fn scroll(&mut self, delta: f32) {
        if delta == 0. {
            return;
        }
        let step = 0.95_f32.powf(self.zoom_speed);
        if delta > 0. {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    pub fn rotate(&mut self, delta: Vec2) {
        self.spherical_delta.theta -= TAU * delta.x / self.viewport_height * self.rotate_speed;
        self.spherical_delta.phi -= TAU * delta.y / self.viewport_height * self.rotate_speed;
    }

    fn pan(&mut self, delta: Vec2, camera: &Camera) {
        let offset = camera.position - self.target;
        // Distance covered by the full viewport height at the target.
        let target_distance = offset.length() * (camera.fov.to_radians() * 0.5).tan();
        let forward = (-offset).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);

        let scale = 2. * target_distance / self.viewport_height * self.pan_speed;
        self.pan_offset += right * (-delta.x * scale) + up * (delta.y * scale);
    }

    /// Applies pending input to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        // Work in a frame where `camera.up` is +Y.
        let to_y_up = Quat::from_rotation_arc(camera.up.normalize_or_zero(), Vec3::Y);
        let offset = to_y_up * (camera.position - self.target);

        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0. {
            (offset.y / radius).clamp(-1., 1.).acos()
        } else {
            0.
        };

        let fraction = if self.enable_damping {
            self.damping_factor
        } else {
            1.
        };
        theta += self.spherical_delta.theta * fraction;
        phi += self.spherical_delta.phi * fraction;
        phi = phi.clamp(EPS, PI - EPS);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * fraction;

        let sin_phi = phi.sin();
        let offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let position = self.target + to_y_up.inverse() * offset;

        if self.enable_damping {
            self.spherical_delta.theta *= 1. - self.damping_factor;
            self.spherical_delta.phi *= 1. - self.damping_factor;
            self.pan_offset *= 1. - self.damping_factor;
        } else {
            self.spherical_delta = SphericalDelta::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.;

        let moved = position.distance_squared(camera.position) > EPS
            || self.target.distance_squared(camera.target) > EPS;

        camera.position = position;
        camera.target = self.target;

        if moved {
            trace!("Camera moved to {:?}", camera.position);
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Settings, window::Size};

    fn camera() -> Camera {
        Camera::new(&Settings::default().camera, Size::new(800, 600))
    }

    fn drag(controls: &mut OrbitControls, camera: &Camera, from: Vec2, to: Vec2) {
        controls.pointer_moved(from, 600., camera);
        controls.pointer_down(PointerButton::Primary);
        controls.pointer_moved(to, 600., camera);
        controls.pointer_up(PointerButton::Primary);
    }

    #[test]
    fn idle_update_keeps_camera_still() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &Settings::default().controls);

        assert!(!controls.update(&mut camera));
        assert!(camera.position.abs_diff_eq(Vec3::new(0., 0., 3.), 1e-5));
    }

    #[test]
    fn damped_rotation_keeps_drifting_and_slows_down() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &Settings::default().controls);
        drag(&mut controls, &camera, Vec2::new(100., 100.), Vec2::new(160., 100.));

        let mut steps = Vec::new();
        for _ in 0..10 {
            let before = camera.position;
            assert!(controls.update(&mut camera));
            steps.push(before.distance(camera.position));
        }

        assert!(steps.windows(2).all(|w| w[1] < w[0]));
        assert!((camera.position.length() - 3.).abs() < 1e-4);
    }

    #[test]
    fn undamped_rotation_applies_at_once() {
        let mut settings = Settings::default().controls;
        settings.enable_damping = false;
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &settings);
        drag(&mut controls, &camera, Vec2::new(100., 100.), Vec2::new(160., 100.));

        assert!(controls.update(&mut camera));
        let after = camera.position;
        assert!(!controls.update(&mut camera));
        assert!(camera.position.abs_diff_eq(after, 1e-5));
    }

    #[test]
    fn moving_without_a_button_does_nothing() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &Settings::default().controls);
        controls.pointer_moved(Vec2::new(0., 0.), 600., &camera);
        controls.pointer_moved(Vec2::new(300., 200.), 600., &camera);

        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn scroll_dollies_towards_target() {
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &Settings::default().controls);
        controls.scroll(1.);
        controls.update(&mut camera);

        assert!((camera.position.length() - 3. * 0.95).abs() < 1e-4);
    }

    #[test]
    fn distance_is_clamped() {
        let mut settings = Settings::default().controls;
        settings.max_distance = 3.5;
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &settings);
        for _ in 0..10 {
            controls.scroll(-1.);
        }
        controls.update(&mut camera);

        assert!((camera.position.length() - 3.5).abs() < 1e-4);
    }

    #[test]
    fn vertical_rotation_stops_at_the_pole() {
        let mut settings = Settings::default().controls;
        settings.enable_damping = false;
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &settings);
        drag(&mut controls, &camera, Vec2::new(0., 0.), Vec2::new(0., 2000.));
        controls.update(&mut camera);

        assert!(camera.position.is_finite());
        assert!(camera.position.y > 2.99);
        assert!(camera.position.x.abs() + camera.position.z.abs() < 1e-3);

        // Still able to rotate away from the pole afterwards.
        drag(&mut controls, &camera, Vec2::new(0., 0.), Vec2::new(0., -150.));
        controls.update(&mut camera);
        assert!(camera.position.y < 2.9);
    }

    #[test]
    fn secondary_drag_pans_target() {
        let mut settings = Settings::default().controls;
        settings.enable_damping = false;
        let mut camera = camera();
        let mut controls = OrbitControls::new(&camera, &settings);
        controls.pointer_moved(Vec2::new(0., 0.), 600., &camera);
        controls.pointer_down(PointerButton::Secondary);
        controls.pointer_moved(Vec2::new(100., 0.), 600., &camera);
        controls.update(&mut camera);

        assert!(camera.target.x < 0.);
        assert!((camera.position - camera.target).abs_diff_eq(Vec3::new(0., 0., 3.), 1e-4));
    }
}
