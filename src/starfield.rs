use std::{f64::consts::TAU, time::SystemTime};

use glam::{Quat, Vec3};
use log::info;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use crate::{config::StarFieldSettings, entity::Transform};

/// Returns `3 * count` scalars, each drawn uniformly from `[-extent, extent]`.
pub fn generate_positions(count: u32, extent: f32, rng: &mut impl Rng) -> Vec<f32> {
    (0..count as usize * 3)
        .map(|_| rng.gen_range(-extent..=extent))
        .collect()
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    pub transform: Transform,
    pub count: u32,
    pub point_size: f32,
    pub size_attenuation: bool,
    positions: Vec<f32>,
    yaw: f64,
}

impl ParticleField {
    pub fn new(settings: &StarFieldSettings) -> Self {
        let rand_seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut rng = Pcg64Mcg::seed_from_u64(rand_seed);
        info!("Seeded RNG with {}", rand_seed);

        let positions = generate_positions(settings.count, settings.extent, &mut rng);
        Self::with_positions(settings, positions)
    }

    pub fn with_positions(settings: &StarFieldSettings, positions: Vec<f32>) -> Self {
        debug_assert_eq!(positions.len() % 3, 0);
        Self {
            transform: Transform::default(),
            count: (positions.len() / 3) as u32,
            point_size: settings.point_size,
            size_attenuation: settings.size_attenuation,
            positions,
            yaw: 0.,
        }
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.positions()
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
    }

    /// Accumulated rotation about the Y axis in radians, wrapped to `(-2π, 2π)`.
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// Kept in f64 and wrapped so every frame adds the same step no matter
    /// how long the field has been turning.
    pub fn spin(&mut self, delta: f64) {
        self.yaw = (self.yaw + delta) % TAU;
        self.transform.rotation = Quat::from_rotation_y(self.yaw as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn buffer_has_three_components_per_particle_within_range() {
        let settings = Settings::default().star_field;
        let field = ParticleField::new(&settings);

        assert_eq!(field.positions().len(), 45_000);
        assert_eq!(field.count, 15_000);
        assert!(field.positions().iter().all(|v| (-50.0..=50.0).contains(v)));
        assert_eq!(field.points().count(), 15_000);
    }

    #[test]
    fn independent_generations_differ() {
        let mut a = Pcg64Mcg::seed_from_u64(1);
        let mut b = Pcg64Mcg::seed_from_u64(2);
        let first = generate_positions(15_000, 50., &mut a);
        let second = generate_positions(15_000, 50., &mut b);

        assert_eq!(first.len(), second.len());
        assert_ne!(first, second);
    }

    #[test]
    fn samples_cover_both_signs() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let positions = generate_positions(1_000, 50., &mut rng);
        assert!(positions.iter().any(|v| *v < -40.));
        assert!(positions.iter().any(|v| *v > 40.));
    }

    #[test]
    fn spin_accumulates_yaw() {
        let settings = Settings::default().star_field;
        let mut field = ParticleField::with_positions(&settings, vec![1., 0., 0.]);

        for _ in 0..1000 {
            field.spin(-0.0001);
        }

        assert!((field.yaw() - -0.1).abs() < 1e-9);
        let rotated = field.transform.rotation * Vec3::X;
        let expected = Quat::from_rotation_y(-0.1) * Vec3::X;
        assert!(rotated.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn spin_step_stays_constant_on_long_runs() {
        let settings = Settings::default().star_field;
        let mut field = ParticleField::with_positions(&settings, vec![1., 0., 0.]);

        for _ in 0..1_000_000 {
            field.spin(-0.0001);
        }
        let expected = -100f64 % TAU;
        assert!((field.yaw() - expected).abs() < 1e-6);

        // Hours into a run the yaw would have passed 2048 rad without wrapping.
        field.yaw = -2048. % TAU;
        for _ in 0..100 {
            let before = field.yaw();
            field.spin(-0.0001);
            let step = field.yaw() - before;
            assert!((step - -0.0001).abs() < 1e-12, "step was {}", step);
        }
        assert!(field.yaw().abs() < TAU);
    }

    #[test]
    fn spin_wraps_within_one_turn() {
        let settings = Settings::default().star_field;
        let mut field = ParticleField::with_positions(&settings, vec![1., 0., 0.]);
        field.yaw = -TAU + 0.00005;

        field.spin(-0.0001);

        assert!((field.yaw() - -0.00005).abs() < 1e-9);
        let rotated = field.transform.rotation * Vec3::X;
        let expected = Quat::from_rotation_y(-0.00005) * Vec3::X;
        assert!(rotated.abs_diff_eq(expected, 1e-5));
    }
}
