use std::f32::consts::TAU;

use rand::Rng;

use crate::math::{lerp, smoothstep, Vec3};

/// Temperature at which a blob reaches its full warm radius.
pub const EXPANSION_CUTOFF: f32 = 0.6;

pub const POOL_WARM_RADIUS: f32 = 0.19;

/// One wax mass. Position is lamp space: x,z in [-1,1], y in [0,1] bottom to top.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    pub pos: Vec3,
    pub vel: Vec3,
    pub cold_radius: f32,
    pub warm_radius: f32,
    /// Derived from temperature; see [`Blob::update_radius`].
    pub radius: f32,
    pub temperature: f32,
    pub mass: f32,
    pub detached: bool,
}

impl Blob {
    /// Cold, motionless blob at `pos`.
    pub fn new(pos: Vec3, warm_radius: f32, cold_fraction: f32) -> Self {
        let cold_radius = warm_radius * cold_fraction;
        Self {
            pos,
            vel: Vec3::ZERO,
            cold_radius,
            warm_radius,
            radius: cold_radius,
            temperature: 0.0,
            mass: warm_radius * warm_radius * warm_radius,
            detached: false,
        }
    }

    pub fn update_radius(&mut self) {
        let t = smoothstep(self.temperature / EXPANSION_CUTOFF);
        self.radius = lerp(self.cold_radius, self.warm_radius, t)
            .clamp(self.cold_radius, self.warm_radius);
    }

    pub fn set_cold_fraction(&mut self, frac: f32) {
        self.cold_radius = self.warm_radius * frac;
        self.update_radius();
    }
}

/// `count` wax blobs in a compact ring near the base, followed by the pool blob.
pub fn spawn_blobs<R: Rng>(rng: &mut R, count: usize, cold_fraction: f32) -> Vec<Blob> {
    let mut blobs = Vec::with_capacity(count + 1);
    for i in 0..count {
        let angle = (i as f32 / count.max(1) as f32) * TAU + rng.gen_range(-0.25..0.25);
        let spread = 0.04 + rng.gen_range(0.0..0.05);
        let r = 0.10 + rng.gen_range(0.0..0.06);
        let pos = Vec3::new(
            angle.cos() * spread,
            0.02 + rng.gen_range(0.0..0.03),
            angle.sin() * spread,
        );
        blobs.push(Blob::new(pos, r, cold_fraction));
    }
    blobs.push(Blob::new(Vec3::new(0.0, 0.02, 0.0), POOL_WARM_RADIUS, cold_fraction));
    blobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn spawn_adds_pool_blob() {
        let mut rng = StdRng::seed_from_u64(1);
        let blobs = spawn_blobs(&mut rng, 6, 0.35);
        assert_eq!(blobs.len(), 7);
        let pool = blobs.last().unwrap();
        assert_eq!(pool.warm_radius, POOL_WARM_RADIUS);
        assert_eq!(pool.pos, Vec3::new(0.0, 0.02, 0.0));
    }

    #[test]
    fn spawned_blobs_are_cold_and_compact() {
        let mut rng = StdRng::seed_from_u64(99);
        for b in spawn_blobs(&mut rng, 12, 0.35) {
            assert_eq!(b.temperature, 0.0);
            assert_eq!(b.radius, b.cold_radius);
            assert!(b.pos.horizontal_len() < 0.1);
            assert!(b.pos.y < 0.06);
            assert!((b.cold_radius - b.warm_radius * 0.35).abs() < 1e-7);
        }
    }

    #[test]
    fn radius_expands_fully_before_peak_heat() {
        let mut b = Blob::new(Vec3::ZERO, 0.12, 0.5);
        b.temperature = EXPANSION_CUTOFF;
        b.update_radius();
        assert_eq!(b.radius, b.warm_radius);

        b.temperature = 0.3;
        b.update_radius();
        assert!(b.radius > b.cold_radius && b.radius < b.warm_radius);
    }

    #[test]
    fn same_seed_same_layout() {
        let a = spawn_blobs(&mut StdRng::seed_from_u64(5), 6, 0.35);
        let b = spawn_blobs(&mut StdRng::seed_from_u64(5), 6, 0.35);
        assert_eq!(a, b);
    }
}
