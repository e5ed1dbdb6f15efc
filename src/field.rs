//! Metaball field evaluation in the 2D image plane.
//!
//! Sample points live in plane space: x in [-1,1] across the vessel,
//! y in [0,1] bottom to top.

use crate::blob::Blob;
use crate::math::smoothstep;

pub const FIELD_EPSILON: f32 = 0.001;
/// Temperature reported where no blob contributes.
pub const NEUTRAL_TEMPERATURE: f32 = 0.3;

const HORIZONTAL_SCALE: f32 = 2.0;
const RADIUS_SCALE: f32 = 3.0;
const DEPTH_COEFF: f32 = 0.3;

/// Beyond this many projected radii a blob is skipped.
const CULL_RADII: f32 = 3.0;
/// Contributions start tapering toward zero here so the cull leaves no seam.
const FADE_RADII: f32 = 2.0;

/// A blob flattened onto the image plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    pub r2: f32,
    pub temperature: f32,
}

impl Projected {
    pub fn of(b: &Blob) -> Self {
        let r = projected_radius(b);
        Self {
            x: b.pos.x * HORIZONTAL_SCALE,
            y: b.pos.y,
            r2: r * r,
            temperature: b.temperature,
        }
    }
}

pub fn projected_radius(b: &Blob) -> f32 {
    let depth = 1.0 / (1.0 + b.pos.z * DEPTH_COEFF).max(FIELD_EPSILON);
    b.radius * depth * RADIUS_SCALE
}

/// Field strength and contribution-weighted temperature at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub value: f32,
    pub temperature: f32,
}

/// Projects a blob snapshot once, then answers point queries against it.
#[derive(Clone, Debug, Default)]
pub struct FieldSampler {
    balls: Vec<Projected>,
}

impl FieldSampler {
    pub fn new(blobs: &[Blob]) -> Self {
        let mut s = Self::default();
        s.load(blobs);
        s
    }

    /// Re-project, reusing the allocation.
    pub fn load(&mut self, blobs: &[Blob]) {
        self.balls.clear();
        self.balls.extend(blobs.iter().map(Projected::of));
    }

    pub fn sample(&self, x: f32, y: f32) -> Sample {
        let mut value = 0.0f32;
        let mut total = 0.0f32;
        let mut temperature = 0.0f32;

        for ball in &self.balls {
            let c = contribution(ball, x, y);
            if c <= 0.0 {
                continue;
            }
            value += c;
            total += c;
            // running weighted mean; a lone contributor yields its own temperature exactly
            temperature += (ball.temperature - temperature) * (c / total);
        }

        if total <= f32::EPSILON {
            temperature = NEUTRAL_TEMPERATURE;
        }
        Sample { value, temperature }
    }
}

/// `r²/(d²+ε)` inside the fade radius, tapered to zero at the cull radius.
fn contribution(ball: &Projected, x: f32, y: f32) -> f32 {
    let dx = x - ball.x;
    let dy = y - ball.y;
    let d2 = dx * dx + dy * dy;
    let cull2 = ball.r2 * CULL_RADII * CULL_RADII;
    if d2 >= cull2 {
        return 0.0;
    }
    let raw = ball.r2 / (d2 + FIELD_EPSILON);
    let fade2 = ball.r2 * FADE_RADII * FADE_RADII;
    if d2 <= fade2 {
        raw
    } else {
        raw * (1.0 - smoothstep((d2 - fade2) / (cull2 - fade2)))
    }
}

/// Convenience for one-off queries.
pub fn sample(blobs: &[Blob], x: f32, y: f32) -> Sample {
    FieldSampler::new(blobs).sample(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn lone(temp: f32) -> Blob {
        let mut b = Blob::new(Vec3::new(0.1, 0.5, 0.2), 0.12, 0.35);
        b.temperature = temp;
        b.update_radius();
        b
    }

    #[test]
    fn centre_of_isolated_blob() {
        let b = lone(0.73);
        let p = Projected::of(&b);
        let s = sample(std::slice::from_ref(&b), p.x, p.y);
        assert_eq!(s.value, p.r2 / FIELD_EPSILON);
        assert_eq!(s.temperature, b.temperature);
        assert!(s.value > 1.0);
    }

    #[test]
    fn far_away_is_neutral() {
        let b = lone(0.9);
        let s = sample(&[b], -0.9, 0.0);
        assert_eq!(s.value, 0.0);
        assert_eq!(s.temperature, NEUTRAL_TEMPERATURE);
    }

    #[test]
    fn field_is_continuous_across_the_cull_radius() {
        let b = lone(0.5);
        let p = Projected::of(&b);
        let r = p.r2.sqrt();
        let inside = sample(&[b.clone()], p.x + r * CULL_RADII * 0.999, p.y).value;
        let outside = sample(&[b], p.x + r * CULL_RADII * 1.001, p.y).value;
        assert!(inside < 1e-3, "inside={inside}");
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn contribution_is_exact_inside_fade_radius() {
        let b = lone(0.5);
        let p = Projected::of(&b);
        let r = p.r2.sqrt();
        let x = p.x + r * 1.5;
        let d2 = (x - p.x) * (x - p.x);
        let s = sample(&[b], x, p.y);
        assert!((s.value - p.r2 / (d2 + FIELD_EPSILON)).abs() < 1e-5);
    }

    #[test]
    fn blend_weights_nearer_blob_more() {
        let mut hot = Blob::new(Vec3::new(-0.05, 0.5, 0.0), 0.12, 1.0);
        hot.temperature = 1.0;
        let cold = Blob::new(Vec3::new(0.05, 0.5, 0.0), 0.12, 1.0);
        let near_hot = sample(&[hot.clone(), cold.clone()], -0.1, 0.5);
        let near_cold = sample(&[hot, cold], 0.1, 0.5);
        assert!(near_hot.temperature > 0.5);
        assert!(near_cold.temperature < 0.5);
    }

    #[test]
    fn depth_shrinks_apparent_radius() {
        let front = Blob::new(Vec3::new(0.0, 0.5, -0.5), 0.12, 1.0);
        let back = Blob::new(Vec3::new(0.0, 0.5, 0.5), 0.12, 1.0);
        assert!(projected_radius(&front) > projected_radius(&back));
    }
}
