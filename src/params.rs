use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::integrator::MAX_DT;

pub const MIN_BLOBS: usize = 3;
pub const MAX_BLOBS: usize = 12;

/// Largest drag coefficient; above it an explicit drag step at [`MAX_DT`]
/// overshoots zero and the velocity oscillates without bound.
pub const MAX_DRAG: f32 = 1.0 / MAX_DT;

/// Tunable physics constants. Read-only during a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    // forces
    pub gravity: f32,
    pub buoyancy_max: f32,
    pub h_drag: f32,
    pub v_drag: f32,

    // thermal
    pub heat_strength: f32,
    pub heat_zone: f32,
    pub cool_zone: f32,
    pub melt_temp: f32,
    pub mid_cool_rate: f32,
    pub top_cool_rate: f32,

    // interaction
    pub repulsion_strength: f32,
    pub thermal_separation: f32,

    pub wall_radius: f32,
    pub warmup_duration: f32,
    pub cold_size_fraction: f32,
    pub flow_speed: f32,
    pub blob_count: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            gravity: 0.18,
            buoyancy_max: 0.65,
            h_drag: 2.5,
            v_drag: 1.6,
            heat_strength: 1.0,
            heat_zone: 0.30,
            cool_zone: 0.65,
            melt_temp: 0.28,
            mid_cool_rate: 0.08,
            top_cool_rate: 2.5,
            repulsion_strength: 1.5,
            thermal_separation: 0.6,
            wall_radius: 0.42,
            warmup_duration: 18.0,
            cold_size_fraction: 0.35,
            flow_speed: 1.0,
            blob_count: 6,
        }
    }
}

impl Parameters {
    /// Rejects anything the integrator would turn into NaN or runaway state.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("gravity", self.gravity),
            ("buoyancy_max", self.buoyancy_max),
            ("h_drag", self.h_drag),
            ("v_drag", self.v_drag),
            ("heat_strength", self.heat_strength),
            ("heat_zone", self.heat_zone),
            ("cool_zone", self.cool_zone),
            ("melt_temp", self.melt_temp),
            ("mid_cool_rate", self.mid_cool_rate),
            ("top_cool_rate", self.top_cool_rate),
            ("repulsion_strength", self.repulsion_strength),
            ("thermal_separation", self.thermal_separation),
            ("wall_radius", self.wall_radius),
            ("warmup_duration", self.warmup_duration),
            ("cold_size_fraction", self.cold_size_fraction),
            ("flow_speed", self.flow_speed),
        ];
        for (name, v) in fields {
            ensure!(v.is_finite(), "{name} must be finite (got {v})");
        }
        for (name, v) in fields {
            if name == "flow_speed" || name == "cold_size_fraction" || name == "wall_radius" {
                continue;
            }
            ensure!(v >= 0.0, "{name} must not be negative (got {v})");
        }

        for (name, v) in [("h_drag", self.h_drag), ("v_drag", self.v_drag)] {
            ensure!(v <= MAX_DRAG, "{name} must be at most {MAX_DRAG} (got {v})");
        }

        validate_blob_count(self.blob_count)?;
        ensure!(self.flow_speed > 0.0, "flow_speed must be positive (got {})", self.flow_speed);
        ensure!(
            self.melt_temp < 1.0,
            "melt_temp must be below 1.0 (got {})",
            self.melt_temp
        );
        ensure!(
            self.cold_size_fraction > 0.0 && self.cold_size_fraction <= 1.0,
            "cold_size_fraction must be in (0, 1] (got {})",
            self.cold_size_fraction
        );
        ensure!(
            self.heat_zone > 0.0 && self.heat_zone < self.cool_zone && self.cool_zone < 1.0,
            "zones must satisfy 0 < heat_zone < cool_zone < 1 (got {} / {})",
            self.heat_zone,
            self.cool_zone
        );
        ensure!(
            self.wall_radius > 0.0 && self.wall_radius <= 1.0,
            "wall_radius must be in (0, 1] (got {})",
            self.wall_radius
        );
        Ok(())
    }

    /// Gravity as a signed vertical force, scaled by flow speed.
    pub fn effective_gravity(&self) -> f32 {
        -self.gravity * self.flow_speed
    }

    pub fn effective_buoyancy(&self) -> f32 {
        self.buoyancy_max * self.flow_speed
    }
}

pub fn validate_blob_count(n: usize) -> Result<()> {
    ensure!(
        (MIN_BLOBS..=MAX_BLOBS).contains(&n),
        "blob count must be between {MIN_BLOBS} and {MAX_BLOBS} (got {n})"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Parameters::default().validate().unwrap();
    }

    #[test]
    fn negative_drag_is_rejected() {
        let p = Parameters {
            h_drag: -0.5,
            ..Parameters::default()
        };
        let err = p.validate().unwrap_err().to_string();
        assert!(err.contains("h_drag"), "{err}");
    }

    #[test]
    fn drag_above_step_limit_is_rejected() {
        let at_limit = Parameters {
            h_drag: MAX_DRAG,
            v_drag: MAX_DRAG,
            ..Parameters::default()
        };
        at_limit.validate().unwrap();

        let p = Parameters {
            h_drag: 100.0,
            ..Parameters::default()
        };
        let err = p.validate().unwrap_err().to_string();
        assert!(err.contains("h_drag"), "{err}");

        let p = Parameters {
            v_drag: MAX_DRAG + 0.5,
            ..Parameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn nan_is_rejected() {
        let p = Parameters {
            gravity: f32::NAN,
            ..Parameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn blob_count_range() {
        assert!(validate_blob_count(2).is_err());
        assert!(validate_blob_count(3).is_ok());
        assert!(validate_blob_count(12).is_ok());
        assert!(validate_blob_count(13).is_err());
    }

    #[test]
    fn inverted_zones_are_rejected() {
        let p = Parameters {
            heat_zone: 0.7,
            cool_zone: 0.6,
            ..Parameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: Parameters = serde_json::from_str(r#"{ "gravity": 0.3, "blob_count": 8 }"#).unwrap();
        assert_eq!(p.gravity, 0.3);
        assert_eq!(p.blob_count, 8);
        assert_eq!(p.v_drag, Parameters::default().v_drag);
    }
}
