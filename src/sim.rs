use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::blob::{spawn_blobs, Blob};
use crate::clock::SimulationClock;
use crate::integrator::{self, TickReport};
use crate::params::{validate_blob_count, Parameters};
use crate::palette::Palette;
use crate::raster::{Frame, Rasterizer, DEFAULT_RENDER_SCALE};

/// Impulse magnitudes are capped here; larger values only launch blobs into the walls.
pub const MAX_IMPULSE: f32 = 2.0;

/// One-shot mixing actions applied between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Impulse {
    Stir,
    Shake,
    HeatBurst,
    CoolDown,
}

impl Impulse {
    pub fn default_magnitude(self) -> f32 {
        match self {
            Impulse::Stir => 0.3,
            Impulse::Shake => 0.8,
            Impulse::HeatBurst => 0.3,
            Impulse::CoolDown => 0.4,
        }
    }

    /// Stir and shake jolt velocities (lateral ±m, vertical ±0.3m);
    /// heat burst and cool down shift every temperature by ±m.
    pub fn apply<R: Rng>(self, blobs: &mut [Blob], magnitude: f32, rng: &mut R) {
        let m = if magnitude.is_finite() {
            magnitude.clamp(0.0, MAX_IMPULSE)
        } else {
            0.0
        };
        match self {
            Impulse::Stir | Impulse::Shake => {
                for b in blobs.iter_mut() {
                    b.vel.x += rng.gen_range(-1.0..1.0) * m;
                    b.vel.z += rng.gen_range(-1.0..1.0) * m;
                    b.vel.y += rng.gen_range(-0.3..0.3) * m;
                }
            }
            Impulse::HeatBurst => {
                for b in blobs.iter_mut() {
                    b.temperature = (b.temperature + m).min(1.0);
                }
            }
            Impulse::CoolDown => {
                for b in blobs.iter_mut() {
                    b.temperature = (b.temperature - m).max(0.0);
                }
            }
        }
    }
}

/// Stir strength for a pointer drag of `dist` pixels, if it is long enough to count.
pub fn drag_stir_strength(dist: f32) -> Option<f32> {
    (dist > 3.0).then(|| (dist * 0.005).min(0.5))
}

/// Blob state, clock and RNG for one lamp, plus the last rendered frame.
pub struct Simulation {
    params: Parameters,
    blobs: Vec<Blob>,
    clock: SimulationClock,
    rng: StdRng,
    rasterizer: Rasterizer,
    frame: Frame,
    last_report: TickReport,
}

impl Simulation {
    pub fn new(params: Parameters, seed: u64) -> Result<Self> {
        params.validate().context("invalid physics parameters")?;
        let mut rng = StdRng::seed_from_u64(seed);
        let blobs = spawn_blobs(&mut rng, params.blob_count, params.cold_size_fraction);
        info!(blobs = params.blob_count, seed, "simulation created (+1 pool blob)");
        Ok(Self {
            clock: SimulationClock::new(params.warmup_duration),
            rasterizer: Rasterizer::new(220, 520, DEFAULT_RENDER_SCALE),
            frame: Frame::default(),
            last_report: TickReport::default(),
            params,
            blobs,
            rng,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Validated replacement. A rejected update leaves everything untouched.
    pub fn set_parameters(&mut self, params: Parameters) -> Result<()> {
        params.validate().context("rejected parameter update")?;
        let count_changed = params.blob_count != self.params.blob_count;
        let cold_changed = params.cold_size_fraction != self.params.cold_size_fraction;
        self.clock.set_warmup_duration(params.warmup_duration);
        self.params = params;

        if count_changed {
            self.reset(self.params.blob_count)?;
        } else if cold_changed {
            for b in &mut self.blobs {
                b.set_cold_fraction(self.params.cold_size_fraction);
                integrator::constrain(b, &self.params);
            }
        }
        debug!(params = ?self.params, "parameters updated");
        Ok(())
    }

    /// Recreate `count` blobs (+ pool) cold at the base and zero the clock.
    pub fn reset(&mut self, count: usize) -> Result<()> {
        validate_blob_count(count)?;
        self.params.blob_count = count;
        self.blobs = spawn_blobs(&mut self.rng, count, self.params.cold_size_fraction);
        self.clock.reset();
        self.last_report = TickReport::default();
        info!(blobs = count, "reset (+1 pool blob)");
        Ok(())
    }

    pub fn apply_impulse(&mut self, kind: Impulse, magnitude: f32) {
        kind.apply(&mut self.blobs, magnitude, &mut self.rng);
        debug!(?kind, magnitude, "impulse");
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.clock.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Advance clock and physics by `dt` (clamped). No-op while paused.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        if self.clock.is_paused() {
            return TickReport::default();
        }
        let dt = integrator::clamp_dt(dt);
        let warmup = self.clock.tick(dt);
        self.last_report =
            integrator::advance(&mut self.blobs, dt, &self.params, warmup, &mut self.rng);
        self.last_report
    }

    pub fn last_report(&self) -> TickReport {
        self.last_report
    }

    pub fn set_render_size(&mut self, display_w: usize, display_h: usize, scale: f32) {
        self.rasterizer = Rasterizer::new(display_w, display_h, scale);
    }

    pub fn render(&mut self, palette: &Palette) -> &Frame {
        let warmup = self.clock.warmup_fraction();
        self.rasterizer.render_into(&self.blobs, palette, warmup, &mut self.frame);
        &self.frame
    }

    pub fn current_frame(&self) -> &Frame {
        &self.frame
    }

    pub fn warmup_percent(&self) -> u8 {
        self.clock.warmup_percent()
    }

    pub fn skip_warmup(&mut self) {
        self.clock.skip_warmup();
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }
}
