use crate::math::smoothstep;

/// Warmup ramp and pause state, owned by the frame driver.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationClock {
    elapsed: f32,
    warmup_duration: f32,
    paused: bool,
}

impl SimulationClock {
    pub fn new(warmup_duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            warmup_duration: warmup_duration.max(0.0),
            paused: false,
        }
    }

    /// Advances elapsed time unless paused and returns the eased warmup factor.
    pub fn tick(&mut self, dt: f32) -> f32 {
        if !self.paused && dt > 0.0 {
            self.elapsed += dt;
        }
        self.warmup_factor()
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    /// Linear 0..1 progress, before easing.
    pub fn warmup_fraction(&self) -> f32 {
        if self.warmup_duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.warmup_duration).min(1.0)
    }

    pub fn warmup_factor(&self) -> f32 {
        smoothstep(self.warmup_fraction())
    }

    pub fn warmup_percent(&self) -> u8 {
        (self.warmup_fraction() * 100.0).floor().clamp(0.0, 100.0) as u8
    }

    pub fn set_warmup_duration(&mut self, secs: f32) {
        self.warmup_duration = secs.max(0.0);
    }

    /// Jump straight to operating temperature.
    pub fn skip_warmup(&mut self) {
        self.elapsed = self.elapsed.max(self.warmup_duration);
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}
