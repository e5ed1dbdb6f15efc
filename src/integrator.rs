//! Per-blob heat, buoyancy and container handling, plus the pairwise pass.
//!
//! Everything here is an always-succeeding numeric transform over a blob
//! slice. Callers validate [`Parameters`] before they get here.

use rand::Rng;
use tracing::trace;

use crate::blob::Blob;
use crate::math::Vec3;
use crate::params::Parameters;

/// Largest step the integrator will take; longer frames are clamped, not subdivided.
pub const MAX_DT: f32 = 0.05;

const HEAT_EPSILON: f32 = 0.01;
const HEAT_GAIN: f32 = 3.0;
const MASS_REFERENCE: f32 = 0.007;

const DETACH_RAMP: f32 = 0.35;
const DETACH_KICK_MIN: f32 = 0.12;
const DETACH_KICK_SPREAD: f32 = 0.08;

const DRIFT_GROUNDED: f32 = 0.008;
const DRIFT_DETACHED: f32 = 0.06;

pub const WALL_MARGIN: f32 = 0.4;
const WALL_BOUNCE: f32 = 1.5;
pub const FLOOR_MARGIN: f32 = 0.25;
pub const CEILING_MARGIN: f32 = 0.25;
const FLOOR_DAMPING: f32 = 0.15;
const CEILING_DAMPING: f32 = 0.25;

const PAIR_DISTANCE: f32 = 0.7;
const SEPARATION_THRESHOLD: f32 = 0.1;
const DIST_EPSILON: f32 = 0.001;

/// What happened during one [`advance`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub lift_offs: usize,
    pub floor_contacts: usize,
    pub overlaps: usize,
}

/// Advance every blob by `dt` seconds (clamped to [`MAX_DT`]).
pub fn advance<R: Rng>(
    blobs: &mut [Blob],
    dt: f32,
    params: &Parameters,
    warmup_factor: f32,
    rng: &mut R,
) -> TickReport {
    let dt = clamp_dt(dt);
    let mut report = TickReport::default();
    if dt <= 0.0 {
        return report;
    }

    let effective_heat = params.heat_strength * warmup_factor.clamp(0.0, 1.0);
    for b in blobs.iter_mut() {
        exchange_heat(b, dt, params, effective_heat);
        b.update_radius();

        let (net_vertical, lifted) = vertical_force(b, params, rng);
        if lifted {
            report.lift_offs += 1;
        }

        b.vel.x += -params.h_drag * b.vel.x * dt;
        b.vel.y += (net_vertical - params.v_drag * b.vel.y) * dt;
        b.vel.z += -params.h_drag * b.vel.z * dt;

        let drift = if b.detached { DRIFT_DETACHED } else { DRIFT_GROUNDED };
        b.vel.x += rng.gen_range(-0.5..0.5) * drift * dt;
        b.vel.z += rng.gen_range(-0.5..0.5) * drift * dt;

        b.pos = b.pos.add(b.vel.mul(dt));

        if constrain(b, params) {
            report.floor_contacts += 1;
        }
    }

    report.overlaps = interact_pairs(blobs, params);
    trace!(
        lift_offs = report.lift_offs,
        floor_contacts = report.floor_contacts,
        overlaps = report.overlaps,
        "tick"
    );
    report
}

pub fn clamp_dt(dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, MAX_DT)
    } else {
        0.0
    }
}

fn exchange_heat(b: &mut Blob, dt: f32, params: &Parameters, effective_heat: f32) {
    if b.pos.y < params.heat_zone && effective_heat > HEAT_EPSILON {
        let proximity = (1.0 - b.pos.y / params.heat_zone).max(0.0);
        // smaller blobs heat faster so the cluster staggers its lift-offs
        let mass_scale = (0.6 + 0.8 * (1.0 - b.mass / MASS_REFERENCE)).max(0.2);
        let rate = proximity * proximity * HEAT_GAIN * effective_heat * mass_scale;
        b.temperature = (b.temperature + rate * dt).min(1.0);
    }

    if b.pos.y > params.cool_zone {
        let above = (b.pos.y - params.cool_zone) / (1.0 - params.cool_zone);
        b.temperature -= above * params.top_cool_rate * dt;
    } else if b.pos.y > params.heat_zone {
        b.temperature -= params.mid_cool_rate * dt;
    }
    b.temperature = b.temperature.clamp(0.0, 1.0);
}

/// Net vertical force, and whether this call fired the detachment kick.
fn vertical_force<R: Rng>(b: &mut Blob, params: &Parameters, rng: &mut R) -> (f32, bool) {
    let gravity = params.effective_gravity();
    if b.temperature <= params.melt_temp {
        return (gravity, false);
    }

    let melt_frac = (b.temperature - params.melt_temp) / (1.0 - params.melt_temp);
    let ramp = melt_frac.clamp(0.0, 1.0).sqrt();
    let net = gravity + ramp * (params.effective_buoyancy() - gravity);

    let mut lifted = false;
    if !b.detached && ramp > DETACH_RAMP {
        b.detached = true;
        b.vel.y += DETACH_KICK_MIN + rng.gen_range(0.0..DETACH_KICK_SPREAD);
        lifted = true;
    }
    (net, lifted)
}

/// Clamp into the cylinder, floor and ceiling. Returns true on floor contact.
pub fn constrain(b: &mut Blob, params: &Parameters) -> bool {
    let hr = b.pos.horizontal_len();
    let max_r = (params.wall_radius - b.radius * WALL_MARGIN).max(0.0);
    if hr > max_r {
        if hr > DIST_EPSILON {
            let nx = b.pos.x / hr;
            let nz = b.pos.z / hr;
            b.pos.x = nx * max_r;
            b.pos.z = nz * max_r;
            let vn = b.vel.x * nx + b.vel.z * nz;
            if vn > 0.0 {
                b.vel.x -= WALL_BOUNCE * vn * nx;
                b.vel.z -= WALL_BOUNCE * vn * nz;
            }
        } else {
            b.pos.x = 0.0;
            b.pos.z = 0.0;
        }
    }

    let min_y = b.radius * FLOOR_MARGIN;
    let max_y = 1.0 - b.radius * CEILING_MARGIN;
    let mut floored = false;
    if b.pos.y < min_y {
        b.pos.y = min_y;
        b.vel.y = b.vel.y.abs() * FLOOR_DAMPING;
        b.detached = false;
        floored = true;
    }
    if b.pos.y > max_y {
        b.pos.y = max_y;
        b.vel.y = -b.vel.y.abs() * CEILING_DAMPING;
    }
    floored
}

/// Repulsion and thermal separation between overlapping pairs. Touches
/// velocities only. Returns the number of overlapping pairs.
pub fn interact_pairs(blobs: &mut [Blob], params: &Parameters) -> usize {
    let mut overlaps = 0;
    let n = blobs.len();
    for i in 0..n {
        let (head, tail) = blobs.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            let d = b.pos.sub(a.pos);
            let dist = d.len().max(DIST_EPSILON);
            let min_dist = (a.radius + b.radius) * PAIR_DISTANCE;
            if dist >= min_dist {
                continue;
            }
            overlaps += 1;

            let overlap = (min_dist - dist) / min_dist;
            let force = overlap * params.repulsion_strength;
            let dir = d.mul(1.0 / dist);
            let mr = a.mass / (a.mass + b.mass).max(f32::EPSILON);
            a.vel = a.vel.sub(dir.mul(force * (1.0 - mr)));
            b.vel = b.vel.add(dir.mul(force * mr));

            let temp_diff = a.temperature - b.temperature;
            if temp_diff.abs() > SEPARATION_THRESHOLD {
                let sep = temp_diff * overlap * params.thermal_separation;
                a.vel = a.vel.add(Vec3::new(0.0, sep, 0.0));
                b.vel = b.vel.sub(Vec3::new(0.0, sep, 0.0));
            }
        }
    }
    overlaps
}
