//! Turns a blob snapshot into an RGBA frame at reduced resolution.
//!
//! Rendering only reads blob state. Rows are independent, so a host may
//! split [`Rasterizer::render_rows`] across workers over one snapshot.

use std::f32::consts::PI;

use crate::blob::Blob;
use crate::field::{FieldSampler, Sample};
use crate::palette::Palette;

pub const WAX_THRESHOLD: f32 = 1.0;
pub const DEFAULT_RENDER_SCALE: f32 = 0.35;
const MIN_SIZE: usize = 4;

const HOT_CORE: [f32; 3] = [50.0, 60.0, 30.0];
const SPECULAR: [f32; 3] = [200.0, 150.0, 80.0];
const EDGE_SHADE: f32 = 0.4;
const GLOW_BAND: f32 = 0.15;

/// Vessel half-width at normalized height `h` (0 bottom, 1 top), before the
/// 2x horizontal plane scale.
pub fn lamp_radius(h: f32) -> f32 {
    let bulge = 1.0 + 0.06 * (h * PI).sin();
    let taper = if h < 0.05 {
        h / 0.05
    } else if h > 0.95 {
        (1.0 - h) / 0.05
    } else {
        1.0
    };
    0.46 * bulge * taper.max(0.3)
}

/// Row-major RGBA8 buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height * 4, 0);
    }
}

#[derive(Clone, Debug)]
pub struct Rasterizer {
    width: usize,
    height: usize,
}

impl Rasterizer {
    /// Render grid for a `display_w` x `display_h` target at `scale` (0..1].
    pub fn new(display_w: usize, display_h: usize, scale: f32) -> Self {
        let scale = if scale.is_finite() {
            scale.clamp(0.01, 1.0)
        } else {
            DEFAULT_RENDER_SCALE
        };
        Self {
            width: scaled(display_w, scale),
            height: scaled(display_h, scale),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn render(&self, blobs: &[Blob], palette: &Palette, warmup: f32) -> Frame {
        let mut frame = Frame::default();
        self.render_into(blobs, palette, warmup, &mut frame);
        frame
    }

    /// Same as [`Rasterizer::render`] but reuses `frame`'s allocation.
    pub fn render_into(&self, blobs: &[Blob], palette: &Palette, warmup: f32, frame: &mut Frame) {
        frame.resize(self.width, self.height);
        let field = FieldSampler::new(blobs);
        let row_bytes = self.width * 4;
        for (py, row) in frame.pixels.chunks_exact_mut(row_bytes).enumerate() {
            self.render_rows(&field, palette, warmup, py, row);
        }
    }

    /// Shade row `py` into `row` (exactly `width * 4` bytes).
    pub fn render_rows(
        &self,
        field: &FieldSampler,
        palette: &Palette,
        warmup: f32,
        py: usize,
        row: &mut [u8],
    ) {
        let rw = self.width as f32;
        let rh = self.height as f32;
        let y01 = (py as f32 + 0.5) / rh; // 0 top
        let h = 1.0 - y01;
        let lamp_r = lamp_radius(h);
        let half_w = lamp_r * 2.0;
        let glow = heat_glow(y01, warmup);

        for (px, out) in row.chunks_exact_mut(4).enumerate() {
            let x = ((px as f32 + 0.5) / rw - 0.5) * 2.0;
            if x.abs() >= half_w {
                out.copy_from_slice(&[0, 0, 0, 0]);
                continue;
            }

            let s = field.sample(x, h);
            let shade = edge_shade(x, half_w);
            let mut rgb = if s.value > WAX_THRESHOLD {
                wax_pixel(s, palette, shade, x, lamp_r)
            } else {
                liquid_pixel(s, palette, shade)
            };

            if let Some((intensity, gy)) = glow {
                let d = x * x + gy * gy * 0.5;
                if d < 1.0 {
                    let a = intensity * (1.0 - d);
                    let base = palette.base.to_f32();
                    for c in 0..3 {
                        rgb[c] += base[c] * a;
                    }
                }
            }

            out[0] = to_u8(rgb[0]);
            out[1] = to_u8(rgb[1]);
            out[2] = to_u8(rgb[2]);
            out[3] = 255;
        }
    }
}

/// Quadratic darkening toward the vessel wall: 1 on the axis, `1 - EDGE_SHADE` at the glass.
fn edge_shade(x: f32, half_w: f32) -> f32 {
    let edge = x.abs() / half_w.max(0.01);
    1.0 - edge * edge * EDGE_SHADE
}

fn wax_pixel(s: Sample, palette: &Palette, shade: f32, x: f32, lamp_r: f32) -> [f32; 3] {
    let mut rgb = palette.wax(s.temperature).to_f32();
    let core = ((s.value - WAX_THRESHOLD) * 0.5).clamp(0.0, 1.0);
    let shine = (1.0 - (x + lamp_r * 0.6).abs() / (lamp_r * 0.8).max(0.01)).max(0.0);
    let shine = shine * shine * shine * 0.3;
    for c in 0..3 {
        rgb[c] = (rgb[c] + core * HOT_CORE[c]).min(255.0) * shade;
        rgb[c] = (rgb[c] + shine * SPECULAR[c]).min(255.0);
    }
    rgb
}

fn liquid_pixel(s: Sample, palette: &Palette, shade: f32) -> [f32; 3] {
    let mut rgb = palette.liquid.to_f32();
    let base = palette.base.to_f32();
    let glow = (s.value * 0.3).clamp(0.0, 1.0);
    for c in 0..3 {
        rgb[c] = (rgb[c] + glow * base[c] * 0.3) * shade;
    }
    rgb
}

/// (intensity, vertical offset into the band) for rows inside the bottom glow band.
fn heat_glow(y01: f32, warmup: f32) -> Option<(f32, f32)> {
    let start = 1.0 - GLOW_BAND;
    if y01 < start {
        return None;
    }
    let gy = (y01 - start) / GLOW_BAND;
    Some((0.03 + warmup.clamp(0.0, 1.0) * 0.18, gy))
}

fn scaled(n: usize, scale: f32) -> usize {
    // nudge so 220 * 0.35 lands on 77, not 76
    ((n as f32 * scale + 1e-3) as usize).max(MIN_SIZE)
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use crate::math::Vec3;

    fn wax_at(value: f32, temperature: f32, x: f32) -> [f32; 3] {
        let lamp_r = lamp_radius(0.5);
        let s = Sample { value, temperature };
        wax_pixel(s, &Palette::default(), edge_shade(x, lamp_r * 2.0), x, lamp_r)
    }

    fn hot_blob(x: f32, y: f32) -> Blob {
        let mut b = Blob::new(Vec3::new(x, y, 0.0), 0.14, 0.35);
        b.temperature = 1.0;
        b.update_radius();
        b
    }

    #[test]
    fn silhouette_tapers_at_caps_and_bulges_mid() {
        assert!(lamp_radius(0.5) > lamp_radius(0.2));
        assert!(lamp_radius(0.0) < lamp_radius(0.5));
        assert!((lamp_radius(0.0) - 0.46 * 0.3).abs() < 1e-6);
        assert!(lamp_radius(1.0) < lamp_radius(0.9));
    }

    #[test]
    fn size_follows_scale_with_floor() {
        assert_eq!(Rasterizer::new(220, 520, 0.35).size(), (77, 182));
        assert_eq!(Rasterizer::new(5, 5, 0.35).size(), (4, 4));
    }

    #[test]
    fn corners_are_transparent_and_centre_is_opaque() {
        let r = Rasterizer::new(100, 200, 0.5);
        let f = r.render(&[], &Palette::default(), 0.0);
        assert_eq!(f.pixel(0, 0)[3], 0);
        assert_eq!(f.pixel(f.width - 1, 0)[3], 0);
        assert_eq!(f.pixel(f.width / 2, f.height / 2)[3], 255);
    }

    #[test]
    fn blob_centre_is_wax_coloured() {
        let p = Palette::by_key("blue").unwrap();
        let r = Rasterizer::new(100, 200, 1.0);
        let f = r.render(&[hot_blob(0.0, 0.5)], &p, 0.0);
        let c = f.pixel(f.width / 2, f.height / 2);
        // hot blue wax is far brighter than the liquid
        assert!(c[2] > 200, "{c:?}");
        assert_eq!(c[3], 255);
    }

    #[test]
    fn empty_lamp_is_all_liquid() {
        let p = Palette::default();
        let r = Rasterizer::new(60, 120, 1.0);
        let f = r.render(&[], &p, 0.0);
        let c = f.pixel(f.width / 2, f.height / 2);
        assert!(c[0] <= p.liquid.r && c[1] <= p.liquid.g);
    }

    #[test]
    fn warmup_brightens_the_base() {
        let p = Palette::default();
        let r = Rasterizer::new(60, 120, 1.0);
        let cold = r.render(&[], &p, 0.0);
        let warm = r.render(&[], &p, 1.0);
        let (x, y) = (cold.width / 2, cold.height - 2);
        assert!(warm.pixel(x, y)[0] > cold.pixel(x, y)[0]);
        assert_eq!(warm.pixel(x, 10), cold.pixel(x, 10));
    }

    #[test]
    fn render_into_reuses_buffer_and_matches() {
        let blobs = [hot_blob(0.1, 0.4), hot_blob(-0.1, 0.6)];
        let p = Palette::default();
        let r = Rasterizer::new(80, 160, 0.5);
        let a = r.render(&blobs, &p, 0.5);
        let mut b = Frame::new(3, 3);
        r.render_into(&blobs, &p, 0.5, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn wax_darkens_toward_the_glass() {
        let half_w = lamp_radius(0.5) * 2.0;
        assert_eq!(edge_shade(0.0, half_w), 1.0);
        assert!((edge_shade(half_w, half_w) - (1.0 - EDGE_SHADE)).abs() < 1e-6);
        assert_eq!(edge_shade(-0.3, half_w), edge_shade(0.3, half_w));

        // both right of centre, clear of the highlight
        let near = wax_at(1.5, 0.5, 0.1);
        let far = wax_at(1.5, 0.5, 0.7);
        for c in 0..3 {
            assert!(far[c] < near[c], "{far:?} vs {near:?}");
        }
    }

    #[test]
    fn highlight_sits_left_of_centre() {
        let x = lamp_radius(0.5) * 0.6;
        let left = wax_at(1.2, 0.0, -x);
        let right = wax_at(1.2, 0.0, x);
        for c in 0..3 {
            assert!(left[c] > right[c], "{left:?} vs {right:?}");
        }
    }

    #[test]
    fn dense_field_brightens_the_core() {
        let rim = wax_at(1.05, 0.3, 0.1);
        let core = wax_at(3.5, 0.3, 0.1);
        for c in 0..3 {
            assert!(core[c] > rim[c], "{core:?} vs {rim:?}");
        }
        // the boost saturates once the field is 2 past threshold
        assert_eq!(wax_at(3.0, 0.3, 0.1), wax_at(8.0, 0.3, 0.1));
    }

    #[test]
    fn liquid_glows_in_proportion_to_field() {
        let p = Palette::default();
        let at = |value: f32| liquid_pixel(Sample { value, temperature: 0.3 }, &p, 1.0);
        let (dark, faint, bright) = (at(0.0), at(0.4), at(0.8));
        for c in 0..3 {
            assert!(((bright[c] - dark[c]) - 2.0 * (faint[c] - dark[c])).abs() < 1e-3);
        }
        assert!(bright[0] > faint[0] && faint[0] > dark[0]);
    }

    #[test]
    fn sub_threshold_blob_lights_nearby_liquid() {
        let blob = Blob::new(Vec3::new(0.0, 0.5, 0.0), 0.12, 0.35);
        let r = Rasterizer::new(100, 200, 1.0);
        let p = Palette::default();
        let lit = r.render(std::slice::from_ref(&blob), &p, 0.0);
        let empty = r.render(&[], &p, 0.0);

        let (px, py) = (60, 99);
        let x = ((px as f32 + 0.5) / 100.0 - 0.5) * 2.0;
        let h = 1.0 - (py as f32 + 0.5) / 200.0;
        let v = field::sample(std::slice::from_ref(&blob), x, h).value;
        assert!(v > 0.0 && v < WAX_THRESHOLD, "field {v}");
        assert!(lit.pixel(px, py)[0] > empty.pixel(px, py)[0]);
    }
}
