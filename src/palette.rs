use anyhow::{bail, ensure, Context, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
    pub fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp1 = |x: u8, y: u8| -> u8 {
            (x as f32 + (y as f32 - x as f32) * t).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: lerp1(a.r, b.r),
            g: lerp1(a.g, b.g),
            b: lerp1(a.b, b.b),
        }
    }
    /// Parses `#rrggbb` (the `#` is optional).
    pub fn from_hex(s: &str) -> Result<Rgb> {
        let hex = s.trim().trim_start_matches('#');
        ensure!(hex.len() == 6 && hex.is_ascii(), "colour must look like #rrggbb (got '{s}')");
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .with_context(|| format!("bad hex digits in colour '{s}'"))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_f32(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }

    fn to_hsv(self) -> (f32, f32, f32) {
        let [r, g, b] = self.to_f32().map(|c| c / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let d = max - min;
        let h = if d <= f32::EPSILON {
            0.0
        } else if max == r {
            ((g - b) / d).rem_euclid(6.0) / 6.0
        } else if max == g {
            ((b - r) / d + 2.0) / 6.0
        } else {
            ((r - g) / d + 4.0) / 6.0
        };
        let s = if max <= 0.0 { 0.0 } else { d / max };
        (h, s, max)
    }

    fn from_hsv(h: f32, s: f32, v: f32) -> Rgb {
        let h6 = h.rem_euclid(1.0) * 6.0;
        let i = h6.floor();
        let f = h6 - i;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match i as u8 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        let c = |x: f32| (x * 255.0).clamp(0.0, 255.0) as u8;
        Rgb::new(c(r), c(g), c(b))
    }
}

/// Wax and liquid colours for one lamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub key: &'static str,
    pub name: String,
    /// Cold wax.
    pub base: Rgb,
    /// Hot wax; blended with `base` by temperature.
    pub hot: Rgb,
    pub liquid: Rgb,
    /// Backdrop outside the vessel.
    pub bg: Rgb,
}

struct Scheme {
    key: &'static str,
    name: &'static str,
    base: Rgb,
    hot: Rgb,
    bg: Rgb,
    liquid: Rgb,
}

const SCHEMES: [Scheme; 12] = [
    Scheme {
        key: "classic",
        name: "Classic Red",
        base: Rgb::new(180, 30, 10),
        hot: Rgb::new(255, 180, 40),
        bg: Rgb::new(20, 8, 5),
        liquid: Rgb::new(45, 15, 8),
    },
    Scheme {
        key: "blue",
        name: "Cosmic Blue",
        base: Rgb::new(20, 40, 180),
        hot: Rgb::new(80, 180, 255),
        bg: Rgb::new(5, 8, 25),
        liquid: Rgb::new(8, 12, 45),
    },
    Scheme {
        key: "green",
        name: "Acid Green",
        base: Rgb::new(30, 160, 20),
        hot: Rgb::new(180, 255, 60),
        bg: Rgb::new(5, 20, 5),
        liquid: Rgb::new(8, 35, 10),
    },
    Scheme {
        key: "purple",
        name: "Nebula",
        base: Rgb::new(120, 20, 160),
        hot: Rgb::new(220, 100, 255),
        bg: Rgb::new(15, 5, 20),
        liquid: Rgb::new(30, 10, 40),
    },
    Scheme {
        key: "gold",
        name: "Molten Gold",
        base: Rgb::new(180, 120, 10),
        hot: Rgb::new(255, 220, 80),
        bg: Rgb::new(20, 14, 5),
        liquid: Rgb::new(40, 28, 8),
    },
    Scheme {
        key: "cyan",
        name: "Cyan Glow",
        base: Rgb::new(10, 150, 160),
        hot: Rgb::new(60, 240, 255),
        bg: Rgb::new(4, 15, 18),
        liquid: Rgb::new(6, 30, 35),
    },
    Scheme {
        key: "magenta",
        name: "Hot Magenta",
        base: Rgb::new(180, 20, 100),
        hot: Rgb::new(255, 100, 200),
        bg: Rgb::new(20, 4, 12),
        liquid: Rgb::new(40, 8, 25),
    },
    Scheme {
        key: "orange",
        name: "Ember",
        base: Rgb::new(200, 80, 5),
        hot: Rgb::new(255, 200, 50),
        bg: Rgb::new(22, 10, 2),
        liquid: Rgb::new(45, 20, 4),
    },
    Scheme {
        key: "white",
        name: "Ghost",
        base: Rgb::new(180, 180, 190),
        hot: Rgb::new(240, 240, 255),
        bg: Rgb::new(10, 10, 12),
        liquid: Rgb::new(20, 20, 25),
    },
    Scheme {
        key: "sunset",
        name: "Sunset",
        base: Rgb::new(200, 50, 30),
        hot: Rgb::new(255, 180, 80),
        bg: Rgb::new(20, 6, 4),
        liquid: Rgb::new(40, 12, 8),
    },
    Scheme {
        key: "ocean_fire",
        name: "Ocean & Fire",
        base: Rgb::new(20, 60, 180),
        hot: Rgb::new(100, 200, 255),
        bg: Rgb::new(4, 8, 20),
        liquid: Rgb::new(8, 15, 40),
    },
    Scheme {
        key: "toxic",
        name: "Toxic",
        base: Rgb::new(40, 200, 20),
        hot: Rgb::new(200, 255, 80),
        bg: Rgb::new(5, 22, 3),
        liquid: Rgb::new(10, 40, 6),
    },
];

pub const DEFAULT_SCHEME: &str = "classic";

impl Palette {
    pub fn by_key(key: &str) -> Result<Palette> {
        match SCHEMES.iter().find(|s| s.key == key) {
            Some(s) => Ok(Palette::from_scheme(s)),
            None => bail!("unknown scheme '{key}'. available: {}", keys().join(", ")),
        }
    }

    /// Built-in scheme by catalog position, wrapping.
    pub fn nth(idx: usize) -> Palette {
        Palette::from_scheme(&SCHEMES[idx % SCHEMES.len()])
    }

    fn from_scheme(s: &Scheme) -> Palette {
        Palette {
            key: s.key,
            name: s.name.to_string(),
            base: s.base,
            hot: s.hot,
            liquid: s.liquid,
            bg: s.bg,
        }
    }

    /// Derive a whole scheme from one wax colour.
    pub fn from_base(name: &str, base: Rgb) -> Palette {
        let (h, s, v) = base.to_hsv();
        let hot = Rgb::from_hsv(h, (s - 0.2).max(0.0), (v + 0.35).min(1.0));
        let liquid = Rgb::new((base.r / 5).max(2), (base.g / 5).max(2), (base.b / 5).max(2));
        let bg = Rgb::new((base.r / 12).max(1), (base.g / 12).max(1), (base.b / 12).max(1));
        Palette {
            key: "custom",
            name: name.to_string(),
            base,
            hot,
            liquid,
            bg,
        }
    }

    pub fn wax(&self, temperature: f32) -> Rgb {
        Rgb::lerp(self.base, self.hot, temperature)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::nth(0)
    }
}

pub fn keys() -> Vec<&'static str> {
    let mut k: Vec<_> = SCHEMES.iter().map(|s| s.key).collect();
    k.sort_unstable();
    k
}

pub fn position(key: &str) -> Option<usize> {
    SCHEMES.iter().position(|s| s.key == key)
}

pub fn count() -> usize {
    SCHEMES.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        let p = Palette::by_key("gold").unwrap();
        assert_eq!(p.name, "Molten Gold");
        let err = Palette::by_key("plaid").unwrap_err().to_string();
        assert!(err.contains("classic") && err.contains("toxic"), "{err}");
    }

    #[test]
    fn default_is_classic() {
        assert_eq!(Palette::default().key, DEFAULT_SCHEME);
    }

    #[test]
    fn wax_endpoints() {
        let p = Palette::default();
        assert_eq!(p.wax(0.0), p.base);
        assert_eq!(p.wax(1.0), p.hot);
    }

    #[test]
    fn derived_scheme_is_darker_liquid_brighter_hot() {
        let p = Palette::from_base("mine", Rgb::new(200, 60, 20));
        assert_eq!(p.liquid, Rgb::new(40, 12, 4));
        assert_eq!(p.bg, Rgb::new(16, 5, 1));
        let sum = |c: Rgb| c.r as u32 + c.g as u32 + c.b as u32;
        assert!(sum(p.hot) > sum(p.base));
    }

    #[test]
    fn hex_colours_parse() {
        assert_eq!(Rgb::from_hex("#ff6020").unwrap(), Rgb::new(255, 96, 32));
        assert_eq!(Rgb::from_hex("0A0b0C").unwrap(), Rgb::new(10, 11, 12));
        assert!(Rgb::from_hex("#fff").is_err());
        assert!(Rgb::from_hex("#gg0000").is_err());
    }

    #[test]
    fn hsv_round_trip_primary() {
        let red = Rgb::new(255, 0, 0);
        let (h, s, v) = red.to_hsv();
        assert_eq!(Rgb::from_hsv(h, s, v), red);
    }

    #[test]
    fn catalog_is_sorted_and_complete() {
        let k = keys();
        assert_eq!(k.len(), count());
        assert!(k.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(position("classic"), Some(0));
    }
}
