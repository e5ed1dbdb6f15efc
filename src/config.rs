use anyhow::{ensure, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use lavalamp::palette::{self, DEFAULT_SCHEME};
use lavalamp::{Palette, Parameters, Rgb};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "lavalamp",
    version,
    about = "Lava lamp simulator: heated wax blobs rendered as metaballs in your terminal"
)]
pub(crate) struct Cli {
    /// number of wax blobs (3-12); the base pool blob is always extra
    #[arg(long)]
    pub(crate) blobs: Option<usize>,

    /// colour scheme key (see --list-schemes)
    #[arg(long)]
    pub(crate) scheme: Option<String>,

    /// derive a custom scheme from one wax colour, e.g. #ff6020 (overrides --scheme)
    #[arg(long, value_name = "HEX")]
    pub(crate) base_color: Option<String>,

    /// render resolution in percent of the display (15-80)
    #[arg(long)]
    pub(crate) quality: Option<u32>,

    /// seconds for the heater to reach full power
    #[arg(long)]
    pub(crate) warmup: Option<f32>,

    /// rng seed; defaults to the clock
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// frame rate cap
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// settings file (JSON); defaults to the per-user data dir
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// save the effective settings to the settings file and continue
    #[arg(long)]
    pub(crate) write_config: bool,

    /// print colour schemes and exit
    #[arg(long)]
    pub(crate) list_schemes: bool,

    /// run this many ticks without a terminal and log a summary
    #[arg(long, value_name = "TICKS")]
    pub(crate) headless: Option<u32>,

    /// write logs here (the lamp owns the terminal while running)
    #[arg(long)]
    pub(crate) log_file: Option<PathBuf>,

    /// debug logging
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) scheme: String,
    /// `#rrggbb`; when set, the starting palette is derived from it.
    pub(crate) base_color: Option<String>,
    pub(crate) quality: u32,
    pub(crate) fps: u32,
    pub(crate) seed: Option<u64>,
    pub(crate) physics: Parameters,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            base_color: None,
            quality: 35,
            fps: 30,
            seed: None,
            physics: Parameters::default(),
        }
    }
}

impl Settings {
    /// Command-line flags win over the file.
    pub(crate) fn apply_cli(&mut self, cli: &Cli) {
        if let Some(n) = cli.blobs {
            self.physics.blob_count = n;
        }
        if let Some(s) = &cli.scheme {
            self.scheme = s.clone();
        }
        if cli.base_color.is_some() {
            self.base_color = cli.base_color.clone();
        }
        if let Some(q) = cli.quality {
            self.quality = q;
        }
        if let Some(w) = cli.warmup {
            self.physics.warmup_duration = w;
        }
        if cli.seed.is_some() {
            self.seed = cli.seed;
        }
        if let Some(f) = cli.fps {
            self.fps = f;
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            (15..=80).contains(&self.quality),
            "quality must be 15-80 percent (got {})",
            self.quality
        );
        ensure!((5..=240).contains(&self.fps), "fps must be 5-240 (got {})", self.fps);
        ensure!(
            palette::position(&self.scheme).is_some(),
            "unknown scheme '{}'. available: {}",
            self.scheme,
            palette::keys().join(", ")
        );
        if let Some(hex) = &self.base_color {
            Rgb::from_hex(hex).context("invalid base_color")?;
        }
        self.physics.validate()
    }

    /// Starting palette: the derived custom scheme if a base colour is set.
    pub(crate) fn palette(&self) -> Result<Palette> {
        match &self.base_color {
            Some(hex) => Ok(Palette::from_base("Custom", Rgb::from_hex(hex)?)),
            None => Palette::by_key(&self.scheme),
        }
    }

    pub(crate) fn render_scale(&self) -> f32 {
        self.quality as f32 / 100.0
    }

    pub(crate) fn seed_or_clock(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0xC0FFEE)
        })
    }
}

pub(crate) fn default_settings_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("com", "lavalamp", "Lavalamp")
        .context("could not resolve project directories")?;
    Ok(proj.config_dir().join("settings.json"))
}

/// Missing or unparsable files fall back to defaults.
pub(crate) fn load_settings(path: &Path) -> Settings {
    let Ok(s) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&s) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
            Settings::default()
        }
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
