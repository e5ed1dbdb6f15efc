use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use lavalamp::params::{MAX_BLOBS, MIN_BLOBS};
use lavalamp::{palette, sim::drag_stir_strength, Impulse, Palette, Rgb, Simulation};
use tracing::{info, warn};

use crate::config::Settings;
use crate::term::{blit, lamp_rect, Terminal};

/// Virtual lamp canvas the render quality is relative to.
const LAMP_W: usize = 220;
const LAMP_H: usize = 520;

const HUD_FG: Rgb = Rgb::new(225, 210, 195);
const HUD_DIM: Rgb = Rgb::new(165, 150, 140);
const HUD_KEYS: &str = concat!(
    "Keys: Space pause  R reset  S stir  K shake  B heat burst  C cool  ",
    "[ / ] blobs  ↑/↓ heat  P scheme  H hud  Q quit  drag to stir"
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum LampAction {
    Quit,
    TogglePause,
    Reset,
    Impulse(Impulse),
    Blobs(i32),
    Heat(f32),
    NextScheme,
    ToggleHud,
}

pub(crate) fn map_key(code: KeyCode) -> Option<LampAction> {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(LampAction::Quit),
        KeyCode::Char(' ') => Some(LampAction::TogglePause),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(LampAction::Reset),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(LampAction::Impulse(Impulse::Stir)),
        KeyCode::Char('k') | KeyCode::Char('K') => Some(LampAction::Impulse(Impulse::Shake)),
        KeyCode::Char('b') | KeyCode::Char('B') => Some(LampAction::Impulse(Impulse::HeatBurst)),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(LampAction::Impulse(Impulse::CoolDown)),
        KeyCode::Char('[') => Some(LampAction::Blobs(-1)),
        KeyCode::Char(']') => Some(LampAction::Blobs(1)),
        KeyCode::Up => Some(LampAction::Heat(0.1)),
        KeyCode::Down => Some(LampAction::Heat(-0.1)),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(LampAction::NextScheme),
        KeyCode::Char('h') | KeyCode::Char('H') => Some(LampAction::ToggleHud),
        _ => None,
    }
}

struct Lamp {
    sim: Simulation,
    scheme_idx: usize,
    palette: Palette,
    show_hud: bool,
    quit: bool,
}

impl Lamp {
    fn new(settings: &Settings) -> Result<Self> {
        let mut sim = Simulation::new(settings.physics.clone(), settings.seed_or_clock())?;
        sim.set_render_size(LAMP_W, LAMP_H, settings.render_scale());
        let scheme_idx = palette::position(&settings.scheme).unwrap_or(0);
        Ok(Self {
            sim,
            scheme_idx,
            palette: settings.palette()?,
            show_hud: true,
            quit: false,
        })
    }

    fn apply(&mut self, action: LampAction) {
        match action {
            LampAction::Quit => self.quit = true,
            LampAction::TogglePause => {
                let p = !self.sim.is_paused();
                self.sim.set_paused(p);
            }
            LampAction::Reset => {
                let n = self.sim.parameters().blob_count;
                if let Err(e) = self.sim.reset(n) {
                    warn!(error = %e, "reset failed");
                }
            }
            LampAction::Impulse(kind) => self.sim.apply_impulse(kind, kind.default_magnitude()),
            LampAction::Blobs(delta) => {
                let n = (self.sim.parameters().blob_count as i32 + delta)
                    .clamp(MIN_BLOBS as i32, MAX_BLOBS as i32) as usize;
                if n != self.sim.parameters().blob_count {
                    if let Err(e) = self.sim.reset(n) {
                        warn!(error = %e, "blob count change failed");
                    }
                }
            }
            LampAction::Heat(delta) => {
                let mut p = self.sim.parameters().clone();
                p.heat_strength = (p.heat_strength + delta).clamp(0.0, 2.0);
                if let Err(e) = self.sim.set_parameters(p) {
                    warn!(error = %e, "heat change rejected");
                }
            }
            LampAction::NextScheme => {
                self.scheme_idx = (self.scheme_idx + 1) % palette::count();
                self.palette = Palette::nth(self.scheme_idx);
            }
            LampAction::ToggleHud => self.show_hud = !self.show_hud,
        }
    }

    fn hud(&self, fps: f32) -> (String, String) {
        let warm = self.sim.warmup_percent();
        let warm = if warm >= 100 { "ready".to_string() } else { format!("{warm:>3}%") };
        let line1 = format!(
            "Lava Lamp  {}  blobs:{}+1  heat:{:>3}%  warmup:{}  {:>3.0} fps{}",
            self.palette.name,
            self.sim.parameters().blob_count,
            (self.sim.parameters().heat_strength * 100.0).round() as i32,
            warm,
            fps,
            if self.sim.is_paused() { "  [PAUSED]" } else { "" }
        );
        (line1, HUD_KEYS.to_string())
    }
}

pub(crate) fn run(settings: &Settings) -> Result<()> {
    let mut lamp = Lamp::new(settings)?;
    let mut term = Terminal::begin()?;
    let result = frame_loop(&mut lamp, &mut term, settings.fps);
    term.end()?;
    result
}

fn frame_loop(lamp: &mut Lamp, term: &mut Terminal, fps_cap: u32) -> Result<()> {
    let frame_budget = Duration::from_secs_f32(1.0 / fps_cap.max(1) as f32);
    let mut last = Instant::now();
    let mut last_fps = Instant::now();
    let mut fps_smoothed = fps_cap as f32;
    let mut frames = 0u32;
    let mut drag_from: Option<(u16, u16)> = None;

    while !lamp.quit {
        let frame_start = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind == KeyEventKind::Press => {
                    if let Some(a) = map_key(k.code) {
                        lamp.apply(a);
                    }
                }
                Event::Mouse(m) => match m.kind {
                    MouseEventKind::Down(MouseButton::Left) => drag_from = Some((m.column, m.row)),
                    MouseEventKind::Drag(MouseButton::Left) => {
                        if let Some((x0, y0)) = drag_from {
                            let (cols, rows) = term.diff.size();
                            let (_, _, w, _) = lamp_rect(cols, rows);
                            // cells to lamp-canvas pixels; rows are two pixels tall
                            let px = LAMP_W as f32 / w.max(1) as f32;
                            let dx = (m.column as f32 - x0 as f32) * px;
                            let dy = (m.row as f32 - y0 as f32) * px * 2.0;
                            if let Some(s) = drag_stir_strength((dx * dx + dy * dy).sqrt()) {
                                lamp.sim.apply_impulse(Impulse::Stir, s);
                            }
                        }
                        drag_from = Some((m.column, m.row));
                    }
                    MouseEventKind::Up(MouseButton::Left) => drag_from = None,
                    _ => {}
                },
                Event::Resize(w, h) => term.diff.resize(w, h),
                _ => {}
            }
        }

        let now = Instant::now();
        let dt = (now - last).as_secs_f32();
        last = now;
        lamp.sim.tick(dt);

        frames += 1;
        let window = (now - last_fps).as_secs_f32();
        if window >= 0.5 {
            let fps = frames as f32 / window.max(1e-6);
            fps_smoothed = fps_smoothed * 0.7 + fps * 0.3;
            frames = 0;
            last_fps = now;
        }

        let backdrop = lamp.palette.bg;
        term.diff.clear_next(backdrop);
        let frame = lamp.sim.render(&lamp.palette);
        blit(&mut term.diff, frame, backdrop);
        if lamp.show_hud {
            let (l1, l2) = lamp.hud(fps_smoothed);
            term.diff.text(0, 0, &l1, HUD_FG, backdrop);
            term.diff.text(0, 1, &l2, HUD_DIM, backdrop);
        }
        term.present()?;

        let spent = frame_start.elapsed();
        if spent < frame_budget {
            std::thread::sleep(frame_budget - spent);
        }
    }
    Ok(())
}

/// Run without a terminal and report what the lamp did.
pub(crate) fn headless(settings: &Settings, ticks: u32) -> Result<()> {
    let mut lamp = Lamp::new(settings)?;
    let dt = 1.0 / settings.fps.max(1) as f32;
    let mut lift_offs = 0usize;
    let mut peak_y = 0.0f32;

    for _ in 0..ticks {
        lift_offs += lamp.sim.tick(dt).lift_offs;
        for b in lamp.sim.blobs() {
            peak_y = peak_y.max(b.pos.y);
        }
    }

    let warmup = lamp.sim.warmup_percent();
    let overlaps = lamp.sim.last_report().overlaps;
    let frame = lamp.sim.render(&lamp.palette);
    let inside = frame.pixels.chunks_exact(4).filter(|p| p[3] > 0).count();
    info!(
        ticks,
        lift_offs,
        peak_y,
        warmup,
        overlaps,
        frame_w = frame.width,
        frame_h = frame.height,
        inside,
        "headless run finished"
    );
    println!(
        "{} ticks: {} lift-offs, peak height {:.2}, warmup {}%, {} touching pairs, \
         frame {}x{} ({} px inside vessel)",
        ticks,
        lift_offs,
        peak_y,
        warmup,
        overlaps,
        frame.width,
        frame.height,
        inside
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(map_key(KeyCode::Char('q')), Some(LampAction::Quit));
        assert_eq!(
            map_key(KeyCode::Char('b')),
            Some(LampAction::Impulse(Impulse::HeatBurst))
        );
        assert_eq!(map_key(KeyCode::Char(']')), Some(LampAction::Blobs(1)));
        assert_eq!(map_key(KeyCode::Char('z')), None);
    }

    #[test]
    fn blob_count_keys_stay_in_range() {
        let settings = Settings {
            seed: Some(1),
            ..Settings::default()
        };
        let mut lamp = Lamp::new(&settings).unwrap();
        for _ in 0..20 {
            lamp.apply(LampAction::Blobs(1));
        }
        assert_eq!(lamp.sim.parameters().blob_count, MAX_BLOBS);
        assert_eq!(lamp.sim.blobs().len(), MAX_BLOBS + 1);
        for _ in 0..20 {
            lamp.apply(LampAction::Blobs(-1));
        }
        assert_eq!(lamp.sim.parameters().blob_count, MIN_BLOBS);
    }

    #[test]
    fn scheme_cycles_and_pause_toggles() {
        let settings = Settings {
            seed: Some(1),
            ..Settings::default()
        };
        let mut lamp = Lamp::new(&settings).unwrap();
        let first = lamp.palette.key;
        lamp.apply(LampAction::NextScheme);
        assert_ne!(lamp.palette.key, first);
        lamp.apply(LampAction::TogglePause);
        assert!(lamp.sim.is_paused());
        assert!(lamp.hud(30.0).0.contains("PAUSED"));
    }

    #[test]
    fn custom_base_colour_is_used_until_cycled() {
        let settings = Settings {
            seed: Some(1),
            base_color: Some("#20c040".into()),
            ..Settings::default()
        };
        let mut lamp = Lamp::new(&settings).unwrap();
        assert_eq!(lamp.palette.key, "custom");
        assert_eq!(lamp.palette.base, Rgb::new(0x20, 0xc0, 0x40));
        lamp.apply(LampAction::NextScheme);
        assert_eq!(lamp.palette, Palette::nth(1));
    }

    #[test]
    fn heat_keys_clamp() {
        let settings = Settings {
            seed: Some(1),
            ..Settings::default()
        };
        let mut lamp = Lamp::new(&settings).unwrap();
        for _ in 0..30 {
            lamp.apply(LampAction::Heat(0.1));
        }
        assert_eq!(lamp.sim.parameters().heat_strength, 2.0);
    }
}
