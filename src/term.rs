use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, DisableLineWrap, EnableLineWrap, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use lavalamp::{Frame, Rgb};

/// Lamp width over height, in square pixels.
pub(crate) const LAMP_ASPECT: f32 = 220.0 / 520.0;
pub(crate) const HUD_ROWS: u16 = 2;

const UPPER_HALF: char = '▀';

fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

#[derive(Clone, PartialEq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Rgb,
    pub(crate) bg: Rgb,
}

impl Cell {
    fn blank(bg: Rgb) -> Self {
        Cell {
            ch: ' ',
            fg: Rgb::new(255, 255, 255),
            bg,
        }
    }
}

/// Double-buffered cell grid; only changed cells are written.
pub(crate) struct Diff {
    w: u16,
    h: u16,
    prev: Vec<Cell>,
    next: Vec<Cell>,
}

impl Diff {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        let n = w as usize * h as usize;
        // prev starts impossible so the first flush paints everything
        let mut stale = Cell::blank(Rgb::new(0, 0, 0));
        stale.ch = '\0';
        Self {
            w,
            h,
            prev: vec![stale; n],
            next: vec![Cell::blank(Rgb::new(0, 0, 0)); n],
        }
    }

    pub(crate) fn resize(&mut self, w: u16, h: u16) {
        if self.w == w && self.h == h {
            return;
        }
        *self = Self::new(w, h);
    }

    pub(crate) fn size(&self) -> (u16, u16) {
        (self.w, self.h)
    }

    fn idx(&self, x: u16, y: u16) -> usize {
        y as usize * self.w as usize + x as usize
    }

    pub(crate) fn clear_next(&mut self, bg: Rgb) {
        for c in &mut self.next {
            *c = Cell::blank(bg);
        }
    }

    pub(crate) fn set_next(&mut self, x: u16, y: u16, cell: Cell) {
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        self.next[i] = cell;
    }

    pub(crate) fn text(&mut self, x: u16, y: u16, s: &str, fg: Rgb, bg: Rgb) {
        for (i, ch) in s.chars().enumerate() {
            let cx = x as usize + i;
            if cx >= self.w as usize {
                break;
            }
            self.set_next(cx as u16, y, Cell { ch, fg, bg });
        }
    }

    pub(crate) fn flush<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let mut last_fg: Option<Rgb> = None;
        let mut last_bg: Option<Rgb> = None;

        for y in 0..self.h {
            for x in 0..self.w {
                let i = self.idx(x, y);
                let b = &self.next[i];
                if self.prev[i] == *b {
                    continue;
                }

                queue!(out, cursor::MoveTo(x, y))?;
                if last_bg != Some(b.bg) {
                    queue!(out, SetBackgroundColor(to_color(b.bg)))?;
                    last_bg = Some(b.bg);
                }
                if last_fg != Some(b.fg) {
                    queue!(out, SetForegroundColor(to_color(b.fg)))?;
                    last_fg = Some(b.fg);
                }
                queue!(out, Print(b.ch))?;
            }
        }

        std::mem::swap(&mut self.prev, &mut self.next);
        Ok(())
    }
}

/// Cell rectangle the lamp occupies: (x, y, cols, rows).
pub(crate) fn lamp_rect(cols: u16, rows: u16) -> (u16, u16, u16, u16) {
    let lamp_rows = rows.saturating_sub(HUD_ROWS).max(1);
    let lamp_cols = ((lamp_rows as f32 * 2.0 * LAMP_ASPECT).round() as u16).clamp(1, cols.max(1));
    let x = cols.saturating_sub(lamp_cols) / 2;
    (x, HUD_ROWS.min(rows.saturating_sub(1)), lamp_cols, lamp_rows)
}

/// Bilinear RGBA lookup at normalized (u, v), pixel centres at (i + 0.5) / n.
pub(crate) fn sample_bilinear(frame: &Frame, u: f32, v: f32) -> [f32; 4] {
    if frame.width == 0 || frame.height == 0 {
        return [0.0; 4];
    }
    let fx = (u * frame.width as f32 - 0.5).clamp(0.0, (frame.width - 1) as f32);
    let fy = (v * frame.height as f32 - 0.5).clamp(0.0, (frame.height - 1) as f32);
    let x0 = fx.floor() as usize;
    let y0 = fy.floor() as usize;
    let x1 = (x0 + 1).min(frame.width - 1);
    let y1 = (y0 + 1).min(frame.height - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let p00 = frame.pixel(x0, y0);
    let p10 = frame.pixel(x1, y0);
    let p01 = frame.pixel(x0, y1);
    let p11 = frame.pixel(x1, y1);
    let mut out = [0.0; 4];
    for c in 0..4 {
        let top = p00[c] as f32 + (p10[c] as f32 - p00[c] as f32) * tx;
        let bot = p01[c] as f32 + (p11[c] as f32 - p01[c] as f32) * tx;
        out[c] = top + (bot - top) * ty;
    }
    out
}

fn over(px: [f32; 4], backdrop: Rgb) -> Rgb {
    let a = (px[3] / 255.0).clamp(0.0, 1.0);
    let mix = |s: f32, d: u8| -> u8 {
        (d as f32 + (s - d as f32) * a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgb::new(mix(px[0], backdrop.r), mix(px[1], backdrop.g), mix(px[2], backdrop.b))
}

/// Upscale `frame` into half-block cells covering the lamp rect.
pub(crate) fn blit(diff: &mut Diff, frame: &Frame, backdrop: Rgb) {
    let (cols, rows) = diff.size();
    let (x0, y0, w, h) = lamp_rect(cols, rows);
    let px_h = h as f32 * 2.0;
    for cy in 0..h {
        let v_top = (cy as f32 * 2.0 + 0.5) / px_h;
        let v_bot = (cy as f32 * 2.0 + 1.5) / px_h;
        for cx in 0..w {
            let u = (cx as f32 + 0.5) / w as f32;
            let top = over(sample_bilinear(frame, u, v_top), backdrop);
            let bot = over(sample_bilinear(frame, u, v_bot), backdrop);
            diff.set_next(
                x0 + cx,
                y0 + cy,
                Cell {
                    ch: UPPER_HALF,
                    fg: top,
                    bg: bot,
                },
            );
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) diff: Diff,
}

impl Terminal {
    pub(crate) fn begin() -> Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            DisableLineWrap,
            EnableMouseCapture,
            cursor::Hide
        )?;
        terminal::enable_raw_mode()?;
        let (w, h) = terminal::size()?;
        Ok(Self {
            out,
            diff: Diff::new(w, h),
        })
    }

    pub(crate) fn present(&mut self) -> Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        self.diff.flush(&mut self.out)?;
        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        Ok(())
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        terminal::disable_raw_mode()?;
        execute!(
            self.out,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        Ok(())
    }
}
