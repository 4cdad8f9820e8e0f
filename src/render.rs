use crossterm::{
    cursor, queue,
    style::{self, Color as CColor},
};
use glam::Vec2;
use signal_runner::gesture::{Gesture, PoseFrame};
use signal_runner::grading::Verdict;
use signal_runner::road::RoadSegment;
use signal_runner::{Heading, Phase, SegmentKind, Session};
use std::io::{self, Write};

// ── Colors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    const fn lerp(a: Rgb, b: Rgb, t_256: u16) -> Rgb {
        let t = t_256 as i32;
        Rgb(
            (a.0 as i32 + (b.0 as i32 - a.0 as i32) * t / 256) as u8,
            (a.1 as i32 + (b.1 as i32 - a.1 as i32) * t / 256) as u8,
            (a.2 as i32 + (b.2 as i32 - a.2 as i32) * t / 256) as u8,
        )
    }

    fn color(self) -> CColor {
        CColor::Rgb {
            r: self.0,
            g: self.1,
            b: self.2,
        }
    }
}

const GRASS: Rgb = Rgb(84, 168, 55);
const GRASS_LIGHT: Rgb = Rgb(98, 184, 64);
const GRASS_TUFT: Rgb = Rgb(62, 140, 42);
const ASPHALT: Rgb = Rgb(78, 80, 88);
const CURB: Rgb = Rgb(190, 186, 170);
const CROSSWALK: Rgb = Rgb(235, 235, 228);
const STOP_RED: Rgb = Rgb(210, 40, 40);
const SIGN_YELLOW: Rgb = Rgb(245, 200, 66);
const SIGN_DONE: Rgb = Rgb(130, 130, 130);
const RIDER_BODY: Rgb = Rgb(40, 110, 220);
const RIDER_SKIN: Rgb = Rgb(240, 190, 150);
const BIKE: Rgb = Rgb(25, 25, 25);
const PANEL: Rgb = Rgb(210, 185, 110);
const PANEL_HI: Rgb = Rgb(220, 195, 120);
const GOOD: Rgb = Rgb(110, 220, 90);
const BAD: Rgb = Rgb(240, 80, 60);
const MAP_BG: Rgb = Rgb(20, 24, 32);
const BONE: Rgb = Rgb(120, 220, 255);
const WHITE: Rgb = Rgb(255, 255, 255);
const SHADOW: Rgb = Rgb(30, 30, 30);

/// World units visible across the shorter screen side.
const VIEW_SPAN: f32 = 1400.0;
/// Road surface width as a share of the tile.
const ROAD_WIDTH: f32 = 0.45;

// ── Pixel buffer with half-block rendering ──────────────────────────────────

struct Label {
    col: u16,
    row: u16,
    text: String,
    fg: Rgb,
}

/// Two pixels per terminal cell, plus text laid over the top after the pixels.
pub struct PixelBuf {
    w: usize,
    h: usize,
    px: Vec<Rgb>,
    labels: Vec<Label>,
}

impl PixelBuf {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            px: vec![GRASS; w * h],
            labels: Vec::new(),
        }
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.px.resize(w * h, GRASS);
        self.labels.clear();
    }

    fn set(&mut self, x: i32, y: i32, c: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.px[y as usize * self.w + x as usize] = c;
        }
    }

    fn get(&self, x: usize, y: usize) -> Rgb {
        self.px[y * self.w + x]
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, c: Rgb) {
        let (x0, x1) = (x.max(0), (x + w).min(self.w as i32));
        let (y0, y1) = (y.max(0), (y + h).min(self.h as i32));
        for py in y0..y1 {
            for px in x0..x1 {
                self.set(px, py, c);
            }
        }
    }

    fn line(&mut self, a: Vec2, b: Vec2, c: Rgb) {
        let steps = (b - a).abs().max_element().ceil().max(1.0) as i32;
        for i in 0..=steps {
            let p = a.lerp(b, i as f32 / steps as f32);
            self.set(p.x.round() as i32, p.y.round() as i32, c);
        }
    }

    fn darken(&mut self) {
        for c in &mut self.px {
            *c = Rgb(c.0 / 2, c.1 / 2, c.2 / 2);
        }
    }

    fn text(&mut self, col: i32, row: i32, text: impl Into<String>, fg: Rgb) {
        if col < 0 || row < 0 {
            return;
        }
        self.labels.push(Label {
            col: col as u16,
            row: row as u16,
            text: text.into(),
            fg,
        });
    }

    fn text_centered(&mut self, row: i32, text: impl Into<String>, fg: Rgb) {
        let text = text.into();
        let col = (self.w as i32 - text.chars().count() as i32) / 2;
        self.text(col.max(0), row, text, fg);
    }

    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0))?;
        let rows = self.h / 2;
        for row in 0..rows {
            if row > 0 {
                queue!(out, style::ResetColor, style::Print("\r\n"))?;
            }
            let mut pen = Pen::default();
            for col in 0..self.w {
                let (top, bot) = (self.get(col, row * 2), self.get(col, row * 2 + 1));
                let glyph = if top == bot {
                    pen.bg(out, top)?;
                    ' '
                } else {
                    pen.fg(out, top)?;
                    pen.bg(out, bot)?;
                    '\u{2580}' // upper half block
                };
                queue!(out, style::Print(glyph))?;
            }
        }

        for label in self.labels.iter().filter(|l| (l.row as usize) < rows) {
            let row = label.row as usize;
            queue!(out, cursor::MoveTo(label.col, label.row))?;
            let mut pen = Pen::default();
            pen.fg(out, label.fg)?;
            let cols = (label.col as usize..self.w).zip(label.text.chars());
            for (col, ch) in cols {
                pen.bg(out, Rgb::lerp(self.get(col, row * 2), self.get(col, row * 2 + 1), 128))?;
                queue!(out, style::Print(ch))?;
            }
        }
        queue!(out, style::ResetColor)?;
        out.flush()
    }
}

/// Colors last sent to the terminal; repeats are skipped.
#[derive(Default)]
struct Pen {
    fg: Option<Rgb>,
    bg: Option<Rgb>,
}

impl Pen {
    fn fg(&mut self, out: &mut impl Write, c: Rgb) -> io::Result<()> {
        if self.fg != Some(c) {
            queue!(out, style::SetForegroundColor(c.color()))?;
            self.fg = Some(c);
        }
        Ok(())
    }

    fn bg(&mut self, out: &mut impl Write, c: Rgb) -> io::Result<()> {
        if self.bg != Some(c) {
            queue!(out, style::SetBackgroundColor(c.color()))?;
            self.bg = Some(c);
        }
        Ok(())
    }
}

// ── Score digits ────────────────────────────────────────────────────────────

/// 3x5 glyphs, one byte per row, bit 2 is the left column.
#[rustfmt::skip]
const GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b011, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Width in pixels of `n` drawn with [`draw_number`].
fn number_width(n: u32) -> i32 {
    n.to_string().len() as i32 * 4 - 1
}

/// Draws `n` centered on `cx` with a drop shadow one pixel down and right.
fn draw_number(buf: &mut PixelBuf, cx: i32, y: i32, n: u32, fg: Rgb) {
    let left = cx - number_width(n) / 2;
    let digits = n.to_string();
    let lit = digits.bytes().enumerate().flat_map(|(i, ch)| {
        let x0 = left + i as i32 * 4;
        GLYPHS[(ch - b'0') as usize]
            .into_iter()
            .enumerate()
            .flat_map(move |(dy, bits)| {
                (0..3)
                    .filter(move |&dx| bits & (0b100 >> dx) != 0)
                    .map(move |dx| (x0 + dx, y + dy as i32))
            })
    });
    let pixels: Vec<(i32, i32)> = lit.collect();
    for &(x, y) in &pixels {
        buf.set(x + 1, y + 1, SHADOW);
    }
    for &(x, y) in &pixels {
        buf.set(x, y, fg);
    }
}

// ── Menu button ─────────────────────────────────────────────────────────────

/// A clickable area in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub col: u16,
    pub row: u16,
    pub w: u16,
    pub h: u16,
}

impl Button {
    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.col && col < self.col + self.w && row >= self.row && row < self.row + self.h
    }
}

pub fn start_button(cols: u16, rows: u16) -> Button {
    let w = 15.min(cols);
    Button {
        col: (cols - w) / 2,
        row: rows * 3 / 5,
        w,
        h: 3,
    }
}

// ── World to screen ─────────────────────────────────────────────────────────

struct Camera {
    anchor: Vec2,
    scale: f32,
}

impl Camera {
    fn new(pw: usize, ph: usize, jitter: Vec2) -> Self {
        Self {
            anchor: Vec2::new(pw as f32 / 2.0, ph as f32 * 0.62) + jitter,
            scale: pw.min(ph).max(1) as f32 / VIEW_SPAN,
        }
    }

    fn to_screen(&self, world: Vec2) -> Vec2 {
        self.anchor + world * self.scale
    }

    fn to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.anchor) / self.scale
    }

    fn fill(&self, buf: &mut PixelBuf, min: Vec2, max: Vec2, c: Rgb) {
        let a = self.to_screen(min).floor();
        let b = self.to_screen(max).ceil();
        let size = (b - a).max(Vec2::ONE);
        buf.fill_rect(a.x as i32, a.y as i32, size.x as i32, size.y as i32, c);
    }

    /// Axis-aligned box of half extents `half` around `center`.
    fn fill_box(&self, buf: &mut PixelBuf, center: Vec2, half: Vec2, c: Rgb) {
        self.fill(buf, center - half, center + half, c);
    }

    /// A band of half width `hw` from `a` to `b` along one axis.
    fn fill_band(&self, buf: &mut PixelBuf, a: Vec2, b: Vec2, hw: f32, c: Rgb) {
        let pad = Vec2::splat(hw);
        self.fill(buf, a.min(b) - pad, a.max(b) + pad, c);
    }
}

/// Everything the frame shows beyond the session itself.
pub struct Scene<'a> {
    pub session: &'a Session,
    pub gesture: Gesture,
    pub preview: Option<&'a PoseFrame>,
    pub degraded: bool,
    pub player: &'a str,
    pub tick_rate_hz: u32,
    pub keyboard: bool,
}

pub fn draw(buf: &mut PixelBuf, scene: &Scene) {
    buf.labels.clear();
    let session = scene.session;

    let jitter = match (session.phase(), session.last_resolution()) {
        (Phase::ResultAnim, Some(r)) if r.verdict == Verdict::Fail => {
            let f = session.frame();
            Vec2::new(
                (noise(f) - 0.5) * 4.0,
                (noise(f.wrapping_add(7)) - 0.5) * 2.0,
            )
        }
        _ => Vec2::ZERO,
    };
    let cam = Camera::new(buf.w, buf.h, jitter);

    draw_backdrop(buf, &cam, session);
    draw_road(buf, &cam, session);
    if session.phase() != Phase::Menu {
        draw_rider(buf, &cam, session.heading(), scene.gesture);
    }
    draw_hud(buf, scene);
    draw_minimap(buf, scene);

    match session.phase() {
        Phase::Menu => draw_menu(buf, scene),
        Phase::GameOver => draw_game_over(buf, session),
        _ => {}
    }
}

fn draw_backdrop(buf: &mut PixelBuf, cam: &Camera, session: &Session) {
    let backdrop = session.backdrop();
    let tile = backdrop.tile();
    let shift = backdrop.shift();
    let (w, h) = (buf.w, buf.h);
    for y in 0..h {
        for x in 0..w {
            let p = cam.to_world(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) - shift;
            let cell = (p / (tile / 2.0)).floor();
            let checker = (cell.x as i64 + cell.y as i64).rem_euclid(2) == 0;
            // Tufts repeat every tile so wrapping the shift never reshuffles them.
            let fine = (p / (tile / 8.0)).floor();
            let seed = (fine.x as i64).rem_euclid(8) as u64 * 8 + (fine.y as i64).rem_euclid(8) as u64;
            let c = if noise(seed) < 0.12 {
                GRASS_TUFT
            } else if checker {
                GRASS
            } else {
                GRASS_LIGHT
            };
            buf.set(x as i32, y as i32, c);
        }
    }
}

fn draw_road(buf: &mut PixelBuf, cam: &Camera, session: &Session) {
    let road = session.road();
    // Curbs first so neighbouring tiles' asphalt covers the seams.
    for seg in road.segments() {
        let hw = seg.size() * ROAD_WIDTH / 2.0;
        let curb = hw + seg.size() * 0.03;
        cam.fill_band(buf, seg.entry_point(), seg.center(), curb, CURB);
        cam.fill_band(buf, seg.center(), seg.exit_point(), curb, CURB);
    }
    for seg in road.segments() {
        let hw = seg.size() * ROAD_WIDTH / 2.0;
        cam.fill_band(buf, seg.entry_point(), seg.center(), hw, ASPHALT);
        cam.fill_band(buf, seg.center(), seg.exit_point(), hw, ASPHALT);
    }
    for seg in road.segments() {
        match seg.kind() {
            SegmentKind::Straight => {}
            SegmentKind::Stop => draw_stop_line(buf, cam, seg),
            SegmentKind::LeftTurn | SegmentKind::RightTurn => draw_turn_sign(buf, cam, seg),
        }
    }
}

fn draw_stop_line(buf: &mut PixelBuf, cam: &Camera, seg: &RoadSegment) {
    let size = seg.size();
    let width = size * ROAD_WIDTH;
    let along = seg.entry().unit();
    let across = seg.entry().turned_right().unit();
    let stripe = if seg.is_judged() {
        Rgb::lerp(CROSSWALK, ASPHALT, 160)
    } else {
        CROSSWALK
    };
    for i in 0..5 {
        let offset = -width / 2.0 + width / 10.0 + i as f32 * width / 5.0;
        let center = seg.center() + across * offset;
        let half = across.abs() * (width / 20.0) + along.abs() * (size * 0.05);
        cam.fill_box(buf, center, half, stripe);
    }
    let sign = seg.center() + across * (width / 2.0 + size * 0.08);
    let color = if seg.is_judged() { SIGN_DONE } else { STOP_RED };
    cam.fill_box(buf, sign, Vec2::splat(size * 0.05), color);
}

fn draw_turn_sign(buf: &mut PixelBuf, cam: &Camera, seg: &RoadSegment) {
    let size = seg.size();
    let reach = size * ROAD_WIDTH / 2.0 + size * 0.08;
    // Outer corner: past the junction, on the side away from the exit.
    let post = seg.center() + seg.entry().unit() * reach - seg.exit().unit() * reach;
    let (face, arrow) = if seg.is_judged() {
        (SIGN_DONE, SHADOW)
    } else {
        (SIGN_YELLOW, BIKE)
    };
    cam.fill_box(buf, post, Vec2::splat(size * 0.06), face);
    cam.fill_box(
        buf,
        post + seg.exit().unit() * size * 0.03,
        Vec2::splat(size * 0.02),
        arrow,
    );
}

fn draw_rider(buf: &mut PixelBuf, cam: &Camera, heading: Heading, gesture: Gesture) {
    let at = cam.anchor;
    let d = heading.unit();
    let len = (cam.scale * 40.0).max(3.0);

    buf.line(at - d * len, at + d * len, BIKE);
    buf.fill_rect(at.x as i32 - 1, at.y as i32 - 1, 3, 3, RIDER_BODY);
    let head = at + d * 1.5;
    buf.set(head.x.round() as i32, head.y.round() as i32, RIDER_SKIN);

    let arm = match gesture {
        Gesture::None => None,
        Gesture::LeftTurn => Some(heading.turned_left().unit()),
        Gesture::RightTurn => Some(heading.turned_right().unit()),
        Gesture::Stop => Some((heading.turned_left().unit() - d).normalize()),
    };
    if let Some(dir) = arm {
        buf.line(at, at + dir * len, RIDER_SKIN);
    }
}

// ── HUD ─────────────────────────────────────────────────────────────────────

fn draw_hud(buf: &mut PixelBuf, scene: &Scene) {
    let session = scene.session;
    let cols = buf.w as i32;
    let rows = (buf.h / 2) as i32;
    if session.phase() == Phase::Menu {
        return;
    }

    draw_number(buf, cols / 2, 2, session.score(), WHITE);

    let mistakes = format!(" MISTAKES {}/{} ", session.mistakes(), session.mistake_limit());
    let tint = if session.mistakes() > 0 { BAD } else { WHITE };
    buf.text(1, 0, mistakes, tint);

    let who = format!(" {}  BEST {} ", scene.player, session.best());
    buf.text(cols - who.chars().count() as i32 - 1, 0, who, WHITE);
    if let Some(next) = session.next_signal() {
        let next = format!(" NEXT: {} ", next.label());
        buf.text(cols - next.chars().count() as i32 - 1, 1, next, SIGN_YELLOW);
    }

    match session.phase() {
        Phase::Grading => {
            if let Some(mission) = session.mission() {
                buf.text_centered(rows / 4, format!(" {}! ", mission.label()), SIGN_YELLOW);
            }
            let hint = if session.reacting() {
                " GET READY ".to_string()
            } else {
                let secs = session.hold_remaining() as f32 / scene.tick_rate_hz.max(1) as f32;
                format!(" HOLD {secs:.1}s ")
            };
            buf.text_centered(rows / 4 + 1, hint, WHITE);
        }
        Phase::ResultAnim => {
            if let Some(result) = session.last_resolution() {
                let tint = match result.verdict {
                    Verdict::Success => GOOD,
                    Verdict::Fail => BAD,
                };
                buf.text_centered(rows / 4, format!(" {} ", result.rating.label()), tint);
                buf.text_centered(
                    rows / 4 + 1,
                    format!(" {:.0}% MATCH ", result.accuracy * 100.0),
                    WHITE,
                );
            }
        }
        _ => {}
    }
}

fn draw_minimap(buf: &mut PixelBuf, scene: &Scene) {
    let mw = (buf.w as i32 / 5).clamp(16, 40);
    let mh = mw * 3 / 4;
    let x = buf.w as i32 - mw - 2;
    let y = buf.h as i32 - mh - 4;
    if x < 0 || y < 0 {
        return;
    }
    buf.fill_rect(x - 1, y - 1, mw + 2, mh + 2, SHADOW);
    buf.fill_rect(x, y, mw, mh, MAP_BG);

    let label_row = (y + mh) / 2 + 1;
    if scene.degraded {
        buf.text(x + (mw - 9) / 2, (y + mh / 2) / 2, "CAM ERROR", BAD);
        return;
    }
    if let Some(frame) = scene.preview {
        let to_box = |p: Vec2| {
            Vec2::new(x as f32, y as f32)
                + p.clamp(Vec2::ZERO, Vec2::ONE) * Vec2::new((mw - 1) as f32, (mh - 1) as f32)
        };
        let (s, e, w, h) = (
            to_box(frame.shoulder()),
            to_box(frame.elbow()),
            to_box(frame.wrist()),
            to_box(frame.hip()),
        );
        buf.line(s, e, BONE);
        buf.line(e, w, BONE);
        buf.line(s, h, BONE);
        for joint in [s, e, w, h] {
            buf.set(joint.x as i32, joint.y as i32, WHITE);
        }
    } else if scene.keyboard {
        buf.text(x + (mw - 4) / 2, (y + mh / 2) / 2, "KEYS", SIGN_DONE);
    }
    let label = format!(" {} ", scene.gesture.label());
    buf.text(x + (mw - label.len() as i32) / 2, label_row, label, WHITE);
}

fn draw_menu(buf: &mut PixelBuf, scene: &Scene) {
    let cols = buf.w as u16;
    let rows = (buf.h / 2) as u16;
    buf.darken();

    buf.text_centered(rows as i32 / 4, " SIGNAL RUNNER ", SIGN_YELLOW);
    buf.text_centered(
        rows as i32 / 4 + 2,
        format!(" {}  BEST {} ", scene.player, scene.session.best()),
        WHITE,
    );

    let button = start_button(cols, rows);
    let (bx, by) = (button.col as i32, button.row as i32 * 2);
    let (bw, bh) = (button.w as i32, button.h as i32 * 2);
    buf.fill_rect(bx - 1, by - 1, bw + 2, bh + 2, SHADOW);
    buf.fill_rect(bx, by, bw, bh, PANEL);
    buf.fill_rect(bx + 1, by + 1, bw - 2, bh - 2, PANEL_HI);
    buf.text_centered(button.row as i32 + 1, "START", BIKE);

    let help_row = button.row as i32 + button.h as i32 + 1;
    buf.text_centered(help_row, " ENTER or click START, Q to quit ", WHITE);
    let controls = if scene.keyboard {
        " signal with arrows or A / D / S "
    } else {
        " signal with your right arm "
    };
    buf.text_centered(help_row + 1, controls, WHITE);
}

fn draw_game_over(buf: &mut PixelBuf, session: &Session) {
    let cx = buf.w as i32 / 2;
    let cy = buf.h as i32 / 2;
    let panel_w = 36;
    let panel_h = 22;
    buf.darken();

    let px = cx - panel_w / 2;
    let py = cy - panel_h / 2;
    buf.fill_rect(px - 1, py - 1, panel_w + 2, panel_h + 2, SHADOW);
    buf.fill_rect(px, py, panel_w, panel_h, PANEL);
    buf.fill_rect(px + 1, py + 1, panel_w - 2, panel_h - 2, PANEL_HI);

    draw_number(buf, cx, py + 6, session.score(), WHITE);
    draw_number(buf, cx, py + 14, session.best(), SIGN_YELLOW);

    buf.text_centered(py / 2, "GAME OVER", BAD);
    if session.score() > 0 && session.score() >= session.best() {
        buf.text_centered((py + panel_h) / 2 + 1, "NEW BEST!", GOOD);
    }
}

/// Deterministic noise in `0..1` for a seed (splitmix64 finalizer).
fn noise(seed: u64) -> f32 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f32 / (1u64 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_button_hit_test() {
        let button = start_button(80, 24);
        assert_eq!(button.row, 14);
        assert!(button.contains(button.col, button.row));
        assert!(button.contains(button.col + button.w - 1, button.row + button.h - 1));
        assert!(!button.contains(button.col + button.w, button.row));
        assert!(!button.contains(button.col, button.row - 1));
    }

    #[test]
    fn camera_keeps_rider_on_anchor() {
        let cam = Camera::new(100, 60, Vec2::ZERO);
        assert_eq!(cam.to_screen(Vec2::ZERO), Vec2::new(50.0, 60.0 * 0.62));
        let p = Vec2::new(350.0, -700.0);
        assert!((cam.to_world(cam.to_screen(p)) - p).length() < 1e-3);
    }

    #[test]
    fn fill_rect_clips_to_buffer() {
        let mut buf = PixelBuf::new(4, 4);
        buf.fill_rect(-10, -10, 12, 12, WHITE);
        assert_eq!(buf.get(1, 1), WHITE);
        assert_eq!(buf.get(2, 2), GRASS);
    }

    #[test]
    fn number_width_counts_digits() {
        assert_eq!(number_width(7), 3);
        assert_eq!(number_width(210), 11);
    }

    #[test]
    fn digits_cast_a_shadow() {
        let mut buf = PixelBuf::new(8, 8);
        draw_number(&mut buf, 1, 0, 1, WHITE);
        // "1" starts with its top pixel in the middle column.
        assert_eq!(buf.get(0, 0), GRASS);
        assert_eq!(buf.get(1, 0), WHITE);
        assert_eq!(buf.get(2, 1), SHADOW);
        assert_eq!(buf.get(3, 5), SHADOW);
        assert_eq!(buf.get(0, 1), WHITE);
    }

    #[test]
    fn noise_is_stable_and_in_range() {
        for seed in 0..1000 {
            let v = noise(seed);
            assert!((0.0..1.0).contains(&v));
            assert_eq!(v, noise(seed));
        }
        assert_ne!(noise(1), noise(2));
    }

    #[test]
    fn render_writes_half_blocks_and_labels() {
        let mut buf = PixelBuf::new(3, 2);
        buf.set(0, 0, WHITE);
        buf.text(1, 0, "X", WHITE);
        let mut out = Vec::new();
        buf.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains('\u{2580}'));
        assert!(text.contains('X'));
    }
}
