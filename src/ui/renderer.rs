/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. The room layer is a persistent cell cache. Each frame it is patched
///      with the `CellChange` list from `Frame::diff` and nothing else.
///   2. The next screen is built into `front`: HUD, room layer, message
///      and help lines, or a menu screen, plus any overlay.
///   3. Each cell of `front` is compared with `back` (what the terminal
///      shows) and only changed cells are emitted.
///   4. All commands are batched with `queue!` and flushed once.
///   5. Swap front/back.
///
/// The riddle modal draws straight over the last screen and blocks on
/// `read_key`; the next `render` repaints whatever it covered.

use std::io::{self, BufWriter, Write};
use std::time::Duration;

use crossterm::{
    cursor::{self, MoveTo},
    event::KeyCode,
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::glyph;
use crate::domain::riddle::{PromptReply, Riddle, RiddlePrompt};
use crate::sim::avatar::Avatar;
use crate::sim::frame::{CellChange, Frame};
use crate::sim::world::{Phase, WorldState};
use super::input;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every "empty" cell, also used for `Clear`,
    /// so the gaps between rows match the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from every real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }

    /// Room glyph with its palette colour.
    fn glyph(ch: char) -> Self {
        Cell::new(ch, glyph_color(ch), Cell::BASE_BG)
    }
}

fn glyph_color(ch: char) -> Color {
    match ch {
        glyph::WALL => Color::Rgb { r: 120, g: 120, b: 140 },
        glyph::BREAKABLE_WALL => Color::Rgb { r: 170, g: 110, b: 60 },
        glyph::SWITCH_WALL => Color::Rgb { r: 90, g: 90, b: 110 },
        glyph::SPRING => Color::Rgb { r: 80, g: 220, b: 120 },
        glyph::OBSTACLE => Color::Rgb { r: 255, g: 140, b: 40 },
        glyph::TORCH => Color::Rgb { r: 255, g: 230, b: 80 },
        glyph::BOMB => Color::Rgb { r: 255, g: 70, b: 70 },
        glyph::KEY => Color::Rgb { r: 255, g: 200, b: 50 },
        glyph::SWITCH_OFF | glyph::SWITCH_ON => Color::Rgb { r: 100, g: 200, b: 255 },
        glyph::RIDDLE => Color::Rgb { r: 220, g: 120, b: 255 },
        glyph::AVATAR_ONE => Color::Rgb { r: 120, g: 255, b: 120 },
        glyph::AVATAR_TWO => Color::Rgb { r: 120, g: 200, b: 255 },
        c if glyph::is_door(c) => Color::Rgb { r: 80, g: 140, b: 255 },
        _ => Color::White,
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

#[derive(Clone)]
struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn invalidate(&mut self) {
        self.cells.fill(Cell::INVALID);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for row in y..y + h {
            for col in x..x + w {
                self.set(col, row, Cell::new(' ', Color::White, bg));
            }
        }
    }
}

// ── Room layer ──

/// The room as last drawn, patched by per-tick diffs.
struct RoomLayer {
    frame: Option<Frame>,
    cells: FrameBuffer,
}

impl RoomLayer {
    fn new() -> Self {
        RoomLayer { frame: None, cells: FrameBuffer::new(0, 0) }
    }

    fn reset(&mut self) {
        self.frame = None;
    }

    /// Apply this tick's frame. Returns how many cells changed.
    fn update(&mut self, next: Frame) -> usize {
        let changes = next.diff(self.frame.as_ref());
        self.cells.resize(next.width(), next.height());
        self.apply(&changes);
        self.frame = Some(next);
        changes.len()
    }

    fn apply(&mut self, changes: &[CellChange]) {
        for c in changes {
            self.cells.set(c.x as usize, c.y as usize, Cell::glyph(c.glyph));
        }
    }
}

// ── Renderer ──

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const MODAL_BG: Color = Color::Rgb { r: 40, g: 30, b: 60 };
const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GOOD: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const BAD: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const KEY_C: Color = Color::Rgb { r: 100, g: 200, b: 255 };

const FEEDBACK_PAUSE: Duration = Duration::from_millis(700);

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    room: RoomLayer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    last_room: Option<usize>,
    /// Help line, built from the configured keys.
    help: String,
}

impl Renderer {
    pub fn new(help: String) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            room: RoomLayer::new(),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            last_room: None,
            help,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.invalidate();
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.invalidate();
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clean slate
        if self.last_phase != Some(world.phase) {
            self.back.invalidate();
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }
        // New game or new room → the room layer starts over
        if self.last_room != Some(world.current) || world.tick == 0 {
            self.room.reset();
            self.last_room = Some(world.current);
        }

        self.front.clear();
        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Instructions => self.compose_instructions(),
            Phase::Playing => self.compose_game(world),
            Phase::Paused => {
                self.compose_game(world);
                self.compose_pause_overlay();
            }
            Phase::GameOver => self.compose_game_over(world),
            Phase::Victory => self.compose_victory(world),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours; ResetColor would fall back to the
        // terminal default and leave line artifacts.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: game screen ──

    fn compose_game(&mut self, w: &WorldState) {
        let changed = self.room.update(Frame::compose(w));
        if changed > 0 {
            log::trace!("tick {}: {} room cells changed", w.tick, changed);
        }

        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud_text(w), Color::White, HUD_BG);

        let layer = &self.room.cells;
        for y in 0..layer.height {
            for x in 0..layer.width {
                self.front.set(x, MAP_ROW + y, layer.get(x, y));
            }
        }

        let msg_row = MAP_ROW + layer.height + 1;
        if !w.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" {} ", w.message), Color::Black, MSG_BG);
        }
        let help = self.help.clone();
        self.front.put_str(0, msg_row + 2, &help, Color::DarkGrey, Color::Reset);
    }

    fn compose_pause_overlay(&mut self) {
        let (box_w, box_h) = (32, 8);
        let box_x = self.room.cells.width.max(box_w).saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + self.room.cells.height.max(box_h).saturating_sub(box_h) / 2;
        self.front.fill_rect(box_x, box_y, box_w, box_h, MODAL_BG);

        self.front.put_str(box_x + 7, box_y + 1, "╔════════════════╗", ACCENT, MODAL_BG);
        self.front.put_str(box_x + 7, box_y + 2, "║     PAUSED     ║", ACCENT, MODAL_BG);
        self.front.put_str(box_x + 7, box_y + 3, "╚════════════════╝", ACCENT, MODAL_BG);
        self.front.put_str(box_x + 4, box_y + 5, "ESC  Resume", KEY_C, MODAL_BG);
        self.front.put_str(box_x + 4, box_y + 6, "H    Back to Title", KEY_C, MODAL_BG);
    }

    // ── Compose: menu screens ──

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r" _____                   _               ",
            r"|_   _|__ _  _ __    __| |  ___  _ __ ___  ",
            r"  | | / _` || '_ \  / _` | / _ \| '_ ` _ \ ",
            r"  | || (_| || | | || (_| ||  __/| | | | | |",
            r"  |_| \__,_||_| |_| \__,_| \___||_| |_| |_|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(4, 2 + i, line, ACCENT, Color::Reset);
        }
        self.front.put_str(10, 8, "Two explorers. One way out.", GOOD, Color::Reset);

        let menu_base = 11;
        self.front.put_str(8, menu_base, "1   Start", GOOD, Color::Reset);
        self.front.put_str(8, menu_base + 1, "8   Instructions", Color::White, Color::Reset);
        self.front.put_str(8, menu_base + 2, "9   Quit", Color::White, Color::Reset);

        let rooms = format!("{} rooms", w.rooms.len());
        self.front.put_str(8, menu_base + 4, &rooms, Color::DarkGrey, Color::Reset);

        if !w.message.is_empty() {
            let row = self.front.height.saturating_sub(1);
            self.front.fill_row(row, MSG_BG);
            self.front.put_str(0, row, &format!(" {} ", w.message), Color::Black, MSG_BG);
        }
    }

    fn compose_instructions(&mut self) {
        let lines = [
            ("How to play", ACCENT),
            ("", Color::White),
            ("Guide both explorers through every room. Walk into a door", Color::White),
            ("together to pass through it. Forward doors may need keys or", Color::White),
            ("a solved switch puzzle; keys are shared between you.", Color::White),
            ("", Color::White),
            ("Explorers keep walking until told to stay or blocked.", Color::White),
            ("Each carries one item: K key, ! torch, @ bomb.", Color::White),
            ("Dropped bombs explode after a short fuse. Keep clear,", Color::White),
            ("and keep keys away from the blast.", Color::White),
            ("Push into a # spring to compress it, then let go to fly.", Color::White),
            ("Dark areas are only visible around a torch bearer.", Color::White),
            ("Answer ? riddles with 1-4. Wrong answers cost a life.", Color::White),
            ("", Color::White),
            ("Any key: back", Color::DarkGrey),
        ];
        for (i, (text, color)) in lines.iter().enumerate() {
            self.front.put_str(4, 2 + i, text, *color, Color::Reset);
        }
        let help = self.help.clone();
        self.front.put_str(4, 3 + lines.len(), &help, KEY_C, Color::Reset);
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let art = [
            "╔══════════════════════════════╗",
            "║          GAME  OVER          ║",
            "╚══════════════════════════════╝",
        ];
        for (i, l) in art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, BAD, Color::Reset);
        }
        self.front.put_str(8, 9, &w.message, Color::White, Color::Reset);
        self.front.put_str(8, 10, &format!("Reached: {}", w.room().name), Color::White, Color::Reset);
        self.front.put_str(8, 12, "1    Play again", GOOD, Color::Reset);
        self.front.put_str(8, 13, "ESC  Back to Title", Color::DarkGrey, Color::Reset);
    }

    fn compose_victory(&mut self, w: &WorldState) {
        let art = [
            "╔══════════════════════════════╗",
            "║     YOU  MADE  IT  OUT!      ║",
            "╚══════════════════════════════╝",
        ];
        for (i, l) in art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, ACCENT, Color::Reset);
        }
        let ticks = format!("Escaped in {} ticks", w.tick);
        self.front.put_str(8, 9, &ticks, GOOD, Color::Reset);
        self.front.put_str(8, 11, "1    Play again", GOOD, Color::Reset);
        self.front.put_str(8, 12, "ESC  Back to Title", Color::DarkGrey, Color::Reset);
    }

    // ── Riddle modal ──

    /// Draw the modal over what is on screen now and flush it.
    fn show_modal(&mut self, lines: &[(String, Color)]) -> io::Result<()> {
        self.front.cells.clone_from(&self.back.cells);
        let inner = lines.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
        let box_w = (inner + 6).min(self.front.width);
        let box_h = lines.len() + 2;
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + 2;
        self.front.fill_rect(box_x, box_y, box_w, box_h, MODAL_BG);
        for (i, (text, color)) in lines.iter().enumerate() {
            self.front.put_str(box_x + 3, box_y + 1 + i, text, *color, MODAL_BG);
        }
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn ask_riddle(&mut self, riddle: &Riddle) -> io::Result<PromptReply> {
        let mut lines = vec![
            ("RIDDLE".to_string(), ACCENT),
            (String::new(), Color::White),
            (riddle.question.clone(), Color::White),
            (String::new(), Color::White),
        ];
        for (i, opt) in riddle.options.iter().enumerate() {
            lines.push((format!("{}) {}", i + 1, opt), KEY_C));
        }
        lines.push((String::new(), Color::White));
        lines.push(("1-4 answer   ESC leave".to_string(), Color::DarkGrey));
        self.show_modal(&lines)?;

        loop {
            match input::read_key()? {
                KeyCode::Esc => return Ok(PromptReply::Escape),
                KeyCode::Char(c) => {
                    if let Some(n) = c.to_digit(10).filter(|n| (1..=4).contains(n)) {
                        return Ok(PromptReply::Answer(n as usize - 1));
                    }
                }
                _ => {}
            }
        }
    }

    fn notice(&mut self, text: &str, color: Color) {
        if let Err(e) = self.show_modal(&[(text.to_string(), color)]) {
            log::warn!("riddle modal draw failed: {e}");
        }
        std::thread::sleep(FEEDBACK_PAUSE);
    }
}

/// `RiddlePrompt` backed by the terminal.
pub struct TerminalPrompt<'a> {
    renderer: &'a mut Renderer,
}

impl<'a> TerminalPrompt<'a> {
    pub fn new(renderer: &'a mut Renderer) -> Self {
        TerminalPrompt { renderer }
    }
}

impl RiddlePrompt for TerminalPrompt<'_> {
    fn ask(&mut self, riddle: &Riddle) -> PromptReply {
        match self.renderer.ask_riddle(riddle) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("riddle prompt failed: {e}");
                PromptReply::Escape
            }
        }
    }

    fn report_missing(&mut self, riddle_id: u32) {
        self.renderer.notice(&format!("Riddle {} could not be found.", riddle_id), BAD);
    }

    fn feedback(&mut self, correct: bool) {
        if correct {
            self.renderer.notice("Correct! The way is clear.", GOOD);
        } else {
            self.renderer.notice("Wrong! You lose a life.", BAD);
        }
    }
}

// ── HUD ──

fn avatar_status(label: &str, a: &Avatar) -> String {
    let item = a.slot.map(|i| i.glyph()).unwrap_or(' ');
    let state = if a.alive { "" } else { " (lost)" };
    format!("{} {}  keys:{}  [{}]  ♥{}{}", label, a.glyph, a.key_count, item, a.lives, state)
}

fn hud_text(w: &WorldState) -> String {
    format!(
        " {:<16} │ {} │ {} ",
        w.room().name,
        avatar_status("P1", &w.avatars[0]),
        avatar_status("P2", &w.avatars[1]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::domain::entity::Item;
    use crate::domain::riddle::RiddleBank;
    use crate::sim::level::LevelPack;

    fn world() -> WorldState {
        let pack = LevelPack::builtin().expect("built-in pack");
        WorldState::new(&pack, RiddleBank::builtin(), RulesConfig::default())
    }

    #[test]
    fn hud_shows_both_avatars() {
        let mut w = world();
        w.avatars[0].slot = Some(Item::Key);
        w.avatars[0].key_count = 1;
        let hud = hud_text(&w);
        assert!(hud.contains("The Workshop"));
        assert!(hud.contains("P1 $  keys:1  [K]  ♥3"));
        assert!(hud.contains("P2 &  keys:0  [ ]  ♥3"));
    }

    #[test]
    fn room_layer_applies_only_diffs() {
        let mut w = world();
        let mut layer = RoomLayer::new();
        let first = layer.update(Frame::compose(&w));
        assert_eq!(first, 79 * 21);
        assert_eq!(layer.cells.get(3, 5).ch, '$');

        w.avatars[0].pos = w.avatars[0].pos.offset(1, 0);
        assert_eq!(layer.update(Frame::compose(&w)), 2);
        assert_eq!(layer.cells.get(3, 5).ch, ' ');
        assert_eq!(layer.cells.get(4, 5).ch, '$');
    }

    #[test]
    fn palette_distinguishes_doors() {
        assert_eq!(glyph_color('3'), glyph_color('0'));
        assert_ne!(glyph_color('W'), glyph_color('3'));
        assert_eq!(Cell::new('x', Color::White, Color::Reset).bg, Cell::BASE_BG);
    }
}
