/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The renderer only reads the world. Entities are placed through their
/// pixel positions and the map's tile size, and drawn from the sprite
/// selection each entity reports.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Dir, Sprite, SpriteSheet, Vec2};
use crate::domain::grid::TileGrid;
use crate::domain::tile::Tile;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the gap
    /// between rows matches the cells on VTE-based terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

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

    /// Write a string at (x, y). Each char occupies 1 column; overflow is clipped.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

/// Each game cell is 2 terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// Rows below the map: gap, message, gap, help.
const FOOTER_ROWS: usize = 4;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GOOD: Color = Color::Rgb { r: 80, g: 255, b: 80 };

/// Where the map lands on screen, centred in the terminal.
#[derive(Clone, Copy, Debug)]
struct Viewport {
    x0: usize,
    y0: usize,
    cols: usize,
    rows: usize,
}

impl Viewport {
    fn centered(map_w: usize, map_h: usize, term_w: usize, term_h: usize) -> Self {
        let avail_cols = term_w / CELL_W;
        let avail_rows = term_h.saturating_sub(MAP_ROW + FOOTER_ROWS).max(1);
        let cols = map_w.min(avail_cols);
        let rows = map_h.min(avail_rows);
        Viewport {
            x0: (term_w.saturating_sub(cols * CELL_W)) / 2,
            y0: MAP_ROW + (avail_rows - rows) / 2,
            cols,
            rows,
        }
    }

    /// Screen column/row for map cell (gx, gy), if visible.
    fn cell_at(&self, gx: i32, gy: i32) -> Option<(usize, usize)> {
        if gx < 0 || gy < 0 || gx as usize >= self.cols || gy as usize >= self.rows {
            return None;
        }
        Some((self.x0 + gx as usize * CELL_W, self.y0 + gy as usize))
    }

    /// Screen column/row for a world position, via its pixel coordinates.
    fn entity_at(&self, pos: Vec2, tile_px: u32) -> Option<(usize, usize)> {
        let (px, py) = pos.to_pixels(tile_px);
        let tile = tile_px.max(1) as f32;
        self.cell_at((px / tile).round() as i32, (py / tile).round() as i32)
    }
}

// ── Glyphs ──

fn tile_glyph(tile: Tile) -> ([char; 2], Color) {
    match tile {
        Tile::Wall => (['█', '█'], Color::Rgb { r: 90, g: 90, b: 110 }),
        Tile::Rock => (['▓', '▓'], Color::Rgb { r: 150, g: 150, b: 150 }),
        Tile::Wood => (['▒', '▒'], Color::Rgb { r: 170, g: 110, b: 50 }),
        Tile::Ground => (['░', '░'], Color::Rgb { r: 120, g: 100, b: 60 }),
    }
}

/// Two-column glyph and colour for a sprite frame.
fn sprite_glyph(sprite: Sprite) -> ([char; 2], Color) {
    let odd = sprite.frame % 2 == 1;
    match sprite.sheet {
        SpriteSheet::PlayerIdle => (['☻', ' '], Color::Rgb { r: 255, g: 230, b: 80 }),
        SpriteSheet::PlayerWalk(dir) => {
            let pair = match dir {
                Dir::Left => ['◂', '☻'],
                Dir::Right => ['☻', '▸'],
                Dir::Up => ['☻', '▴'],
                Dir::Down => ['☻', '▾'],
            };
            (pair, Color::Rgb { r: 255, g: 230, b: 80 })
        }
        SpriteSheet::PlayerDeath => {
            let fade = 255u8.saturating_sub((sprite.frame as u8).saturating_mul(50));
            (['✕', '✕'], Color::Rgb { r: fade, g: 40, b: 40 })
        }
        SpriteSheet::EnemyWalk(_) => {
            let pair = if odd { ['}', '{'] } else { ['{', '}'] };
            (pair, Color::Rgb { r: 230, g: 80, b: 230 })
        }
        SpriteSheet::EnemyDeath => (['x', 'x'], Color::Rgb { r: 120, g: 40, b: 120 }),
        SpriteSheet::Bomb => {
            let fuse = if odd { Color::Rgb { r: 255, g: 220, b: 60 } } else { Color::Rgb { r: 255, g: 60, b: 40 } };
            (['●', '*'], fuse)
        }
        SpriteSheet::Explosion => {
            let g = 200u8.saturating_sub((sprite.frame as u8).saturating_mul(40));
            (['✶', '✶'], Color::Rgb { r: 255, g, b: 40 })
        }
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns true when the
    /// terminal will report key Release events.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back differs from front everywhere
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized {
            self.resize(tw as usize, th as usize);
        }
        if resized || self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, world: &WorldState) {
        self.front.clear();
        match world.phase {
            Phase::MainMenu => self.compose_menu(world),
            Phase::Playing => {
                self.compose_game(world);
                if world.paused {
                    self.compose_pause_overlay();
                }
            }
            Phase::GameOver => {
                self.compose_game(world);
                self.compose_banner(world, "GAME  OVER", Color::Rgb { r: 255, g: 60, b: 60 });
            }
            Phase::Win => self.compose_banner(world, "ALL  MAZES  CLEARED", ACCENT),
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours; ResetColor would fall back to the terminal's own default
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

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

    // ── Compose: build front buffer content ──

    fn put_pair(&mut self, at: (usize, usize), glyph: [char; 2], fg: Color, bg: Color) {
        self.front.set(at.0, at.1, Cell::new(glyph[0], fg, bg));
        self.front.set(at.0 + 1, at.1, Cell::new(glyph[1], fg, bg));
    }

    fn compose_game(&mut self, w: &WorldState) {
        let map = &w.map;
        let tile_px = map.terrain.tile_size();
        let view = Viewport::centered(map.width(), map.height(), self.term_w, self.term_h);

        // ── HUD row ──
        let bomb = if w.player.can_place_bomb() {
            "READY".to_string()
        } else {
            format!("{:.1}s", w.player.bomb_cooldown)
        };
        let hud = format!(
            " {}  [{}/{}]  ♥×{}  Enemies:{}  Kills:{}  Bomb:{} ",
            w.level_name,
            w.current_level + 1,
            w.total_levels(),
            w.player.lives,
            w.active_enemies(),
            w.kills,
            bomb,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Tiles ──
        for gy in 0..view.rows as i32 {
            for gx in 0..view.cols as i32 {
                let Some(at) = view.cell_at(gx, gy) else { continue };
                if let Some(tile) = map.terrain.tile(gx, gy) {
                    let (glyph, fg) = tile_glyph(tile);
                    self.put_pair(at, glyph, fg, Color::Reset);
                } else if w.exit == Some((gx, gy)) {
                    self.put_pair(at, ['[', ']'], GOOD, Color::Reset);
                }
            }
        }

        // ── Bombs and flames ──
        for b in &w.bombs {
            let Some(sprite) = b.sprite() else { continue };
            let (glyph, fg) = sprite_glyph(sprite);
            if b.is_exploding() {
                for &(cx, cy) in &b.blast_cells {
                    if let Some(at) = view.cell_at(cx, cy) {
                        self.put_pair(at, glyph, fg, Color::Rgb { r: 90, g: 30, b: 10 });
                    }
                }
            } else if let Some(at) = view.entity_at(b.position(), tile_px) {
                self.put_pair(at, glyph, fg, Color::Reset);
            }
        }

        // ── Enemies ──
        for e in w.enemies.iter().filter(|e| !e.is_dead()) {
            if let Some(at) = view.entity_at(e.position, tile_px) {
                let (glyph, fg) = sprite_glyph(e.sprite());
                self.put_pair(at, glyph, fg, Color::Reset);
            }
        }

        // ── Player (blinks during respawn grace) ──
        let blink_off = w.player.grace > 0.0 && (w.player.grace * 8.0) as i32 % 2 == 1;
        if !blink_off {
            if let Some(at) = view.entity_at(w.player.position, tile_px) {
                let (glyph, fg) = sprite_glyph(w.player.sprite(&w.player_cfg));
                self.put_pair(at, glyph, fg, Color::Reset);
            }
        }

        // ── Message bar ──
        let msg_row = view.y0 + view.rows + 1;
        if !w.message.is_empty() && msg_row < self.front.height {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }

        let help_row = view.y0 + view.rows + 3;
        if help_row < self.front.height {
            let help = " ←→↑↓/WASD:Move  Space/X:Bomb  F1/P:Pause  Esc:Menu  │  Pad: A/B Bomb  Y Pause";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_menu(&mut self, w: &WorldState) {
        let title = [
            r" ___  _            _     __  __             ",
            r"| _ )| | __ _  ___| |_  |  \/  | __ _  ___ ___ ",
            r"| _ \| |/ _` |(_-<|  _| | |\/| |/ _` ||_ // -_)",
            r"|___/|_|\__,_|/__/ \__| |_|  |_|\__,_|/__|\___|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_centered(2 + i, line, ACCENT, Color::Reset);
        }

        let levels = format!("{} mazes loaded", w.total_levels());
        self.front.put_centered(8, &levels, Color::DarkGrey, Color::Reset);

        self.front.put_centered(11, "ENTER   Start", GOOD, Color::Reset);
        self.front.put_centered(12, "Q/ESC   Quit ", Color::White, Color::Reset);

        let help = [
            "Controls",
            "←→↑↓ / WASD    Move one cell",
            "Space / X      Drop a bomb ",
            "F1 / P         Pause       ",
            "Esc            Back to menu",
        ];
        for (i, line) in help.iter().enumerate() {
            let fg = if i == 0 { ACCENT } else { Color::White };
            self.front.put_centered(15 + i, line, fg, Color::Reset);
        }
    }

    fn compose_banner(&mut self, w: &WorldState, headline: &str, fg: Color) {
        let inner = headline.chars().count() + 8;
        let top = format!("╔{}╗", "═".repeat(inner));
        let mid = format!("║    {headline}    ║");
        let bot = format!("╚{}╝", "═".repeat(inner));
        let y = self.front.height.saturating_sub(10) / 2;
        let bg = Color::Rgb { r: 30, g: 30, b: 40 };
        for (i, line) in [top, mid, bot].iter().enumerate() {
            self.front.put_centered(y + i, line, fg, bg);
        }

        let stats = format!("Kills: {}   Reached maze {} of {}", w.kills, w.current_level + 1, w.total_levels());
        self.front.put_centered(y + 4, &stats, Color::White, bg);
        self.front.put_centered(y + 6, "▸ ENTER: Play again ", GOOD, bg);
        self.front.put_centered(y + 7, "▸ ESC:   Back to menu", Color::DarkGrey, bg);
    }

    fn compose_pause_overlay(&mut self) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let box_w = 28_usize.min(self.front.width);
        let box_h = 7_usize.min(self.front.height);
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = self.front.height.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, dim));
            }
        }
        self.front.put_centered(box_y + 1, "▶  PAUSED  ◀", ACCENT, dim);
        self.front.put_centered(box_y + 3, "F1/P  Resume      ", Color::Rgb { r: 100, g: 200, b: 255 }, dim);
        self.front.put_centered(box_y + 4, "Esc   Back to menu", Color::Rgb { r: 100, g: 200, b: 255 }, dim);
    }
}
