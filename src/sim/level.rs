/// Level catalog and loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by file name)
///   2. Built-in embedded levels ("First Map", "Second Map")
///
/// ## Single-level format (`.txt`):
///   Line 1: `# Level Name`
///   Lines: map rows (short rows are padded with empty cells)
///
/// ## Tile legend:
///   '#' = Wall (stops blasts)     ':' = Ground (destructible)
///   'o' = Rock (destructible)     '=' = Wood (destructible)
///   '1' '2' '3' '7' = legacy tile ids (wall, ground, rock, wood)
///   'P' = Player spawn (exactly one)
///   'E' = Enemy spawn             'X' = Exit cell
///   ' ' / '.' = Empty
///
/// Every tile goes into both the terrain and the collision layer.
/// The whole catalog is parsed and validated once, at startup.

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::domain::enemy::Enemy;
use crate::domain::grid::{MapLayers, TileLayer};
use crate::domain::player::Player;
use crate::domain::tile::Tile;
use crate::sim::world::{Phase, WorldState};

/// Parsed level text (owned, validated).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

/// Everything a level places on the board.
struct Layout {
    map: MapLayers,
    spawn: (i32, i32),
    enemies: Vec<(i32, i32)>,
    exit: Option<(i32, i32)>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Start a fresh game at the first level with full lives.
pub fn start_new_game(world: &mut WorldState) {
    world.player = Player::new((0, 0), &world.player_cfg);
    world.kills = 0;
    world.paused = false;
    load_level(world, 0);
    info!(levels = world.total_levels(), "new game");
}

/// Load a level into the world state. Lives carry over.
/// Past the last level the session is won.
pub fn load_level(world: &mut WorldState, level_idx: usize) {
    let Some(def) = world.levels.get(level_idx) else {
        world.phase = Phase::Win;
        return;
    };
    let layout = def.layout();
    let name = def.name.clone();

    world.current_level = level_idx;
    world.level_name = name.clone();
    world.map = layout.map;
    world.player_spawn = layout.spawn;
    world.exit = layout.exit;

    let lives = world.player.lives;
    world.player = Player::new(layout.spawn, &world.player_cfg);
    world.player.lives = lives;

    world.enemies = layout.enemies
        .iter()
        .enumerate()
        .map(|(id, &cell)| Enemy::new(id, cell, &world.enemy_cfg))
        .collect();
    world.enemies_at_start = world.enemies.len();
    world.bombs.clear();
    world.tick = 0;
    world.phase = Phase::Playing;

    debug!(
        level = level_idx,
        enemies = world.enemies.len(),
        walls = world.map.terrain.count(Tile::Wall),
        "level loaded"
    );
    world.set_message(&name, 2.0);
}

/// Build the level catalog: `.txt` files from the levels directory, or
/// the embedded maps when there are none. Any invalid level is an error.
pub fn load_catalog(config: &GameConfig) -> Result<Vec<LevelDef>> {
    let from_dir = load_from_directory(&config.levels_dir)?;
    if !from_dir.is_empty() {
        info!(count = from_dir.len(), dir = %config.levels_dir.display(), "levels loaded from directory");
        return Ok(from_dir);
    }
    embedded_levels()
}

// ══════════════════════════════════════════════════════════════
// Single-level parsing
// ══════════════════════════════════════════════════════════════

/// Parse and validate a single level from text content.
pub fn parse_level(content: &str) -> Result<LevelDef> {
    let mut name = String::new();
    let mut rows: Vec<String> = vec![];

    for line in content.lines() {
        if name.is_empty() && rows.is_empty() && line.starts_with('#') && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else {
            rows.push(line.trim_end_matches('\r').to_string());
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }
    ensure!(!rows.is_empty(), "level has no map rows");

    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let len = row.chars().count();
        if len < max_width {
            row.extend(std::iter::repeat(' ').take(max_width - len));
        }
    }

    let mut spawns = 0;
    let mut goals = 0;
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            match ch {
                'P' => spawns += 1,
                'E' | 'X' => goals += 1,
                ' ' | '.' => {}
                c if tile_for(c).is_some() => {}
                c => bail!("unknown glyph {c:?} at ({x}, {y})"),
            }
        }
    }
    ensure!(spawns == 1, "level needs exactly one player spawn 'P', found {spawns}");
    ensure!(goals > 0, "level needs an enemy 'E' or an exit 'X' to be winnable");

    if name.is_empty() {
        name = "Unnamed Maze".to_string();
    }
    Ok(LevelDef { name, rows })
}

/// Distinguish `# Level Name` from `####################` (map data).
/// A name line starts with `#` and contains at least one letter.
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| c.is_alphabetic())
}

fn tile_for(c: char) -> Option<Tile> {
    Tile::from_glyph(c).or_else(|| c.to_digit(10).and_then(Tile::from_id))
}

impl LevelDef {
    fn layout(&self) -> Layout {
        let height = self.rows.len();
        let width = self.rows.first().map_or(0, |r| r.chars().count());
        let mut terrain = TileLayer::new(width, height);
        let mut collision = TileLayer::new(width, height);
        let mut spawn = (0, 0);
        let mut enemies = vec![];
        let mut exit = None;

        for (y, row) in self.rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let (x, y) = (x as i32, y as i32);
                match ch {
                    'P' => spawn = (x, y),
                    'E' => enemies.push((x, y)),
                    'X' => exit = Some((x, y)),
                    c => {
                        let tile = tile_for(c);
                        terrain.set_tile(x, y, tile);
                        collision.set_tile(x, y, tile);
                    }
                }
            }
        }

        Layout { map: MapLayers::new(terrain, Some(collision)), spawn, enemies, exit }
    }
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Result<Vec<LevelDef>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "no levels directory");
            return Ok(vec![]);
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort();

    let mut levels = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading level {}", path.display()))?;
        let def = parse_level(&content)
            .with_context(|| format!("invalid level {}", path.display()))?;
        levels.push(def);
    }
    if levels.is_empty() {
        warn!(dir = %dir.display(), "levels directory has no .txt files, using built-in maps");
    }
    Ok(levels)
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

fn embedded_levels() -> Result<Vec<LevelDef>> {
    [FIRST_MAP, SECOND_MAP]
        .iter()
        .map(|text| parse_level(text).context("invalid built-in level"))
        .collect()
}

const FIRST_MAP: &str = "\
# First Map
####################
#    :   =   :     #
# ##:# # # # #:## ##
#   :  o   o  :    #
# # #### # #### # ##
#     :  E  :      #
# ##:# ##### #:## ##
#   o          o   #
#:# # ###=### # #:##
#   :    :    :    #
# ## ## #:# ## ##  #
#  o           o   #
# #:# ##:=:## #:# ##
#    :   o   :     #
# ## # #:#:# # ## ##
#   =          =   #
# #:# ## :: ## #:#=#
#:   :        :  :X#
#P   E  :  o  :   o#
####################
";

const SECOND_MAP: &str = "\
# Second Map
####################
#  o   :  =   :    #
# # #=# # # #=# # ##
#  :    o  :    o  #
## # ## # # ## # # #
#  =     E   =     #
# #:### # # ###:# ##
#      :   :       #
# ## #o# # #o# ##  #
#  :           :   #
## # #:##:##:# # # #
#   o    =    o    #
# # # ### ### # # ##
#  :   :   :   :   #
# ##o## # # ##o## ##
#   :    =    :    #
# # # ## :: ## # #=#
#  o   :    :   o:X#
#P   E   :   =    o#
####################
";
