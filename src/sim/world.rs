/// WorldState: the complete snapshot of a running game.
///
/// ## Ownership
///
/// The world exclusively owns the map layers, the player and the enemy
/// and bomb collections. Only `sim::step` mutates the collections, and
/// only bomb detonation mutates the map. Tuning values are copied in
/// from `GameConfig` once, at construction.
///
/// ## Session phases
///
/// ```text
///   MainMenu ── start ──► Playing ── lives exhausted ──► GameOver
///                           │  ▲                           │
///                           │  └──────── retry ────────────┤
///                           └─ last level cleared / exit ─► Win ── retry / menu
/// ```

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{BombConfig, EnemyConfig, GameConfig, PlayerConfig};
use crate::domain::bomb::Bomb;
use crate::domain::enemy::Enemy;
use crate::domain::entity::Vec2;
use crate::domain::grid::{MapLayers, TileLayer};
use crate::domain::player::Player;
use super::level::LevelDef;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    MainMenu,
    Playing,
    GameOver,
    Win,
}

pub struct WorldState {
    // ── Map ──
    pub map: MapLayers,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub bombs: Vec<Bomb>,

    // ── Tuning ──
    pub bomb_cfg: BombConfig,
    pub enemy_cfg: EnemyConfig,
    pub player_cfg: PlayerConfig,

    // ── Levels ──
    pub levels: Vec<LevelDef>,
    pub current_level: usize,
    pub level_name: String,
    pub player_spawn: (i32, i32),
    pub exit: Option<(i32, i32)>,
    /// Enemies the current level started with.
    pub enemies_at_start: usize,

    // ── Meta ──
    pub phase: Phase,
    pub paused: bool,
    pub tick: u64,
    pub kills: u32,
    pub rng: StdRng,

    // ── UI ──
    pub message: String,
    pub message_timer: f32,
}

// ── Construction ──

impl WorldState {
    /// Empty world sitting in the main menu. `levels` must be non-empty
    /// before a game is started.
    pub fn new(config: &GameConfig, levels: Vec<LevelDef>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        WorldState {
            map: MapLayers::new(TileLayer::new(0, 0), None),
            player: Player::new((0, 0), &config.player),
            enemies: vec![],
            bombs: vec![],
            bomb_cfg: config.bomb.clone(),
            enemy_cfg: config.enemy.clone(),
            player_cfg: config.player.clone(),
            levels,
            current_level: 0,
            level_name: String::new(),
            player_spawn: (0, 0),
            exit: None,
            enemies_at_start: 0,
            phase: Phase::MainMenu,
            paused: false,
            tick: 0,
            kills: 0,
            rng,
            message: String::new(),
            message_timer: 0.0,
        }
    }

    pub fn set_message(&mut self, msg: &str, seconds: f32) {
        self.message = msg.to_string();
        self.message_timer = seconds;
    }

    pub fn toggle_pause(&mut self) {
        if self.phase == Phase::Playing {
            self.paused = !self.paused;
        }
    }

    /// Leave the current session for the main menu.
    pub fn return_to_menu(&mut self) {
        self.phase = Phase::MainMenu;
        self.paused = false;
        self.message.clear();
        self.message_timer = 0.0;
    }

    /// Positions of bombs that have not exploded yet.
    pub fn armed_bomb_positions(&self) -> Vec<Vec2> {
        self.bombs.iter().filter(|b| b.is_armed()).map(|b| b.position()).collect()
    }

    /// Enemies that are neither dying nor dead.
    pub fn active_enemies(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_active()).count()
    }

    pub fn total_levels(&self) -> usize {
        self.levels.len()
    }
}
