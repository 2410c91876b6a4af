/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing or incomplete.
/// All distances are in tiles, all durations in seconds.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub bomb: BombConfig,
    pub enemy: EnemyConfig,
    pub player: PlayerConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    /// Fixed RNG seed for reproducible enemy behaviour.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
}

#[derive(Clone, Debug)]
pub struct BombConfig {
    pub arm_time: f32,
    pub explosion_duration: f32,
    pub blast_radius: u32,
    pub hurts_player: bool,
}

#[derive(Clone, Debug)]
pub struct EnemyConfig {
    /// Patrol speed, tiles per second.
    pub speed: f32,
    pub chase_multiplier: f32,
    pub boost_multiplier: f32,
    pub flee_multiplier: f32,
    pub radius: f32,
    pub sight_range: f32,
    /// Half-width of the vision cone in degrees.
    pub sight_half_angle: f32,
    pub boost_range: f32,
    /// Armed bombs closer than this (in cells, same row/column) are fled.
    pub flee_radius: u32,
    pub dodge_duration: f32,
    pub dying_duration: f32,
}

#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub lives: u32,
    pub radius: f32,
    pub movement_cooldown: f32,
    pub bomb_cooldown: f32,
    pub dying_duration: f32,
    pub respawn_grace: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub bomb: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub pause: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    bomb: TomlBomb,
    #[serde(default)]
    enemy: TomlEnemy,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlBomb {
    #[serde(default = "default_arm_time")]
    arm_time: f32,
    #[serde(default = "default_explosion_duration")]
    explosion_duration: f32,
    #[serde(default = "default_blast_radius")]
    blast_radius: u32,
    #[serde(default)]
    hurts_player: bool,
}

#[derive(Deserialize, Debug)]
struct TomlEnemy {
    #[serde(default = "default_enemy_speed")]
    speed: f32,
    #[serde(default = "default_chase")]
    chase_multiplier: f32,
    #[serde(default = "default_boost")]
    boost_multiplier: f32,
    #[serde(default = "default_flee")]
    flee_multiplier: f32,
    #[serde(default = "default_radius")]
    radius: f32,
    #[serde(default = "default_sight_range")]
    sight_range: f32,
    #[serde(default = "default_sight_half_angle")]
    sight_half_angle: f32,
    #[serde(default = "default_boost_range")]
    boost_range: f32,
    #[serde(default = "default_flee_radius")]
    flee_radius: u32,
    #[serde(default = "default_dodge")]
    dodge_duration: f32,
    #[serde(default = "default_enemy_dying")]
    dying_duration: f32,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_lives")]
    lives: u32,
    #[serde(default = "default_radius")]
    radius: f32,
    #[serde(default = "default_movement_cooldown")]
    movement_cooldown: f32,
    #[serde(default = "default_bomb_cooldown")]
    bomb_cooldown: f32,
    #[serde(default = "default_player_dying")]
    dying_duration: f32,
    #[serde(default = "default_respawn_grace")]
    respawn_grace: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_bomb")]
    bomb: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 33 }

fn default_arm_time() -> f32 { 2.0 }
fn default_explosion_duration() -> f32 { 0.5 }
fn default_blast_radius() -> u32 { 2 }

fn default_enemy_speed() -> f32 { 1.5 }   // ~50 px/s at 32 px tiles
fn default_chase() -> f32 { 3.0 }
fn default_boost() -> f32 { 5.0 }
fn default_flee() -> f32 { 2.0 }
fn default_radius() -> f32 { 0.4 }
fn default_sight_range() -> f32 { 8.0 }
fn default_sight_half_angle() -> f32 { 10.0 }
fn default_boost_range() -> f32 { 3.0 }
fn default_flee_radius() -> u32 { 3 }
fn default_dodge() -> f32 { 0.6 }
fn default_enemy_dying() -> f32 { 2.5 }   // 5 frames × 0.5s

fn default_lives() -> u32 { 3 }
fn default_movement_cooldown() -> f32 { 0.3 }
fn default_bomb_cooldown() -> f32 { 1.0 }
fn default_player_dying() -> f32 { 1.0 }
fn default_respawn_grace() -> f32 { 1.5 }

fn default_pad_bomb() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_pause() -> Vec<String> { vec!["Y".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlBomb {
    fn default() -> Self {
        TomlBomb {
            arm_time: default_arm_time(),
            explosion_duration: default_explosion_duration(),
            blast_radius: default_blast_radius(),
            hurts_player: false,
        }
    }
}

impl Default for TomlEnemy {
    fn default() -> Self {
        TomlEnemy {
            speed: default_enemy_speed(),
            chase_multiplier: default_chase(),
            boost_multiplier: default_boost(),
            flee_multiplier: default_flee(),
            radius: default_radius(),
            sight_range: default_sight_range(),
            sight_half_angle: default_sight_half_angle(),
            boost_range: default_boost_range(),
            flee_radius: default_flee_radius(),
            dodge_duration: default_dodge(),
            dying_duration: default_enemy_dying(),
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            lives: default_lives(),
            radius: default_radius(),
            movement_cooldown: default_movement_cooldown(),
            bomb_cooldown: default_bomb_cooldown(),
            dying_duration: default_player_dying(),
            respawn_grace: default_respawn_grace(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            bomb: default_pad_bomb(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            pause: default_pause(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir(), seed: None }
    }
}

// ── Schema → public ──

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig { tick_rate_ms: t.tick_rate_ms.max(1) }
    }
}

impl From<TomlBomb> for BombConfig {
    fn from(t: TomlBomb) -> Self {
        BombConfig {
            arm_time: t.arm_time.max(0.0),
            explosion_duration: t.explosion_duration.max(0.0),
            blast_radius: t.blast_radius,
            hurts_player: t.hurts_player,
        }
    }
}

impl From<TomlEnemy> for EnemyConfig {
    fn from(t: TomlEnemy) -> Self {
        EnemyConfig {
            speed: t.speed.max(0.0),
            chase_multiplier: t.chase_multiplier.max(0.0),
            boost_multiplier: t.boost_multiplier.max(0.0),
            flee_multiplier: t.flee_multiplier.max(0.0),
            radius: t.radius,
            sight_range: t.sight_range,
            sight_half_angle: t.sight_half_angle,
            boost_range: t.boost_range,
            flee_radius: t.flee_radius,
            dodge_duration: t.dodge_duration,
            dying_duration: t.dying_duration,
        }
    }
}

impl From<TomlPlayer> for PlayerConfig {
    fn from(t: TomlPlayer) -> Self {
        PlayerConfig {
            lives: t.lives.max(1),
            radius: t.radius,
            movement_cooldown: t.movement_cooldown.max(0.0),
            bomb_cooldown: t.bomb_cooldown.max(0.0),
            dying_duration: t.dying_duration,
            respawn_grace: t.respawn_grace.max(0.0),
        }
    }
}

impl From<TomlGamepad> for GamepadConfig {
    fn from(t: TomlGamepad) -> Self {
        GamepadConfig { bomb: t.bomb, confirm: t.confirm, cancel: t.cancel, pause: t.pause }
    }
}

impl Default for TimingConfig {
    fn default() -> Self { TomlTiming::default().into() }
}

impl Default for BombConfig {
    fn default() -> Self { TomlBomb::default().into() }
}

impl Default for EnemyConfig {
    fn default() -> Self { TomlEnemy::default().into() }
}

impl Default for PlayerConfig {
    fn default() -> Self { TomlPlayer::default().into() }
}

impl Default for GamepadConfig {
    fn default() -> Self { TomlGamepad::default().into() }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_schema(TomlConfig::default(), PathBuf::from(default_levels_dir()))
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        // Resolve levels directory
        let levels_dir_str = toml_cfg.general.levels_dir.clone();
        let levels_dir = if PathBuf::from(&levels_dir_str).is_absolute() {
            PathBuf::from(&levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(&levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(&levels_dir_str))
        };
        debug!(levels_dir = %levels_dir.display(), "config resolved");

        GameConfig::from_schema(toml_cfg, levels_dir)
    }

    /// Parse config text directly. Levels dir is taken as written.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        let levels_dir = PathBuf::from(&toml_cfg.general.levels_dir);
        Ok(GameConfig::from_schema(toml_cfg, levels_dir))
    }

    fn from_schema(t: TomlConfig, levels_dir: PathBuf) -> Self {
        GameConfig {
            timing: t.timing.into(),
            bomb: t.bomb.into(),
            enemy: t.enemy.into(),
            player: t.player.into(),
            gamepad: t.gamepad.into(),
            levels_dir,
            seed: t.general.seed,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + user data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable (symlinks resolved)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/blastmaze)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/blastmaze");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        debug!(path = %path.display(), "loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "config.toml parse error, using defaults");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not read config");
                }
            }
        }
    }
    TomlConfig::default()
}
