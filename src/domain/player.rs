/// Player entity: cooldown-gated grid stepping, lives, death/respawn.
///
/// ```text
///   Idle ⇄ Walking      (velocity zero / nonzero)
///   Idle | Walking ── take_damage ──► Dying ── animation ──► Dead
///   Dead ── respawn ──► Idle        (session decides: respawn or game over)
/// ```
///
/// The player never validates its own moves; the session checks the
/// destination cell against the map before calling `move_by`.

use super::entity::{loop_frame, once_frame, Collidable, Dir, Sprite, SpriteSheet, Vec2};
use crate::config::PlayerConfig;

const WALK_FRAME_TIME: f32 = 0.1;
const WALK_FRAMES: usize = 4;
const DEATH_FRAMES: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    Idle,
    Walking,
    Dying,
    Dead,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: Dir,
    pub movement_cooldown: f32,
    pub bomb_cooldown: f32,
    pub lives: u32,
    pub state: PlayerState,
    pub anim_clock: f32,
    /// Remaining post-respawn invulnerability.
    pub grace: f32,
    pub radius: f32,
}

impl Player {
    pub fn new(spawn: (i32, i32), cfg: &PlayerConfig) -> Self {
        Player {
            position: Vec2::of_cell(spawn.0, spawn.1),
            velocity: Vec2::ZERO,
            facing: Dir::Down,
            movement_cooldown: 0.0,
            bomb_cooldown: 0.0,
            lives: cfg.lives,
            state: PlayerState::Idle,
            anim_clock: 0.0,
            grace: 0.0,
            radius: cfg.radius,
        }
    }

    pub fn cell(&self) -> (i32, i32) {
        self.position.cell()
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.state, PlayerState::Idle | PlayerState::Walking)
    }

    pub fn can_move(&self) -> bool {
        self.is_alive() && self.movement_cooldown <= 0.0
    }

    pub fn can_place_bomb(&self) -> bool {
        self.is_alive() && self.bomb_cooldown <= 0.0
    }

    /// Set this tick's intended velocity. Ignored unless alive.
    pub fn set_velocity(&mut self, v: Vec2) {
        if !self.is_alive() { return; }
        self.velocity = v;
        if let Some(d) = Dir::dominant(v) {
            self.facing = d;
        }
    }

    /// One grid step. Caller has validated the destination.
    pub fn move_by(&mut self, dir: Dir, cfg: &PlayerConfig) {
        let (dx, dy) = dir.delta();
        self.position = self.position.add(Vec2::new(dx as f32, dy as f32));
        self.facing = dir;
        self.movement_cooldown = cfg.movement_cooldown;
    }

    /// Start the bomb cooldown and return the cell to drop a bomb on.
    pub fn try_place_bomb(&mut self, cfg: &PlayerConfig) -> Option<(i32, i32)> {
        if !self.can_place_bomb() { return None; }
        self.bomb_cooldown = cfg.bomb_cooldown;
        Some(self.cell())
    }

    pub fn update(&mut self, dt: f32, cfg: &PlayerConfig) {
        self.anim_clock += dt;
        self.movement_cooldown = (self.movement_cooldown - dt).max(0.0);
        self.bomb_cooldown = (self.bomb_cooldown - dt).max(0.0);
        self.grace = (self.grace - dt).max(0.0);

        let next = match self.state {
            PlayerState::Dead => return,
            PlayerState::Dying => {
                if self.anim_clock >= cfg.dying_duration {
                    PlayerState::Dead
                } else {
                    return;
                }
            }
            PlayerState::Idle | PlayerState::Walking => {
                if self.velocity.is_zero() { PlayerState::Idle } else { PlayerState::Walking }
            }
        };
        if next != self.state {
            self.state = next;
            self.anim_clock = 0.0;
        }
    }

    /// Lose a life and start dying. Returns false when ignored
    /// (already dying/dead, or still invulnerable after a respawn).
    pub fn take_damage(&mut self) -> bool {
        if !self.is_alive() || self.grace > 0.0 { return false; }
        self.lives = self.lives.saturating_sub(1);
        self.velocity = Vec2::ZERO;
        self.movement_cooldown = 0.0;
        self.bomb_cooldown = 0.0;
        self.state = PlayerState::Dying;
        self.anim_clock = 0.0;
        true
    }

    /// Back at the spawn point after death, briefly invulnerable.
    pub fn respawn(&mut self, spawn: (i32, i32), cfg: &PlayerConfig) {
        self.position = Vec2::of_cell(spawn.0, spawn.1);
        self.velocity = Vec2::ZERO;
        self.facing = Dir::Down;
        self.movement_cooldown = 0.0;
        self.bomb_cooldown = 0.0;
        self.state = PlayerState::Idle;
        self.anim_clock = 0.0;
        self.grace = cfg.respawn_grace;
    }

    pub fn sprite(&self, cfg: &PlayerConfig) -> Sprite {
        match self.state {
            PlayerState::Idle => Sprite {
                sheet: SpriteSheet::PlayerIdle,
                frame: loop_frame(self.anim_clock, WALK_FRAME_TIME, WALK_FRAMES),
            },
            PlayerState::Walking => Sprite {
                sheet: SpriteSheet::PlayerWalk(self.facing),
                frame: loop_frame(self.anim_clock, WALK_FRAME_TIME, WALK_FRAMES),
            },
            PlayerState::Dying => Sprite {
                sheet: SpriteSheet::PlayerDeath,
                frame: once_frame(self.anim_clock, cfg.dying_duration / DEATH_FRAMES as f32, DEATH_FRAMES),
            },
            PlayerState::Dead => Sprite { sheet: SpriteSheet::PlayerDeath, frame: DEATH_FRAMES - 1 },
        }
    }
}

impl Collidable for Player {
    fn position(&self) -> Vec2 { self.position }
    fn radius(&self) -> f32 { self.radius }

    fn receive_blast(&mut self, center: Vec2, half_extent: f32) -> bool {
        self.touches_square(center, half_extent) && self.take_damage()
    }
}
