/// Enemy entity and its state machine.
///
/// ```text
///            sees player          close
///  Patrolling ──────────► Chasing ──────► Boosting
///      ▲  ▲                  │ blocked       │ blocked
///      │  │ lost sight       ▼               ▼
///      │  └──────────────  Dodging ◄─────────┘
///      │   timer expires     ▲
///      │                     │ blocked
///      └──── threat gone ─ Fleeing ◄── armed bomb in line
///
///  any movement state ── blast ──► Dying ── animation done ──► Dead
/// ```
///
/// `Dying` and `Dead` are terminal for movement. A `Dead` enemy is removed
/// by the session during cleanup, never by itself.

use rand::Rng;

use super::ai;
use super::entity::{loop_frame, once_frame, Collidable, Dir, Sprite, SpriteSheet, Vec2};
use super::grid::MapLayers;
use crate::config::EnemyConfig;

/// How far ahead of the centre the leading edge is probed for walls.
const LEAD: f32 = 0.49;
/// Longest move tested against the grid in one go.
const MAX_SUBSTEP: f32 = 0.5;
const WALK_FRAME_TIME: f32 = 0.5;
const WALK_FRAMES: usize = 3;
const DEATH_FRAMES: usize = 5;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EnemyState {
    Patrolling { heading: Dir },
    Chasing,
    Boosting,
    Dodging { heading: Dir, remaining: f32 },
    Fleeing { heading: Dir },
    Dying,
    Dead,
}

/// What an enemy can observe this tick.
pub struct Surroundings<'a> {
    pub map: &'a MapLayers,
    pub player: Vec2,
    /// Positions of armed (not yet exploded) bombs.
    pub bombs: &'a [Vec2],
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: usize,
    pub position: Vec2,
    pub speed: f32,
    pub facing: Dir,
    pub state: EnemyState,
    pub anim_clock: f32,
    pub radius: f32,
}

impl Enemy {
    /// Spawn at the centre of `cell`, patrolling to the left.
    pub fn new(id: usize, cell: (i32, i32), cfg: &EnemyConfig) -> Self {
        Enemy {
            id,
            position: Vec2::of_cell(cell.0, cell.1),
            speed: cfg.speed,
            facing: Dir::Left,
            state: EnemyState::Patrolling { heading: Dir::Left },
            anim_clock: 0.0,
            radius: cfg.radius,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    /// Still a threat to the player (not dying or dead).
    pub fn is_active(&self) -> bool {
        !matches!(self.state, EnemyState::Dying | EnemyState::Dead)
    }

    /// Advance one tick: move, then re-evaluate the state.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        env: &Surroundings,
        cfg: &EnemyConfig,
        rng: &mut R,
    ) {
        self.anim_clock += dt;
        match self.state {
            EnemyState::Dead => return,
            EnemyState::Dying => {
                if self.anim_clock >= cfg.dying_duration {
                    self.state = EnemyState::Dead;
                }
                return;
            }
            _ => {}
        }
        self.step(dt, env, cfg, rng);
        self.reassess(dt, env, cfg);
    }

    /// Blast damage. Returns true if this blast killed the enemy.
    pub fn handle_blast(&mut self, center: Vec2, half_extent: f32) -> bool {
        if !self.is_active() { return false; }
        if !self.touches_square(center, half_extent) { return false; }
        self.state = EnemyState::Dying;
        self.anim_clock = 0.0;
        true
    }

    pub fn sprite(&self) -> Sprite {
        match self.state {
            EnemyState::Dying | EnemyState::Dead => Sprite {
                sheet: SpriteSheet::EnemyDeath,
                frame: once_frame(self.anim_clock, WALK_FRAME_TIME, DEATH_FRAMES),
            },
            _ => Sprite {
                sheet: SpriteSheet::EnemyWalk(self.facing),
                frame: loop_frame(self.anim_clock, WALK_FRAME_TIME, WALK_FRAMES),
            },
        }
    }

    fn multiplier(&self, cfg: &EnemyConfig) -> f32 {
        match self.state {
            EnemyState::Chasing => cfg.chase_multiplier,
            EnemyState::Boosting => cfg.boost_multiplier,
            EnemyState::Fleeing { .. } => cfg.flee_multiplier,
            _ => 1.0,
        }
    }

    fn heading(&self, player: Vec2) -> Option<Dir> {
        match self.state {
            EnemyState::Patrolling { heading }
            | EnemyState::Dodging { heading, .. }
            | EnemyState::Fleeing { heading } => Some(heading),
            EnemyState::Chasing | EnemyState::Boosting => ai::approach_dir(self.position, player),
            EnemyState::Dying | EnemyState::Dead => None,
        }
    }

    fn step<R: Rng + ?Sized>(&mut self, dt: f32, env: &Surroundings, cfg: &EnemyConfig, rng: &mut R) {
        let Some(dir) = self.heading(env.player) else { return };

        // Turning onto the other axis: line up with the lane first
        if dir.is_horizontal() {
            self.position.y = self.position.y.round();
        } else {
            self.position.x = self.position.x.round();
        }
        self.facing = dir;

        // At most half a tile per probe
        let distance = (self.speed * self.multiplier(cfg) * dt).max(0.0);
        let substeps = (distance / MAX_SUBSTEP).ceil().max(1.0) as usize;
        let stride = dir.unit().scale(distance / substeps as f32);
        let mut blocked = false;
        for _ in 0..substeps {
            let candidate = self.position.add(stride);
            let (lx, ly) = candidate.add(dir.unit().scale(LEAD)).cell();
            if env.map.is_blocked(lx, ly) {
                blocked = true;
                break;
            }
            self.position = candidate;
        }
        if !blocked { return; }

        self.position = self.position.snapped();
        let (cx, cy) = self.position.cell();
        // Boxed in: idle in place and retry next tick.
        let Some(next) = ai::pick_open_direction(env.map, cx, cy, rng) else { return };
        self.facing = next;
        self.state = match self.state {
            EnemyState::Patrolling { .. } => EnemyState::Patrolling { heading: next },
            _ => EnemyState::Dodging { heading: next, remaining: cfg.dodge_duration },
        };
        tracing::trace!(id = self.id, ?next, state = ?self.state, "enemy blocked");
    }

    fn reassess(&mut self, dt: f32, env: &Surroundings, cfg: &EnemyConfig) {
        if let EnemyState::Dodging { heading, remaining } = self.state {
            let remaining = remaining - dt;
            if remaining > 0.0 {
                self.state = EnemyState::Dodging { heading, remaining };
                return;
            }
            self.state = EnemyState::Patrolling { heading };
        }

        if let Some(heading) = ai::flee_direction(env.map, self.position, env.bombs, cfg.flee_radius) {
            self.state = EnemyState::Fleeing { heading };
            return;
        }

        let sees = ai::can_see(
            env.map, self.position, self.facing, env.player,
            cfg.sight_range, cfg.sight_half_angle,
        );
        if sees {
            self.state = if self.position.dist(env.player) <= cfg.boost_range {
                EnemyState::Boosting
            } else {
                EnemyState::Chasing
            };
            return;
        }

        if matches!(self.state, EnemyState::Chasing | EnemyState::Boosting | EnemyState::Fleeing { .. }) {
            self.state = EnemyState::Patrolling { heading: self.facing };
        }
    }
}

impl Collidable for Enemy {
    fn position(&self) -> Vec2 { self.position }
    fn radius(&self) -> f32 { self.radius }

    fn receive_blast(&mut self, center: Vec2, half_extent: f32) -> bool {
        self.handle_blast(center, half_extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnemyConfig;
    use crate::domain::grid::layers_from;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 0.05;

    fn run(e: &mut Enemy, map: &MapLayers, player: Vec2, bombs: &[Vec2], ticks: usize, rng: &mut StdRng) {
        let cfg = EnemyConfig::default();
        let env = Surroundings { map, player, bombs };
        for _ in 0..ticks {
            e.update(DT, &env, &cfg, rng);
        }
    }

    #[test]
    fn patrols_left_until_wall_then_turns() {
        let map = layers_from(&[
            "#######",
            "#     #",
            "#######",
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut e = Enemy::new(0, (4, 1), &EnemyConfig::default());
        // Player far below the map, never visible
        run(&mut e, &map, Vec2::new(4.0, 40.0), &[], 60, &mut rng);
        // Never enters the wall column
        assert!(e.position.x >= 1.0 - 0.01);
        assert!(e.position.x <= 5.0 + 0.01);
        assert_eq!(e.position.y, 1.0);
        // Corridor only opens to the right after hitting the left wall
        assert!(matches!(e.state, EnemyState::Patrolling { heading: Dir::Right } | EnemyState::Patrolling { heading: Dir::Left }));
    }

    #[test]
    fn spots_player_and_chases_faster() {
        let map = layers_from(&[
            "            ",
        ]);
        let mut rng = StdRng::seed_from_u64(2);
        let cfg = EnemyConfig::default();
        let mut e = Enemy::new(0, (10, 0), &cfg);
        let player = Vec2::new(3.0, 0.0);
        run(&mut e, &map, player, &[], 1, &mut rng);
        assert_eq!(e.state, EnemyState::Chasing);

        let before = e.position.x;
        run(&mut e, &map, player, &[], 1, &mut rng);
        let moved = before - e.position.x;
        assert!((moved - cfg.speed * cfg.chase_multiplier * DT).abs() < 1e-4);
    }

    #[test]
    fn boosts_when_close() {
        let map = layers_from(&["        "]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut e = Enemy::new(0, (4, 0), &EnemyConfig::default());
        run(&mut e, &map, Vec2::new(2.0, 0.0), &[], 1, &mut rng);
        assert_eq!(e.state, EnemyState::Boosting);
    }

    #[test]
    fn loses_sight_falls_back_to_patrol() {
        let map = layers_from(&[
            "          ",
            "          ",
            "          ",
            "          ",
            "          ",
        ]);
        let mut rng = StdRng::seed_from_u64(4);
        let mut e = Enemy::new(0, (8, 0), &EnemyConfig::default());
        e.state = EnemyState::Chasing;
        // Player far off the facing axis
        run(&mut e, &map, Vec2::new(0.0, 4.0), &[], 1, &mut rng);
        assert!(matches!(e.state, EnemyState::Patrolling { .. }));
    }

    #[test]
    fn blocked_chase_turns_into_dodge() {
        let map = layers_from(&[
            "     ",
            "  #  ",
            "     ",
        ]);
        let mut rng = StdRng::seed_from_u64(5);
        let mut e = Enemy::new(0, (3, 1), &EnemyConfig::default());
        e.state = EnemyState::Chasing;
        // Player behind the wall on the same row
        run(&mut e, &map, Vec2::new(0.0, 1.0), &[], 1, &mut rng);
        assert!(matches!(e.state, EnemyState::Dodging { .. }));
        assert_eq!(e.position, Vec2::new(3.0, 1.0));
    }

    #[test]
    fn boxed_in_enemy_idles() {
        let map = layers_from(&[
            "###",
            "# #",
            "###",
        ]);
        let mut rng = StdRng::seed_from_u64(6);
        let mut e = Enemy::new(0, (1, 1), &EnemyConfig::default());
        run(&mut e, &map, Vec2::new(40.0, 40.0), &[], 30, &mut rng);
        assert_eq!(e.position, Vec2::new(1.0, 1.0));
        assert!(e.is_active());
    }

    #[test]
    fn flees_from_bomb_in_line() {
        let map = layers_from(&[
            "#######",
            "       ",
            "#######",
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut e = Enemy::new(0, (3, 1), &EnemyConfig::default());
        run(&mut e, &map, Vec2::new(40.0, 40.0), &[Vec2::new(1.0, 1.0)], 1, &mut rng);
        assert_eq!(e.state, EnemyState::Fleeing { heading: Dir::Right });
    }

    #[test]
    fn blast_kills_then_dies_then_dead() {
        let map = layers_from(&["     "]);
        let cfg = EnemyConfig::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut e = Enemy::new(0, (2, 0), &cfg);
        e.position = Vec2::new(2.5, 0.0);
        // 0.5 from the blast cell centre
        assert!(e.handle_blast(Vec2::new(2.0, 0.0), 0.5));
        assert_eq!(e.state, EnemyState::Dying);
        assert_eq!(e.anim_clock, 0.0);
        // Second blast is ignored
        assert!(!e.handle_blast(Vec2::new(2.0, 0.0), 0.5));

        let frozen = e.position;
        let ticks = (cfg.dying_duration / DT).ceil() as usize + 1;
        run(&mut e, &map, Vec2::new(0.0, 0.0), &[], ticks, &mut rng);
        assert!(e.is_dead());
        assert_eq!(e.position, frozen);

        // Dead never moves again
        run(&mut e, &map, Vec2::new(0.0, 0.0), &[], 10, &mut rng);
        assert!(e.is_dead());
        assert_eq!(e.position, frozen);
    }

    #[test]
    fn fast_enemy_never_tunnels_through_a_wall() {
        let map = layers_from(&["         #  "]);
        let mut cfg = EnemyConfig::default();
        cfg.speed = 8.0;
        let mut rng = StdRng::seed_from_u64(3);
        let mut e = Enemy::new(0, (10, 0), &cfg);
        let env = Surroundings { map: &map, player: Vec2::new(0.0, 40.0), bombs: &[] };
        for _ in 0..12 {
            // 1.2 tiles per tick at this speed
            e.update(0.15, &env, &cfg, &mut rng);
            assert!(e.position.x > 9.5, "crossed the wall: {:?}", e.position);
            assert!(!map.is_blocked(e.position.cell().0, e.position.cell().1));
        }
    }

    #[test]
    fn blast_two_tiles_away_misses() {
        let mut e = Enemy::new(0, (7, 5), &EnemyConfig::default());
        assert!(!e.handle_blast(Vec2::new(5.0, 5.0), 0.5));
        assert!(e.is_active());
    }

    #[test]
    fn sprite_follows_state() {
        let mut e = Enemy::new(0, (0, 0), &EnemyConfig::default());
        assert_eq!(e.sprite().sheet, SpriteSheet::EnemyWalk(Dir::Left));
        e.handle_blast(Vec2::new(0.0, 0.0), 0.5);
        assert_eq!(e.sprite().sheet, SpriteSheet::EnemyDeath);
    }
}
