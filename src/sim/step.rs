/// The step function: advances the world by one tick of `dt` seconds.
///
/// Processing order:
///   1. Player velocity from input
///   2. Player move attempt (bounds + collision layer)
///   3. Player update, bomb placement
///   4. Enemy updates (see the player and armed bombs)
///   5. Enemy contact damage
///   6. Bomb timers → detonation → blast damage
///   7. Cleanup (dead enemies, spent bombs)
///   8. Player death → respawn or game over
///   9. Level progress (all enemies gone, or exit reached)
///
/// Removal happens only in phase 7, so every phase before it sees
/// the same collections. Only phase 6 mutates the map.

use tracing::{debug, info};

use crate::domain::entity::{Dir, FrameInput, Vec2};
use crate::domain::enemy::Surroundings;
use crate::domain::player::PlayerState;
use crate::domain::bomb::Bomb;
use crate::domain::rules;
use super::event::GameEvent;
use super::level::load_level;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: &FrameInput, dt: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0.0 {
        world.message_timer -= dt;
        if world.message_timer <= 0.0 { world.message.clear(); }
    }

    resolve_player_movement(world, input, &mut events);
    resolve_player_update(world, input, dt, &mut events);
    resolve_enemies(world, dt);
    resolve_enemy_contact(world, &mut events);
    resolve_bombs(world, dt, &mut events);
    resolve_cleanup(world);
    if resolve_player_death(world, &mut events) { return events; }
    resolve_progress(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, input: &FrameInput, events: &mut Vec<GameEvent>) {
    let wanted = input.movement();
    world.player.set_velocity(wanted.map_or(Vec2::ZERO, Dir::unit));

    let Some(dir) = wanted else { return };
    if let Some((x, y)) = rules::step_target(&world.map, &world.player, dir) {
        world.player.move_by(dir, &world.player_cfg);
        events.push(GameEvent::PlayerStepped { x, y });
    }
}

fn resolve_player_update(world: &mut WorldState, input: &FrameInput, dt: f32, events: &mut Vec<GameEvent>) {
    world.player.update(dt, &world.player_cfg);

    if !input.place_bomb || !rules::can_place_bomb(&world.player, &world.bombs) { return; }
    if let Some(cell) = world.player.try_place_bomb(&world.player_cfg) {
        world.bombs.push(Bomb::place(cell, world.bomb_cfg.arm_time, world.bomb_cfg.explosion_duration));
        debug!(x = cell.0, y = cell.1, "bomb placed");
        events.push(GameEvent::BombPlaced { x: cell.0, y: cell.1 });
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(world: &mut WorldState, dt: f32) {
    let bombs = world.armed_bomb_positions();
    let env = Surroundings {
        map: &world.map,
        player: world.player.position,
        bombs: &bombs,
    };
    for enemy in world.enemies.iter_mut() {
        enemy.update(dt, &env, &world.enemy_cfg, &mut world.rng);
    }
}

fn resolve_enemy_contact(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let touched = world.enemies.iter().any(|e| rules::contact_damage(&world.player, e));
    if touched && world.player.take_damage() {
        debug!(lives = world.player.lives, "player caught");
        events.push(GameEvent::PlayerHit { lives_left: world.player.lives });
    }
}

// ══════════════════════════════════════════════════════════════
// Bombs
// ══════════════════════════════════════════════════════════════

fn resolve_bombs(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    for bomb in world.bombs.iter_mut() {
        if !bomb.advance(dt) { continue; }
        let Some(blast) = bomb.detonate(&mut world.map, world.bomb_cfg.blast_radius) else { continue };

        debug!(x = blast.origin.0, y = blast.origin.1, cells = blast.cells.len(), "bomb exploded");
        events.push(GameEvent::BombExploded { x: blast.origin.0, y: blast.origin.1 });
        for &((x, y), tile) in &blast.destroyed {
            events.push(GameEvent::TileDestroyed { x, y, tile });
        }

        for enemy in world.enemies.iter_mut() {
            if blast.strike(enemy) {
                let (x, y) = enemy.position.cell();
                world.kills += 1;
                events.push(GameEvent::EnemyKilled { id: enemy.id, x, y });
            }
        }

        if world.bomb_cfg.hurts_player && blast.strike(&mut world.player) {
            events.push(GameEvent::PlayerHit { lives_left: world.player.lives });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Cleanup / death / progress
// ══════════════════════════════════════════════════════════════

fn resolve_cleanup(world: &mut WorldState) {
    world.enemies.retain(|e| !e.is_dead());
    world.bombs.retain(|b| !b.is_spent());
}

/// Returns true if the game just ended.
fn resolve_player_death(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if world.player.state != PlayerState::Dead { return false; }

    if world.player.lives == 0 {
        world.phase = Phase::GameOver;
        info!(level = world.current_level, kills = world.kills, "game over");
        events.push(GameEvent::GameOver);
        return true;
    }
    world.player.respawn(world.player_spawn, &world.player_cfg);
    events.push(GameEvent::PlayerRespawned);
    false
}

fn resolve_progress(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let all_gone = world.enemies_at_start > 0 && world.enemies.is_empty();
    let on_exit = world.player.is_alive() && world.exit == Some(world.player.cell());
    if !all_gone && !on_exit { return; }

    let cleared = world.current_level;
    info!(level = cleared, on_exit, "level cleared");
    events.push(GameEvent::LevelCleared { level: cleared });

    if cleared + 1 >= world.total_levels() {
        world.phase = Phase::Win;
        info!(kills = world.kills, "game won");
        events.push(GameEvent::GameWon);
    } else {
        load_level(world, cleared + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::grid::TileGrid;
    use crate::domain::tile::Tile;
    use crate::sim::level::{parse_level, start_new_game};

    const DT: f32 = 0.05;

    fn world_with(cfg: GameConfig, levels: &[&str]) -> WorldState {
        let defs = levels.iter().map(|t| parse_level(t).unwrap()).collect();
        let mut w = WorldState::new(&cfg, defs);
        start_new_game(&mut w);
        w
    }

    fn seeded() -> GameConfig {
        let mut cfg = GameConfig::default();
        cfg.seed = Some(7);
        cfg
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn right() -> FrameInput {
        FrameInput { right: true, ..Default::default() }
    }

    fn bomb() -> FrameInput {
        FrameInput { place_bomb: true, ..Default::default() }
    }

    const ROOM: &str = "\
# Room
######
#P#  #
#    #
#   X#
######
";

    #[test]
    fn blocked_move_changes_nothing() {
        let mut w = world_with(seeded(), &[ROOM]);
        let events = step(&mut w, &right(), DT);
        assert_eq!(w.player.cell(), (1, 1));
        assert_eq!(w.player.movement_cooldown, 0.0);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerStepped { .. })));
    }

    #[test]
    fn open_move_steps_then_waits_for_cooldown() {
        let mut w = world_with(seeded(), &[ROOM]);
        let down = FrameInput { down: true, ..Default::default() };
        let events = step(&mut w, &down, DT);
        assert_eq!(events, vec![GameEvent::PlayerStepped { x: 1, y: 2 }]);
        step(&mut w, &down, DT);
        assert_eq!(w.player.cell(), (1, 2));
        for _ in 0..6 {
            step(&mut w, &down, DT);
        }
        assert_eq!(w.player.cell(), (1, 3));
    }

    #[test]
    fn bomb_clears_ground_up_to_radius() {
        let level = "\
# Blast
########
#P::#: #
#     X#
########
";
        let mut w = world_with(seeded(), &[level]);
        let events = step(&mut w, &bomb(), DT);
        assert_eq!(events, vec![GameEvent::BombPlaced { x: 1, y: 1 }]);

        let mut exploded_at = None;
        let mut destroyed = 0;
        for tick in 1..80 {
            let events = step(&mut w, &idle(), DT);
            destroyed += events.iter().filter(|e| matches!(e, GameEvent::TileDestroyed { .. })).count();
            if events.contains(&GameEvent::BombExploded { x: 1, y: 1 }) {
                exploded_at = Some(tick);
            }
        }
        // 2.0 s fuse at 0.05 s per tick
        assert!(exploded_at.unwrap() >= 39);
        assert_eq!(destroyed, 2);
        assert_eq!(w.map.terrain.tile(2, 1), None);
        assert_eq!(w.map.terrain.tile(3, 1), None);
        assert_eq!(w.map.terrain.tile(4, 1), Some(Tile::Wall));
        assert_eq!(w.map.terrain.tile(5, 1), Some(Tile::Ground));
        // Spent bombs are swept away
        assert!(w.bombs.is_empty());
        // Own bomb is harmless by default
        assert_eq!(w.player.lives, 3);
    }

    #[test]
    fn one_live_bomb_per_cell() {
        let mut cfg = seeded();
        cfg.player.bomb_cooldown = 0.0;
        let mut w = world_with(cfg, &[ROOM]);
        step(&mut w, &bomb(), DT);
        step(&mut w, &bomb(), DT);
        assert_eq!(w.bombs.len(), 1);
    }

    #[test]
    fn blasted_enemy_dies_then_level_is_won() {
        // Enemy boxed in behind ground; the blast clears it and reaches the enemy
        let level = "\
# Trap
######
# P:E#
######
";
        let mut w = world_with(seeded(), &[level]);
        step(&mut w, &bomb(), DT);

        let mut killed = false;
        let mut won = false;
        for _ in 0..200 {
            let events = step(&mut w, &idle(), DT);
            killed |= events.iter().any(|e| matches!(e, GameEvent::EnemyKilled { id: 0, .. }));
            if events.contains(&GameEvent::GameWon) {
                won = true;
                assert!(events.contains(&GameEvent::LevelCleared { level: 0 }));
                break;
            }
            // Dying enemy stays put until removed
            if let Some(e) = w.enemies.first() {
                assert_eq!(e.position.cell(), (4, 1));
            }
        }
        assert!(killed);
        assert!(won);
        assert!(w.enemies.is_empty());
        assert_eq!(w.phase, Phase::Win);
        assert_eq!(w.kills, 1);
    }

    #[test]
    fn last_enemy_down_loads_next_level_keeping_lives() {
        let trap = "\
# Trap
######
# P:E#
######
";
        let mut w = world_with(seeded(), &[trap, ROOM]);
        w.player.lives = 2;
        step(&mut w, &bomb(), DT);

        let mut cleared = false;
        for _ in 0..200 {
            let events = step(&mut w, &idle(), DT);
            assert!(!events.contains(&GameEvent::GameWon));
            if events.contains(&GameEvent::LevelCleared { level: 0 }) {
                cleared = true;
                break;
            }
        }
        assert!(cleared);
        assert_eq!(w.current_level, 1);
        assert_eq!(w.level_name, "Room");
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.player.lives, 2);
        assert_eq!(w.player.cell(), (1, 1));
        assert_eq!(w.kills, 1);
        assert!(w.bombs.is_empty());
    }

    #[test]
    fn last_life_ends_the_game_once() {
        let level = "\
# Doom
######
#PE  #
######
";
        let mut w = world_with(seeded(), &[level]);
        w.player.lives = 1;

        let mut hits = 0;
        let mut overs = 0;
        for _ in 0..200 {
            for e in step(&mut w, &idle(), DT) {
                match e {
                    GameEvent::PlayerHit { lives_left } => {
                        assert_eq!(lives_left, 0);
                        hits += 1;
                    }
                    GameEvent::GameOver => overs += 1,
                    GameEvent::PlayerRespawned => panic!("no lives left to respawn"),
                    _ => {}
                }
            }
        }
        assert_eq!(hits, 1);
        assert_eq!(overs, 1);
        assert_eq!(w.phase, Phase::GameOver);
        assert_eq!(w.player.lives, 0);
        assert!(step(&mut w, &idle(), DT).is_empty());
    }

    #[test]
    fn death_with_lives_left_respawns() {
        let level = "\
# Again
#######
#PE   #
#    X#
#######
";
        let mut w = world_with(seeded(), &[level]);
        let mut respawned = false;
        for _ in 0..100 {
            let events = step(&mut w, &idle(), DT);
            if events.contains(&GameEvent::PlayerRespawned) {
                respawned = true;
                break;
            }
        }
        assert!(respawned);
        assert_eq!(w.player.lives, 2);
        assert_eq!(w.player.cell(), (1, 1));
        assert_eq!(w.player.state, PlayerState::Idle);
        assert!(w.player.grace > 0.0);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn exit_advances_to_next_level_keeping_lives() {
        let first = "\
# One
#####
#PX #
#####
";
        let mut w = world_with(seeded(), &[first, ROOM]);
        w.player.lives = 2;
        let events = step(&mut w, &right(), DT);
        assert!(events.contains(&GameEvent::LevelCleared { level: 0 }));
        assert_eq!(w.current_level, 1);
        assert_eq!(w.level_name, "Room");
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.player.lives, 2);
        assert_eq!(w.player.cell(), (1, 1));
        assert_eq!(w.map.width(), 6);
        assert_eq!(w.map.terrain.tile_size(), 32);
    }

    #[test]
    fn paused_world_is_frozen() {
        let mut w = world_with(seeded(), &[ROOM]);
        w.toggle_pause();
        assert!(step(&mut w, &FrameInput { down: true, ..Default::default() }, DT).is_empty());
        assert_eq!(w.tick, 0);
        assert_eq!(w.player.cell(), (1, 1));
        w.toggle_pause();
        step(&mut w, &idle(), DT);
        assert_eq!(w.tick, 1);
    }

    #[test]
    fn own_bomb_hurts_when_enabled() {
        let mut cfg = seeded();
        cfg.bomb.hurts_player = true;
        let mut w = world_with(cfg, &[ROOM]);
        step(&mut w, &bomb(), DT);
        let mut hit = false;
        for _ in 0..60 {
            hit |= step(&mut w, &idle(), DT).contains(&GameEvent::PlayerHit { lives_left: 2 });
        }
        assert!(hit);
    }
}
