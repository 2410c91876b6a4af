/// Player action rules: truth-table driven.
///
/// Pure functions over the map and entities, no side effects.
/// These encode "what is legal" without performing the action.
///
/// ### Step (one cell in a cardinal direction)
/// ┌──────────────────────────────┬────────┬─────────────────┐
/// │ Condition                     │ Allow? │ Notes           │
/// ├──────────────────────────────┼────────┼─────────────────┤
/// │ Player Dying/Dead             │ DENY   │                 │
/// │ Movement cooldown running     │ DENY   │ position frozen │
/// │ Dest out of bounds            │ DENY   │ map edge        │
/// │ Dest blocked (collision)      │ DENY   │ any tile        │
/// │ Otherwise                     │ ALLOW  │                 │
/// └──────────────────────────────┴────────┴─────────────────┘
///
/// A denied step leaves position and cooldown untouched.
///
/// ### Bomb placement
/// ┌──────────────────────────────┬────────┐
/// │ Condition                     │ Allow? │
/// ├──────────────────────────────┼────────┤
/// │ Player Dying/Dead             │ DENY   │
/// │ Bomb cooldown running         │ DENY   │
/// │ Unspent bomb already on cell  │ DENY   │
/// │ Otherwise                     │ ALLOW  │
/// └──────────────────────────────┴────────┘
///
/// ### Contact damage
/// ┌──────────────────────────────┬──────────┐
/// │ Condition                     │ Damage?  │
/// ├──────────────────────────────┼──────────┤
/// │ Enemy Dying/Dead              │ NO       │
/// │ Player Dying/Dead             │ NO       │
/// │ Circles overlap (d < r1 + r2) │ YES      │
/// │ Otherwise                     │ NO       │
/// └──────────────────────────────┴──────────┘

use super::bomb::Bomb;
use super::enemy::Enemy;
use super::entity::{Collidable, Dir};
use super::grid::MapLayers;
use super::player::Player;

/// Destination cell of a legal step, or `None`. See truth table above.
pub fn step_target(map: &MapLayers, player: &Player, dir: Dir) -> Option<(i32, i32)> {
    if !player.can_move() { return None; }
    let (x, y) = player.cell();
    let (dx, dy) = dir.delta();
    let dest = (x + dx, y + dy);
    if map.is_blocked(dest.0, dest.1) { return None; }
    Some(dest)
}

/// Is there already a live bomb on this cell?
pub fn bomb_on_cell(bombs: &[Bomb], cell: (i32, i32)) -> bool {
    bombs.iter().any(|b| !b.is_spent() && b.cell == cell)
}

pub fn can_place_bomb(player: &Player, bombs: &[Bomb]) -> bool {
    player.can_place_bomb() && !bomb_on_cell(bombs, player.cell())
}

/// Does this enemy hurt the player on contact?
pub fn contact_damage(player: &Player, enemy: &Enemy) -> bool {
    player.is_alive() && enemy.is_active() && enemy.overlaps(player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnemyConfig, PlayerConfig};
    use crate::domain::grid::layers_from;

    fn map() -> MapLayers {
        layers_from(&[
            "     ",
            " #   ",
            "     ",
        ])
    }

    fn player_at(x: i32, y: i32) -> Player {
        Player::new((x, y), &PlayerConfig::default())
    }

    #[test]
    fn step_into_open_cell() {
        let p = player_at(2, 2);
        assert_eq!(step_target(&map(), &p, Dir::Right), Some((3, 2)));
        assert_eq!(step_target(&map(), &p, Dir::Up), Some((2, 1)));
    }

    #[test]
    fn step_denied_by_wall_and_edge() {
        let p = player_at(1, 2);
        assert_eq!(step_target(&map(), &p, Dir::Up), None);
        assert_eq!(step_target(&map(), &p, Dir::Down), None);
        let corner = player_at(0, 0);
        assert_eq!(step_target(&map(), &corner, Dir::Left), None);
        assert_eq!(step_target(&map(), &corner, Dir::Up), None);
    }

    #[test]
    fn step_denied_during_cooldown() {
        let cfg = PlayerConfig::default();
        let mut p = player_at(2, 2);
        p.move_by(Dir::Right, &cfg);
        assert_eq!(step_target(&map(), &p, Dir::Right), None);
    }

    #[test]
    fn step_denied_while_dying() {
        let mut p = player_at(2, 2);
        p.take_damage();
        assert_eq!(step_target(&map(), &p, Dir::Right), None);
    }

    #[test]
    fn one_bomb_per_cell() {
        let p = player_at(2, 2);
        let mut bombs = vec![Bomb::place((2, 2), 2.0, 0.5)];
        assert!(!can_place_bomb(&p, &bombs));
        bombs[0].advance(2.0);
        bombs[0].advance(0.5);
        assert!(bombs[0].is_spent());
        assert!(can_place_bomb(&p, &bombs));
    }

    #[test]
    fn contact_needs_overlap_and_live_parties() {
        let cfg = EnemyConfig::default();
        let p = player_at(2, 2);
        let mut e = Enemy::new(0, (2, 2), &cfg);
        e.position.x = 2.5;
        assert!(contact_damage(&p, &e));
        e.position.x = 3.0;
        assert!(!contact_damage(&p, &e));
        e.position.x = 2.5;
        e.handle_blast(e.position, 0.5);
        assert!(!contact_damage(&p, &e));
    }
}
