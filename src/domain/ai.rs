/// Enemy AI: perception and obstacle avoidance over the grid.
///
/// Pure queries; the enemy state machine in `enemy.rs` decides what to do
/// with the answers.
///
///   1. **Sight**: the player is seen when within range, inside a narrow
///      bearing window around the enemy's facing, with no blocking cell on
///      the segment between them.
///   2. **Threat**: an armed bomb on the same row or column, within
///      range, with no wall in between (walls stop blasts too).
///   3. **Avoidance**: uniform random pick among the cardinal directions
///      whose adjacent cell is open.

use rand::seq::SliceRandom;
use rand::Rng;

use super::entity::{Dir, Vec2};
use super::grid::MapLayers;

/// Sampling step along a sight line, in tiles.
const SIGHT_STEP: f32 = 0.25;

/// Bearing from `from` to `to` in degrees, [0, 360).
/// 0 = right, 90 = down, 180 = left, 270 = up (screen coordinates).
pub fn bearing(from: Vec2, to: Vec2) -> f32 {
    let d = to.sub(from);
    let mut a = d.y.atan2(d.x).to_degrees();
    if a < 0.0 { a += 360.0; }
    a
}

fn facing_angle(dir: Dir) -> f32 {
    match dir {
        Dir::Right => 0.0,
        Dir::Down => 90.0,
        Dir::Left => 180.0,
        Dir::Up => 270.0,
    }
}

/// Smallest absolute difference between two angles in degrees.
fn angle_between(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}

/// No blocked cell between the two points (endpoint cells excluded).
pub fn line_clear(map: &MapLayers, from: Vec2, to: Vec2) -> bool {
    let start = from.cell();
    let end = to.cell();
    let dist = from.dist(to);
    let steps = (dist / SIGHT_STEP).ceil().max(1.0) as i32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let cell = from.add(to.sub(from).scale(t)).cell();
        if cell == start || cell == end { continue; }
        if map.is_blocked(cell.0, cell.1) { return false; }
    }
    true
}

/// Line-of-sight predicate: range, bearing window around `facing`, clear line.
pub fn can_see(
    map: &MapLayers,
    eye: Vec2,
    facing: Dir,
    target: Vec2,
    range: f32,
    half_angle: f32,
) -> bool {
    if eye.dist(target) > range { return false; }
    if eye.cell() == target.cell() { return true; }
    if angle_between(bearing(eye, target), facing_angle(facing)) > half_angle {
        return false;
    }
    line_clear(map, eye, target)
}

/// Cardinal step that closes the larger axis gap toward `target`.
pub fn approach_dir(from: Vec2, to: Vec2) -> Option<Dir> {
    Dir::dominant(to.sub(from))
}

/// Directions whose neighbouring cell is open.
pub fn open_directions(map: &MapLayers, x: i32, y: i32) -> Vec<Dir> {
    Dir::ALL
        .into_iter()
        .filter(|d| {
            let (dx, dy) = d.delta();
            !map.is_blocked(x + dx, y + dy)
        })
        .collect()
}

/// Uniform random open direction, or `None` when boxed in.
pub fn pick_open_direction<R: Rng + ?Sized>(map: &MapLayers, x: i32, y: i32, rng: &mut R) -> Option<Dir> {
    open_directions(map, x, y).choose(rng).copied()
}

/// If an armed bomb threatens the cell at `at`, the direction to flee in.
///
/// A bomb threatens when it shares the row or column, is at most
/// `radius` cells away and nothing blocks the line. Stepping off the
/// blast line (perpendicular) is preferred; otherwise straight away.
/// `None` if there is no threat or no way out.
pub fn flee_direction(map: &MapLayers, at: Vec2, bombs: &[Vec2], radius: u32) -> Option<Dir> {
    let (ex, ey) = at.cell();
    let threat = bombs.iter().copied().filter(|b| {
        let (bx, by) = b.cell();
        let aligned = bx == ex || by == ey;
        let cells = (bx - ex).abs() + (by - ey).abs();
        aligned && cells as u32 <= radius && line_clear(map, at, *b)
    })
    .min_by(|a, b| at.dist(*a).total_cmp(&at.dist(*b)))?;

    let open = open_directions(map, ex, ey);
    let (bx, by) = threat.cell();
    let along_row = by == ey && bx != ex;
    let along_col = bx == ex && by != ey;

    let sideways: Vec<Dir> = open.iter().copied()
        .filter(|d| (along_row && !d.is_horizontal()) || (along_col && d.is_horizontal()))
        .collect();
    if let Some(d) = sideways.first() {
        return Some(*d);
    }
    let away = approach_dir(threat, at);
    match away {
        Some(d) if open.contains(&d) => Some(d),
        // Standing on the bomb: any open direction will do
        _ => open.first().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::layers_from;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn bearing_matches_screen_axes() {
        let o = Vec2::new(5.0, 5.0);
        assert!((bearing(o, Vec2::new(9.0, 5.0)) - 0.0).abs() < 0.01);
        assert!((bearing(o, Vec2::new(5.0, 9.0)) - 90.0).abs() < 0.01);
        assert!((bearing(o, Vec2::new(1.0, 5.0)) - 180.0).abs() < 0.01);
        assert!((bearing(o, Vec2::new(5.0, 1.0)) - 270.0).abs() < 0.01);
    }

    #[test]
    fn sees_player_in_window_to_the_left() {
        let map = layers_from(&[
            "          ",
            "          ",
            "          ",
        ]);
        let eye = Vec2::new(8.0, 1.0);
        // Straight left: 180°
        assert!(can_see(&map, eye, Dir::Left, Vec2::new(2.0, 1.0), 8.0, 10.0));
        // Behind the enemy
        assert!(!can_see(&map, eye, Dir::Right, Vec2::new(2.0, 1.0), 8.0, 10.0));
        // Off by ~18°: outside the 170–190 window
        assert!(!can_see(&map, eye, Dir::Left, Vec2::new(2.0, 3.0), 8.0, 10.0));
        // Out of range
        assert!(!can_see(&map, eye, Dir::Left, Vec2::new(2.0, 1.0), 4.0, 10.0));
    }

    #[test]
    fn wall_blocks_sight() {
        let map = layers_from(&[
            "    #     ",
        ]);
        let eye = Vec2::new(8.0, 0.0);
        assert!(!can_see(&map, eye, Dir::Left, Vec2::new(1.0, 0.0), 10.0, 10.0));
        assert!(can_see(&map, eye, Dir::Left, Vec2::new(5.0, 0.0), 10.0, 10.0));
    }

    #[test]
    fn open_directions_respect_walls_and_edges() {
        let map = layers_from(&[
            " # ",
            "   ",
        ]);
        let dirs = open_directions(&map, 0, 0);
        assert_eq!(dirs, vec![Dir::Down]);
    }

    #[test]
    fn boxed_in_has_no_pick() {
        let map = layers_from(&[
            "###",
            "# #",
            "###",
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_open_direction(&map, 1, 1, &mut rng), None);
    }

    #[test]
    fn random_pick_is_always_open() {
        let map = layers_from(&[
            "#  ",
            "   ",
            " # ",
        ]);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let d = pick_open_direction(&map, 1, 1, &mut rng).unwrap();
            assert!(d == Dir::Up || d == Dir::Left || d == Dir::Right);
        }
    }

    #[test]
    fn flee_sideways_off_blast_row() {
        let map = layers_from(&[
            "#####",
            "     ",
            "#####",
            "     ",
        ]);
        // Corridor on row 1, bomb two cells left: no sideways exit, run right
        let d = flee_direction(&map, Vec2::new(3.0, 1.0), &[Vec2::new(1.0, 1.0)], 3);
        assert_eq!(d, Some(Dir::Right));

        let open = layers_from(&[
            "     ",
            "     ",
            "     ",
        ]);
        let d = flee_direction(&open, Vec2::new(3.0, 1.0), &[Vec2::new(1.0, 1.0)], 3).unwrap();
        assert!(!d.is_horizontal());
    }

    #[test]
    fn no_threat_behind_wall_or_far_away() {
        let map = layers_from(&[
            "  #    ",
        ]);
        assert_eq!(flee_direction(&map, Vec2::new(4.0, 0.0), &[Vec2::new(1.0, 0.0)], 3), None);
        assert_eq!(flee_direction(&map, Vec2::new(6.0, 0.0), &[Vec2::new(3.0, 0.0)], 2), None);
        assert_eq!(flee_direction(&map, Vec2::new(6.0, 0.0), &[], 2), None);
    }
}
