/// Bombs: fuse timer, one-shot detonation and cross-shaped blast propagation.
///
/// ## Lifecycle
///
/// ```text
///   Armed ── arm_timer ≥ arm_duration ──► Exploding ── explosion_duration ──► Spent
/// ```
///
/// `advance` reports the Armed → Exploding edge exactly once; the session
/// then calls `detonate`, which refuses to run a second time.
///
/// ## Propagation
///
/// The bomb's own cell is always in the blast. From there, four rays
/// (up, down, left, right) walk `radius` cells each:
///
/// | Cell on the ray   | Effect                    | Ray continues? |
/// |-------------------|---------------------------|----------------|
/// | out of bounds     | none                      | no             |
/// | `Wall`            | none (indestructible)     | no             |
/// | destructible tile | cleared in every layer    | yes            |
/// | empty             | in blast                  | yes            |

use tracing::trace;

use super::entity::{loop_frame, once_frame, Collidable, Dir, Sprite, SpriteSheet, Vec2};
use super::grid::{MapLayers, TileGrid};
use super::tile::Tile;

/// Half-extent of one blast cell's hit square, in tiles.
pub const BLAST_HALF_EXTENT: f32 = 0.5;

const FUSE_BLINK: f32 = 0.25;
const EXPLOSION_FRAMES: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BombState {
    Armed,
    Exploding,
    Spent,
}

#[derive(Clone, Debug)]
pub struct Bomb {
    pub cell: (i32, i32),
    pub arm_timer: f32,
    pub arm_duration: f32,
    pub explosion_elapsed: f32,
    pub explosion_duration: f32,
    pub state: BombState,
    /// Cells reached by the blast, for drawing the flames.
    pub blast_cells: Vec<(i32, i32)>,
    detonated: bool,
}

/// Outcome of one detonation.
#[derive(Clone, Debug, Default)]
pub struct Blast {
    pub origin: (i32, i32),
    pub cells: Vec<(i32, i32)>,
    pub destroyed: Vec<((i32, i32), Tile)>,
}

impl Blast {
    /// Deliver the blast to one entity. True if it was hurt.
    pub fn strike<C: Collidable>(&self, target: &mut C) -> bool {
        self.cells
            .iter()
            .any(|&(x, y)| target.receive_blast(Vec2::of_cell(x, y), BLAST_HALF_EXTENT))
    }
}

impl Bomb {
    pub fn place(cell: (i32, i32), arm_duration: f32, explosion_duration: f32) -> Self {
        Bomb {
            cell,
            arm_timer: 0.0,
            arm_duration,
            explosion_elapsed: 0.0,
            explosion_duration,
            state: BombState::Armed,
            blast_cells: Vec::new(),
            detonated: false,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::of_cell(self.cell.0, self.cell.1)
    }

    pub fn is_armed(&self) -> bool { self.state == BombState::Armed }
    pub fn is_exploding(&self) -> bool { self.state == BombState::Exploding }
    pub fn is_spent(&self) -> bool { self.state == BombState::Spent }

    /// Advance timers. Returns true on the tick the bomb starts exploding.
    pub fn advance(&mut self, dt: f32) -> bool {
        match self.state {
            BombState::Armed => {
                self.arm_timer += dt;
                if self.arm_timer >= self.arm_duration {
                    self.state = BombState::Exploding;
                    return true;
                }
            }
            BombState::Exploding => {
                self.explosion_elapsed += dt;
                if self.explosion_elapsed >= self.explosion_duration {
                    self.state = BombState::Spent;
                }
            }
            BombState::Spent => {}
        }
        false
    }

    /// Propagate the blast through `map`, clearing destructible tiles.
    /// `None` unless exploding and not yet detonated.
    pub fn detonate(&mut self, map: &mut MapLayers, radius: u32) -> Option<Blast> {
        if self.state != BombState::Exploding || self.detonated {
            return None;
        }
        self.detonated = true;

        let mut blast = Blast { origin: self.cell, cells: vec![self.cell], destroyed: Vec::new() };
        let (ox, oy) = self.cell;

        for dir in Dir::ALL {
            let (dx, dy) = dir.delta();
            for dist in 1..=radius as i32 {
                let (x, y) = (ox + dx * dist, oy + dy * dist);
                if !map.terrain.in_bounds(x, y) { break; }
                match map.terrain.tile(x, y) {
                    Some(tile) if tile.stops_blast() => break,
                    Some(tile) if tile.is_destructible() => {
                        trace!(x, y, tile_id = tile.id(), "tile destroyed");
                        map.destroy(x, y);
                        blast.destroyed.push(((x, y), tile));
                    }
                    _ => {}
                }
                blast.cells.push((x, y));
            }
        }

        self.blast_cells = blast.cells.clone();
        Some(blast)
    }

    /// `None` once spent.
    pub fn sprite(&self) -> Option<Sprite> {
        match self.state {
            BombState::Armed => Some(Sprite {
                sheet: SpriteSheet::Bomb,
                frame: loop_frame(self.arm_timer, FUSE_BLINK, 2),
            }),
            BombState::Exploding => Some(Sprite {
                sheet: SpriteSheet::Explosion,
                frame: once_frame(
                    self.explosion_elapsed,
                    self.explosion_duration / EXPLOSION_FRAMES as f32,
                    EXPLOSION_FRAMES,
                ),
            }),
            BombState::Spent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{layers_from, TileLayer};

    fn armed_at(cell: (i32, i32)) -> Bomb {
        let mut b = Bomb::place(cell, 2.0, 0.5);
        assert!(b.advance(2.0));
        b
    }

    #[test]
    fn clears_two_ground_cells_to_the_right() {
        let mut map = layers_from(&[
            "     ",
            " ::  ",
            "     ",
        ]);
        let mut bomb = armed_at((0, 1));
        let blast = bomb.detonate(&mut map, 2).unwrap();
        assert_eq!(map.terrain.tile(1, 1), None);
        assert_eq!(map.terrain.tile(2, 1), None);
        assert!(!map.is_blocked(1, 1));
        assert!(!map.is_blocked(2, 1));
        assert_eq!(blast.destroyed.len(), 2);
        assert!(blast.cells.contains(&(0, 1)));
        assert!(!blast.cells.contains(&(3, 1)));
    }

    #[test]
    fn wall_stops_the_ray() {
        let mut map = layers_from(&[
            " ::#:",
        ]);
        let mut bomb = armed_at((0, 0));
        let blast = bomb.detonate(&mut map, 4).unwrap();
        assert_eq!(map.terrain.tile(1, 0), None);
        assert_eq!(map.terrain.tile(2, 0), None);
        assert_eq!(map.terrain.tile(3, 0), Some(Tile::Wall));
        assert_eq!(map.terrain.tile(4, 0), Some(Tile::Ground));
        assert!(!blast.cells.contains(&(3, 0)));
        assert!(!blast.cells.contains(&(4, 0)));
    }

    #[test]
    fn rays_stop_at_map_edge() {
        let mut map = layers_from(&[
            "  ",
            "  ",
        ]);
        let mut bomb = armed_at((0, 0));
        let blast = bomb.detonate(&mut map, 3).unwrap();
        let mut cells = blast.cells.clone();
        cells.sort();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn works_without_collision_layer() {
        let mut terrain = TileLayer::new(3, 1);
        terrain.set_tile(1, 0, Some(Tile::Wood));
        terrain.set_tile(2, 0, Some(Tile::Rock));
        let mut map = MapLayers::new(terrain, None);
        let mut bomb = armed_at((0, 0));
        bomb.detonate(&mut map, 2).unwrap();
        assert_eq!(map.terrain.count(Tile::Wood), 0);
        assert_eq!(map.terrain.count(Tile::Rock), 0);
    }

    #[test]
    fn detonates_once() {
        let mut map = layers_from(&["   "]);
        let mut bomb = armed_at((1, 0));
        assert!(bomb.detonate(&mut map, 1).is_some());
        assert!(bomb.detonate(&mut map, 1).is_none());
        assert_eq!(bomb.blast_cells.len(), 3);
    }

    #[test]
    fn no_explosion_before_fuse_runs_out() {
        let mut map = layers_from(&[" : "]);
        let mut bomb = Bomb::place((0, 0), 2.0, 0.5);
        assert!(!bomb.advance(1.9));
        assert!(bomb.is_armed());
        assert!(bomb.detonate(&mut map, 2).is_none());
        assert_eq!(map.terrain.tile(1, 0), Some(Tile::Ground));
    }

    #[test]
    fn explosion_then_spent_and_inert() {
        let mut bomb = Bomb::place((0, 0), 1.0, 0.5);
        assert!(bomb.advance(1.0));
        assert!(bomb.is_exploding());
        assert!(!bomb.advance(0.25));
        assert_eq!(bomb.sprite().map(|s| s.sheet), Some(SpriteSheet::Explosion));
        assert!(!bomb.advance(0.25));
        assert!(bomb.is_spent());
        assert!(!bomb.advance(10.0));
        assert!(bomb.is_spent());
        assert_eq!(bomb.sprite(), None);
    }

    struct Target { at: Vec2, hurt: bool }

    impl Collidable for Target {
        fn position(&self) -> Vec2 { self.at }
        fn radius(&self) -> f32 { 0.4 }
        fn receive_blast(&mut self, center: Vec2, half_extent: f32) -> bool {
            if self.hurt || !self.touches_square(center, half_extent) { return false; }
            self.hurt = true;
            true
        }
    }

    #[test]
    fn strike_hits_entities_in_blast_cells() {
        let mut map = layers_from(&[
            "     ",
            "  #  ",
        ]);
        let mut bomb = armed_at((2, 0));
        let blast = bomb.detonate(&mut map, 2).unwrap();
        let mut near = Target { at: Vec2::new(4.0, 0.0), hurt: false };
        let mut below = Target { at: Vec2::new(2.0, 1.0), hurt: false };
        assert!(blast.strike(&mut near));
        assert!(!blast.strike(&mut below));
    }
}
