/// Shared entity vocabulary: positions, directions, frame input,
/// the `Collidable` capability and the sprite selection handed to the
/// render sink. Concrete entities live in `player`, `enemy` and `bomb`.

/// 2D coordinate in tile units. Cell (x, y) is centred on (x, y).
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Centre of cell (x, y).
    pub fn of_cell(x: i32, y: i32) -> Self {
        Vec2 { x: x as f32, y: y as f32 }
    }

    pub fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }

    pub fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }

    pub fn scale(self, k: f32) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dist(self, o: Vec2) -> f32 {
        self.sub(o).length()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// The cell this point falls in.
    pub fn cell(self) -> (i32, i32) {
        ((self.x + 0.5).floor() as i32, (self.y + 0.5).floor() as i32)
    }

    /// Snap to the centre of the containing cell.
    pub fn snapped(self) -> Vec2 {
        let (cx, cy) = self.cell();
        Vec2::of_cell(cx, cy)
    }

    /// Pixel position for the render boundary: cell (0, 0) is drawn at
    /// (0, 0) with a `tile_px` square sprite.
    pub fn to_pixels(self, tile_px: u32) -> (f32, f32) {
        let px = tile_px as f32;
        (self.x * px, self.y * px)
    }
}

/// Cardinal direction. Screen convention: y grows downward.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }

    pub fn unit(self) -> Vec2 {
        let (dx, dy) = self.delta();
        Vec2::new(dx as f32, dy as f32)
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Dir::Left | Dir::Right)
    }

    /// Direction of a nonzero vector along its dominant axis.
    pub fn dominant(v: Vec2) -> Option<Dir> {
        if v.is_zero() { return None; }
        if v.x.abs() >= v.y.abs() {
            Some(if v.x < 0.0 { Dir::Left } else { Dir::Right })
        } else {
            Some(if v.y < 0.0 { Dir::Up } else { Dir::Down })
        }
    }
}

/// Per-tick input snapshot. Movement is level-triggered (held keys),
/// `place_bomb` is edge-triggered (fresh press).
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub place_bomb: bool,
}

impl FrameInput {
    /// Requested step. Vertical wins over horizontal when both are held.
    pub fn movement(&self) -> Option<Dir> {
        if self.up { Some(Dir::Up) }
        else if self.down { Some(Dir::Down) }
        else if self.left { Some(Dir::Left) }
        else if self.right { Some(Dir::Right) }
        else { None }
    }
}

/// Anything with a position, a bounding circle and a reaction to blasts.
pub trait Collidable {
    fn position(&self) -> Vec2;
    fn radius(&self) -> f32;

    /// React to a blast cell centred at `center` with the given half-extent.
    /// Returns true if the entity was hurt by it.
    fn receive_blast(&mut self, center: Vec2, half_extent: f32) -> bool;

    /// Bounding-circle overlap.
    fn overlaps<C: Collidable>(&self, other: &C) -> bool
    where
        Self: Sized,
    {
        self.position().dist(other.position()) < self.radius() + other.radius()
    }

    /// Does the bounding circle touch the axis-aligned square around `center`?
    fn touches_square(&self, center: Vec2, half_extent: f32) -> bool {
        let p = self.position();
        let nx = p.x.clamp(center.x - half_extent, center.x + half_extent);
        let ny = p.y.clamp(center.y - half_extent, center.y + half_extent);
        p.dist(Vec2::new(nx, ny)) <= self.radius()
    }
}

/// Which sprite sheet the render sink should draw from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpriteSheet {
    PlayerIdle,
    PlayerWalk(Dir),
    PlayerDeath,
    EnemyWalk(Dir),
    EnemyDeath,
    Bomb,
    Explosion,
}

/// Sprite selection: sheet + animation frame index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Sprite {
    pub sheet: SpriteSheet,
    pub frame: usize,
}

/// Frame index for a looping animation.
pub fn loop_frame(clock: f32, frame_time: f32, frames: usize) -> usize {
    if frames == 0 || frame_time <= 0.0 { return 0; }
    (clock / frame_time) as usize % frames
}

/// Frame index for a one-shot animation (holds the last frame).
pub fn once_frame(clock: f32, frame_time: f32, frames: usize) -> usize {
    if frames == 0 || frame_time <= 0.0 { return 0; }
    ((clock / frame_time) as usize).min(frames - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dot { at: Vec2, r: f32 }

    impl Collidable for Dot {
        fn position(&self) -> Vec2 { self.at }
        fn radius(&self) -> f32 { self.r }
        fn receive_blast(&mut self, center: Vec2, half_extent: f32) -> bool {
            self.touches_square(center, half_extent)
        }
    }

    #[test]
    fn cell_rounds_to_nearest_centre() {
        assert_eq!(Vec2::new(4.49, 2.0).cell(), (4, 2));
        assert_eq!(Vec2::new(4.5, 2.0).cell(), (5, 2));
        assert_eq!(Vec2::new(-0.4, 0.0).cell(), (0, 0));
        assert_eq!(Vec2::new(-0.6, 0.0).cell(), (-1, 0));
    }

    #[test]
    fn dominant_axis() {
        assert_eq!(Dir::dominant(Vec2::new(-3.0, 1.0)), Some(Dir::Left));
        assert_eq!(Dir::dominant(Vec2::new(0.5, 2.0)), Some(Dir::Down));
        assert_eq!(Dir::dominant(Vec2::ZERO), None);
    }

    #[test]
    fn circle_overlap() {
        let a = Dot { at: Vec2::new(0.0, 0.0), r: 0.4 };
        let b = Dot { at: Vec2::new(0.7, 0.0), r: 0.4 };
        let c = Dot { at: Vec2::new(1.0, 0.0), r: 0.4 };
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn square_touch() {
        let mut d = Dot { at: Vec2::new(5.5, 5.0), r: 0.4 };
        assert!(d.receive_blast(Vec2::new(5.0, 5.0), 0.5));
        d.at = Vec2::new(7.0, 5.0);
        assert!(!d.receive_blast(Vec2::new(5.0, 5.0), 0.5));
    }

    #[test]
    fn frames() {
        assert_eq!(loop_frame(0.35, 0.1, 4), 3);
        assert_eq!(loop_frame(0.45, 0.1, 4), 0);
        assert_eq!(once_frame(9.0, 0.5, 5), 4);
    }

    #[test]
    fn input_priority() {
        let i = FrameInput { left: true, up: true, ..Default::default() };
        assert_eq!(i.movement(), Some(Dir::Up));
        assert_eq!(FrameInput::default().movement(), None);
    }
}
