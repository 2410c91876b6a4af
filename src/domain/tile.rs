/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// An empty cell is `None` in a layer, not a tile variant.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Ground, // Destructible
    Rock,   // Destructible
    Wood,   // Destructible
    Wall,   // Solid, stops blasts
}

impl Tile {
    /// Can a blast clear this tile?
    pub fn is_destructible(self) -> bool {
        matches!(self, Tile::Ground | Tile::Rock | Tile::Wood)
    }

    /// Does this tile stop blast propagation along a ray?
    pub fn stops_blast(self) -> bool {
        matches!(self, Tile::Wall)
    }

    /// Legacy numeric tile id used by the original tile sets.
    pub fn id(self) -> u32 {
        match self {
            Tile::Wall => 1,
            Tile::Ground => 2,
            Tile::Rock => 3,
            Tile::Wood => 7,
        }
    }

    pub fn from_id(id: u32) -> Option<Tile> {
        match id {
            1 => Some(Tile::Wall),
            2 => Some(Tile::Ground),
            3 => Some(Tile::Rock),
            7 => Some(Tile::Wood),
            _ => None,
        }
    }

    /// Level-file glyph → tile. `None` for empty or entity markers.
    pub fn from_glyph(c: char) -> Option<Tile> {
        match c {
            '#' => Some(Tile::Wall),
            ':' => Some(Tile::Ground),
            'o' => Some(Tile::Rock),
            '=' => Some(Tile::Wood),
            _ => None,
        }
    }
}
