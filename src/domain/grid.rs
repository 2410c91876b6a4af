/// Grid map adapter: layered tile storage with bounds-checked queries.
///
/// ## Layers
///
/// Two layers, queried through the same `TileGrid` interface:
///   - `terrain`  : what the cell looks like (destructible blocks, walls).
///   - `collision`: optional parallel grid used purely for movement blocking.
///
/// When no collision layer is present, the terrain layer blocks movement.
///
/// ## Bounds
///
/// Coordinates are signed so that callers can probe past the edge freely.
/// Out of bounds reads as "no tile" from `tile()` but as *blocked* from
/// `MapLayers::is_blocked()`. Mutations out of bounds are no-ops.

use super::tile::Tile;

/// Pixels per tile at the render boundary.
pub const TILE_PX: u32 = 32;

/// Tile lookup / removal interface shared by every layer.
pub trait TileGrid {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn tile_size(&self) -> u32;

    /// Tile at (x, y), or `None` if empty or out of bounds.
    fn tile(&self, x: i32, y: i32) -> Option<Tile>;

    /// Empty the cell at (x, y). Out of bounds is ignored.
    fn clear_tile(&mut self, x: i32, y: i32);

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }
}

/// A single rectangular tile layer.
#[derive(Clone, Debug)]
pub struct TileLayer {
    width: usize,
    height: usize,
    tile_size: u32,
    cells: Vec<Option<Tile>>,
}

impl TileLayer {
    pub fn new(width: usize, height: usize) -> Self {
        TileLayer {
            width,
            height,
            tile_size: TILE_PX,
            cells: vec![None; width * height],
        }
    }

    /// Place a tile at (x, y). Out of bounds is ignored.
    pub fn set_tile(&mut self, x: i32, y: i32, tile: Option<Tile>) {
        if self.in_bounds(x, y) {
            let idx = self.index(x, y);
            self.cells[idx] = tile;
        }
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.cells.iter().filter(|c| **c == Some(tile)).count()
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width + x as usize
    }
}

impl TileGrid for TileLayer {
    fn width(&self) -> usize { self.width }
    fn height(&self) -> usize { self.height }
    fn tile_size(&self) -> u32 { self.tile_size }

    #[inline]
    fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        if self.in_bounds(x, y) {
            self.cells[self.index(x, y)]
        } else {
            None
        }
    }

    fn clear_tile(&mut self, x: i32, y: i32) {
        self.set_tile(x, y, None);
    }
}

/// Terrain + optional collision layer. Exclusive owner of cell state:
/// entities query it, only bomb detonation mutates it.
#[derive(Clone, Debug)]
pub struct MapLayers {
    pub terrain: TileLayer,
    pub collision: Option<TileLayer>,
}

impl MapLayers {
    pub fn new(terrain: TileLayer, collision: Option<TileLayer>) -> Self {
        MapLayers { terrain, collision }
    }

    pub fn width(&self) -> usize { self.terrain.width() }
    pub fn height(&self) -> usize { self.terrain.height() }

    /// Is the cell closed to movement? Out of bounds = blocked.
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        if !self.terrain.in_bounds(x, y) {
            return true;
        }
        match &self.collision {
            Some(layer) => layer.tile(x, y).is_some(),
            None => self.terrain.tile(x, y).is_some(),
        }
    }

    /// Clear a cell in the terrain layer and, if present, the collision layer.
    pub fn destroy(&mut self, x: i32, y: i32) {
        self.terrain.clear_tile(x, y);
        if let Some(layer) = self.collision.as_mut() {
            layer.clear_tile(x, y);
        }
    }
}

/// Build layers from ASCII rows (`#` wall, `:` ground, `o` rock, `=` wood).
/// Every tile is mirrored into the collision layer.
#[cfg(test)]
pub fn layers_from(rows: &[&str]) -> MapLayers {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    let mut terrain = TileLayer::new(width, height);
    let mut collision = TileLayer::new(width, height);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let tile = Tile::from_glyph(ch);
            terrain.set_tile(x as i32, y as i32, tile);
            collision.set_tile(x as i32, y as i32, tile);
        }
    }
    MapLayers::new(terrain, Some(collision))
}
