/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and messages.

use crate::domain::tile::Tile;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PlayerStepped { x: i32, y: i32 },
    BombPlaced { x: i32, y: i32 },
    BombExploded { x: i32, y: i32 },
    TileDestroyed { x: i32, y: i32, tile: Tile },
    EnemyKilled { id: usize, x: i32, y: i32 },
    PlayerHit { lives_left: u32 },
    PlayerRespawned,
    LevelCleared { level: usize },
    GameWon,
    GameOver,
}
