pub mod ai;
pub mod bomb;
pub mod enemy;
pub mod entity;
pub mod grid;
pub mod player;
pub mod rules;
pub mod tile;
