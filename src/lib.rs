pub mod ai;
pub mod components;
pub mod config;
pub mod enemy;
pub mod game_runtime;
pub mod generation;
pub mod input;
pub mod leveller;
pub mod pathfinding;
pub mod physics;
pub mod physics_core;
pub mod player;
pub mod projectile;
pub mod spawn;
pub mod tilemap;
pub mod world;
