//! RPS Arena Library
//!
//! A rock/paper/scissor territory simulation: entities of three kinds move
//! on a bounded board, chase what they defeat, flee what defeats them and
//! convert (or remove) whatever they overlap.
//!
//! # Layout
//!
//! - `game::spatial` - k-d tree nearest-neighbour index rebuilt every tick
//! - `game::state` - board geometry, entity storage and the deferred effect queue
//! - `game::systems` - movement strategies and interaction resolution
//! - `game::scheduler` - tick orchestration, pacing and run/stop control

pub mod config;
pub mod util;
pub mod game;
