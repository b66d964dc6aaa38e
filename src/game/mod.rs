pub mod constants;
pub mod kind;
pub mod state;
pub mod spatial;
pub mod systems;
pub mod control;
pub mod performance;
pub mod render;
pub mod scheduler;
