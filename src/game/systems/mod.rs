pub mod movement;
pub mod interaction;
