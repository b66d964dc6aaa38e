pub mod ivec2;
