pub mod camera;
pub mod collision;
pub mod editor;
pub mod geometry;
pub mod map_file;
pub mod overlay;
pub mod portal;
pub mod renderer;
pub mod scaler;
pub mod world;
