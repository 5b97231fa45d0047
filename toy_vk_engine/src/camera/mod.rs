//! Camera module: orientation state and the projection used by the renderer.

mod camera;

pub use camera::{projection_matrix, Camera, MAX_PITCH, MIN_PITCH};
