//! Perspective and orthographic cameras.

pub use self::camera::{Camera, CameraOptions, Projection};
pub use self::frustum::Frustum;

mod camera;
mod frustum;
