//! Procedural geometry generation.

pub use self::plane::plane;

mod plane;
