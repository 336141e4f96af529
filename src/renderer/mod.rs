//! The renderer and its GPU state cache.

pub use self::renderer::{Parameters, RenderParams, Renderer, RendererError, RendererOptions};
pub use self::state::{BlendEquationState, BlendFunc, RenderState, UniformCacheEntry};
pub use self::warnings::{WarningLimiter, MAX_WARNINGS};

pub mod render_list;
mod renderer;
mod state;
mod warnings;
