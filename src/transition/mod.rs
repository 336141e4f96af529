//! Slide transitions: shader selection, progress easing and the [`Slider`] itself.

pub use self::debounce::SwapDebounce;
pub use self::easing::{ease_in_out_cos, AnimationStep, ProgressAnimation};
pub use self::shader::{
    GeometrySource, ShaderPool, ShaderSelection, TransitionShader, UniformDeclaration,
    DEFAULT_VERTEX_SRC, FRAGMENT_COMMON_SRC,
};
pub use self::slider::{Slider, SliderOptions, State, TransitionError};

mod debounce;
mod easing;
mod shader;
mod slider;
