//! GPU context abstraction and its backends.

pub use self::context::*;
#[cfg(feature = "glow")]
pub use self::glow_context::GlowContext;
pub use self::recording_context::{CallLog, GlCall, RecordingContext};

mod context;
#[cfg(feature = "glow")]
mod glow_context;
mod recording_context;
