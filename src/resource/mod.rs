//! GPU resources: buffers, programs and textures.

pub use self::attribute::{Attribute, AttributeData};
pub use self::geometry::{Bounds, DrawRange, Geometry, GeometryError};
pub use self::program::{
    add_line_numbers, ActiveAttribute, ActiveUniform, Program, ProgramError, ProgramOptions,
    ProgramState,
};
pub use self::texture::{Texture, TextureOptions, TextureRef};
pub use self::uniform::{UniformPath, UniformValue, Uniforms};

mod attribute;
mod geometry;
mod program;
mod texture;
mod uniform;
