//! The GPU context abstraction.
//!
//! Every call that touches the GPU goes through the [`GlContext`] trait. The
//! renderer owns exactly one boxed context and caches the state it last applied
//! to it, so implementations stay thin: they translate each call to the
//! underlying API and never cache anything themselves.

use std::fmt;

macro_rules! gl_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({})", stringify!($name), self.0)
                }
            }
        )*
    };
}

gl_handle!(
    /// Opaque handle to a vertex or index buffer.
    BufferHandle,
    /// Opaque handle to a vertex array object.
    VertexArrayHandle,
    /// Opaque handle to a texture object.
    TextureHandle,
    /// Opaque handle to a compiled shader stage.
    ShaderHandle,
    /// Opaque handle to a linked program.
    ProgramHandle,
    /// Opaque handle to a framebuffer object.
    FramebufferHandle,
    /// Opaque handle to a uniform location inside a linked program.
    UniformLocation,
);

/// Server-side capabilities toggled with `enable`/`disable`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    CullFace,
    DepthTest,
    StencilTest,
    ScissorTest,
}

/// Blend factors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend equations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Polygon faces, used for culling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

/// Winding of front-facing polygons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrontFace {
    Cw,
    #[default]
    Ccw,
}

impl FrontFace {
    /// The opposite winding.
    pub fn flipped(self) -> Self {
        match self {
            FrontFace::Cw => FrontFace::Ccw,
            FrontFace::Ccw => FrontFace::Cw,
        }
    }
}

/// Depth comparison functions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DepthFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Buffer binding points.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum BufferTarget {
    #[default]
    Array,
    ElementArray,
}

/// Buffer usage hints.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// Primitive topology of a draw call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Component types of vertex data and pixel data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
}

impl DataType {
    /// Size in bytes of one component.
    pub fn byte_size(self) -> usize {
        match self {
            DataType::Byte | DataType::UnsignedByte => 1,
            DataType::Short | DataType::UnsignedShort => 2,
            DataType::Int | DataType::UnsignedInt | DataType::Float => 4,
        }
    }
}

/// Shader stages.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// GLSL types reported by program introspection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlslType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2d,
    SamplerCube,
    Other(u32),
}

impl GlslType {
    /// Parses a GLSL type keyword.
    pub fn from_keyword(keyword: &str) -> Option<GlslType> {
        let ty = match keyword {
            "float" => GlslType::Float,
            "vec2" => GlslType::FloatVec2,
            "vec3" => GlslType::FloatVec3,
            "vec4" => GlslType::FloatVec4,
            "int" => GlslType::Int,
            "ivec2" => GlslType::IntVec2,
            "ivec3" => GlslType::IntVec3,
            "ivec4" => GlslType::IntVec4,
            "bool" => GlslType::Bool,
            "bvec2" => GlslType::BoolVec2,
            "bvec3" => GlslType::BoolVec3,
            "bvec4" => GlslType::BoolVec4,
            "mat2" => GlslType::FloatMat2,
            "mat3" => GlslType::FloatMat3,
            "mat4" => GlslType::FloatMat4,
            "sampler2D" => GlslType::Sampler2d,
            "samplerCube" => GlslType::SamplerCube,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether values of this type are uploaded through the integer uniform entry points.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            GlslType::Int
                | GlslType::IntVec2
                | GlslType::IntVec3
                | GlslType::IntVec4
                | GlslType::Bool
                | GlslType::BoolVec2
                | GlslType::BoolVec3
                | GlslType::BoolVec4
                | GlslType::Sampler2d
                | GlslType::SamplerCube
        )
    }

    /// Number of consecutive attribute locations a value of this type occupies.
    pub fn attribute_slots(self) -> u32 {
        match self {
            GlslType::FloatMat2 => 2,
            GlslType::FloatMat3 => 3,
            GlslType::FloatMat4 => 4,
            _ => 1,
        }
    }
}

/// Texture binding targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureTarget {
    #[default]
    Texture2d,
    CubeMap,
}

/// Pixel formats, used both as internal and external formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    #[default]
    Rgba,
    Rgb,
    Alpha,
    Luminance,
    LuminanceAlpha,
}


/// Texture minification/magnification filters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

/// Texture coordinate wrapping modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// A texture sampler parameter and its value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TexParameter {
    MinFilter(TextureFilter),
    MagFilter(TextureFilter),
    WrapS(TextureWrap),
    WrapT(TextureWrap),
    MaxAnisotropy(f32),
}

/// Integer/float state queried once at renderer creation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Parameter {
    MaxCombinedTextureImageUnits,
    MaxTextureMaxAnisotropy,
}

bitflags! {
    /// Buffers cleared by [`GlContext::clear`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ClearFlags: u8 {
        const COLOR   = 0b001;
        const DEPTH   = 0b010;
        const STENCIL = 0b100;
    }
}

/// An active uniform as reported by program introspection.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveUniformInfo {
    /// Full GLSL name, e.g. `lights[1].color` or `weights[0]`.
    pub name: String,
    /// Array size (1 for non-arrays).
    pub size: i32,
    /// Declared type.
    pub kind: GlslType,
    /// Location, `None` when the uniform was optimized away.
    pub location: Option<UniformLocation>,
}

/// An active vertex attribute as reported by program introspection.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveAttributeInfo {
    pub name: String,
    pub size: i32,
    pub kind: GlslType,
    /// Bound location, `None` for built-ins such as `gl_VertexID`.
    pub location: Option<u32>,
}

/// Uniform payload handed to [`GlContext::uniform`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UniformData<'a> {
    Floats(&'a [f32]),
    Ints(&'a [i32]),
}

/// The set of GPU entry points the engine relies on.
///
/// Methods mirror the WebGL2 / OpenGL ES 3.0 API, with typed enums in place of raw
/// `GLenum`s. Creation methods return `Err` with a driver message when the object
/// cannot be allocated.
pub trait GlContext {
    /// Whether a drawable surface backs this context.
    fn is_surface_available(&self) -> bool {
        true
    }
    /// Queries an integer parameter.
    fn parameter_i32(&mut self, parameter: Parameter) -> i32;
    /// Queries a float parameter.
    fn parameter_f32(&mut self, parameter: Parameter) -> f32;
    /// Names of every extension the context supports.
    fn supported_extensions(&self) -> Vec<String>;

    fn enable(&mut self, capability: Capability);
    fn disable(&mut self, capability: Capability);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );
    fn blend_equation(&mut self, mode: BlendEquation);
    fn blend_equation_separate(&mut self, mode_rgb: BlendEquation, mode_alpha: BlendEquation);
    fn cull_face(&mut self, face: Face);
    fn front_face(&mut self, front_face: FrontFace);
    fn depth_mask(&mut self, write: bool);
    fn depth_func(&mut self, func: DepthFunc);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&mut self, flags: ClearFlags);
    fn unpack_alignment(&mut self, alignment: i32);

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle, String>;
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);
    /// Attaches `texture` as the color buffer of the bound framebuffer.
    fn framebuffer_texture_2d(&mut self, target: TextureTarget, texture: TextureHandle, level: i32);

    fn create_buffer(&mut self) -> Result<BufferHandle, String>;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>);
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: i32, data: &[u8]);
    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, String>;
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: i32,
        data_type: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32);

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, String>;
    fn shader_source(&mut self, shader: ShaderHandle, source: &str);
    fn compile_shader(&mut self, shader: ShaderHandle);
    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool;
    fn shader_info_log(&mut self, shader: ShaderHandle) -> String;
    fn delete_shader(&mut self, shader: ShaderHandle);

    fn create_program(&mut self) -> Result<ProgramHandle, String>;
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);
    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);
    fn link_program(&mut self, program: ProgramHandle);
    fn program_link_status(&mut self, program: ProgramHandle) -> bool;
    fn program_info_log(&mut self, program: ProgramHandle) -> String;
    fn use_program(&mut self, program: Option<ProgramHandle>);
    fn delete_program(&mut self, program: ProgramHandle);
    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveUniformInfo>;
    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveAttributeInfo>;
    /// Uploads a uniform. `kind` selects the entry point (`uniform3fv`, `uniformMatrix4fv`, ...).
    fn uniform(&mut self, location: UniformLocation, kind: GlslType, data: UniformData<'_>);

    fn create_texture(&mut self) -> Result<TextureHandle, String>;
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureHandle>);
    fn tex_parameter(&mut self, target: TextureTarget, parameter: TexParameter);
    fn tex_image_2d(
        &mut self,
        target: TextureTarget,
        level: i32,
        internal_format: PixelFormat,
        width: u32,
        height: u32,
        format: PixelFormat,
        data_type: DataType,
        pixels: Option<&[u8]>,
    );
    fn generate_mipmap(&mut self, target: TextureTarget);
    fn delete_texture(&mut self, texture: TextureHandle);

    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32);
    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: i32, count: i32, instances: i32);
    fn draw_elements(&mut self, mode: DrawMode, count: i32, element_type: DataType, offset: i32);
    fn draw_elements_instanced(
        &mut self,
        mode: DrawMode,
        count: i32,
        element_type: DataType,
        offset: i32,
        instances: i32,
    );
}
