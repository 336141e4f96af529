//! [`GlContext`] implementation on top of `glow`, for native OpenGL 3.3+ and WebGL2.

use std::collections::HashMap;

use glow::HasContext;

use super::context::*;

// EXT_texture_filter_anisotropic
const TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;
const MAX_TEXTURE_MAX_ANISOTROPY: u32 = 0x84FF;

/// Maps the engine's `u32` handles to the backend's native objects.
struct Slots<T> {
    next: u32,
    objects: HashMap<u32, T>,
}

impl<T: Clone> Slots<T> {
    fn new() -> Self {
        Slots {
            next: 1,
            objects: HashMap::new(),
        }
    }

    fn insert(&mut self, object: T) -> u32 {
        let id = self.next;
        self.next += 1;
        let _ = self.objects.insert(id, object);
        id
    }

    fn get(&self, id: u32) -> Option<T> {
        self.objects.get(&id).cloned()
    }

    fn remove(&mut self, id: u32) -> Option<T> {
        self.objects.remove(&id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.objects.len()
    }
}

/// Uniform locations, grouped by the program they were queried from.
///
/// Locations die with their program, so they are released by [`Self::release`]
/// when the program is deleted or introspected again.
struct UniformSlots<T> {
    slots: Slots<T>,
    by_program: HashMap<u32, Vec<u32>>,
}

impl<T: Clone> UniformSlots<T> {
    fn new() -> Self {
        UniformSlots {
            slots: Slots::new(),
            by_program: HashMap::new(),
        }
    }

    fn insert(&mut self, program: u32, location: T) -> u32 {
        let id = self.slots.insert(location);
        self.by_program.entry(program).or_default().push(id);
        id
    }

    fn get(&self, id: u32) -> Option<T> {
        self.slots.get(id)
    }

    fn release(&mut self, program: u32) {
        for id in self.by_program.remove(&program).unwrap_or_default() {
            let _ = self.slots.remove(id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// A GPU context backed by a `glow::Context`.
pub struct GlowContext {
    gl: glow::Context,
    buffers: Slots<glow::Buffer>,
    vertex_arrays: Slots<glow::VertexArray>,
    textures: Slots<glow::Texture>,
    shaders: Slots<glow::Shader>,
    programs: Slots<glow::Program>,
    framebuffers: Slots<glow::Framebuffer>,
    uniform_locations: UniformSlots<glow::UniformLocation>,
}

impl GlowContext {
    /// Wraps an already current `glow` context.
    pub fn new(gl: glow::Context) -> Self {
        log::debug!(
            "Created glow context: {}",
            unsafe { gl.get_parameter_string(glow::VERSION) }
        );

        GlowContext {
            gl,
            buffers: Slots::new(),
            vertex_arrays: Slots::new(),
            textures: Slots::new(),
            shaders: Slots::new(),
            programs: Slots::new(),
            framebuffers: Slots::new(),
            uniform_locations: UniformSlots::new(),
        }
    }

    /// The wrapped `glow` context.
    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }
}

fn capability(capability: Capability) -> u32 {
    match capability {
        Capability::Blend => glow::BLEND,
        Capability::CullFace => glow::CULL_FACE,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::StencilTest => glow::STENCIL_TEST,
        Capability::ScissorTest => glow::SCISSOR_TEST,
    }
}

fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

fn blend_equation(mode: BlendEquation) -> u32 {
    match mode {
        BlendEquation::Add => glow::FUNC_ADD,
        BlendEquation::Subtract => glow::FUNC_SUBTRACT,
        BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendEquation::Min => glow::MIN,
        BlendEquation::Max => glow::MAX,
    }
}

fn depth_func(func: DepthFunc) -> u32 {
    match func {
        DepthFunc::Never => glow::NEVER,
        DepthFunc::Less => glow::LESS,
        DepthFunc::Equal => glow::EQUAL,
        DepthFunc::LessEqual => glow::LEQUAL,
        DepthFunc::Greater => glow::GREATER,
        DepthFunc::NotEqual => glow::NOTEQUAL,
        DepthFunc::GreaterEqual => glow::GEQUAL,
        DepthFunc::Always => glow::ALWAYS,
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

fn draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Points => glow::POINTS,
        DrawMode::Lines => glow::LINES,
        DrawMode::LineLoop => glow::LINE_LOOP,
        DrawMode::LineStrip => glow::LINE_STRIP,
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
        DrawMode::TriangleFan => glow::TRIANGLE_FAN,
    }
}

fn data_type(data_type: DataType) -> u32 {
    match data_type {
        DataType::Byte => glow::BYTE,
        DataType::UnsignedByte => glow::UNSIGNED_BYTE,
        DataType::Short => glow::SHORT,
        DataType::UnsignedShort => glow::UNSIGNED_SHORT,
        DataType::Int => glow::INT,
        DataType::UnsignedInt => glow::UNSIGNED_INT,
        DataType::Float => glow::FLOAT,
    }
}

fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2d => glow::TEXTURE_2D,
        TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
    }
}

fn pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Rgba => glow::RGBA,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Alpha => glow::ALPHA,
        PixelFormat::Luminance => glow::LUMINANCE,
        PixelFormat::LuminanceAlpha => glow::LUMINANCE_ALPHA,
    }
}

fn texture_filter(filter: TextureFilter) -> i32 {
    (match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
        TextureFilter::LinearMipmapNearest => glow::LINEAR_MIPMAP_NEAREST,
        TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn texture_wrap(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn glsl_type(raw: u32) -> GlslType {
    match raw {
        glow::FLOAT => GlslType::Float,
        glow::FLOAT_VEC2 => GlslType::FloatVec2,
        glow::FLOAT_VEC3 => GlslType::FloatVec3,
        glow::FLOAT_VEC4 => GlslType::FloatVec4,
        glow::INT => GlslType::Int,
        glow::INT_VEC2 => GlslType::IntVec2,
        glow::INT_VEC3 => GlslType::IntVec3,
        glow::INT_VEC4 => GlslType::IntVec4,
        glow::BOOL => GlslType::Bool,
        glow::BOOL_VEC2 => GlslType::BoolVec2,
        glow::BOOL_VEC3 => GlslType::BoolVec3,
        glow::BOOL_VEC4 => GlslType::BoolVec4,
        glow::FLOAT_MAT2 => GlslType::FloatMat2,
        glow::FLOAT_MAT3 => GlslType::FloatMat3,
        glow::FLOAT_MAT4 => GlslType::FloatMat4,
        glow::SAMPLER_2D => GlslType::Sampler2d,
        glow::SAMPLER_CUBE => GlslType::SamplerCube,
        other => GlslType::Other(other),
    }
}

impl GlContext for GlowContext {
    fn parameter_i32(&mut self, parameter: Parameter) -> i32 {
        let raw = match parameter {
            Parameter::MaxCombinedTextureImageUnits => glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS,
            Parameter::MaxTextureMaxAnisotropy => MAX_TEXTURE_MAX_ANISOTROPY,
        };
        unsafe { self.gl.get_parameter_i32(raw) }
    }

    fn parameter_f32(&mut self, parameter: Parameter) -> f32 {
        let raw = match parameter {
            Parameter::MaxCombinedTextureImageUnits => glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS,
            Parameter::MaxTextureMaxAnisotropy => MAX_TEXTURE_MAX_ANISOTROPY,
        };
        unsafe { self.gl.get_parameter_f32(raw) }
    }

    fn supported_extensions(&self) -> Vec<String> {
        self.gl.supported_extensions().iter().cloned().collect()
    }

    fn enable(&mut self, cap: Capability) {
        unsafe { self.gl.enable(capability(cap)) }
    }

    fn disable(&mut self, cap: Capability) {
        unsafe { self.gl.disable(capability(cap)) }
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(blend_factor(src), blend_factor(dst)) }
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        unsafe {
            self.gl.blend_func_separate(
                blend_factor(src_rgb),
                blend_factor(dst_rgb),
                blend_factor(src_alpha),
                blend_factor(dst_alpha),
            )
        }
    }

    fn blend_equation(&mut self, mode: BlendEquation) {
        unsafe { self.gl.blend_equation(blend_equation(mode)) }
    }

    fn blend_equation_separate(&mut self, mode_rgb: BlendEquation, mode_alpha: BlendEquation) {
        unsafe {
            self.gl
                .blend_equation_separate(blend_equation(mode_rgb), blend_equation(mode_alpha))
        }
    }

    fn cull_face(&mut self, face: Face) {
        let raw = match face {
            Face::Front => glow::FRONT,
            Face::Back => glow::BACK,
            Face::FrontAndBack => glow::FRONT_AND_BACK,
        };
        unsafe { self.gl.cull_face(raw) }
    }

    fn front_face(&mut self, front_face: FrontFace) {
        let raw = match front_face {
            FrontFace::Cw => glow::CW,
            FrontFace::Ccw => glow::CCW,
        };
        unsafe { self.gl.front_face(raw) }
    }

    fn depth_mask(&mut self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn depth_func(&mut self, func: DepthFunc) {
        unsafe { self.gl.depth_func(depth_func(func)) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&mut self, flags: ClearFlags) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(mask) }
    }

    fn unpack_alignment(&mut self, alignment: i32) {
        unsafe { self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment) }
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle, String> {
        let framebuffer = unsafe { self.gl.create_framebuffer()? };
        Ok(FramebufferHandle(self.framebuffers.insert(framebuffer)))
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        let raw = framebuffer.and_then(|f| self.framebuffers.get(f.0));
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, raw) }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if let Some(raw) = self.framebuffers.remove(framebuffer.0) {
            unsafe { self.gl.delete_framebuffer(raw) }
        }
    }

    fn framebuffer_texture_2d(&mut self, target: TextureTarget, texture: TextureHandle, level: i32) {
        let raw = self.textures.get(texture.0);
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                texture_target(target),
                raw,
                level,
            )
        }
    }

    fn create_buffer(&mut self) -> Result<BufferHandle, String> {
        let buffer = unsafe { self.gl.create_buffer()? };
        Ok(BufferHandle(self.buffers.insert(buffer)))
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        let raw = buffer.and_then(|b| self.buffers.get(b.0));
        unsafe { self.gl.bind_buffer(buffer_target(target), raw) }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, buffer_usage(usage))
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: i32, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(buffer_target(target), offset, data)
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(raw) = self.buffers.remove(buffer.0) {
            unsafe { self.gl.delete_buffer(raw) }
        }
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, String> {
        let vao = unsafe { self.gl.create_vertex_array()? };
        Ok(VertexArrayHandle(self.vertex_arrays.insert(vao)))
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        let raw = vertex_array.and_then(|v| self.vertex_arrays.get(v.0));
        unsafe { self.gl.bind_vertex_array(raw) }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if let Some(raw) = self.vertex_arrays.remove(vertex_array.0) {
            unsafe { self.gl.delete_vertex_array(raw) }
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: i32,
        ty: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(location, size, data_type(ty), normalized, stride, offset)
        }
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(location, divisor) }
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, String> {
        let raw_stage = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = unsafe { self.gl.create_shader(raw_stage)? };
        Ok(ShaderHandle(self.shaders.insert(shader)))
    }

    fn shader_source(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(raw) = self.shaders.get(shader.0) {
            unsafe { self.gl.shader_source(raw, source) }
        }
    }

    fn compile_shader(&mut self, shader: ShaderHandle) {
        if let Some(raw) = self.shaders.get(shader.0) {
            unsafe { self.gl.compile_shader(raw) }
        }
    }

    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool {
        self.shaders
            .get(shader.0)
            .is_some_and(|raw| unsafe { self.gl.get_shader_compile_status(raw) })
    }

    fn shader_info_log(&mut self, shader: ShaderHandle) -> String {
        self.shaders
            .get(shader.0)
            .map(|raw| unsafe { self.gl.get_shader_info_log(raw) })
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(raw) = self.shaders.remove(shader.0) {
            unsafe { self.gl.delete_shader(raw) }
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle, String> {
        let program = unsafe { self.gl.create_program()? };
        Ok(ProgramHandle(self.programs.insert(program)))
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(p), Some(s)) = (self.programs.get(program.0), self.shaders.get(shader.0)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(p), Some(s)) = (self.programs.get(program.0), self.shaders.get(shader.0)) {
            unsafe { self.gl.detach_shader(p, s) }
        }
    }

    fn link_program(&mut self, program: ProgramHandle) {
        if let Some(raw) = self.programs.get(program.0) {
            unsafe { self.gl.link_program(raw) }
        }
    }

    fn program_link_status(&mut self, program: ProgramHandle) -> bool {
        self.programs
            .get(program.0)
            .is_some_and(|raw| unsafe { self.gl.get_program_link_status(raw) })
    }

    fn program_info_log(&mut self, program: ProgramHandle) -> String {
        self.programs
            .get(program.0)
            .map(|raw| unsafe { self.gl.get_program_info_log(raw) })
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let raw = program.and_then(|p| self.programs.get(p.0));
        unsafe { self.gl.use_program(raw) }
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.uniform_locations.release(program.0);
        if let Some(raw) = self.programs.remove(program.0) {
            unsafe { self.gl.delete_program(raw) }
        }
    }

    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveUniformInfo> {
        let Some(raw) = self.programs.get(program.0) else {
            return Vec::new();
        };
        self.uniform_locations.release(program.0);
        let count = unsafe { self.gl.get_active_uniforms(raw) };
        let mut res = Vec::with_capacity(count as usize);

        for index in 0..count {
            let Some(active) = (unsafe { self.gl.get_active_uniform(raw, index) }) else {
                continue;
            };
            let location = unsafe { self.gl.get_uniform_location(raw, &active.name) }
                .map(|loc| UniformLocation(self.uniform_locations.insert(program.0, loc)));
            res.push(ActiveUniformInfo {
                name: active.name,
                size: active.size,
                kind: glsl_type(active.utype),
                location,
            });
        }

        res
    }

    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveAttributeInfo> {
        let Some(raw) = self.programs.get(program.0) else {
            return Vec::new();
        };
        let count = unsafe { self.gl.get_active_attributes(raw) };
        let mut res = Vec::with_capacity(count as usize);

        for index in 0..count {
            let Some(active) = (unsafe { self.gl.get_active_attribute(raw, index) }) else {
                continue;
            };
            let location = unsafe { self.gl.get_attrib_location(raw, &active.name) };
            res.push(ActiveAttributeInfo {
                name: active.name,
                size: active.size,
                kind: glsl_type(active.atype),
                location,
            });
        }

        res
    }

    fn uniform(&mut self, location: UniformLocation, kind: GlslType, data: UniformData<'_>) {
        let Some(loc) = self.uniform_locations.get(location.0) else {
            return;
        };
        let loc = Some(&loc);

        unsafe {
            match data {
                UniformData::Floats(v) => match kind {
                    GlslType::FloatVec2 => self.gl.uniform_2_f32_slice(loc, v),
                    GlslType::FloatVec3 => self.gl.uniform_3_f32_slice(loc, v),
                    GlslType::FloatVec4 => self.gl.uniform_4_f32_slice(loc, v),
                    GlslType::FloatMat2 => self.gl.uniform_matrix_2_f32_slice(loc, false, v),
                    GlslType::FloatMat3 => self.gl.uniform_matrix_3_f32_slice(loc, false, v),
                    GlslType::FloatMat4 => self.gl.uniform_matrix_4_f32_slice(loc, false, v),
                    _ => self.gl.uniform_1_f32_slice(loc, v),
                },
                UniformData::Ints(v) => match kind {
                    GlslType::IntVec2 | GlslType::BoolVec2 => self.gl.uniform_2_i32_slice(loc, v),
                    GlslType::IntVec3 | GlslType::BoolVec3 => self.gl.uniform_3_i32_slice(loc, v),
                    GlslType::IntVec4 | GlslType::BoolVec4 => self.gl.uniform_4_i32_slice(loc, v),
                    _ => self.gl.uniform_1_i32_slice(loc, v),
                },
            }
        }
    }

    fn create_texture(&mut self) -> Result<TextureHandle, String> {
        let texture = unsafe { self.gl.create_texture()? };
        Ok(TextureHandle(self.textures.insert(texture)))
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureHandle>) {
        let raw = texture.and_then(|t| self.textures.get(t.0));
        unsafe { self.gl.bind_texture(texture_target(target), raw) }
    }

    fn tex_parameter(&mut self, target: TextureTarget, parameter: TexParameter) {
        let target = texture_target(target);
        unsafe {
            match parameter {
                TexParameter::MinFilter(f) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, texture_filter(f))
                }
                TexParameter::MagFilter(f) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, texture_filter(f))
                }
                TexParameter::WrapS(w) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_WRAP_S, texture_wrap(w))
                }
                TexParameter::WrapT(w) => {
                    self.gl
                        .tex_parameter_i32(target, glow::TEXTURE_WRAP_T, texture_wrap(w))
                }
                TexParameter::MaxAnisotropy(a) => {
                    self.gl.tex_parameter_f32(target, TEXTURE_MAX_ANISOTROPY, a)
                }
            }
        }
    }

    fn tex_image_2d(
        &mut self,
        target: TextureTarget,
        level: i32,
        internal_format: PixelFormat,
        width: u32,
        height: u32,
        format: PixelFormat,
        ty: DataType,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_2d(
                texture_target(target),
                level,
                pixel_format(internal_format) as i32,
                width as i32,
                height as i32,
                0,
                pixel_format(format),
                data_type(ty),
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn generate_mipmap(&mut self, target: TextureTarget) {
        unsafe { self.gl.generate_mipmap(texture_target(target)) }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(raw) = self.textures.remove(texture.0) {
            unsafe { self.gl.delete_texture(raw) }
        }
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(draw_mode(mode), first, count) }
    }

    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: i32, count: i32, instances: i32) {
        unsafe {
            self.gl
                .draw_arrays_instanced(draw_mode(mode), first, count, instances)
        }
    }

    fn draw_elements(&mut self, mode: DrawMode, count: i32, element_type: DataType, offset: i32) {
        unsafe {
            self.gl
                .draw_elements(draw_mode(mode), count, data_type(element_type), offset)
        }
    }

    fn draw_elements_instanced(
        &mut self,
        mode: DrawMode,
        count: i32,
        element_type: DataType,
        offset: i32,
        instances: i32,
    ) {
        unsafe {
            self.gl.draw_elements_instanced(
                draw_mode(mode),
                count,
                data_type(element_type),
                offset,
                instances,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_hand_out_fresh_ids() {
        let mut slots = Slots::new();
        let a = slots.insert("a");
        let b = slots.insert("b");
        assert_ne!(a, b);
        assert_eq!(slots.remove(a), Some("a"));
        assert_eq!(slots.get(a), None);
        assert_eq!(slots.get(b), Some("b"));
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn uniform_slots_die_with_their_program() {
        let mut locations = UniformSlots::new();

        // A shader swap: introspect the new program, then delete the old one.
        let mut live = None;
        for program in 1..=50u32 {
            let ids: Vec<u32> = (0..10).map(|i| locations.insert(program, i)).collect();
            if let Some(old) = live.replace(program) {
                locations.release(old);
            }
            assert_eq!(locations.len(), 10);
            assert!(ids.iter().all(|id| locations.get(*id).is_some()));
        }

        locations.release(50);
        assert_eq!(locations.len(), 0);
    }

    #[test]
    fn introspecting_again_replaces_the_locations() {
        let mut locations = UniformSlots::new();
        let first = locations.insert(1, 0);
        locations.release(1);
        let second = locations.insert(1, 0);
        assert_eq!(locations.get(first), None);
        assert_eq!(locations.get(second), Some(0));
        assert_eq!(locations.len(), 1);
    }
}
