//! A headless [`GlContext`] that records every call instead of talking to a GPU.
//!
//! Shader introspection is emulated by scanning the GLSL sources for `uniform`,
//! `attribute` and `in` declarations (including struct and array uniforms), which is
//! enough to drive the whole engine without a driver.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::context::*;

/// One recorded context call.
#[derive(Clone, Debug, PartialEq)]
pub enum GlCall {
    Enable(Capability),
    Disable(Capability),
    BlendFunc(BlendFactor, BlendFactor),
    BlendFuncSeparate(BlendFactor, BlendFactor, BlendFactor, BlendFactor),
    BlendEquation(BlendEquation),
    BlendEquationSeparate(BlendEquation, BlendEquation),
    CullFace(Face),
    FrontFace(FrontFace),
    DepthMask(bool),
    DepthFunc(DepthFunc),
    Viewport(i32, i32, i32, i32),
    ClearColor([f32; 4]),
    Clear(ClearFlags),
    UnpackAlignment(i32),
    CreateFramebuffer(FramebufferHandle),
    BindFramebuffer(Option<FramebufferHandle>),
    DeleteFramebuffer(FramebufferHandle),
    FramebufferTexture2d {
        target: TextureTarget,
        texture: TextureHandle,
        level: i32,
    },
    CreateBuffer(BufferHandle),
    BindBuffer(BufferTarget, Option<BufferHandle>),
    BufferData {
        target: BufferTarget,
        len: usize,
        usage: BufferUsage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: i32,
        len: usize,
    },
    DeleteBuffer(BufferHandle),
    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(Option<VertexArrayHandle>),
    DeleteVertexArray(VertexArrayHandle),
    VertexAttribPointer {
        location: u32,
        size: i32,
        data_type: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    EnableVertexAttribArray(u32),
    VertexAttribDivisor(u32, u32),
    CreateShader(ShaderStage, ShaderHandle),
    CompileShader(ShaderHandle),
    DeleteShader(ShaderHandle),
    CreateProgram(ProgramHandle),
    LinkProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    DeleteProgram(ProgramHandle),
    Uniform {
        location: UniformLocation,
        kind: GlslType,
        floats: Vec<f32>,
        ints: Vec<i32>,
    },
    CreateTexture(TextureHandle),
    ActiveTexture(u32),
    BindTexture(TextureTarget, Option<TextureHandle>),
    TexParameter(TextureTarget, TexParameter),
    TexImage2d {
        target: TextureTarget,
        level: i32,
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: Option<usize>,
    },
    GenerateMipmap(TextureTarget),
    DeleteTexture(TextureHandle),
    DrawArrays {
        mode: DrawMode,
        first: i32,
        count: i32,
    },
    DrawArraysInstanced {
        mode: DrawMode,
        first: i32,
        count: i32,
        instances: i32,
    },
    DrawElements {
        mode: DrawMode,
        count: i32,
        element_type: DataType,
        offset: i32,
    },
    DrawElementsInstanced {
        mode: DrawMode,
        count: i32,
        element_type: DataType,
        offset: i32,
        instances: i32,
    },
}

impl GlCall {
    /// Whether this call issues primitives.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            GlCall::DrawArrays { .. }
                | GlCall::DrawArraysInstanced { .. }
                | GlCall::DrawElements { .. }
                | GlCall::DrawElementsInstanced { .. }
        )
    }
}

/// Shared view on the calls recorded by a [`RecordingContext`].
///
/// The log stays readable after the context itself has been moved into a renderer.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<GlCall>>>,
}

impl CallLog {
    /// A copy of every call recorded so far.
    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    /// The recorded draw calls, in issue order.
    pub fn draws(&self) -> Vec<GlCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_draw())
            .cloned()
            .collect()
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        self.calls.borrow_mut().clear()
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    fn push(&self, call: GlCall) {
        self.calls.borrow_mut().push(call)
    }
}

#[derive(Default)]
struct ShaderRecord {
    stage: Option<ShaderStage>,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Default)]
struct ProgramRecord {
    shaders: Vec<ShaderHandle>,
    linked: bool,
    log: String,
    uniforms: Vec<ActiveUniformInfo>,
    attributes: Vec<ActiveAttributeInfo>,
}

/// A [`GlContext`] recording calls into a [`CallLog`].
pub struct RecordingContext {
    log: CallLog,
    next_handle: u32,
    next_location: u32,
    surface: bool,
    max_texture_units: i32,
    max_anisotropy: f32,
    extensions: HashSet<String>,
    shaders: HashMap<ShaderHandle, ShaderRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
}

impl Default for RecordingContext {
    fn default() -> Self {
        RecordingContext::new()
    }
}

impl RecordingContext {
    /// A context exposing 16 texture units and no extension.
    pub fn new() -> Self {
        RecordingContext {
            log: CallLog::default(),
            next_handle: 1,
            next_location: 0,
            surface: true,
            max_texture_units: 16,
            max_anisotropy: 0.0,
            extensions: HashSet::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
        }
    }

    /// A context reporting that no drawable surface is available.
    pub fn without_surface() -> Self {
        RecordingContext {
            surface: false,
            ..RecordingContext::new()
        }
    }

    /// Advertises an extension. `EXT_texture_filter_anisotropic` also enables a
    /// maximum anisotropy of 16.
    pub fn with_extension(mut self, name: &str) -> Self {
        if name.ends_with("texture_filter_anisotropic") {
            self.max_anisotropy = 16.0;
        }
        let _ = self.extensions.insert(name.to_string());
        self
    }

    /// Handle on the call log.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn next_handle(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn link(&mut self, program: ProgramHandle) {
        let Some(record) = self.programs.get(&program) else {
            return;
        };
        let stages: Vec<_> = record
            .shaders
            .iter()
            .filter_map(|s| self.shaders.get(s))
            .collect();

        let vertex = stages
            .iter()
            .find(|s| s.stage == Some(ShaderStage::Vertex) && s.compiled);
        let fragment = stages
            .iter()
            .find(|s| s.stage == Some(ShaderStage::Fragment) && s.compiled);

        let (linked, log, mut uniforms, attributes) = match (vertex, fragment) {
            (Some(vs), Some(fs)) => {
                let mut uniforms = glsl::uniforms(&vs.source);
                for u in glsl::uniforms(&fs.source) {
                    if !uniforms.iter().any(|(name, _, _)| *name == u.0) {
                        uniforms.push(u);
                    }
                }
                (true, String::new(), uniforms, glsl::attributes(&vs.source))
            }
            _ => (
                false,
                "ERROR: program is missing a compiled vertex or fragment shader".to_string(),
                Vec::new(),
                Vec::new(),
            ),
        };

        let mut active_uniforms = Vec::with_capacity(uniforms.len());
        for (name, size, kind) in uniforms.drain(..) {
            let location = UniformLocation(self.next_location);
            self.next_location += 1;
            active_uniforms.push(ActiveUniformInfo {
                name,
                size,
                kind,
                location: Some(location),
            });
        }

        let mut next_attrib = 0;
        let active_attributes = attributes
            .into_iter()
            .map(|(name, size, kind)| {
                let location = next_attrib;
                next_attrib += kind.attribute_slots();
                ActiveAttributeInfo {
                    name,
                    size,
                    kind,
                    location: Some(location),
                }
            })
            .collect();

        if let Some(record) = self.programs.get_mut(&program) {
            record.linked = linked;
            record.log = log;
            record.uniforms = active_uniforms;
            record.attributes = active_attributes;
        }
    }
}

impl GlContext for RecordingContext {
    fn is_surface_available(&self) -> bool {
        self.surface
    }

    fn parameter_i32(&mut self, parameter: Parameter) -> i32 {
        match parameter {
            Parameter::MaxCombinedTextureImageUnits => self.max_texture_units,
            Parameter::MaxTextureMaxAnisotropy => self.max_anisotropy as i32,
        }
    }

    fn parameter_f32(&mut self, parameter: Parameter) -> f32 {
        match parameter {
            Parameter::MaxCombinedTextureImageUnits => self.max_texture_units as f32,
            Parameter::MaxTextureMaxAnisotropy => self.max_anisotropy,
        }
    }

    fn supported_extensions(&self) -> Vec<String> {
        self.extensions.iter().cloned().collect()
    }

    fn enable(&mut self, capability: Capability) {
        self.log.push(GlCall::Enable(capability))
    }

    fn disable(&mut self, capability: Capability) {
        self.log.push(GlCall::Disable(capability))
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.log.push(GlCall::BlendFunc(src, dst))
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.log.push(GlCall::BlendFuncSeparate(
            src_rgb, dst_rgb, src_alpha, dst_alpha,
        ))
    }

    fn blend_equation(&mut self, mode: BlendEquation) {
        self.log.push(GlCall::BlendEquation(mode))
    }

    fn blend_equation_separate(&mut self, mode_rgb: BlendEquation, mode_alpha: BlendEquation) {
        self.log
            .push(GlCall::BlendEquationSeparate(mode_rgb, mode_alpha))
    }

    fn cull_face(&mut self, face: Face) {
        self.log.push(GlCall::CullFace(face))
    }

    fn front_face(&mut self, front_face: FrontFace) {
        self.log.push(GlCall::FrontFace(front_face))
    }

    fn depth_mask(&mut self, write: bool) {
        self.log.push(GlCall::DepthMask(write))
    }

    fn depth_func(&mut self, func: DepthFunc) {
        self.log.push(GlCall::DepthFunc(func))
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.log.push(GlCall::Viewport(x, y, width, height))
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.log.push(GlCall::ClearColor([r, g, b, a]))
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.log.push(GlCall::Clear(flags))
    }

    fn unpack_alignment(&mut self, alignment: i32) {
        self.log.push(GlCall::UnpackAlignment(alignment))
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferHandle, String> {
        let handle = FramebufferHandle(self.next_handle());
        self.log.push(GlCall::CreateFramebuffer(handle));
        Ok(handle)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.log.push(GlCall::BindFramebuffer(framebuffer))
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.log.push(GlCall::DeleteFramebuffer(framebuffer))
    }

    fn framebuffer_texture_2d(&mut self, target: TextureTarget, texture: TextureHandle, level: i32) {
        self.log.push(GlCall::FramebufferTexture2d {
            target,
            texture,
            level,
        })
    }

    fn create_buffer(&mut self) -> Result<BufferHandle, String> {
        let handle = BufferHandle(self.next_handle());
        self.log.push(GlCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        self.log.push(GlCall::BindBuffer(target, buffer))
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.log.push(GlCall::BufferData {
            target,
            len: data.len(),
            usage,
        })
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: i32, data: &[u8]) {
        self.log.push(GlCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        })
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.log.push(GlCall::DeleteBuffer(buffer))
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, String> {
        let handle = VertexArrayHandle(self.next_handle());
        self.log.push(GlCall::CreateVertexArray(handle));
        Ok(handle)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.log.push(GlCall::BindVertexArray(vertex_array))
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.log.push(GlCall::DeleteVertexArray(vertex_array))
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: i32,
        data_type: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.log.push(GlCall::VertexAttribPointer {
            location,
            size,
            data_type,
            normalized,
            stride,
            offset,
        })
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.log.push(GlCall::EnableVertexAttribArray(location))
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        self.log.push(GlCall::VertexAttribDivisor(location, divisor))
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderHandle, String> {
        let handle = ShaderHandle(self.next_handle());
        let _ = self.shaders.insert(
            handle,
            ShaderRecord {
                stage: Some(stage),
                ..Default::default()
            },
        );
        self.log.push(GlCall::CreateShader(stage, handle));
        Ok(handle)
    }

    fn shader_source(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(record) = self.shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
    }

    fn compile_shader(&mut self, shader: ShaderHandle) {
        if let Some(record) = self.shaders.get_mut(&shader) {
            match glsl::compile_error(&record.source) {
                Some(log) => {
                    record.compiled = false;
                    record.log = log;
                }
                None => {
                    record.compiled = true;
                    record.log.clear();
                }
            }
        }
        self.log.push(GlCall::CompileShader(shader))
    }

    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool {
        self.shaders.get(&shader).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&mut self, shader: ShaderHandle) -> String {
        self.shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        let _ = self.shaders.remove(&shader);
        self.log.push(GlCall::DeleteShader(shader))
    }

    fn create_program(&mut self) -> Result<ProgramHandle, String> {
        let handle = ProgramHandle(self.next_handle());
        let _ = self.programs.insert(handle, ProgramRecord::default());
        self.log.push(GlCall::CreateProgram(handle));
        Ok(handle)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.shaders.push(shader);
        }
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.shaders.retain(|s| *s != shader);
        }
    }

    fn link_program(&mut self, program: ProgramHandle) {
        self.link(program);
        self.log.push(GlCall::LinkProgram(program))
    }

    fn program_link_status(&mut self, program: ProgramHandle) -> bool {
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&mut self, program: ProgramHandle) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.log.push(GlCall::UseProgram(program))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let _ = self.programs.remove(&program);
        self.log.push(GlCall::DeleteProgram(program))
    }

    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveUniformInfo> {
        self.programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveAttributeInfo> {
        self.programs
            .get(&program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn uniform(&mut self, location: UniformLocation, kind: GlslType, data: UniformData<'_>) {
        let (floats, ints) = match data {
            UniformData::Floats(v) => (v.to_vec(), Vec::new()),
            UniformData::Ints(v) => (Vec::new(), v.to_vec()),
        };
        self.log.push(GlCall::Uniform {
            location,
            kind,
            floats,
            ints,
        })
    }

    fn create_texture(&mut self) -> Result<TextureHandle, String> {
        let handle = TextureHandle(self.next_handle());
        self.log.push(GlCall::CreateTexture(handle));
        Ok(handle)
    }

    fn active_texture(&mut self, unit: u32) {
        self.log.push(GlCall::ActiveTexture(unit))
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureHandle>) {
        self.log.push(GlCall::BindTexture(target, texture))
    }

    fn tex_parameter(&mut self, target: TextureTarget, parameter: TexParameter) {
        self.log.push(GlCall::TexParameter(target, parameter))
    }

    fn tex_image_2d(
        &mut self,
        target: TextureTarget,
        level: i32,
        _internal_format: PixelFormat,
        width: u32,
        height: u32,
        format: PixelFormat,
        _data_type: DataType,
        pixels: Option<&[u8]>,
    ) {
        self.log.push(GlCall::TexImage2d {
            target,
            level,
            width,
            height,
            format,
            bytes: pixels.map(|p| p.len()),
        })
    }

    fn generate_mipmap(&mut self, target: TextureTarget) {
        self.log.push(GlCall::GenerateMipmap(target))
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.log.push(GlCall::DeleteTexture(texture))
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) {
        self.log.push(GlCall::DrawArrays { mode, first, count })
    }

    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: i32, count: i32, instances: i32) {
        self.log.push(GlCall::DrawArraysInstanced {
            mode,
            first,
            count,
            instances,
        })
    }

    fn draw_elements(&mut self, mode: DrawMode, count: i32, element_type: DataType, offset: i32) {
        self.log.push(GlCall::DrawElements {
            mode,
            count,
            element_type,
            offset,
        })
    }

    fn draw_elements_instanced(
        &mut self,
        mode: DrawMode,
        count: i32,
        element_type: DataType,
        offset: i32,
        instances: i32,
    ) {
        self.log.push(GlCall::DrawElementsInstanced {
            mode,
            count,
            element_type,
            offset,
            instances,
        })
    }
}

/// Minimal GLSL declaration scanning.
mod glsl {
    use std::collections::HashMap;

    use crate::context::GlslType;

    /// Source with comments removed and statements split on `;`.
    fn statements(source: &str) -> Vec<String> {
        let mut stripped = String::with_capacity(source.len());
        let mut rest = source;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("//") {
                rest = after.find('\n').map_or("", |i| &after[i..]);
            } else if let Some(after) = rest.strip_prefix("/*") {
                rest = after.find("*/").map_or("", |i| &after[i + 2..]);
            } else {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    stripped.push(c);
                }
                rest = chars.as_str();
            }
        }

        stripped
            .lines()
            .filter(|l| !l.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n")
            .split([';', '{', '}'])
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Struct definitions: name -> [(field, type keyword, array size)].
    fn structs(source: &str) -> HashMap<String, Vec<(String, String, i32)>> {
        let mut res = HashMap::new();
        let mut rest = source;

        while let Some(pos) = rest.find("struct ") {
            let after = &rest[pos + "struct ".len()..];
            let (Some(open), Some(close)) = (after.find('{'), after.find('}')) else {
                break;
            };
            let name = after[..open].trim().to_string();
            let fields = after[open + 1..close]
                .split(';')
                .filter_map(|decl| {
                    let mut words = decl.split_whitespace();
                    let ty = words.next()?;
                    let (field, size) = split_array(words.next()?);
                    Some((field.to_string(), ty.to_string(), size))
                })
                .collect();
            let _ = res.insert(name, fields);
            rest = &after[close + 1..];
        }

        res
    }

    fn split_array(declarator: &str) -> (&str, i32) {
        match declarator.split_once('[') {
            Some((name, size)) => (
                name,
                size.trim_end_matches(']').trim().parse().unwrap_or(1),
            ),
            None => (declarator, 1),
        }
    }

    fn strip_qualifiers<'a>(words: &mut impl Iterator<Item = &'a str>) -> Option<&'a str> {
        words.find(|w| !matches!(*w, "lowp" | "mediump" | "highp" | "flat" | "smooth"))
    }

    /// Active uniforms in declaration order, flattened the way drivers report them.
    pub fn uniforms(source: &str) -> Vec<(String, i32, GlslType)> {
        let structs = structs(source);
        let mut res = Vec::new();

        for statement in statements(source) {
            let mut words = statement.split(' ');
            if words.next() != Some("uniform") {
                continue;
            }
            let Some(ty) = strip_qualifiers(&mut words) else {
                continue;
            };

            for declarator in words.collect::<Vec<_>>().join("").split(',') {
                let (name, size) = split_array(declarator);

                if let Some(fields) = structs.get(ty) {
                    let elements: Vec<String> = if declarator.contains('[') {
                        (0..size).map(|i| format!("{name}[{i}]")).collect()
                    } else {
                        vec![name.to_string()]
                    };
                    for element in elements {
                        for (field, field_ty, field_size) in fields {
                            if let Some(kind) = GlslType::from_keyword(field_ty) {
                                res.push((format!("{element}.{field}"), *field_size, kind));
                            }
                        }
                    }
                } else if let Some(kind) = GlslType::from_keyword(ty) {
                    let reported = if declarator.contains('[') {
                        format!("{name}[0]")
                    } else {
                        name.to_string()
                    };
                    res.push((reported, size, kind));
                }
            }
        }

        res
    }

    /// Vertex attributes in declaration order.
    pub fn attributes(source: &str) -> Vec<(String, i32, GlslType)> {
        let mut res = Vec::new();

        for statement in statements(source) {
            let mut words = statement.split(' ');
            let is_input = match words.next() {
                Some("attribute") | Some("in") => true,
                Some(w) if w.starts_with("layout") => words.any(|w| w == "in"),
                _ => false,
            };
            if !is_input {
                continue;
            }
            let Some(ty) = strip_qualifiers(&mut words) else {
                continue;
            };
            let Some(kind) = GlslType::from_keyword(ty) else {
                continue;
            };
            for declarator in words.collect::<Vec<_>>().join("").split(',') {
                let (name, size) = split_array(declarator);
                res.push((name.to_string(), size, kind));
            }
        }

        res
    }

    /// Emulated compiler: `#error` directives and empty sources fail.
    pub fn compile_error(source: &str) -> Option<String> {
        if source.trim().is_empty() {
            return Some("ERROR: 0:1: '' : syntax error: empty shader".to_string());
        }

        source.lines().enumerate().find_map(|(i, line)| {
            let line = line.trim();
            line.strip_prefix("#error").map(|msg| {
                format!("ERROR: 0:{}: '#error' :{}", i + 1, msg)
            })
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn scans_plain_and_array_uniforms() {
            let src = "precision highp float;\nuniform float progress;\nuniform vec4 resolution;\nuniform float weights[3];\n// uniform float hidden;\nvoid main() {}";
            let res = uniforms(src);
            assert_eq!(
                res,
                vec![
                    ("progress".to_string(), 1, GlslType::Float),
                    ("resolution".to_string(), 1, GlslType::FloatVec4),
                    ("weights[0]".to_string(), 3, GlslType::Float),
                ]
            );
        }

        #[test]
        fn expands_struct_uniforms() {
            let src = "struct Light { vec3 color; float power; };\nuniform Light sun;\nuniform Light lamps[2];";
            let names: Vec<_> = uniforms(src).into_iter().map(|u| u.0).collect();
            assert_eq!(
                names,
                [
                    "sun.color",
                    "sun.power",
                    "lamps[0].color",
                    "lamps[0].power",
                    "lamps[1].color",
                    "lamps[1].power"
                ]
            );
        }

        #[test]
        fn scans_attributes() {
            let src = "attribute vec2 uv;\nattribute vec3 position;\nin mat4 instanceMatrix;\nvoid main() { float in_loop = 1.0; }";
            let names: Vec<_> = attributes(src).into_iter().map(|a| a.0).collect();
            assert_eq!(names, ["uv", "position", "instanceMatrix"]);
        }

        #[test]
        fn error_directive_fails_compilation() {
            assert!(compile_error("void main() {}").is_none());
            let log = compile_error("void main() {\n#error broken\n}").unwrap();
            assert!(log.contains("0:2"));
        }
    }
}
