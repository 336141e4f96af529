//! Linked shader programs and their fixed render state.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::context::{
    BlendEquation, BlendFactor, Capability, DepthFunc, Face, FrontFace, GlContext, GlslType,
    ProgramHandle, ShaderHandle, ShaderStage, UniformLocation,
};
use crate::renderer::{BlendEquationState, BlendFunc, Renderer};
use crate::resource::{UniformPath, UniformValue, Uniforms};

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Errors raised while building a [`Program`].
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("{stage} shader source was not supplied")]
    MissingSource { stage: ShaderStage },
    #[error("{stage} shader failed to compile: {log}\n{source_with_lines}")]
    Compile {
        stage: ShaderStage,
        log: String,
        /// The shader source, each line prefixed with its number.
        source_with_lines: String,
    },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("failed to create a GPU resource: {0}")]
    ResourceCreation(String),
}

/// The pipeline state applied whenever a program is used.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProgramState {
    /// Transparent programs are blended and drawn after opaque ones.
    pub transparent: bool,
    /// Culled faces, `None` to draw both sides.
    pub cull_face: Option<Face>,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: DepthFunc,
    /// Blending is enabled iff a blend function is set.
    pub blend_func: Option<BlendFunc>,
    pub blend_equation: BlendEquationState,
}

impl Default for ProgramState {
    fn default() -> Self {
        ProgramState {
            transparent: false,
            cull_face: Some(Face::Back),
            front_face: FrontFace::Ccw,
            depth_test: true,
            depth_write: true,
            depth_func: DepthFunc::Less,
            blend_func: None,
            blend_equation: BlendEquationState::default(),
        }
    }
}

/// Sources and settings of a [`Program`].
#[derive(Clone, Debug, Default)]
pub struct ProgramOptions {
    pub vertex: String,
    pub fragment: String,
    pub uniforms: Uniforms,
    pub state: ProgramState,
}

impl ProgramOptions {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        ProgramOptions {
            vertex: vertex.into(),
            fragment: fragment.into(),
            ..ProgramOptions::default()
        }
    }

    pub fn uniforms(mut self, uniforms: Uniforms) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.state.transparent = transparent;
        self
    }

    pub fn cull_face(mut self, cull_face: Option<Face>) -> Self {
        self.state.cull_face = cull_face;
        self
    }

    pub fn front_face(mut self, front_face: FrontFace) -> Self {
        self.state.front_face = front_face;
        self
    }

    pub fn depth_test(mut self, depth_test: bool) -> Self {
        self.state.depth_test = depth_test;
        self
    }

    pub fn depth_write(mut self, depth_write: bool) -> Self {
        self.state.depth_write = depth_write;
        self
    }

    pub fn depth_func(mut self, depth_func: DepthFunc) -> Self {
        self.state.depth_func = depth_func;
        self
    }
}

/// An active uniform of a linked program.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveUniform {
    /// Name as reported by the driver, e.g. `lights[0].color`.
    pub name: String,
    pub location: UniformLocation,
    pub kind: GlslType,
    pub size: i32,
    /// Where the value lives in the program uniforms.
    pub path: UniformPath,
}

/// An active attribute of a linked program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    pub location: u32,
    pub kind: GlslType,
}

/// A linked shader program, its uniform values and its render state.
pub struct Program {
    id: u64,
    handle: ProgramHandle,
    uniforms: Uniforms,
    state: ProgramState,
    uniform_locations: Vec<ActiveUniform>,
    attribute_locations: Vec<ActiveAttribute>,
    attribute_order: String,
}

impl Program {
    /// Compiles and links a program, then records its active uniforms and attributes.
    ///
    /// Transparent programs without a blend function get alpha blending, adjusted
    /// to the premultiplication mode of the renderer.
    ///
    /// # Errors
    /// Fails on missing sources, compile errors and link errors. Compile errors
    /// carry the offending source with line numbers.
    pub fn new(renderer: &mut Renderer, options: ProgramOptions) -> Result<Program, ProgramError> {
        let ProgramOptions {
            vertex,
            fragment,
            uniforms,
            mut state,
        } = options;

        for (stage, source) in [(ShaderStage::Vertex, &vertex), (ShaderStage::Fragment, &fragment)] {
            if source.trim().is_empty() {
                let _ = renderer
                    .warnings()
                    .warn(format_args!("{stage} shader not supplied"));
                return Err(ProgramError::MissingSource { stage });
            }
        }

        let handle = link(renderer.gl(), &vertex, &fragment)?;

        let uniform_locations: Vec<ActiveUniform> = renderer
            .gl()
            .active_uniforms(handle)
            .into_iter()
            .filter_map(|info| {
                Some(ActiveUniform {
                    path: UniformPath::parse(&info.name),
                    location: info.location?,
                    kind: info.kind,
                    size: info.size,
                    name: info.name,
                })
            })
            .collect();

        let mut attribute_locations: Vec<ActiveAttribute> = renderer
            .gl()
            .active_attributes(handle)
            .into_iter()
            .filter_map(|info| {
                Some(ActiveAttribute {
                    location: info.location?,
                    kind: info.kind,
                    name: info.name,
                })
            })
            .collect();
        attribute_locations.sort_by_key(|a| a.location);
        let attribute_order = attribute_locations
            .iter()
            .map(|a| a.name.as_str())
            .collect::<String>();

        if state.transparent && state.blend_func.is_none() {
            state.blend_func = Some(if renderer.premultiplied_alpha() {
                BlendFunc::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha)
            } else {
                BlendFunc::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
            });
        }

        Ok(Program {
            id: NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed),
            handle,
            uniforms,
            state,
            uniform_locations,
            attribute_locations,
            attribute_order,
        })
    }

    /// Unique identifier of this program, used to group draws.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    #[inline]
    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    #[inline]
    pub fn uniforms_mut(&mut self) -> &mut Uniforms {
        &mut self.uniforms
    }

    #[inline]
    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut ProgramState {
        &mut self.state
    }

    #[inline]
    pub fn transparent(&self) -> bool {
        self.state.transparent
    }

    #[inline]
    pub fn depth_test(&self) -> bool {
        self.state.depth_test
    }

    /// Active uniforms, in driver order.
    #[inline]
    pub fn uniform_locations(&self) -> &[ActiveUniform] {
        &self.uniform_locations
    }

    /// Active attributes, by increasing location.
    #[inline]
    pub fn attribute_locations(&self) -> &[ActiveAttribute] {
        &self.attribute_locations
    }

    /// Names of the active attributes concatenated by location.
    ///
    /// Geometries cache one vertex array per distinct value.
    #[inline]
    pub fn attribute_order(&self) -> &str {
        &self.attribute_order
    }

    /// Sets the blend factors. The alpha factors are only used when both are given.
    pub fn set_blend_func(
        &mut self,
        src: BlendFactor,
        dst: BlendFactor,
        src_alpha: Option<BlendFactor>,
        dst_alpha: Option<BlendFactor>,
    ) {
        self.state.blend_func = Some(BlendFunc {
            src,
            dst,
            src_alpha,
            dst_alpha,
        });
    }

    pub fn set_blend_equation(&mut self, mode_rgb: BlendEquation, mode_alpha: Option<BlendEquation>) {
        self.state.blend_equation = BlendEquationState {
            mode_rgb,
            mode_alpha,
        };
    }

    /// Makes this program current and uploads its uniforms and render state.
    ///
    /// Textures are bound to consecutive units starting at 0, in uniform order.
    /// With `flip_faces`, the front-face winding is reversed, for mirroring
    /// transforms.
    pub fn use_program(&self, renderer: &mut Renderer, flip_faces: bool) {
        let _ = renderer.use_program(self.handle);

        let mut next_unit = 0u32;
        for active in &self.uniform_locations {
            let Some(value) = self.uniforms.resolve(&active.path) else {
                let _ = renderer.warnings().warn(format_args!(
                    "Active uniform {} has not been supplied",
                    active.name
                ));
                continue;
            };

            match value {
                UniformValue::Texture(texture) => {
                    let unit = next_unit;
                    next_unit += 1;
                    texture.borrow_mut().update(renderer, unit);
                    renderer.set_uniform(active.location, active.kind, &UniformValue::Int(unit as i32));
                }
                UniformValue::Textures(textures) => {
                    let units: Vec<i32> = textures
                        .iter()
                        .map(|texture| {
                            let unit = next_unit;
                            next_unit += 1;
                            texture.borrow_mut().update(renderer, unit);
                            unit as i32
                        })
                        .collect();
                    renderer.set_uniform(active.location, active.kind, &UniformValue::Ints(units));
                }
                _ => renderer.set_uniform(active.location, active.kind, value),
            }
        }

        self.apply_state(renderer, flip_faces);
    }

    fn apply_state(&self, renderer: &mut Renderer, flip_faces: bool) {
        let state = &self.state;

        if state.depth_test {
            renderer.enable(Capability::DepthTest);
        } else {
            renderer.disable(Capability::DepthTest);
        }

        match state.cull_face {
            Some(face) => {
                renderer.enable(Capability::CullFace);
                renderer.set_cull_face(face);
            }
            None => renderer.disable(Capability::CullFace),
        }

        match state.blend_func {
            Some(func) => {
                renderer.enable(Capability::Blend);
                renderer.set_blend_func(func);
            }
            None => renderer.disable(Capability::Blend),
        }

        let front_face = if flip_faces {
            state.front_face.flipped()
        } else {
            state.front_face
        };
        renderer.set_front_face(front_face);
        renderer.set_depth_mask(state.depth_write);
        renderer.set_depth_func(state.depth_func);
        renderer.set_blend_equation(state.blend_equation);
    }

    /// Deletes the GPU program and forgets its cached uniform values.
    pub fn destroy(&mut self, renderer: &mut Renderer) {
        let locations: Vec<UniformLocation> =
            self.uniform_locations.iter().map(|u| u.location).collect();
        renderer.forget_program(self.handle, &locations);
        renderer.gl().delete_program(self.handle);
    }
}

/// Prefixes every line of `source` with its 1-based number.
pub fn add_line_numbers(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{}: {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn compile(
    gl: &mut dyn GlContext,
    stage: ShaderStage,
    source: &str,
) -> Result<ShaderHandle, ProgramError> {
    let shader = gl
        .create_shader(stage)
        .map_err(ProgramError::ResourceCreation)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    let log = gl.shader_info_log(shader);
    if !gl.shader_compile_status(shader) {
        let source_with_lines = add_line_numbers(source);
        log::error!("{log}\n{stage} Shader\n{source_with_lines}");
        gl.delete_shader(shader);
        return Err(ProgramError::Compile {
            stage,
            log,
            source_with_lines,
        });
    }

    if !log.trim().is_empty() {
        log::warn!("{log}\n{stage} Shader\n{}", add_line_numbers(source));
    }

    Ok(shader)
}

fn link(gl: &mut dyn GlContext, vertex: &str, fragment: &str) -> Result<ProgramHandle, ProgramError> {
    let vs = compile(gl, ShaderStage::Vertex, vertex)?;
    let fs = match compile(gl, ShaderStage::Fragment, fragment) {
        Ok(fs) => fs,
        Err(e) => {
            gl.delete_shader(vs);
            return Err(e);
        }
    };

    let program = match gl.create_program() {
        Ok(program) => program,
        Err(e) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(ProgramError::ResourceCreation(e));
        }
    };

    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    gl.link_program(program);
    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    if !gl.program_link_status(program) {
        let log = gl.program_info_log(program);
        log::error!("Program failed to link: {log}");
        gl.delete_program(program);
        return Err(ProgramError::Link { log });
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_lines_from_one() {
        assert_eq!(add_line_numbers("a\nb"), "1: a\n2: b");
    }

    #[test]
    fn default_state() {
        let state = ProgramState::default();
        assert_eq!(state.cull_face, Some(Face::Back));
        assert_eq!(state.front_face, FrontFace::Ccw);
        assert!(state.depth_test && state.depth_write);
        assert_eq!(state.depth_func, DepthFunc::Less);
        assert!(state.blend_func.is_none());
    }
}
