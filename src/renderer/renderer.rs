use std::collections::HashSet;

use thiserror::Error;

use crate::camera::Camera;
use crate::color::{self, Color};
use crate::context::{
    BufferHandle, BufferTarget, Capability, ClearFlags, DepthFunc, Face, FramebufferHandle,
    FrontFace, GlContext, GlslType, Parameter, ProgramHandle, UniformData, UniformLocation,
};
use crate::renderer::render_list;
use crate::renderer::state::{BlendEquationState, BlendFunc, RenderState, UniformCacheEntry};
use crate::renderer::warnings::WarningLimiter;
use crate::resource::{GeometryError, ProgramError, Texture, UniformValue};
use crate::scene::SceneNode;

const ANISOTROPIC_EXTENSIONS: [&str; 4] = [
    "EXT_texture_filter_anisotropic",
    "GL_EXT_texture_filter_anisotropic",
    "GL_ARB_texture_filter_anisotropic",
    "WEBKIT_EXT_texture_filter_anisotropic",
];

/// Errors raised while setting up rendering.
#[derive(Debug, Error)]
pub enum RendererError {
    /// No usable GPU surface could be obtained.
    #[error("no usable GPU surface: {0}")]
    ContextUnavailable(String),
    /// A GPU object could not be allocated.
    #[error("failed to create a GPU resource: {0}")]
    ResourceCreation(String),
    /// A shader program could not be built.
    #[error(transparent)]
    Program(#[from] ProgramError),
    /// A geometry could not be built.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Construction options of a [`Renderer`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RendererOptions {
    /// Surface width, in CSS pixels.
    pub width: u32,
    /// Surface height, in CSS pixels.
    pub height: u32,
    /// Device pixel ratio applied to the drawing buffer.
    pub dpr: f32,
    /// Whether the drawing buffer has an alpha channel.
    pub alpha: bool,
    /// Whether the drawing buffer has a depth buffer.
    pub depth: bool,
    /// Whether the drawing buffer has a stencil buffer.
    pub stencil: bool,
    /// Whether the compositor expects premultiplied colors.
    pub premultiplied_alpha: bool,
    /// Whether [`Renderer::render`] clears the surface unless told otherwise.
    pub auto_clear: bool,
    /// Color the surface is cleared to.
    pub clear_color: Color,
}

impl Default for RendererOptions {
    fn default() -> Self {
        RendererOptions {
            width: 300,
            height: 150,
            dpr: 1.0,
            alpha: false,
            depth: true,
            stencil: false,
            premultiplied_alpha: false,
            auto_clear: true,
            clear_color: color::TRANSPARENT,
        }
    }
}

/// Limits queried from the context at creation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Parameters {
    /// Number of combined texture image units.
    pub max_texture_units: u32,
    /// Maximum anisotropy, `None` when anisotropic filtering is unsupported.
    pub max_anisotropy: Option<f32>,
}

/// What to draw in one [`Renderer::render`] call.
pub struct RenderParams<'a> {
    pub scene: &'a SceneNode,
    pub camera: &'a mut Camera,
    /// `Some(true)` forces a clear, `Some(false)` suppresses it, `None` follows
    /// [`RendererOptions::auto_clear`].
    pub clear: Option<bool>,
    /// Whether world matrices are updated before drawing.
    pub update: bool,
    /// Whether meshes outside the camera frustum are skipped.
    pub frustum_cull: bool,
    /// Whether the render list is sorted.
    pub sort: bool,
    /// Framebuffer drawn into, `None` for the default surface.
    pub target: Option<FramebufferHandle>,
}

impl<'a> RenderParams<'a> {
    /// Renders `scene` through `camera` with default settings.
    pub fn new(scene: &'a SceneNode, camera: &'a mut Camera) -> Self {
        RenderParams {
            scene,
            camera,
            clear: None,
            update: true,
            frustum_cull: true,
            sort: true,
            target: None,
        }
    }

    /// Overrides the clear behavior.
    pub fn clear(mut self, clear: bool) -> Self {
        self.clear = Some(clear);
        self
    }

    /// Enables or disables frustum culling.
    pub fn frustum_cull(mut self, frustum_cull: bool) -> Self {
        self.frustum_cull = frustum_cull;
        self
    }

    /// Enables or disables render-list sorting.
    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Enables or disables the world-matrix update pass.
    pub fn update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    /// Draws into `framebuffer` instead of the default surface.
    pub fn target(mut self, framebuffer: FramebufferHandle) -> Self {
        self.target = Some(framebuffer);
        self
    }
}

/// Owns the GPU context and mediates every state change through a cache.
///
/// All pipeline-state setters compare the requested value with the last applied
/// one and skip the context call when they are equal.
pub struct Renderer {
    gl: Box<dyn GlContext>,
    options: RendererOptions,
    width: u32,
    height: u32,
    state: RenderState,
    warnings: WarningLimiter,
    parameters: Parameters,
    extensions: HashSet<String>,
    #[cfg(target_arch = "wasm32")]
    canvas: Option<web_sys::HtmlCanvasElement>,
}

impl Renderer {
    /// Creates a renderer drawing through `gl`.
    ///
    /// # Errors
    /// Returns [`RendererError::ContextUnavailable`] if the context has no drawable
    /// surface.
    pub fn new(mut gl: Box<dyn GlContext>, options: RendererOptions) -> Result<Self, RendererError> {
        if !gl.is_surface_available() {
            return Err(RendererError::ContextUnavailable(
                "the context has no drawable surface".to_string(),
            ));
        }

        let extensions: HashSet<String> = gl.supported_extensions().into_iter().collect();
        let max_texture_units = gl
            .parameter_i32(Parameter::MaxCombinedTextureImageUnits)
            .max(1) as u32;
        let max_anisotropy = ANISOTROPIC_EXTENSIONS
            .iter()
            .any(|e| extensions.contains(*e))
            .then(|| gl.parameter_f32(Parameter::MaxTextureMaxAnisotropy));

        let c = options.clear_color;
        gl.clear_color(c.r, c.g, c.b, c.a);

        log::debug!(
            "Renderer created: {max_texture_units} texture units, anisotropy {max_anisotropy:?}"
        );

        let mut renderer = Renderer {
            gl,
            width: options.width,
            height: options.height,
            options,
            state: RenderState::default(),
            warnings: WarningLimiter::new(),
            parameters: Parameters {
                max_texture_units,
                max_anisotropy,
            },
            extensions,
            #[cfg(target_arch = "wasm32")]
            canvas: None,
        };
        renderer.set_size(renderer.width, renderer.height);

        Ok(renderer)
    }

    /// Creates a renderer on top of a current `glow` context.
    #[cfg(feature = "glow")]
    pub fn from_glow(gl: glow::Context, options: RendererOptions) -> Result<Self, RendererError> {
        Renderer::new(Box::new(crate::context::GlowContext::new(gl)), options)
    }

    /// Creates a renderer drawing into a WebGL2 context of `canvas`.
    #[cfg(all(target_arch = "wasm32", feature = "glow"))]
    pub fn from_canvas(
        canvas: &web_sys::HtmlCanvasElement,
        options: RendererOptions,
    ) -> Result<Self, RendererError> {
        use wasm_bindgen::JsCast;

        let attributes = web_sys::WebGlContextAttributes::new();
        attributes.set_alpha(options.alpha);
        attributes.set_depth(options.depth);
        attributes.set_stencil(options.stencil);
        attributes.set_premultiplied_alpha(options.premultiplied_alpha);

        let context = canvas
            .get_context_with_context_options("webgl2", &attributes)
            .map_err(|e| RendererError::ContextUnavailable(format!("{e:?}")))?
            .ok_or_else(|| {
                RendererError::ContextUnavailable("WebGL2 is not supported".to_string())
            })?
            .dyn_into::<web_sys::WebGl2RenderingContext>()
            .map_err(|_| {
                RendererError::ContextUnavailable("unexpected context type".to_string())
            })?;

        let gl = glow::Context::from_webgl2_context(context);
        let mut renderer = Renderer::from_glow(gl, options)?;
        renderer.canvas = Some(canvas.clone());
        renderer.set_size(renderer.width, renderer.height);
        Ok(renderer)
    }

    /// The underlying context.
    pub fn gl(&mut self) -> &mut dyn GlContext {
        &mut *self.gl
    }

    /// The options this renderer was created with.
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Limits of the context.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The cached pipeline state.
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Mutable access to the cached pipeline state.
    ///
    /// Writing to the cache without issuing the matching context call desynchronizes
    /// it from the GPU.
    pub fn state_mut(&mut self) -> &mut RenderState {
        &mut self.state
    }

    /// The warning limiter shared by every program drawn with this renderer.
    pub fn warnings(&mut self) -> &mut WarningLimiter {
        &mut self.warnings
    }

    /// Looks up an extension, accepting `GL_` and vendor prefixed names.
    ///
    /// # Returns
    /// The name under which the extension is supported, or `None` if it is unavailable.
    pub fn extension(&self, name: &str) -> Option<&str> {
        let candidates = [
            name.to_string(),
            format!("GL_{name}"),
            format!("WEBKIT_{name}"),
            format!("MOZ_{name}"),
        ];
        candidates
            .iter()
            .find_map(|c| self.extensions.get(c.as_str()))
            .map(|s| s.as_str())
    }

    /// Whether the drawing buffer uses premultiplied alpha.
    pub fn premultiplied_alpha(&self) -> bool {
        self.options.premultiplied_alpha
    }

    /// Resizes the surface. Only the bookkeeping changes: nothing is redrawn.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;

        #[cfg(target_arch = "wasm32")]
        if let Some(canvas) = &self.canvas {
            canvas.set_width((width as f32 * self.options.dpr) as u32);
            canvas.set_height((height as f32 * self.options.dpr) as u32);
            let style = canvas.style();
            let _ = style.set_property("width", &format!("{width}px"));
            let _ = style.set_property("height", &format!("{height}px"));
        }
    }

    /// Surface size in CSS pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Surface size in device pixels.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.options.dpr).round() as u32,
            (self.height as f32 * self.options.dpr).round() as u32,
        )
    }

    /*
     * Cached state setters.
     */
    /// Sets the viewport.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if self.state.viewport == (width, height) {
            return;
        }
        self.state.viewport = (width, height);
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    /// Enables a capability.
    pub fn enable(&mut self, capability: Capability) {
        if self.state.enabled.get(&capability) == Some(&true) {
            return;
        }
        self.gl.enable(capability);
        let _ = self.state.enabled.insert(capability, true);
    }

    /// Disables a capability.
    pub fn disable(&mut self, capability: Capability) {
        if self.state.enabled.get(&capability) == Some(&false) {
            return;
        }
        self.gl.disable(capability);
        let _ = self.state.enabled.insert(capability, false);
    }

    /// Sets the blend factors. Separate alpha factors are used when both are given.
    pub fn set_blend_func(&mut self, func: BlendFunc) {
        if self.state.blend_func == func {
            return;
        }
        self.state.blend_func = func;

        match (func.src_alpha, func.dst_alpha) {
            (Some(src_alpha), Some(dst_alpha)) => {
                self.gl
                    .blend_func_separate(func.src, func.dst, src_alpha, dst_alpha)
            }
            _ => self.gl.blend_func(func.src, func.dst),
        }
    }

    /// Sets the blend equations.
    pub fn set_blend_equation(&mut self, equation: BlendEquationState) {
        if self.state.blend_equation == equation {
            return;
        }
        self.state.blend_equation = equation;

        match equation.mode_alpha {
            Some(mode_alpha) => self
                .gl
                .blend_equation_separate(equation.mode_rgb, mode_alpha),
            None => self.gl.blend_equation(equation.mode_rgb),
        }
    }

    /// Selects the culled faces.
    pub fn set_cull_face(&mut self, face: Face) {
        if self.state.cull_face == Some(face) {
            return;
        }
        self.state.cull_face = Some(face);
        self.gl.cull_face(face);
    }

    /// Selects the front-face winding.
    pub fn set_front_face(&mut self, front_face: FrontFace) {
        if self.state.front_face == front_face {
            return;
        }
        self.state.front_face = front_face;
        self.gl.front_face(front_face);
    }

    /// Enables or disables depth writes.
    pub fn set_depth_mask(&mut self, write: bool) {
        if self.state.depth_mask == write {
            return;
        }
        self.state.depth_mask = write;
        self.gl.depth_mask(write);
    }

    /// Sets the depth comparison function.
    pub fn set_depth_func(&mut self, func: DepthFunc) {
        if self.state.depth_func == func {
            return;
        }
        self.state.depth_func = func;
        self.gl.depth_func(func);
    }

    /// Selects the active texture unit.
    pub fn active_texture(&mut self, unit: u32) {
        if self.state.active_texture_unit == unit {
            return;
        }
        self.state.active_texture_unit = unit;
        self.gl.active_texture(unit);
    }

    /// Binds a framebuffer, `None` being the default surface.
    pub fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        if self.state.framebuffer == framebuffer {
            return;
        }
        self.state.framebuffer = framebuffer;
        self.gl.bind_framebuffer(framebuffer);
    }

    /// Creates a framebuffer whose color buffer is `color`.
    ///
    /// The texture is allocated first if needed, so it should carry a size in its
    /// options. The viewport of a render into the framebuffer is the drawing buffer
    /// size, which the texture is expected to match.
    pub fn create_framebuffer(
        &mut self,
        color: &mut Texture,
    ) -> Result<FramebufferHandle, RendererError> {
        let framebuffer = self
            .gl
            .create_framebuffer()
            .map_err(RendererError::ResourceCreation)?;
        color.update(self, 0);

        let previous = self.state.framebuffer;
        self.bind_framebuffer(Some(framebuffer));
        self.gl
            .framebuffer_texture_2d(color.options().target, color.handle(), color.options().level);
        self.bind_framebuffer(previous);

        log::debug!("Created framebuffer on texture {}", color.id());
        Ok(framebuffer)
    }

    /// Deletes a framebuffer created by [`Renderer::create_framebuffer`].
    pub fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        // Deleting the bound framebuffer reverts to the default one.
        if self.state.framebuffer == Some(framebuffer) {
            self.state.framebuffer = None;
        }
        self.gl.delete_framebuffer(framebuffer);
    }

    /// Binds a buffer to `target`.
    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        if self.state.bound_buffer == buffer {
            return;
        }
        self.state.bound_buffer = buffer;
        self.gl.bind_buffer(target, buffer);
    }

    /// Sets the pixel unpack alignment.
    pub fn set_unpack_alignment(&mut self, alignment: i32) {
        if self.state.unpack_alignment == alignment {
            return;
        }
        self.state.unpack_alignment = alignment;
        self.gl.unpack_alignment(alignment);
    }

    /// Makes `program` current.
    ///
    /// # Returns
    /// `true` if the program was not already current.
    pub fn use_program(&mut self, program: ProgramHandle) -> bool {
        if self.state.current_program == Some(program) {
            return false;
        }
        self.state.current_program = Some(program);
        self.gl.use_program(Some(program));
        true
    }

    /// Uploads a uniform value unless `location` already holds it.
    ///
    /// Textures and structs are not uploadable values and are ignored here.
    pub fn set_uniform(&mut self, location: UniformLocation, kind: GlslType, value: &UniformValue) {
        let Some(entry) = value.to_cache_entry(kind.is_integer()) else {
            return;
        };
        if self.state.uniforms.get(&location) == Some(&entry) {
            return;
        }

        match &entry {
            UniformCacheEntry::Floats(v) => self.gl.uniform(location, kind, UniformData::Floats(v)),
            UniformCacheEntry::Ints(v) => self.gl.uniform(location, kind, UniformData::Ints(v)),
        }
        let _ = self.state.uniforms.insert(location, entry);
    }

    /// Forgets everything cached about `program`.
    pub(crate) fn forget_program(&mut self, program: ProgramHandle, locations: &[UniformLocation]) {
        if self.state.current_program == Some(program) {
            self.state.current_program = None;
        }
        for location in locations {
            let _ = self.state.uniforms.remove(location);
        }
    }

    /*
     * Frame.
     */
    /// Renders one frame.
    ///
    /// Binds the target framebuffer, the default surface unless a
    /// [`RenderParams::target`] is set. Then clears it, updates the world matrices of
    /// the scene and camera, and draws every mesh of the render list.
    pub fn render(&mut self, params: RenderParams<'_>) {
        let RenderParams {
            scene,
            camera,
            clear,
            update,
            frustum_cull,
            sort,
            target,
        } = params;

        self.bind_framebuffer(target);
        let (width, height) = self.drawing_buffer_size();
        self.set_viewport(width, height);

        if clear.unwrap_or(self.options.auto_clear) {
            let mut flags = ClearFlags::COLOR;
            if self.options.depth {
                // Depth writes must be on for the depth clear to take effect.
                self.enable(Capability::DepthTest);
                self.set_depth_mask(true);
                flags |= ClearFlags::DEPTH;
            }
            if self.options.stencil {
                flags |= ClearFlags::STENCIL;
            }
            self.gl.clear(flags);
        }

        if update {
            scene.update_matrix_world(false);
        }
        camera.update_matrix_world(false);

        let list = render_list::build(scene, camera, frustum_cull, sort);

        for node in &list {
            let world = node.world_matrix();
            let mut data = node.data_mut();
            if let Some(mesh) = data.mesh_mut() {
                mesh.draw(self, &world, camera);
            }
        }
    }

    /// The render list [`Renderer::render`] would draw for `scene`.
    pub fn render_list(
        &self,
        scene: &SceneNode,
        camera: &mut Camera,
        frustum_cull: bool,
        sort: bool,
    ) -> Vec<SceneNode> {
        render_list::build(scene, camera, frustum_cull, sort)
    }
}
