//! The transition orchestrator.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use glamx::{Vec3, Vec4};
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use web_time::Instant;

use crate::camera::{Camera, CameraOptions};
use crate::procedural;
use crate::renderer::{RenderParams, Renderer, RendererError};
use crate::resource::{
    Geometry, GeometryError, Program, ProgramError, ProgramOptions, Texture, TextureOptions,
    TextureRef, Uniforms,
};
use crate::scene::{Mesh, SceneNode};
use crate::transition::{
    AnimationStep, ProgressAnimation, ShaderPool, ShaderSelection, SwapDebounce, TransitionShader,
    UniformDeclaration,
};

/// Errors raised while building or reconfiguring a [`Slider`].
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("a slider needs at least one slide")]
    NoSlides,
    #[error("no transition shader named `{0}`")]
    UnknownShader(String),
    #[error("no transition shader matches the selection")]
    NoShader,
    #[error(transparent)]
    Renderer(#[from] RendererError),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Configuration of a [`Slider`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SliderOptions {
    /// Duration of an animated transition, in milliseconds.
    pub speed: u64,
    pub shader: ShaderSelection,
    /// With a [`ShaderSelection::Pool`], uses the `i`-th shader of the pool for slide `i`.
    pub shader_per_slide: bool,
    /// Distance from the camera to the slide plane.
    pub camera_distance: f32,
    /// Initial vertical field of view, in degrees. Replaced on the first resize.
    pub fov: f32,
    /// Increment of the `time` uniform per frame.
    pub time_step: f32,
    /// Seed of the shader picker. Random when `None`.
    pub seed: Option<u64>,
}

impl Default for SliderOptions {
    fn default() -> Self {
        SliderOptions {
            speed: 600,
            shader: ShaderSelection::Random,
            shader_per_slide: false,
            camera_distance: 2.0,
            fov: 45.0,
            time_step: 0.05,
            seed: None,
        }
    }
}

/// Where a [`Slider`] stands between two slides.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum State {
    /// Nothing was requested yet.
    Idle,
    /// `progress` is moving toward `target`, animated or driven by the caller.
    Transitioning { target: f32 },
    /// `slide` is fully shown.
    Settled { slide: usize },
}

#[derive(Copy, Clone, Debug)]
struct ProgressRequest {
    from: usize,
    to: usize,
    progress: f32,
    needs_transition_duration: bool,
}

struct PendingTransition {
    animation: ProgressAnimation,
    from_texture: TextureRef,
    to_texture: TextureRef,
    from: usize,
    to: usize,
    target: f32,
}

struct Objects {
    material: Rc<RefCell<Program>>,
    vertex_material: Option<Rc<RefCell<Program>>>,
    geometry: Rc<RefCell<Geometry>>,
    nodes: Vec<SceneNode>,
}

/// Blends slide textures with a transition shader.
///
/// The `progress` uniform of the material goes from 0 (`texture1` shown) to 1
/// (`texture2` shown). Shaders with a vertex stage draw the incoming slide with a
/// second material whose `texture1` is the incoming texture.
///
/// The slider is driven by [`Slider::set_progress`] and must be ticked once per frame
/// with [`Slider::tick`]. Nothing is drawn until [`Slider::init`] is called, once the
/// slide images are available.
pub struct Slider {
    renderer: Renderer,
    camera: Camera,
    scene: SceneNode,
    pool: ShaderPool,
    current_shader: usize,
    options: SliderOptions,
    textures: Vec<TextureRef>,
    displacement: TextureRef,
    material: Rc<RefCell<Program>>,
    vertex_material: Option<Rc<RefCell<Program>>>,
    geometry: Rc<RefCell<Geometry>>,
    nodes: Vec<SceneNode>,
    declared: Vec<(String, UniformDeclaration)>,
    time: f32,
    animation: Option<PendingTransition>,
    debounce: SwapDebounce,
    initialized: bool,
    pending: Option<ProgressRequest>,
    destroyed: bool,
    state: State,
    rng: StdRng,
    active_slide: usize,
    size: (u32, u32),
}

impl Slider {
    /// Creates a slider showing the first slide.
    ///
    /// # Arguments
    /// * `renderer` - The renderer to draw with
    /// * `shaders` - The transition shaders to pick from
    /// * `options` - Slider configuration
    /// * `images` - One image per slide, `None` for images still loading
    pub fn new(
        mut renderer: Renderer,
        shaders: Vec<TransitionShader>,
        options: SliderOptions,
        images: Vec<Option<Rc<RgbaImage>>>,
    ) -> Result<Slider, TransitionError> {
        if images.is_empty() {
            return Err(TransitionError::NoSlides);
        }

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let pool = ShaderPool::new(shaders);
        let current_shader = pool
            .select(&options.shader, options.shader_per_slide, 0, None, &mut rng)
            .ok_or_else(|| match &options.shader {
                ShaderSelection::Fixed(name) => TransitionError::UnknownShader(name.clone()),
                _ => TransitionError::NoShader,
            })?;

        let textures = images
            .into_iter()
            .map(|image| Texture::new_shared(&mut renderer, TextureOptions::default(), image))
            .collect::<Result<Vec<_>, _>>()?;
        let displacement = Texture::new_shared(&mut renderer, TextureOptions::default(), None)?;

        let (width, height) = renderer.size();
        let mut camera = Camera::new(CameraOptions {
            fov: options.fov,
            aspect: width as f32 / height.max(1) as f32,
            ..CameraOptions::default()
        });
        let _ = camera
            .node()
            .set_position(Vec3::new(0.0, 0.0, options.camera_distance));
        camera.update_matrix_world(false);

        let shader = pool.get(current_shader).ok_or(TransitionError::NoShader)?;
        let objects = build_objects(&mut renderer, shader, &textures, &displacement)?;
        let declared = shader.uniforms.clone();

        let scene = SceneNode::empty();
        for node in &objects.nodes {
            scene.add_child(node);
        }

        log::info!(
            "Created slider with {} slides, shader `{}`",
            textures.len(),
            shader.name
        );

        Ok(Slider {
            renderer,
            camera,
            scene,
            pool,
            current_shader,
            options,
            textures,
            displacement,
            material: objects.material,
            vertex_material: objects.vertex_material,
            geometry: objects.geometry,
            nodes: objects.nodes,
            declared,
            time: 0.0,
            animation: None,
            debounce: SwapDebounce::new(),
            initialized: false,
            pending: None,
            destroyed: false,
            state: State::Idle,
            rng,
            active_slide: 0,
            size: (width, height),
        })
    }

    /// Marks the slide images as available and starts drawing.
    ///
    /// A progress request received before this call is replayed now, without its
    /// shader replace flag.
    pub fn init(&mut self) {
        if self.destroyed || self.initialized {
            return;
        }
        self.initialized = true;

        let (width, height) = self.size;
        self.resize(width, height);

        if let Some(request) = self.pending.take() {
            self.set_progress(
                request.from,
                request.to,
                request.progress,
                request.needs_transition_duration,
                false,
            );
        }
    }

    /// Fits the slides to a surface of `width` x `height` CSS pixels.
    ///
    /// The camera field of view is set so that a unit plane fills the view
    /// vertically. The `resolution` uniform receives the surface size and the
    /// cover-fit ratios of the first slide image.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if !self.initialized || self.destroyed {
            return;
        }

        self.renderer.set_size(width, height);

        let dist = self.camera.node().position().z;
        let (w, h) = (width as f32, height.max(1) as f32);
        let fov = (2.0 * (1.0 / (2.0 * dist)).atan()).to_degrees();
        let (near, far) = (self.camera.near(), self.camera.far());
        self.camera.perspective(fov, w / h, near, far);

        let image_aspect = match self.textures[0].borrow().image() {
            Some(image) => image.height() as f32 / image.width().max(1) as f32,
            None => return,
        };
        let (a1, a2) = if h / w > image_aspect {
            (w / h * image_aspect, 1.0)
        } else {
            (1.0, h / w / image_aspect)
        };

        let resolution = Vec4::new(w, h, a1, a2);
        self.material
            .borrow_mut()
            .uniforms_mut()
            .set("resolution", resolution);
        if let Some(vertex_material) = &self.vertex_material {
            vertex_material
                .borrow_mut()
                .uniforms_mut()
                .set("resolution", resolution);
        }

        let aspect = self.camera.aspect();
        let scale = if self.vertex_material.is_some() {
            Vec3::new(aspect / 2.0, 0.5, 0.5)
        } else {
            Vec3::new(aspect, 1.0, 1.0)
        };
        for node in &self.nodes {
            let _ = node.set_scale(scale);
        }
    }

    /// Moves the transition from slide `from` to slide `to`.
    ///
    /// # Arguments
    /// * `progress` - Transition progress in `[-1, 1]`, negative when going backward
    /// * `needs_transition_duration` - Animate toward `progress` over the configured speed
    /// * `need_shader_replace` - A slide boundary was crossed. With a random or pooled
    ///   selection, the shader is swapped, at most once per frame.
    pub fn set_progress(
        &mut self,
        from: usize,
        to: usize,
        progress: f32,
        needs_transition_duration: bool,
        need_shader_replace: bool,
    ) {
        if self.destroyed {
            return;
        }
        if !self.initialized {
            self.pending = Some(ProgressRequest {
                from,
                to,
                progress,
                needs_transition_duration,
            });
            return;
        }

        let (from_texture, to_texture) = match (self.textures.get(from), self.textures.get(to)) {
            (Some(a), Some(b)) => (a.clone(), b.clone()),
            _ => {
                log::warn!(
                    "Ignoring transition {} -> {}: the slider has {} slides",
                    from,
                    to,
                    self.textures.len()
                );
                return;
            }
        };

        self.set_material_texture("texture1", from_texture.clone());
        self.set_incoming_texture(to_texture.clone());

        if need_shader_replace {
            self.animation = None;
            if !self.debounce.try_acquire() {
                self.set_progress_value(progress.abs());
                return;
            }

            if self.options.shader.is_dynamic() {
                self.swap_random_shader(to);
                self.set_material_texture("texture1", from_texture);
                self.set_material_texture("texture2", to_texture);
            }
            self.set_progress_value(progress.abs());
            self.state = State::Transitioning {
                target: progress.abs(),
            };
        } else if needs_transition_duration {
            let current = self.progress();
            if progress == 0.0 && current == 0.0 {
                self.set_progress_value(1.0);
            }
            if progress == 1.0 && current == 1.0 {
                self.set_progress_value(0.0);
            }

            self.animation = Some(PendingTransition {
                animation: ProgressAnimation::new(
                    self.progress(),
                    progress,
                    Duration::from_millis(self.options.speed),
                ),
                from_texture,
                to_texture,
                from,
                to,
                target: progress,
            });
            self.state = State::Transitioning { target: progress };
        } else {
            self.animation = None;
            let value = progress.abs();
            self.set_progress_value(value);
            self.state = if value == 0.0 {
                State::Settled { slide: from }
            } else if value == 1.0 {
                State::Settled { slide: to }
            } else {
                State::Transitioning { target: value }
            };
        }
    }

    /// Advances one frame and draws it.
    pub fn tick(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        self.debounce.release();
        if !self.initialized {
            return;
        }

        if let Some(mut pending) = self.animation.take() {
            let AnimationStep { value, finished } = pending.animation.sample(now);
            self.set_progress_value(value);
            if finished {
                self.complete_transition(pending);
            } else {
                self.animation = Some(pending);
            }
        }

        self.time += self.options.time_step;
        self.material.borrow_mut().uniforms_mut().set("time", self.time);
        if let Some(vertex_material) = &self.vertex_material {
            vertex_material
                .borrow_mut()
                .uniforms_mut()
                .set("time", self.time);
        }

        {
            let mut material = self.material.borrow_mut();
            for (name, declaration) in &self.declared {
                material
                    .uniforms_mut()
                    .set(name.clone(), declaration.to_value());
            }
        }

        self.renderer
            .render(RenderParams::new(&self.scene, &mut self.camera));
    }

    fn complete_transition(&mut self, pending: PendingTransition) {
        let PendingTransition {
            from_texture,
            to_texture,
            from,
            to,
            target,
            ..
        } = pending;
        let slide = if target == 1.0 { to } else { from };

        if self.options.shader.is_dynamic() {
            self.swap_random_shader(slide);
            self.set_material_texture("texture1", from_texture);
            self.set_material_texture("texture2", to_texture.clone());
            self.set_progress_value(target);
        }
        if target == 1.0 {
            self.set_material_texture("texture1", to_texture);
        }
        self.set_progress_value(0.0);

        self.active_slide = slide;
        self.state = State::Settled { slide };
        log::debug!("Transition settled on slide {}", slide);
    }

    /// Switches to another shader selection and keeps showing the incoming slide.
    pub fn replace_shader(&mut self, selection: ShaderSelection) -> Result<(), TransitionError> {
        let from_texture = self.material_texture("texture1");
        let new_texture = self.incoming_texture();

        let index = self
            .pool
            .select(
                &selection,
                self.options.shader_per_slide,
                self.active_slide,
                Some(self.current_shader),
                &mut self.rng,
            )
            .ok_or_else(|| match &selection {
                ShaderSelection::Fixed(name) => TransitionError::UnknownShader(name.clone()),
                _ => TransitionError::NoShader,
            })?;
        self.rebuild(index)?;

        if self.vertex_material.is_some() {
            if let Some(texture) = new_texture {
                self.set_material_texture("texture1", texture.clone());
                self.set_incoming_texture(texture);
            }
        } else {
            if let Some(texture) = from_texture {
                self.set_material_texture("texture1", texture);
            }
            if let Some(texture) = new_texture {
                self.set_material_texture("texture2", texture);
            }
            self.set_progress_value(1.0);
        }

        self.options.shader = selection;
        Ok(())
    }

    fn swap_random_shader(&mut self, slide: usize) {
        let index = self.pool.select(
            &self.options.shader,
            self.options.shader_per_slide,
            slide,
            Some(self.current_shader),
            &mut self.rng,
        );
        match index {
            Some(index) => {
                if let Err(err) = self.rebuild(index) {
                    log::error!("Failed to swap the transition shader: {}", err);
                }
            }
            None => log::warn!("No transition shader matches {:?}", self.options.shader),
        }
    }

    /// Rebuilds the scene objects for shader `index`. The old objects are kept on failure.
    fn rebuild(&mut self, index: usize) -> Result<(), TransitionError> {
        let shader = self.pool.get(index).ok_or(TransitionError::NoShader)?;
        let objects = build_objects(&mut self.renderer, shader, &self.textures, &self.displacement)?;
        self.declared = shader.uniforms.clone();
        log::debug!("Switched to transition shader `{}`", shader.name);

        for node in self.nodes.drain(..) {
            node.detach();
        }
        self.material.borrow_mut().destroy(&mut self.renderer);
        if let Some(vertex_material) = &self.vertex_material {
            vertex_material.borrow_mut().destroy(&mut self.renderer);
        }
        self.geometry.borrow_mut().destroy(&mut self.renderer);

        for node in &objects.nodes {
            self.scene.add_child(node);
        }
        self.material = objects.material;
        self.vertex_material = objects.vertex_material;
        self.geometry = objects.geometry;
        self.nodes = objects.nodes;
        self.current_shader = index;

        let (width, height) = self.size;
        self.resize(width, height);
        Ok(())
    }

    /// Sets the image of `slide`, e.g. once it has loaded.
    pub fn set_image(&mut self, slide: usize, image: Option<Rc<RgbaImage>>) {
        match self.textures.get(slide) {
            Some(texture) => texture.borrow_mut().set_image(image),
            None => {
                log::warn!("Ignoring image of unknown slide {}", slide);
                return;
            }
        }
        if slide == 0 {
            let (width, height) = self.size;
            self.resize(width, height);
        }
    }

    /// Sets the image of the `displacement` texture.
    pub fn set_displacement_image(&mut self, image: Option<Rc<RgbaImage>>) {
        self.displacement.borrow_mut().set_image(image);
    }

    /// Frees the GPU resources. The slider ignores every later call.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.initialized = false;
        self.animation = None;
        self.pending = None;

        for node in self.nodes.drain(..) {
            node.detach();
        }
        self.material.borrow_mut().destroy(&mut self.renderer);
        if let Some(vertex_material) = self.vertex_material.take() {
            vertex_material.borrow_mut().destroy(&mut self.renderer);
        }
        self.geometry.borrow_mut().destroy(&mut self.renderer);
        for texture in &self.textures {
            texture.borrow_mut().destroy(&mut self.renderer);
        }
        self.displacement.borrow_mut().destroy(&mut self.renderer);
        log::info!("Destroyed slider");
    }

    fn set_material_texture(&mut self, name: &str, texture: TextureRef) {
        self.material.borrow_mut().uniforms_mut().set(name, texture);
    }

    /// Gives the incoming slide texture to whichever material draws it.
    fn set_incoming_texture(&mut self, texture: TextureRef) {
        match &self.vertex_material {
            Some(vertex_material) => vertex_material
                .borrow_mut()
                .uniforms_mut()
                .set("texture1", texture),
            None => self.set_material_texture("texture2", texture),
        }
    }

    fn incoming_texture(&self) -> Option<TextureRef> {
        match &self.vertex_material {
            Some(vertex_material) => vertex_material
                .borrow()
                .uniforms()
                .get("texture1")
                .and_then(|v| v.as_texture())
                .cloned(),
            None => self.material_texture("texture2"),
        }
    }

    fn set_progress_value(&mut self, value: f32) {
        self.material.borrow_mut().uniforms_mut().set("progress", value);
    }

    /// The texture bound to the material uniform `name`.
    pub fn material_texture(&self, name: &str) -> Option<TextureRef> {
        self.material
            .borrow()
            .uniforms()
            .get(name)
            .and_then(|v| v.as_texture())
            .cloned()
    }

    /// The current value of the `progress` uniform.
    pub fn progress(&self) -> f32 {
        self.material
            .borrow()
            .uniforms()
            .get("progress")
            .and_then(|v| v.as_f32())
            .unwrap_or(0.0)
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether an animated transition is in flight.
    #[inline]
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    #[inline]
    pub fn options(&self) -> &SliderOptions {
        &self.options
    }

    /// The material of the outgoing slide, or of both slides for fragment-only shaders.
    #[inline]
    pub fn material(&self) -> &Rc<RefCell<Program>> {
        &self.material
    }

    /// The material of the incoming slide, for shaders with a vertex stage.
    #[inline]
    pub fn vertex_material(&self) -> Option<&Rc<RefCell<Program>>> {
        self.vertex_material.as_ref()
    }

    #[inline]
    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    #[inline]
    pub fn displacement(&self) -> &TextureRef {
        &self.displacement
    }

    /// The shader in use.
    pub fn current_shader(&self) -> Option<&TransitionShader> {
        self.pool.get(self.current_shader)
    }

    #[inline]
    pub fn shaders(&self) -> &ShaderPool {
        &self.pool
    }

    /// The declared uniforms of the current shader, copied to the material every frame.
    #[inline]
    pub fn declared_uniforms_mut(&mut self) -> &mut [(String, UniformDeclaration)] {
        &mut self.declared
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    pub fn debounce(&self) -> &SwapDebounce {
        &self.debounce
    }

    #[inline]
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn scene(&self) -> &SceneNode {
        &self.scene
    }
}

fn create_material(
    renderer: &mut Renderer,
    shader: &TransitionShader,
    textures: &[TextureRef],
    displacement: &TextureRef,
) -> Result<Program, ProgramError> {
    let texture1 = textures[0].clone();
    let texture2 = textures.get(1).unwrap_or(&textures[0]).clone();

    let mut uniforms = Uniforms::new()
        .with("time", 0.0_f32)
        .with("progress", 0.0_f32)
        .with("intensity", 0.0_f32)
        .with("width", 0.0_f32)
        .with("radius", 0.0_f32)
        .with("size", 0.0_f32)
        .with("texture1", texture1)
        .with("texture2", texture2)
        .with("displacement", displacement.clone())
        .with("resolution", Vec4::ZERO);
    for (name, declaration) in &shader.uniforms {
        uniforms.set(name.clone(), declaration.to_value());
    }

    let mut options =
        ProgramOptions::new(shader.vertex_source(), shader.fragment.clone()).uniforms(uniforms);
    if shader.has_vertex() {
        options = options.transparent(true).depth_write(false);
    }
    Program::new(renderer, options)
}

fn build_objects(
    renderer: &mut Renderer,
    shader: &TransitionShader,
    textures: &[TextureRef],
    displacement: &TextureRef,
) -> Result<Objects, TransitionError> {
    let material = create_material(renderer, shader, textures, displacement)?;
    let material = Rc::new(RefCell::new(material));

    if !shader.has_vertex() {
        let geometry = match Geometry::plane(renderer, 1.0, 1.0, 2, 2) {
            Ok(geometry) => Rc::new(RefCell::new(geometry)),
            Err(err) => {
                material.borrow_mut().destroy(renderer);
                return Err(err.into());
            }
        };
        let plane = SceneNode::with_mesh(Mesh::new(geometry.clone(), material.clone()));
        return Ok(Objects {
            material,
            vertex_material: None,
            geometry,
            nodes: vec![plane],
        });
    }

    let attributes = match &shader.geometry {
        Some(source) => (source.build)(source.detail, source.offset_top),
        None => procedural::plane(2.0, 2.0, 1, 1),
    };
    let geometry = match Geometry::new(renderer, attributes) {
        Ok(geometry) => Rc::new(RefCell::new(geometry)),
        Err(err) => {
            material.borrow_mut().destroy(renderer);
            return Err(err.into());
        }
    };
    let vertex_material = match create_material(renderer, shader, textures, displacement) {
        Ok(program) => Rc::new(RefCell::new(program)),
        Err(err) => {
            material.borrow_mut().destroy(renderer);
            geometry.borrow_mut().destroy(renderer);
            return Err(err.into());
        }
    };
    let next_texture = textures.get(1).unwrap_or(&textures[0]).clone();
    vertex_material
        .borrow_mut()
        .uniforms_mut()
        .set("texture1", next_texture);

    let current = SceneNode::with_mesh(Mesh::new(geometry.clone(), material.clone()));
    let next = SceneNode::with_mesh(Mesh::new(geometry.clone(), vertex_material.clone()))
        .set_position(Vec3::new(0.0, 0.0, -0.0001));

    Ok(Objects {
        material,
        vertex_material: Some(vertex_material),
        geometry,
        nodes: vec![current, next],
    })
}
