use std::cell::RefCell;
use std::rc::Rc;

use glamx::{Mat3, Mat4};

use crate::camera::Camera;
use crate::context::DrawMode;
use crate::math;
use crate::renderer::Renderer;
use crate::resource::{Geometry, Program};

/// A callback run right before or right after a mesh is drawn.
///
/// Hooks may freely modify the mesh, typically its program uniforms.
pub type RenderHook = Box<dyn FnMut(&mut Mesh, &Camera)>;

/// A drawable object: a geometry rendered with a program.
///
/// Geometries and programs are shared, so several meshes may draw the same
/// vertex data with different uniforms or the other way round.
pub struct Mesh {
    geometry: Rc<RefCell<Geometry>>,
    program: Rc<RefCell<Program>>,
    mode: DrawMode,
    frustum_culled: bool,
    render_order: i32,
    model_view_matrix: Mat4,
    normal_matrix: Mat3,
    before_render: Vec<RenderHook>,
    after_render: Vec<RenderHook>,
}

impl Mesh {
    /// Creates a triangle mesh, frustum culled, with render order 0.
    pub fn new(geometry: Rc<RefCell<Geometry>>, program: Rc<RefCell<Program>>) -> Mesh {
        Mesh {
            geometry,
            program,
            mode: DrawMode::Triangles,
            frustum_culled: true,
            render_order: 0,
            model_view_matrix: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
            before_render: Vec::new(),
            after_render: Vec::new(),
        }
    }

    /// The geometry drawn by this mesh.
    #[inline]
    pub fn geometry(&self) -> &Rc<RefCell<Geometry>> {
        &self.geometry
    }

    /// Replaces the geometry drawn by this mesh.
    pub fn set_geometry(&mut self, geometry: Rc<RefCell<Geometry>>) {
        self.geometry = geometry;
    }

    /// The program this mesh is drawn with.
    #[inline]
    pub fn program(&self) -> &Rc<RefCell<Program>> {
        &self.program
    }

    /// Replaces the program this mesh is drawn with.
    pub fn set_program(&mut self, program: Rc<RefCell<Program>>) {
        self.program = program;
    }

    #[inline]
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    #[inline]
    pub fn set_mode(&mut self, mode: DrawMode) {
        self.mode = mode;
    }

    /// Whether this mesh is skipped when its bounds leave the camera frustum.
    #[inline]
    pub fn frustum_culled(&self) -> bool {
        self.frustum_culled
    }

    #[inline]
    pub fn set_frustum_culled(&mut self, culled: bool) {
        self.frustum_culled = culled;
    }

    /// The primary render-list sort key. Lower values are drawn first.
    #[inline]
    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    #[inline]
    pub fn set_render_order(&mut self, order: i32) {
        self.render_order = order;
    }

    /// Model-view matrix of the last draw.
    #[inline]
    pub fn model_view_matrix(&self) -> &Mat4 {
        &self.model_view_matrix
    }

    /// Normal matrix of the last draw.
    #[inline]
    pub fn normal_matrix(&self) -> &Mat3 {
        &self.normal_matrix
    }

    /// Registers a hook run before every draw.
    pub fn on_before_render(&mut self, hook: impl FnMut(&mut Mesh, &Camera) + 'static) {
        self.before_render.push(Box::new(hook));
    }

    /// Registers a hook run after every draw.
    pub fn on_after_render(&mut self, hook: impl FnMut(&mut Mesh, &Camera) + 'static) {
        self.after_render.push(Box::new(hook));
    }

    /// Draws this mesh with the given world transform.
    ///
    /// Feeds the transform uniforms to the program, applies its state, then issues
    /// the geometry draw call. Faces are flipped when `world` mirrors the mesh.
    pub fn draw(&mut self, renderer: &mut Renderer, world: &Mat4, camera: &Camera) {
        self.run_hooks(false, camera);

        self.model_view_matrix = *camera.view_matrix() * *world;
        self.normal_matrix = math::normal_matrix(&self.model_view_matrix);

        {
            let mut program = self.program.borrow_mut();
            let uniforms = program.uniforms_mut();
            uniforms.set("modelMatrix", *world);
            uniforms.set("viewMatrix", *camera.view_matrix());
            uniforms.set("modelViewMatrix", self.model_view_matrix);
            uniforms.set("normalMatrix", self.normal_matrix);
            uniforms.set("projectionMatrix", *camera.projection_matrix());
            uniforms.set("cameraPosition", camera.world_position());

            let flip_faces = program.state().cull_face.is_some() && world.determinant() < 0.0;
            program.use_program(renderer, flip_faces);
            self.geometry.borrow_mut().draw(renderer, &program, self.mode);
        }

        self.run_hooks(true, camera);
    }

    fn run_hooks(&mut self, after: bool, camera: &Camera) {
        let slot = if after {
            &mut self.after_render
        } else {
            &mut self.before_render
        };
        let mut hooks = std::mem::take(slot);
        if hooks.is_empty() {
            return;
        }

        for hook in &mut hooks {
            hook(self, camera);
        }

        // Keep hooks registered while running.
        let slot = if after {
            &mut self.after_render
        } else {
            &mut self.before_render
        };
        hooks.append(slot);
        *slot = hooks;
    }
}
