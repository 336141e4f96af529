mod common;

use slidegl::prelude::*;

struct Fixture {
    renderer: Renderer,
    log: CallLog,
    camera: Camera,
    scene: SceneNode,
    opaque: Rc<RefCell<Program>>,
    transparent: Rc<RefCell<Program>>,
    quad: Rc<RefCell<Geometry>>,
}

impl Fixture {
    fn new() -> Fixture {
        let (mut renderer, log) = common::renderer();
        let opaque = common::solid_program(&mut renderer);
        let transparent = Rc::new(RefCell::new(
            Program::new(
                &mut renderer,
                ProgramOptions::new(common::PASS_VERTEX, common::SOLID_FRAGMENT)
                    .transparent(true)
                    .uniforms(Uniforms::new().with("color", Vec4::ONE)),
            )
            .expect("valid program"),
        ));
        let quad = Rc::new(RefCell::new(common::quad(&mut renderer)));

        Fixture {
            renderer,
            log,
            camera: Camera::default(),
            scene: SceneNode::empty(),
            opaque,
            transparent,
            quad,
        }
    }

    fn add(&self, program: &Rc<RefCell<Program>>, z: f32) -> SceneNode {
        let node = SceneNode::with_mesh(Mesh::new(self.quad.clone(), program.clone()))
            .set_position(Vec3::new(0.0, 0.0, z));
        self.scene.add_child(&node);
        node
    }

    fn list(&mut self) -> Vec<SceneNode> {
        self.scene.update_matrix_world(false);
        self.camera.update_matrix_world(false);
        self.renderer
            .render_list(&self.scene, &mut self.camera, true, true)
    }
}

fn ids(nodes: &[SceneNode]) -> Vec<u64> {
    nodes.iter().map(|n| n.id()).collect()
}

#[test]
fn opaque_meshes_are_sorted_front_to_back() {
    let mut f = Fixture::new();
    let far = f.add(&f.opaque, -5.0);
    let near = f.add(&f.opaque, -1.0);

    assert_eq!(ids(&f.list()), vec![near.id(), far.id()]);
}

#[test]
fn transparent_meshes_are_sorted_back_to_front_after_opaque() {
    let mut f = Fixture::new();
    let near = f.add(&f.transparent, -1.0);
    let far = f.add(&f.transparent, -5.0);
    let solid = f.add(&f.opaque, -3.0);

    assert_eq!(ids(&f.list()), vec![solid.id(), far.id(), near.id()]);
}

#[test]
fn render_order_comes_first() {
    let mut f = Fixture::new();
    let late = f.add(&f.opaque, -1.0);
    late.modify_mesh(|m| m.set_render_order(1));
    let early = f.add(&f.opaque, -5.0);

    assert_eq!(ids(&f.list()), vec![early.id(), late.id()]);
}

#[test]
fn frustum_culling_skips_outside_meshes() {
    let mut f = Fixture::new();
    let visible = f.add(&f.opaque, -3.0);
    let _behind = f.add(&f.opaque, 5.0);
    let _too_far = f.add(&f.opaque, -500.0);
    let unculled = f.add(&f.opaque, -500.0);
    unculled.modify_mesh(|m| m.set_frustum_culled(false));

    let list = f.list();
    assert_eq!(list.len(), 2);
    assert!(list.iter().any(|n| n.ptr_eq(&visible)));
    assert!(list.iter().any(|n| n.ptr_eq(&unculled)));
}

#[test]
fn invisible_nodes_hide_their_subtree() {
    let mut f = Fixture::new();
    let group = SceneNode::empty();
    f.scene.add_child(&group);
    let child = SceneNode::with_mesh(Mesh::new(f.quad.clone(), f.opaque.clone()))
        .set_position(Vec3::new(0.0, 0.0, -2.0));
    group.add_child(&child);

    assert_eq!(f.list().len(), 1);
    let _ = group.set_visible(false);
    assert!(f.list().is_empty());
}

#[test]
fn render_clears_then_draws_every_mesh() {
    let mut f = Fixture::new();
    let _ = f.add(&f.opaque, -2.0);
    let _ = f.add(&f.transparent, -3.0);
    f.log.clear();

    f.renderer
        .render(RenderParams::new(&f.scene, &mut f.camera));

    let calls = f.log.calls();
    let clear = calls
        .iter()
        .position(|c| matches!(c, GlCall::Clear(_)))
        .expect("surface cleared");
    let first_draw = calls.iter().position(|c| c.is_draw()).expect("drawn");
    assert!(clear < first_draw);
    assert_eq!(f.log.draws().len(), 2);

    f.log.clear();
    f.renderer
        .render(RenderParams::new(&f.scene, &mut f.camera).clear(false));
    assert_eq!(f.log.count(|c| matches!(c, GlCall::Clear(_))), 0);
}

#[test]
fn mirrored_meshes_flip_front_faces() {
    let mut f = Fixture::new();
    let node = f.add(&f.opaque, -2.0);
    let _ = node.set_scale(Vec3::new(-1.0, 1.0, 1.0));
    f.log.clear();

    f.renderer
        .render(RenderParams::new(&f.scene, &mut f.camera));
    assert_eq!(f.log.count(|c| *c == GlCall::FrontFace(FrontFace::Cw)), 1);
}

#[test]
fn hooks_run_around_the_draw() {
    let mut f = Fixture::new();
    let node = f.add(&f.opaque, -2.0);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let before = seen.clone();
    let after = seen.clone();
    node.modify_mesh(|m| {
        m.on_before_render(move |_, _| before.borrow_mut().push("before"));
        m.on_after_render(move |_, _| after.borrow_mut().push("after"));
    });

    f.renderer
        .render(RenderParams::new(&f.scene, &mut f.camera));
    f.renderer
        .render(RenderParams::new(&f.scene, &mut f.camera));
    assert_eq!(*seen.borrow(), ["before", "after", "before", "after"]);
}
