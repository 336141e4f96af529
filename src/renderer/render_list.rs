//! Selection and ordering of the meshes drawn in one frame.

use std::cmp::Ordering;

use crate::camera::Camera;
use crate::math;
use crate::scene::SceneNode;

struct Entry {
    node: SceneNode,
    render_order: i32,
    program_id: u64,
    transparent: bool,
    depth_test: bool,
    z: f32,
    index: usize,
}

/// Collects the visible meshes of `scene` in draw order.
///
/// Invisible nodes prune their whole subtree. Nodes without a mesh are skipped but
/// their children are still visited. When `frustum_cull` is set, meshes that opt in
/// to culling are tested against the camera frustum.
///
/// With `sort`, the list is the concatenation of three independently sorted buckets:
/// * opaque meshes, by render order, program, depth front-to-back, then traversal order;
/// * transparent depth-tested meshes, by render order, depth back-to-front, then traversal order;
/// * transparent meshes without depth test, by render order, program, then traversal order.
pub fn build(scene: &SceneNode, camera: &mut Camera, frustum_cull: bool, sort: bool) -> Vec<SceneNode> {
    if frustum_cull {
        camera.update_frustum();
    }

    let mut nodes = Vec::new();
    scene.traverse(&mut |node| {
        if !node.is_visible() {
            return true;
        }

        let data = node.data();
        let Some(mesh) = data.mesh() else {
            return false;
        };

        if frustum_cull && mesh.frustum_culled() && !camera.frustum_intersects_mesh(mesh, data.world_matrix()) {
            return false;
        }

        nodes.push(node.clone());
        false
    });

    if !sort {
        return nodes;
    }

    let projection_view = *camera.projection_view_matrix();
    let mut opaque = Vec::new();
    let mut transparent = Vec::new();
    let mut ui = Vec::new();

    for (index, node) in nodes.into_iter().enumerate() {
        let entry = {
            let data = node.data();
            let Some(mesh) = data.mesh() else {
                continue;
            };
            let program = mesh.program().borrow();
            let render_order = mesh.render_order();
            let depth_test = program.depth_test();

            let z = if render_order == 0 && depth_test {
                projection_view
                    .project_point3(math::translation(data.world_matrix()))
                    .z
            } else {
                0.0
            };

            Entry {
                node: node.clone(),
                render_order,
                program_id: program.id(),
                transparent: program.transparent(),
                depth_test,
                z,
                index,
            }
        };

        match (entry.transparent, entry.depth_test) {
            (false, _) => opaque.push(entry),
            (true, true) => transparent.push(entry),
            (true, false) => ui.push(entry),
        }
    }

    opaque.sort_by(sort_opaque);
    transparent.sort_by(sort_transparent);
    ui.sort_by(sort_ui);

    opaque
        .into_iter()
        .chain(transparent)
        .chain(ui)
        .map(|e| e.node)
        .collect()
}

fn sort_opaque(a: &Entry, b: &Entry) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(a.program_id.cmp(&b.program_id))
        .then(a.z.total_cmp(&b.z))
        .then(a.index.cmp(&b.index))
}

fn sort_transparent(a: &Entry, b: &Entry) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(b.z.total_cmp(&a.z))
        .then(a.index.cmp(&b.index))
}

fn sort_ui(a: &Entry, b: &Entry) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then(a.program_id.cmp(&b.program_id))
        .then(a.index.cmp(&b.index))
}
