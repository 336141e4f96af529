use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use glamx::{Mat4, Quat, Vec3};

use crate::math;
use crate::scene::Mesh;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// The data contained by a `SceneNode`.
pub struct SceneNodeData {
    id: u64,
    position: Vec3,
    quaternion: Quat,
    scale: Vec3,
    up: Vec3,
    matrix: Mat4,
    world_matrix: Mat4,
    matrix_auto_update: bool,
    world_matrix_needs_update: bool,
    visible: bool,
    children: Vec<SceneNode>,
    mesh: Option<Mesh>,
    parent: Option<Weak<RefCell<SceneNodeData>>>,
}

impl SceneNodeData {
    /// Unique identifier of this node.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The mesh drawn at this node, if any.
    #[inline]
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Mutable access to the mesh drawn at this node, if any.
    #[inline]
    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        self.mesh.as_mut()
    }

    /// The local transform, as of the last [`SceneNode::update_matrix`].
    #[inline]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// The world transform, as of the last [`SceneNode::update_matrix_world`].
    #[inline]
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Whether this node has no parent.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    fn parent(&self) -> Option<Rc<RefCell<SceneNodeData>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn remove_child_entry(&mut self, child: &SceneNode) {
        if let Some(i) = self.children.iter().position(|c| c.ptr_eq(child)) {
            let _ = self.children.remove(i);
        }
    }

    fn update_matrix(&mut self) {
        self.matrix = math::compose(self.quaternion, self.position, self.scale);
        self.world_matrix_needs_update = true;
    }

    fn touch(&mut self) {
        self.world_matrix_needs_update = true;
    }
}

/// A node of the scene graph.
///
/// Nodes own their children and hold a weak link to their parent, so dropping the
/// last handle on a root releases the whole tree. A node may carry a [`Mesh`].
#[derive(Clone)]
pub struct SceneNode {
    data: Rc<RefCell<SceneNodeData>>,
}

impl Default for SceneNode {
    fn default() -> SceneNode {
        SceneNode::empty()
    }
}

impl SceneNode {
    /// Creates a new unrooted scene node with identity transform.
    ///
    /// # Arguments
    /// * `mesh` - Optional mesh to draw (`None` for group nodes)
    pub fn new(mesh: Option<Mesh>) -> SceneNode {
        let data = SceneNodeData {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            position: Vec3::ZERO,
            quaternion: Quat::IDENTITY,
            scale: Vec3::ONE,
            up: Vec3::Y,
            matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            matrix_auto_update: true,
            world_matrix_needs_update: false,
            visible: true,
            children: Vec::new(),
            mesh,
            parent: None,
        };

        SceneNode {
            data: Rc::new(RefCell::new(data)),
        }
    }

    /// Creates a new empty group node.
    pub fn empty() -> SceneNode {
        SceneNode::new(None)
    }

    /// Creates a new node drawing `mesh`.
    pub fn with_mesh(mesh: Mesh) -> SceneNode {
        SceneNode::new(Some(mesh))
    }

    /// Returns an immutable reference to this node's internal data.
    pub fn data(&self) -> Ref<'_, SceneNodeData> {
        self.data.borrow()
    }

    /// Returns a mutable reference to this node's internal data.
    pub fn data_mut(&self) -> RefMut<'_, SceneNodeData> {
        self.data.borrow_mut()
    }

    /// Whether both handles point to the same node.
    #[inline]
    pub fn ptr_eq(&self, other: &SceneNode) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Unique identifier of this node.
    pub fn id(&self) -> u64 {
        self.data().id
    }

    /*
     *
     * Hierarchy.
     *
     */
    /// The parent of this node, if any.
    pub fn parent(&self) -> Option<SceneNode> {
        self.data().parent().map(|data| SceneNode { data })
    }

    /// Handles on the children of this node, in insertion order.
    pub fn children(&self) -> Vec<SceneNode> {
        self.data().children.clone()
    }

    /// Attaches this node to `parent`, or detaches it with `None`.
    ///
    /// The node is removed from its previous parent first, so it is listed by exactly
    /// one parent afterwards. Attaching a node below itself is refused.
    pub fn set_parent(&self, parent: Option<&SceneNode>) {
        let old = self.parent();

        if let (Some(old), Some(new)) = (&old, parent) {
            if old.ptr_eq(new) {
                return;
            }
        }

        if let Some(new) = parent {
            if new.is_descendant_of(self) {
                log::warn!("Cannot attach scene node {} below itself.", self.id());
                return;
            }
        }

        if let Some(old) = old {
            old.data.borrow_mut().remove_child_entry(self);
        }

        self.data.borrow_mut().parent = parent.map(|p| Rc::downgrade(&p.data));

        if let Some(new) = parent {
            new.data.borrow_mut().children.push(self.clone());
        }
    }

    /// Adds `child` to the children of this node, detaching it from its previous parent.
    pub fn add_child(&self, child: &SceneNode) {
        child.set_parent(Some(self));
    }

    /// Removes `child` from the children of this node. Does nothing if `child` is
    /// not a child of this node.
    pub fn remove_child(&self, child: &SceneNode) {
        if child.parent().is_some_and(|p| p.ptr_eq(self)) {
            child.set_parent(None);
        }
    }

    /// Removes this node from its parent.
    pub fn detach(&self) {
        self.set_parent(None);
    }

    /// Whether `ancestor` is this node or one of its ancestors.
    pub fn is_descendant_of(&self, ancestor: &SceneNode) -> bool {
        let mut curr = Some(self.clone());

        while let Some(node) = curr {
            if node.ptr_eq(ancestor) {
                return true;
            }
            curr = node.parent();
        }

        false
    }

    /// Visits this node and its descendants depth-first, in pre-order.
    ///
    /// When `visit` returns `true` the children of the visited node are skipped;
    /// traversal resumes with its next sibling.
    pub fn traverse(&self, visit: &mut dyn FnMut(&SceneNode) -> bool) {
        if visit(self) {
            return;
        }

        for child in self.children() {
            child.traverse(visit);
        }
    }

    /*
     *
     * Transform.
     *
     */
    /// Recomposes the local matrix from position, rotation and scale.
    pub fn update_matrix(&self) {
        self.data.borrow_mut().update_matrix();
    }

    /// Updates the world matrix of this node and its descendants.
    ///
    /// A node recomputes its world matrix when its own transform changed or when
    /// `force` is set. Any recomputation forces the whole subtree below it.
    pub fn update_matrix_world(&self, force: bool) {
        let (children, force) = {
            let mut data = self.data.borrow_mut();

            if data.matrix_auto_update {
                data.update_matrix();
            }

            let mut force = force;
            if data.world_matrix_needs_update || force {
                data.world_matrix = match data.parent() {
                    Some(parent) => parent.borrow().world_matrix * data.matrix,
                    None => data.matrix,
                };
                data.world_matrix_needs_update = false;
                force = true;
            }

            (data.children.clone(), force)
        };

        for child in children {
            child.update_matrix_world(force);
        }
    }

    /// Enables or disables automatic local matrix recomposition.
    ///
    /// When disabled, the local matrix only changes through [`Self::set_matrix`] or
    /// [`Self::update_matrix`].
    pub fn set_matrix_auto_update(&self, enabled: bool) -> Self {
        self.data.borrow_mut().matrix_auto_update = enabled;
        self.clone()
    }

    /// Replaces the local matrix.
    pub fn set_matrix(&self, matrix: Mat4) -> Self {
        let mut data = self.data.borrow_mut();
        data.matrix = matrix;
        data.touch();
        drop(data);
        self.clone()
    }

    /// The local matrix.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        self.data().matrix
    }

    /// The world matrix, as of the last [`Self::update_matrix_world`].
    #[inline]
    pub fn world_matrix(&self) -> Mat4 {
        self.data().world_matrix
    }

    /// Writes position, rotation and scale back from the local matrix.
    pub fn decompose(&self) {
        let mut data = self.data.borrow_mut();
        let (position, quaternion, scale) = math::decompose(&data.matrix);
        data.position = position;
        data.quaternion = quaternion;
        data.scale = scale;
    }

    /// Rotates this node to face `target`.
    ///
    /// With `invert`, the local -Z axis points at the target, as for cameras.
    /// Otherwise the local +Z axis does.
    pub fn look_at(&self, target: Vec3, invert: bool) -> Self {
        let mut data = self.data.borrow_mut();
        data.quaternion = if invert {
            math::look_rotation(data.position, target, data.up)
        } else {
            math::look_rotation(target, data.position, data.up)
        };
        data.touch();
        drop(data);
        self.clone()
    }

    /// This node's local translation.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.data().position
    }

    /// Sets this node's local translation.
    #[inline]
    pub fn set_position(&self, position: Vec3) -> Self {
        let mut data = self.data.borrow_mut();
        data.position = position;
        data.touch();
        drop(data);
        self.clone()
    }

    /// This node's local rotation.
    #[inline]
    pub fn quaternion(&self) -> Quat {
        self.data().quaternion
    }

    /// Sets this node's local rotation.
    #[inline]
    pub fn set_quaternion(&self, quaternion: Quat) -> Self {
        let mut data = self.data.borrow_mut();
        data.quaternion = quaternion;
        data.touch();
        drop(data);
        self.clone()
    }

    /// This node's local scale.
    #[inline]
    pub fn scale(&self) -> Vec3 {
        self.data().scale
    }

    /// Sets this node's local scale.
    #[inline]
    pub fn set_scale(&self, scale: Vec3) -> Self {
        let mut data = self.data.borrow_mut();
        data.scale = scale;
        data.touch();
        drop(data);
        self.clone()
    }

    /// The up direction used by [`Self::look_at`].
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.data().up
    }

    /// Sets the up direction used by [`Self::look_at`].
    pub fn set_up(&self, up: Vec3) -> Self {
        self.data.borrow_mut().up = up;
        self.clone()
    }

    /*
     *
     * Rendering.
     *
     */
    /// Whether this node and its subtree are drawn.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.data().visible
    }

    /// Shows or hides this node and its whole subtree.
    #[inline]
    pub fn set_visible(&self, visible: bool) -> Self {
        self.data.borrow_mut().visible = visible;
        self.clone()
    }

    /// Whether this node carries a mesh.
    #[inline]
    pub fn has_mesh(&self) -> bool {
        self.data().mesh.is_some()
    }

    /// Replaces the mesh drawn at this node.
    pub fn set_mesh(&self, mesh: Option<Mesh>) -> Self {
        self.data.borrow_mut().mesh = mesh;
        self.clone()
    }

    /// Applies `f` to the mesh of this node, if any.
    pub fn modify_mesh<T>(&self, f: impl FnOnce(&mut Mesh) -> T) -> Option<T> {
        self.data.borrow_mut().mesh.as_mut().map(f)
    }
}
