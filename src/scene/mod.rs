//! Everything related to the scene graph.

pub use self::mesh::{Mesh, RenderHook};
pub use self::scene_node::{SceneNode, SceneNodeData};

mod mesh;
mod scene_node;
