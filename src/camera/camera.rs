use glamx::{Mat4, Vec3};

use crate::camera::Frustum;
use crate::math::{self, Sphere};
use crate::scene::{Mesh, SceneNode};

/// How a [`Camera`] projects view space to clip space.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Projection {
    /// Perspective projection with a vertical field of view in degrees.
    Perspective { fov: f32, aspect: f32 },
    /// Orthographic projection. The extents are divided by `zoom`.
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        zoom: f32,
    },
}

/// Construction options of a [`Camera`].
///
/// The camera is orthographic when `left` or `right` is given. Missing extents
/// default to the `[-1, 1]` square.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CameraOptions {
    pub near: f32,
    pub far: f32,
    /// Vertical field of view, in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub left: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub top: Option<f32>,
    pub zoom: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        CameraOptions {
            near: 0.1,
            far: 100.0,
            fov: 45.0,
            aspect: 1.0,
            left: None,
            right: None,
            bottom: None,
            top: None,
            zoom: 1.0,
        }
    }
}

/// A camera looking down the -Z axis of its transform node.
///
/// The view matrix is the inverse of the node world matrix. It is refreshed by
/// [`Camera::update_matrix_world`], which the renderer calls once per frame.
pub struct Camera {
    node: SceneNode,
    near: f32,
    far: f32,
    projection: Projection,
    projection_matrix: Mat4,
    view_matrix: Mat4,
    projection_view_matrix: Mat4,
    world_position: Vec3,
    frustum: Frustum,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new(CameraOptions::default())
    }
}

impl Camera {
    /// Creates a new camera at the origin.
    pub fn new(options: CameraOptions) -> Camera {
        let projection = if options.left.is_some() || options.right.is_some() {
            Projection::Orthographic {
                left: options.left.unwrap_or(-1.0),
                right: options.right.unwrap_or(1.0),
                bottom: options.bottom.unwrap_or(-1.0),
                top: options.top.unwrap_or(1.0),
                zoom: options.zoom,
            }
        } else {
            Projection::Perspective {
                fov: options.fov,
                aspect: options.aspect,
            }
        };

        let mut camera = Camera {
            node: SceneNode::empty(),
            near: options.near,
            far: options.far,
            projection,
            projection_matrix: Mat4::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_view_matrix: Mat4::IDENTITY,
            world_position: Vec3::ZERO,
            frustum: Frustum::default(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// The transform node of this camera.
    ///
    /// Move the camera through it, or attach it to a scene node to follow it.
    #[inline]
    pub fn node(&self) -> &SceneNode {
        &self.node
    }

    /// Switches to a perspective projection.
    ///
    /// # Arguments
    /// * `fov` - Vertical field of view, in degrees
    /// * `aspect` - Width over height of the viewport
    /// * `near` - Distance of the near clipping plane
    /// * `far` - Distance of the far clipping plane
    pub fn perspective(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Projection::Perspective { fov, aspect };
        self.near = near;
        self.far = far;
        self.update_projection_matrix();
    }

    /// Switches to an orthographic projection.
    pub fn orthographic(&mut self, left: f32, right: f32, bottom: f32, top: f32, zoom: f32) {
        self.projection = Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            zoom,
        };
        self.update_projection_matrix();
    }

    /// Changes the aspect ratio of a perspective camera.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = new_aspect;
            self.update_projection_matrix();
        }
    }

    /// Changes the field of view of a perspective camera, in degrees.
    pub fn set_fov(&mut self, new_fov: f32) {
        if let Projection::Perspective { fov, .. } = &mut self.projection {
            *fov = new_fov;
            self.update_projection_matrix();
        }
    }

    /// The aspect ratio of a perspective camera, or of the orthographic extents.
    pub fn aspect(&self) -> f32 {
        match self.projection {
            Projection::Perspective { aspect, .. } => aspect,
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                ..
            } => (right - left) / (top - bottom),
        }
    }

    /// The vertical field of view in degrees, `None` for orthographic cameras.
    pub fn fov(&self) -> Option<f32> {
        match self.projection {
            Projection::Perspective { fov, .. } => Some(fov),
            Projection::Orthographic { .. } => None,
        }
    }

    #[inline]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    #[inline]
    pub fn near(&self) -> f32 {
        self.near
    }

    #[inline]
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Recomputes the projection matrix from the current projection parameters.
    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective { fov, aspect } => {
                Mat4::perspective_rh_gl(fov.to_radians(), aspect, self.near, self.far)
            }
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                zoom,
            } => Mat4::orthographic_rh_gl(
                left / zoom,
                right / zoom,
                bottom / zoom,
                top / zoom,
                self.near,
                self.far,
            ),
        };
        self.projection_view_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Updates the camera node, then derives the view matrices from its world matrix.
    pub fn update_matrix_world(&mut self, force: bool) {
        self.node.update_matrix_world(force);

        let world = self.node.world_matrix();
        self.view_matrix = world.inverse();
        self.world_position = math::translation(&world);
        self.projection_view_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Points the camera at `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let _ = self.node.look_at(target, true);
    }

    #[inline]
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    #[inline]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection times view, as of the last [`Self::update_matrix_world`].
    #[inline]
    pub fn projection_view_matrix(&self) -> &Mat4 {
        &self.projection_view_matrix
    }

    /// Position of the camera in world space.
    #[inline]
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// Transforms a world-space point to normalized device coordinates.
    pub fn project(&self, point: Vec3) -> Vec3 {
        self.projection_view_matrix.project_point3(point)
    }

    /// Transforms a point in normalized device coordinates back to world space.
    pub fn unproject(&self, point: Vec3) -> Vec3 {
        self.projection_view_matrix.inverse().project_point3(point)
    }

    /// Extracts the frustum planes from the current projection-view matrix.
    pub fn update_frustum(&mut self) {
        self.frustum = Frustum::from_matrix(&self.projection_view_matrix);
    }

    #[inline]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Whether the bounds of `mesh`, transformed by `world`, touch the frustum.
    ///
    /// Meshes without a `position` attribute are never culled.
    pub fn frustum_intersects_mesh(&self, mesh: &Mesh, world: &Mat4) -> bool {
        let mut geometry = mesh.geometry().borrow_mut();
        if !geometry.has_attribute("position") {
            return true;
        }

        let Some(bounds) = geometry.bounds() else {
            return true;
        };

        self.frustum_intersects_sphere(&bounds.sphere.transformed(world))
    }

    /// Whether a world-space sphere touches the frustum.
    #[inline]
    pub fn frustum_intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.frustum.intersects_sphere(sphere)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_perspective() {
        let camera = Camera::default();
        assert_eq!(
            camera.projection(),
            Projection::Perspective {
                fov: 45.0,
                aspect: 1.0
            }
        );
        assert_eq!(camera.near(), 0.1);
        assert_eq!(camera.far(), 100.0);
    }

    #[test]
    fn left_or_right_selects_orthographic() {
        let camera = Camera::new(CameraOptions {
            left: Some(-2.0),
            ..CameraOptions::default()
        });
        assert_eq!(
            camera.projection(),
            Projection::Orthographic {
                left: -2.0,
                right: 1.0,
                bottom: -1.0,
                top: 1.0,
                zoom: 1.0
            }
        );
    }

    #[test]
    fn view_is_inverse_of_world() {
        let mut camera = Camera::default();
        let _ = camera.node().set_position(Vec3::new(0.0, 0.0, 2.0));
        camera.update_matrix_world(false);

        assert_eq!(camera.world_position(), Vec3::new(0.0, 0.0, 2.0));
        let p = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1.0e-6));

        let ndc = camera.project(Vec3::ZERO);
        let back = camera.unproject(ndc);
        assert!(back.abs_diff_eq(Vec3::ZERO, 1.0e-4));
    }

    #[test]
    fn look_at_faces_target() {
        let mut camera = Camera::default();
        let _ = camera.node().set_position(Vec3::new(5.0, 0.0, 0.0));
        camera.look_at(Vec3::ZERO);
        camera.update_matrix_world(false);

        let ndc = camera.project(Vec3::ZERO);
        assert!(ndc.x.abs() < 1.0e-5 && ndc.y.abs() < 1.0e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }
}
