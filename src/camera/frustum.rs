use glamx::Mat4;

use crate::math::{Plane, Sphere};

/// The six clipping planes of a camera, normals pointing inward.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Frustum::from_matrix(&Mat4::IDENTITY)
    }
}

impl Frustum {
    /// Extracts the normalized planes of a projection-view matrix.
    ///
    /// Planes are ordered left, right, bottom, top, far, near.
    pub fn from_matrix(projection_view: &Mat4) -> Frustum {
        let r0 = projection_view.row(0);
        let r1 = projection_view.row(1);
        let r2 = projection_view.row(2);
        let r3 = projection_view.row(3);

        Frustum {
            planes: [
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 - r2),
                Plane::from_coefficients(r3 + r2),
            ],
        }
    }

    #[inline]
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Whether `sphere` is at least partly inside the frustum.
    ///
    /// A sphere is rejected as soon as it lies entirely behind one plane.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glamx::Vec3;

    fn point(x: f32, y: f32, z: f32) -> Sphere {
        Sphere {
            center: Vec3::new(x, y, z),
            radius: 0.0,
        }
    }

    #[test]
    fn perspective_frustum_bounds() {
        let proj = Mat4::perspective_rh_gl(45f32.to_radians(), 1.0, 0.1, 100.0);
        let frustum = Frustum::from_matrix(&proj);

        assert!(frustum.intersects_sphere(&point(0.0, 0.0, -5.0)));
        assert!(!frustum.intersects_sphere(&point(0.0, 0.0, 5.0)));
        assert!(!frustum.intersects_sphere(&point(0.0, 0.0, -200.0)));

        let behind_left = Sphere {
            center: Vec3::new(-50.0, 0.0, -5.0),
            radius: 1.0,
        };
        assert!(!frustum.intersects_sphere(&behind_left));

        let huge = Sphere {
            center: Vec3::new(0.0, 0.0, -5.0),
            radius: 1000.0,
        };
        assert!(frustum.intersects_sphere(&huge));
    }
}
