//! Small geometric helpers on top of `glamx`.

use glamx::{Mat3, Mat4, Quat, Vec3, Vec4, Vec4Swizzles};

/// Builds a transform matrix from a rotation, a translation and a scale.
#[inline]
pub fn compose(rotation: Quat, position: Vec3, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

/// Splits a transform matrix into its translation, rotation and scale.
///
/// A negative determinant is attributed to a negative x scale.
pub fn decompose(m: &Mat4) -> (Vec3, Quat, Vec3) {
    let mut sx = m.x_axis.xyz().length();
    let sy = m.y_axis.xyz().length();
    let sz = m.z_axis.xyz().length();

    if m.determinant() < 0.0 {
        sx = -sx;
    }

    let position = m.w_axis.xyz();
    let scale = Vec3::new(sx, sy, sz);

    let inv = Vec3::new(
        if sx != 0.0 { 1.0 / sx } else { 0.0 },
        if sy != 0.0 { 1.0 / sy } else { 0.0 },
        if sz != 0.0 { 1.0 / sz } else { 0.0 },
    );
    let rotation = Mat3::from_cols(
        m.x_axis.xyz() * inv.x,
        m.y_axis.xyz() * inv.y,
        m.z_axis.xyz() * inv.z,
    );

    (position, Quat::from_mat3(&rotation).normalize(), scale)
}

/// The largest scale factor applied by `m` along any of its axes.
#[inline]
pub fn max_scale_on_axis(m: &Mat4) -> f32 {
    m.x_axis
        .xyz()
        .length_squared()
        .max(m.y_axis.xyz().length_squared())
        .max(m.z_axis.xyz().length_squared())
        .sqrt()
}

/// The inverse transpose of the upper 3x3 block of a model-view matrix.
#[inline]
pub fn normal_matrix(model_view: &Mat4) -> Mat3 {
    Mat3::from_mat4(*model_view).inverse().transpose()
}

/// The translation component of a transform matrix.
#[inline]
pub fn translation(m: &Mat4) -> Vec3 {
    m.w_axis.xyz()
}

/// Rotation orienting the +Z axis from `target` towards `eye`.
///
/// This is the orientation of a camera at `eye` looking at `target` (cameras look
/// down their local -Z axis).
pub fn look_rotation(eye: Vec3, target: Vec3, up: Vec3) -> Quat {
    let mut z = eye - target;
    if z.length_squared() == 0.0 {
        z = Vec3::Z;
    }
    let z = z.normalize();

    let mut x = up.cross(z);
    if x.length_squared() == 0.0 {
        // `up` and `z` are parallel: nudge `z` to get a usable basis.
        let nudged = if up.z.abs() == 1.0 {
            Vec3::new(z.x + 0.0001, z.y, z.z)
        } else {
            Vec3::new(z.x, z.y, z.z + 0.0001)
        };
        x = up.cross(nudged.normalize());
    }
    let x = x.normalize();
    let y = z.cross(x);

    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

/// A plane `normal · p + constant = 0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    /// The unit normal, pointing towards the inside half-space.
    pub normal: Vec3,
    /// Signed offset from the origin.
    pub constant: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Plane {
            normal: Vec3::Y,
            constant: 0.0,
        }
    }
}

impl Plane {
    /// Builds a plane from its `(a, b, c, d)` coefficients, normalizing them.
    pub fn from_coefficients(v: Vec4) -> Plane {
        let len = v.xyz().length();
        if len == 0.0 {
            return Plane {
                normal: Vec3::ZERO,
                constant: v.w,
            };
        }
        Plane {
            normal: v.xyz() / len,
            constant: v.w / len,
        }
    }

    /// Signed distance from `point` to this plane.
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }
}

/// A bounding sphere.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    /// The sphere transformed by `m`, with its radius scaled by the largest axis scale.
    pub fn transformed(&self, m: &Mat4) -> Sphere {
        Sphere {
            center: m.transform_point3(self.center),
            radius: self.radius * max_scale_on_axis(m),
        }
    }
}

/// An axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// The box center.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// The box extents along each axis.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_3;

    #[test]
    fn compose_decompose_round_trip() {
        let rotation = Quat::from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), FRAC_PI_3);
        let position = Vec3::new(1.5, -2.0, 7.25);
        let scale = Vec3::new(2.0, 0.5, 3.0);

        let m = compose(rotation, position, scale);
        let (p, q, s) = decompose(&m);

        assert_eq!(p, position);
        assert!(s.abs_diff_eq(scale, 1.0e-5));
        assert!(q.dot(rotation).abs() > 1.0 - 1.0e-5);
    }

    #[test]
    fn decompose_negative_scale() {
        let m = compose(Quat::IDENTITY, Vec3::ZERO, Vec3::new(-2.0, 1.0, 1.0));
        let (_, q, s) = decompose(&m);
        assert!(s.abs_diff_eq(Vec3::new(-2.0, 1.0, 1.0), 1.0e-5));
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1.0e-5));
    }

    #[test]
    fn max_scale() {
        let m = compose(Quat::IDENTITY, Vec3::ONE, Vec3::new(1.0, 4.0, 2.0));
        assert!((max_scale_on_axis(&m) - 4.0).abs() < 1.0e-6);
    }

    #[test]
    fn look_rotation_points_minus_z_at_target() {
        let q = look_rotation(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let forward = q * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1.0e-5));

        let q = look_rotation(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y);
        assert!((q * Vec3::NEG_Z).abs_diff_eq(Vec3::NEG_X, 1.0e-5));
    }

    #[test]
    fn plane_distance() {
        let plane = Plane::from_coefficients(Vec4::new(0.0, 2.0, 0.0, -4.0));
        assert_eq!(plane.normal, Vec3::Y);
        assert_eq!(plane.distance_to_point(Vec3::new(0.0, 5.0, 0.0)), 3.0);
    }
}
