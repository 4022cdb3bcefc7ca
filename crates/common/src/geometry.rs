use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

const PARALLEL_EPSILON: f32 = 1e-7;

/// Inverse of a rigid (rotation + translation) transform.
///
/// Uses the transpose of the rotation block, so the input must be
/// orthonormal. Scale and shear are not supported.
pub fn rigid_inverse(m: &Mat4) -> Mat4 {
    let rot_t = Mat3::from_mat4(*m).transpose();
    let translation = -(rot_t * m.w_axis.truncate());
    Mat4::from_cols(
        rot_t.x_axis.extend(0.0),
        rot_t.y_axis.extend(0.0),
        rot_t.z_axis.extend(0.0),
        translation.extend(1.0),
    )
}

/// A half-line starting at `origin`. `direction` is kept unit length so
/// hit distances stay comparable across rigid frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray along the local −Z axis of `pose`.
    pub fn from_pose(pose: &Mat4) -> Self {
        Self::new(
            pose.transform_point3(Vec3::ZERO),
            pose.transform_vector3(Vec3::NEG_Z),
        )
    }

    /// Same ray expressed in another frame. `m` must be rigid.
    pub fn transformed(&self, m: &Mat4) -> Self {
        Self {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned box in an object's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::from_half_extents(Vec3::ZERO, Vec3::splat(0.5))
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Axis-aligned box enclosing this one after `m` is applied.
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        let center = m.transform_point3((self.min + self.max) * 0.5);
        let half = (self.max - self.min) * 0.5;
        let rot = Mat3::from_mat4(*m);
        let extent =
            rot.x_axis.abs() * half.x + rot.y_axis.abs() * half.y + rot.z_axis.abs() * half.z;
        Aabb {
            min: center - extent,
            max: center + extent,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab test. Returns the `(enter, exit)` distances along the ray when
    /// the box lies at least partly in front of the origin. `enter` is
    /// negative when the origin is inside the box.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        let mut enter = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;
        for axis in 0..3 {
            let o = ray.origin[axis];
            let d = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < PARALLEL_EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            enter = enter.max(t0);
            exit = exit.min(t1);
            if enter > exit {
                return None;
            }
        }
        (exit >= 0.0).then_some((enter, exit))
    }

    /// Nearest non-negative distance at which the ray meets the box shell.
    pub fn ray_hit_distance(&self, ray: &Ray) -> Option<f32> {
        self.intersect_ray(ray)
            .map(|(enter, exit)| if enter >= 0.0 { enter } else { exit })
    }
}

/// Triangle in an object's local frame, used for exact ray tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Möller–Trumbore; two-sided. Only hits in front of the origin count.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t > PARALLEL_EPSILON).then_some(t)
    }
}
