//! Vector and matrix math for the render pipeline

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Lengths and determinants below this are treated as degenerate.
pub const EPSILON: f32 = 1e-4;

/// 2D Vector (texture coordinates, snap grids)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Returns the zero vector for near-zero lengths
    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l < EPSILON {
            return Vec3::ZERO;
        }
        self.scale(1.0 / l)
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

/// Homogeneous 4D vector (clip space)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Divide by w. Near-zero w returns (x, y, z) unchanged to keep
    /// degenerate clip-space positions from exploding.
    pub fn perspective_divide(self) -> Vec3 {
        if self.w.abs() < EPSILON {
            return self.xyz();
        }
        let inv = 1.0 / self.w;
        Vec3::new(self.x * inv, self.y * inv, self.z * inv)
    }
}

impl Default for Vec4 {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

/// Row-major 4x4 matrix. Element order is row 0 cols 0..3, row 1 cols 0..3, ...
/// matching the layout the host writes into the matrix buffers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat4 {
    pub m: [f32; 16],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub fn from_row_major(m: [f32; 16]) -> Self {
        Self { m }
    }

    /// Row . vector product
    pub fn mul_vec4(&self, v: Vec4) -> Vec4 {
        let m = &self.m;
        Vec4::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z + m[3] * v.w,
            m[4] * v.x + m[5] * v.y + m[6] * v.z + m[7] * v.w,
            m[8] * v.x + m[9] * v.y + m[10] * v.z + m[11] * v.w,
            m[12] * v.x + m[13] * v.y + m[14] * v.z + m[15] * v.w,
        )
    }

    /// Transform a direction: rotation/scale only, translation dropped
    pub fn mul_dir(&self, v: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z,
            m[4] * v.x + m[5] * v.y + m[6] * v.z,
            m[8] * v.x + m[9] * v.y + m[10] * v.z,
        )
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub fn min3(a: f32, b: f32, c: f32) -> f32 {
    a.min(b).min(c)
}

pub fn max3(a: f32, b: f32, c: f32) -> f32 {
    a.max(b).max(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_dot() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert!((a.dot(b) - 32.0).abs() < 0.001);
    }

    #[test]
    fn test_vec3_cross() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = a.cross(b);
        assert!((c.z - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let v = Vec3::new(1e-6, 0.0, 0.0).normalize();
        assert_eq!(v, Vec3::ZERO);
    }

    #[test]
    fn test_mat4_row_major_translation() {
        // Translation sits in column 3 of a row-major matrix
        let mut m = Mat4::IDENTITY;
        m.m[3] = 10.0;
        m.m[7] = 20.0;
        m.m[11] = 30.0;
        let p = m.mul_vec4(Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!((p.x, p.y, p.z), (11.0, 22.0, 33.0));

        // Directions ignore translation
        let d = m.mul_dir(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!((d.x, d.y, d.z), (1.0, 2.0, 3.0));
    }

    #[test]
    fn test_perspective_divide_guard() {
        let degenerate = Vec4::new(2.0, 4.0, 6.0, 1e-6);
        let v = degenerate.perspective_divide();
        assert_eq!((v.x, v.y, v.z), (2.0, 4.0, 6.0));

        let normal = Vec4::new(2.0, 4.0, 6.0, 2.0);
        let v = normal.perspective_divide();
        assert_eq!((v.x, v.y, v.z), (1.0, 2.0, 3.0));
    }

    #[test]
    fn test_min3_max3() {
        assert_eq!(min3(3.0, 1.0, 2.0), 1.0);
        assert_eq!(max3(3.0, 1.0, 2.0), 3.0);
    }
}
