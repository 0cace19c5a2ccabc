//! Plain 2D vector math for the layout engine.

use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::Serialize;

const EPSILON: f64 = 1e-9;

/// A point or direction in the drawing plane. The y axis points up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians from the positive x axis.
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vector2) -> f64 {
        (self - other).length()
    }

    pub fn distance_sq(self, other: Vector2) -> f64 {
        let d = self - other;
        d.x * d.x + d.y * d.y
    }

    pub fn dot(self, other: Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(self, other: Vector2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Unit vector in the same direction; the positive x axis for a
    /// zero-length vector.
    pub fn normalized(self) -> Vector2 {
        let len = self.length();
        if len < EPSILON || !len.is_finite() {
            Vector2::new(1.0, 0.0)
        } else {
            Vector2::new(self.x / len, self.y / len)
        }
    }

    /// Counter-clockwise perpendicular.
    pub fn perpendicular(self) -> Vector2 {
        Vector2::new(-self.y, self.x)
    }

    pub fn rotate(self, angle: f64) -> Vector2 {
        let (s, c) = angle.sin_cos();
        Vector2::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    pub fn rotate_around(self, angle: f64, pivot: Vector2) -> Vector2 {
        (self - pivot).rotate(angle) + pivot
    }

    /// Mirror image across the line through `a` and `b`.
    pub fn reflect(self, a: Vector2, b: Vector2) -> Vector2 {
        let dir = (b - a).normalized();
        let rel = self - a;
        let along = dir * rel.dot(dir);
        a + along * 2.0 - rel
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Shortest distance from this point to the segment `a`-`b`.
    pub fn distance_to_segment(self, a: Vector2, b: Vector2) -> f64 {
        let ab = b - a;
        let len_sq = ab.dot(ab);
        if len_sq < EPSILON {
            return self.distance(a);
        }
        let t = ((self - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        self.distance(a + ab * t)
    }

    pub fn centroid(points: &[Vector2]) -> Vector2 {
        if points.is_empty() {
            return Vector2::ZERO;
        }
        let sum = points.iter().fold(Vector2::ZERO, |acc, p| acc + *p);
        sum * (1.0 / points.len() as f64)
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Vector2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

/// Normalizes an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(2.0 * PI);
    if a.is_finite() {
        a
    } else {
        0.0
    }
}

/// Absolute angular difference folded into `[0, π]`.
pub fn angle_between(a: f64, b: f64) -> f64 {
    let d = normalize_angle(a - b);
    if d > PI {
        2.0 * PI - d
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rotation_quarter_turn() {
        let v = Vector2::new(1.0, 0.0).rotate(PI / 2.0);
        assert!(close(v.x, 0.0));
        assert!(close(v.y, 1.0));
    }

    #[test]
    fn reflect_across_x_axis() {
        let p = Vector2::new(2.0, 3.0).reflect(Vector2::ZERO, Vector2::new(1.0, 0.0));
        assert!(close(p.x, 2.0));
        assert!(close(p.y, -3.0));
    }

    #[test]
    fn zero_vector_normalizes_to_x_axis() {
        assert_eq!(Vector2::ZERO.normalized(), Vector2::new(1.0, 0.0));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(10.0, 0.0);
        assert!(close(Vector2::new(5.0, 2.0).distance_to_segment(a, b), 2.0));
        assert!(close(Vector2::new(13.0, 4.0).distance_to_segment(a, b), 5.0));
    }

    #[test]
    fn angle_folding() {
        assert!(close(angle_between(0.1, 2.0 * PI - 0.1), 0.2));
        assert!(close(normalize_angle(-PI / 2.0), 1.5 * PI));
    }
}
