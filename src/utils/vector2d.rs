use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Planar vector in the orbital plane, meters or meters per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

impl Vector2D {
    pub fn new(x: f64, y: f64) -> Self {
        Vector2D { x, y }
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 {
            *self
        } else {
            Vector2D::new(self.x / mag, self.y / mag)
        }
    }

    pub fn dot(&self, other: &Vector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product; positive for counter-clockwise motion.
    pub fn cross(&self, other: &Vector2D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// The vector rotated a quarter turn clockwise.
    pub fn perpendicular_cw(&self) -> Self {
        Vector2D::new(self.y, -self.x)
    }
}

impl Add for Vector2D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Vector2D::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vector2D {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vector2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Vector2D::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Vector2D::new(self.x * scalar, self.y * scalar)
    }
}

impl Mul<Vector2D> for f64 {
    type Output = Vector2D;

    fn mul(self, vector: Vector2D) -> Vector2D {
        Vector2D::new(self * vector.x, self * vector.y)
    }
}

impl Div<f64> for Vector2D {
    type Output = Self;

    fn div(self, scalar: f64) -> Self {
        Vector2D::new(self.x / scalar, self.y / scalar)
    }
}

impl Neg for Vector2D {
    type Output = Self;

    fn neg(self) -> Self {
        Vector2D::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cross_sign() {
        let east = Vector2D::new(1.0, 0.0);
        let north = Vector2D::new(0.0, 1.0);
        assert_eq!(east.cross(&north), 1.0);
        assert_eq!(north.cross(&east), -1.0);
    }

    #[test]
    fn test_perpendicular_cw() {
        let up = Vector2D::new(0.0, 1.0);
        assert_eq!(up.perpendicular_cw(), Vector2D::new(1.0, 0.0));
        assert_eq!(up.dot(&up.perpendicular_cw()), 0.0);
    }

    #[test]
    fn test_normalize() {
        let v = Vector2D::new(3.0, 4.0);
        assert_abs_diff_eq!(v.magnitude(), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.normalize().magnitude(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.normalize().x, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_vector_normalizes_to_itself() {
        assert_eq!(Vector2D::default().normalize(), Vector2D::default());
    }
}
