use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub};

/// Integer 2D vector for board positions and unit steps
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}

impl IVec2 {
    pub const ZERO: IVec2 = IVec2 { x: 0, y: 0 };
    pub const UP: IVec2 = IVec2 { x: 0, y: -1 };
    pub const DOWN: IVec2 = IVec2 { x: 0, y: 1 };
    pub const LEFT: IVec2 = IVec2 { x: -1, y: 0 };
    pub const RIGHT: IVec2 = IVec2 { x: 1, y: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Per-axis sign, each component in {-1, 0, 1}
    #[inline]
    pub fn signum(&self) -> Self {
        Self {
            x: self.x.signum(),
            y: self.y.signum(),
        }
    }

    /// Exact squared length (no overflow for any pair of i32 coordinates on a board)
    #[inline]
    pub fn length_sq(&self) -> i64 {
        let x = self.x as i64;
        let y = self.y as i64;
        x * x + y * y
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.length_sq() as f64).sqrt() as f32
    }

    #[inline]
    pub fn distance_sq(&self, other: IVec2) -> i64 {
        (*self - other).length_sq()
    }

    /// True Euclidean distance
    #[inline]
    pub fn distance(&self, other: IVec2) -> f32 {
        (*self - other).length()
    }

    /// Component-wise clamp into `[min, max]`
    #[inline]
    pub fn clamp(&self, min: IVec2, max: IVec2) -> Self {
        Self {
            x: self.x.clamp(min.x, max.x),
            y: self.y.clamp(min.y, max.y),
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Coordinate along axis 0 (x) or 1 (y)
    #[inline]
    pub fn axis(&self, axis: usize) -> i32 {
        if axis == 0 {
            self.x
        } else {
            self.y
        }
    }
}

impl Add for IVec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for IVec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Neg for IVec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl AddAssign for IVec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl From<(i32, i32)> for IVec2 {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let v = IVec2::new(3, 4);
        assert_eq!(v.x, 3);
        assert_eq!(v.y, 4);
    }

    #[test]
    fn test_length() {
        let v = IVec2::new(3, 4);
        assert_eq!(v.length_sq(), 25);
        assert!((v.length() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_signum() {
        assert_eq!(IVec2::new(-7, 0).signum(), IVec2::new(-1, 0));
        assert_eq!(IVec2::new(12, -3).signum(), IVec2::new(1, -1));
        assert_eq!(IVec2::ZERO.signum(), IVec2::ZERO);
    }

    #[test]
    fn test_distance_is_euclidean() {
        let a = IVec2::new(100, 100);
        let b = IVec2::new(101, 101);
        assert_eq!(a.distance_sq(b), 2);
        assert!((a.distance(b) - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_clamp() {
        let min = IVec2::new(20, 20);
        let max = IVec2::new(680, 680);
        assert_eq!(IVec2::new(5, 700).clamp(min, max), IVec2::new(20, 680));
        assert_eq!(IVec2::new(300, 300).clamp(min, max), IVec2::new(300, 300));
    }

    #[test]
    fn test_operators() {
        let mut v = IVec2::new(1, 2) + IVec2::new(3, 4);
        assert_eq!(v, IVec2::new(4, 6));
        v += IVec2::LEFT;
        assert_eq!(v, IVec2::new(3, 6));
        assert_eq!(-v, IVec2::new(-3, -6));
        assert_eq!(v - IVec2::DOWN, IVec2::new(3, 5));
    }
}
