use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A point in time, in milliseconds, as reported by the frame driver.
///
/// The origin is arbitrary (application start for the desktop app, zero for
/// headless runs); only differences between timestamps are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Timestamp(pub f64);

impl Timestamp {
    pub const ZERO: Self = Self(0.0);

    pub fn from_millis(ms: f64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> f64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`. Negative if `earlier`
    /// is in the future.
    pub fn millis_since(self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Shrink horizontally (x/z) by `margin` on every side. Axes that would
    /// invert collapse to their midpoint.
    pub fn shrink_xz(&self, margin: f32) -> Self {
        let mut min = self.min;
        let mut max = self.max;
        for axis in [0usize, 2] {
            if max[axis] - min[axis] > 2.0 * margin {
                min[axis] += margin;
                max[axis] -= margin;
            } else {
                let mid = (min[axis] + max[axis]) * 0.5;
                min[axis] = mid;
                max[axis] = mid;
            }
        }
        Self { min, max }
    }

    pub fn clamp(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_difference() {
        let a = Timestamp::from_millis(250.0);
        let b = Timestamp::from_millis(1250.0);
        assert_eq!(b.millis_since(a), 1000.0);
        assert_eq!(a.millis_since(b), -1000.0);
    }

    #[test]
    fn aabb_normalizes_corners() {
        let b = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(b.max, Vec3::ONE);
    }

    #[test]
    fn shrink_keeps_vertical_band() {
        let b = Aabb::new(Vec3::new(-10.0, 0.0, -10.0), Vec3::new(10.0, 5.0, 10.0));
        let s = b.shrink_xz(0.5);
        assert_eq!(s.min, Vec3::new(-9.5, 0.0, -9.5));
        assert_eq!(s.max, Vec3::new(9.5, 5.0, 9.5));
    }

    #[test]
    fn shrink_collapses_thin_box() {
        let b = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.5, 1.0, 4.0));
        let s = b.shrink_xz(1.0);
        assert_eq!(s.min.x, 0.25);
        assert_eq!(s.max.x, 0.25);
        assert_eq!(s.min.z, 1.0);
        assert_eq!(s.max.z, 3.0);
    }

    #[test]
    fn clamp_into_bounds() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(b.clamp(Vec3::new(5.0, 0.0, -3.0)), Vec3::new(1.0, 0.0, -1.0));
        assert!(b.contains(Vec3::ZERO));
        assert!(!b.contains(Vec3::new(0.0, 2.0, 0.0)));
    }
}
