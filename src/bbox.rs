use glam::Vec3;

/// Axis-aligned bounding box in world space.
///
/// A default constructed box is empty: expanding it by a point yields a box
/// containing exactly that point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_points(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain `point`.
    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to contain `other`.
    pub fn expand(&mut self, other: BBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_box_is_empty() {
        assert!(BBox::default().is_empty());
    }

    #[test]
    fn expand_by_point() {
        let mut b = BBox::empty();
        b.expand_point(Vec3::new(1.0, -2.0, 3.0));

        assert!(!b.is_empty());
        assert_eq!(b.min, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(b.max, Vec3::new(1.0, -2.0, 3.0));

        b.expand_point(Vec3::new(-1.0, 4.0, 3.0));
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 3.0));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 3.0));
    }

    #[test]
    fn union_of_boxes() {
        let mut a = BBox::from_points(Vec3::ZERO, Vec3::ONE);
        let b = BBox::from_points(Vec3::splat(-2.0), Vec3::splat(-1.0));

        a.expand(b);
        assert_eq!(a.min, Vec3::splat(-2.0));
        assert_eq!(a.max, Vec3::ONE);
    }

    #[test]
    fn union_with_empty_is_identity() {
        let mut a = BBox::from_points(Vec3::ZERO, Vec3::ONE);
        a.expand(BBox::empty());

        assert_eq!(a, BBox::from_points(Vec3::ZERO, Vec3::ONE));
    }
}
