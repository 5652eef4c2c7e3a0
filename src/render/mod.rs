use cgmath::{Point3, Vector3};

pub mod camera;
pub mod clip;
pub mod coords;
pub mod pick;
pub mod render;
pub mod scene;
mod view_core;
mod view_data;
pub mod view_point;
pub mod viewer;

/// Axis-aligned extent of a loaded model in local (Y-up) space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Default for BBox {
    fn default() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }
}

impl BBox {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Box around a flat `[x, y, z, x, y, z, ...]` buffer.
    pub fn from_points(points: &[f64]) -> Self {
        let mut bbox = Self::default();
        for p in points.chunks_exact(3) {
            bbox.merge(&Point3::new(p[0], p[1], p[2]));
        }
        bbox
    }

    #[inline]
    pub fn merge(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    #[inline]
    pub fn merge_box(&mut self, other: &BBox) {
        self.merge(&other.min);
        self.merge(&other.max);
    }

    /// False until at least one point has been merged.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    #[inline]
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }
}
