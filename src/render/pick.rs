//! Ray picking against the visible part of the scene.

use cgmath::{InnerSpace, Point3, Vector2, Vector3};

use super::{camera::CameraRig, clip::ClipPlaneSet, scene::Scene, BBox};

/// A ray in local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Pointer position in pixels, origin at the top-left of the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Normalized device coordinates, -1..1 rightward and upward.
    pub fn to_ndc(&self, width: f64, height: f64) -> Vector2<f64> {
        Vector2::new(self.x / width * 2.0 - 1.0, -(self.y / height) * 2.0 + 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub distance: f64,
    pub point: Point3<f64>,
    pub mesh: usize,
}

/// Möller-Trumbore. Returns the distance along the ray, hits behind the
/// origin excluded. Both windings count.
pub fn ray_triangle_intersect(
    ray: &Ray,
    v0: Point3<f64>,
    v1: Point3<f64>,
    v2: Point3<f64>,
) -> Option<f64> {
    const EPSILON: f64 = 1e-12;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t > EPSILON {
        Some(t)
    } else {
        None
    }
}

/// Slab test: whether the ray meets `bbox` in front of its origin. The box is
/// padded slightly so flat meshes and hits on a face still count.
pub fn ray_hits_box(ray: &Ray, bbox: &BBox) -> bool {
    if !bbox.is_valid() {
        return false;
    }
    let pad = 1e-9 * (1.0 + (bbox.max - bbox.min).magnitude());
    let mut t_near = 0.0f64;
    let mut t_far = f64::INFINITY;
    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        let lo = bbox.min[axis] - pad;
        let hi = bbox.max[axis] + pad;
        if direction == 0.0 {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }
        let t0 = (lo - origin) / direction;
        let t1 = (hi - origin) / direction;
        t_near = t_near.max(t0.min(t1));
        t_far = t_far.min(t0.max(t1));
        if t_near > t_far {
            return false;
        }
    }
    true
}

/// Every ray/mesh intersection, nearest first. Hidden meshes and note labels
/// take no part.
pub fn intersections(ray: &Ray, scene: &Scene) -> Vec<Hit> {
    let mut hits = Vec::new();
    for (mesh_idx, mesh) in scene.meshes().iter().enumerate() {
        if !mesh.visible || !ray_hits_box(ray, &mesh.bbox) {
            continue;
        }
        for tri in mesh.triangles() {
            if let Some(distance) = ray_triangle_intersect(ray, tri[0], tri[1], tri[2]) {
                hits.push(Hit {
                    distance,
                    point: ray.at(distance),
                    mesh: mesh_idx,
                });
            }
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// First intersection that is not clipped away.
pub fn pick_ray(ray: &Ray, scene: &Scene, clip: &ClipPlaneSet) -> Option<Point3<f64>> {
    intersections(ray, scene)
        .into_iter()
        .map(|hit| hit.point)
        .find(|point| clip.contains(point))
}

/// Casts from the camera through `ndc` and returns the first visible
/// surface point, or `None` when every hit is clipped or there is none.
pub fn pick(
    ndc: Vector2<f64>,
    camera: &CameraRig,
    scene: &Scene,
    clip: &ClipPlaneSet,
) -> Option<Point3<f64>> {
    let ray = camera.ray(ndc)?;
    pick_ray(&ray, scene, clip)
}
