//! Conversion between the external (Navisworks, Z-up) world frame and the
//! local (Y-up) render frame.
//!
//! Both frames are right-handed. They differ by a single proper rotation:
//!
//! ```text
//!            | 1  0  0 |
//! local  =   | 0  0  1 | * external        (x, y, z) -> (x, z, -y)
//!            | 0 -1  0 |
//! ```
//!
//! Every position and direction conversion goes through [`external_to_local`]
//! or its transpose. Orientations are not remapped component-wise: the
//! forward direction is extracted, remapped, and a look-rotation is rebuilt
//! against the target frame's up vector. This fixes roll to "image up is as
//! close to world up as possible".

use cgmath::{EuclideanSpace, InnerSpace, Matrix, Matrix3, Point3, Quaternion, Rotation, Vector3};

/// Camera forward axis, shared by both frames.
pub const FORWARD: Vector3<f64> = Vector3::new(0.0, 0.0, -1.0);

const PARALLEL_EPSILON: f64 = 1e-12;

/// Up conventions of one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub up: Vector3<f64>,
    /// Used instead of `up` when the view looks straight along it.
    pub fallback_up: Vector3<f64>,
}

/// Z-up, with external +Y (north) as the top of the image for plan views.
pub const EXTERNAL: Frame = Frame {
    up: Vector3::new(0.0, 0.0, 1.0),
    fallback_up: Vector3::new(0.0, 1.0, 0.0),
};

/// Y-up. Both vectors are the images of [`EXTERNAL`]'s under [`external_to_local`].
pub const LOCAL: Frame = Frame {
    up: Vector3::new(0.0, 1.0, 0.0),
    fallback_up: Vector3::new(0.0, 0.0, -1.0),
};

/// The permutation+sign matrix taking external coordinates to local ones.
#[inline]
pub fn external_to_local() -> Matrix3<f64> {
    // column major: images of external x, y and z
    Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0)
}

/// Inverse of [`external_to_local`]; the matrix is orthogonal.
#[inline]
pub fn local_to_external() -> Matrix3<f64> {
    external_to_local().transpose()
}

#[inline]
pub fn to_local_direction(external: Vector3<f64>) -> Vector3<f64> {
    external_to_local() * external
}

#[inline]
pub fn to_external_direction(local: Vector3<f64>) -> Vector3<f64> {
    local_to_external() * local
}

#[inline]
pub fn to_local_position(external: Point3<f64>) -> Point3<f64> {
    Point3::from_vec(to_local_direction(external.to_vec()))
}

#[inline]
pub fn to_external_position(local: Point3<f64>) -> Point3<f64> {
    Point3::from_vec(to_external_direction(local.to_vec()))
}

pub fn to_local_orientation(external: Quaternion<f64>) -> Quaternion<f64> {
    let forward = external.normalize().rotate_vector(FORWARD);
    look_rotation(to_local_direction(forward), &LOCAL)
}

pub fn to_external_orientation(local: Quaternion<f64>) -> Quaternion<f64> {
    let forward = local.normalize().rotate_vector(FORWARD);
    look_rotation(to_external_direction(forward), &EXTERNAL)
}

/// Rotation that turns [`FORWARD`] into `forward` while keeping the image
/// upright with respect to `frame`.
pub fn look_rotation(forward: Vector3<f64>, frame: &Frame) -> Quaternion<f64> {
    if forward.magnitude2() < PARALLEL_EPSILON {
        return identity();
    }
    let z = -forward.normalize();
    let mut x = frame.up.cross(z);
    if x.magnitude2() < PARALLEL_EPSILON {
        x = frame.fallback_up.cross(z);
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quaternion::from(Matrix3::from_cols(x, y, z)).normalize()
}

#[inline]
pub fn identity() -> Quaternion<f64> {
    Quaternion::new(1.0, 0.0, 0.0, 0.0)
}

/// Builds a normalized quaternion from `[x, y, z, w]`.
///
/// A zero-length input cannot describe a rotation and is read as identity.
pub fn quaternion_from_array(q: [f64; 4]) -> Quaternion<f64> {
    let quat = Quaternion::new(q[3], q[0], q[1], q[2]);
    if quat.magnitude2() < PARALLEL_EPSILON {
        leptos::logging::warn!("degenerate quaternion {:?} read as identity", q);
        return identity();
    }
    quat.normalize()
}

/// `[x, y, z, w]` layout used by the external store.
#[inline]
pub fn quaternion_to_array(q: Quaternion<f64>) -> [f64; 4] {
    [q.v.x, q.v.y, q.v.z, q.s]
}

/// True when `a` and `b` describe the same rotation, either sign.
pub fn same_rotation(a: Quaternion<f64>, b: Quaternion<f64>, epsilon: f64) -> bool {
    a.normalize().dot(b.normalize()).abs() >= 1.0 - epsilon
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::{Deg, Rotation3};
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn random_point(rng: &mut SmallRng) -> Point3<f64> {
        Point3::new(
            rng.gen_range(-1.0e6..1.0e6),
            rng.gen_range(-1.0e6..1.0e6),
            rng.gen_range(-1.0e6..1.0e6),
        )
    }

    fn random_direction(rng: &mut SmallRng) -> Vector3<f64> {
        loop {
            let v = Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if v.magnitude2() > 1e-3 {
                return v.normalize();
            }
        }
    }

    #[test]
    fn position_follows_the_documented_permutation() {
        let local = to_local_position(Point3::new(1000.0, -500.0, 300.0));
        assert_eq!(local, Point3::new(1000.0, 300.0, 500.0));
        let external = to_external_position(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(external, Point3::new(1.0, -3.0, 2.0));
    }

    #[test]
    fn position_round_trips() {
        let mut rng = SmallRng::seed_from_u64(17);
        for _ in 0..500 {
            let p = random_point(&mut rng);
            let back = to_local_position(to_external_position(p));
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
            assert_abs_diff_eq!(back.z, p.z, epsilon = 1e-9);
            let back = to_external_position(to_local_position(p));
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
            assert_abs_diff_eq!(back.z, p.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn frames_are_images_of_each_other() {
        assert_eq!(to_local_direction(EXTERNAL.up), LOCAL.up);
        assert_eq!(to_local_direction(EXTERNAL.fallback_up), LOCAL.fallback_up);
    }

    #[test]
    fn look_rotation_points_forward_and_keeps_image_upright() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..200 {
            let dir = random_direction(&mut rng);
            let q = look_rotation(dir, &LOCAL);
            let fwd = q.rotate_vector(FORWARD);
            assert_abs_diff_eq!(fwd.dot(dir), 1.0, epsilon = 1e-9);
            // camera right axis stays horizontal
            let right = q.rotate_vector(Vector3::new(1.0, 0.0, 0.0));
            assert_abs_diff_eq!(right.dot(LOCAL.up), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn orientation_round_trips_for_upright_cameras() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..500 {
            let q = look_rotation(random_direction(&mut rng), &LOCAL);
            let back = to_local_orientation(to_external_orientation(q));
            assert!(same_rotation(q, back, 1e-6), "{:?} vs {:?}", q, back);

            let ext = look_rotation(random_direction(&mut rng), &EXTERNAL);
            let back = to_external_orientation(to_local_orientation(ext));
            assert!(same_rotation(ext, back, 1e-6), "{:?} vs {:?}", ext, back);
        }
    }

    #[test]
    fn rolled_cameras_keep_their_view_direction_and_lose_the_roll() {
        let mut rng = SmallRng::seed_from_u64(29);
        for _ in 0..500 {
            let axis = random_direction(&mut rng);
            let q = Quaternion::from_axis_angle(axis, Deg(rng.gen_range(-180.0..180.0)));
            let back = to_local_orientation(to_external_orientation(q));

            let forward = q.rotate_vector(FORWARD);
            assert_abs_diff_eq!(back.rotate_vector(FORWARD).dot(forward), 1.0, epsilon = 1e-9);
            assert!(same_rotation(back, look_rotation(forward, &LOCAL), 1e-9));
            let right = back.rotate_vector(Vector3::new(1.0, 0.0, 0.0));
            assert_abs_diff_eq!(right.dot(LOCAL.up), 0.0, epsilon = 1e-9);

            // once upright, further round trips change nothing
            let again = to_local_orientation(to_external_orientation(back));
            assert!(same_rotation(back, again, 1e-6));
        }

        let rolled = Quaternion::from_axis_angle(Vector3::new(0.0, 0.0, -1.0), Deg(30.0));
        let back = to_local_orientation(to_external_orientation(rolled));
        assert!(!same_rotation(rolled, back, 1e-6));
        assert!(same_rotation(back, identity(), 1e-9));
    }

    #[test]
    fn straight_down_view_keeps_identity() {
        // identity in the external frame looks down -Z with north at the top
        let local = to_local_orientation(identity());
        let fwd = local.rotate_vector(FORWARD);
        assert_abs_diff_eq!(fwd.y, -1.0, epsilon = 1e-12);
        let up = local.rotate_vector(Vector3::new(0.0, 1.0, 0.0));
        assert_abs_diff_eq!(up.z, -1.0, epsilon = 1e-12);
        assert!(same_rotation(to_external_orientation(local), identity(), 1e-12));
    }

    #[test]
    fn horizontal_external_view_maps_to_horizontal_local_view() {
        // looking along external +X
        let ext = Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), Deg(-90.0));
        let ext = to_external_orientation(to_local_orientation(ext));
        let fwd = ext.rotate_vector(FORWARD);
        assert_abs_diff_eq!(fwd.x, 1.0, epsilon = 1e-9);
        let local = to_local_orientation(ext);
        let fwd = local.rotate_vector(FORWARD);
        assert_abs_diff_eq!(fwd.x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fwd.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn quaternion_arrays_are_xyzw_and_normalized() {
        let q = quaternion_from_array([0.0, 0.0, 2.0, 0.0]);
        assert_eq!(quaternion_to_array(q), [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(quaternion_from_array([0.0; 4]), identity());
    }
}
