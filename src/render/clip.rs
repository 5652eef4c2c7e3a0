//! Six axis-aligned section planes bound to a model's bounding box.
//!
//! Planes are kept in a fixed order, `[Up, Down, Front, Back, Left, Right]`,
//! which is also the order of the external `clip_constants` arrays. Each plane
//! keeps the half-space `sign * axis <= constant` visible, so a plane sitting
//! on its bounding-box default clips nothing.
//!
//! The external store writes constants negated and with Left/Right stored in
//! each other's slot. [`apply_external`] and [`to_external`] undo and redo
//! exactly that, in that order, so records written by either side load back
//! the same.

use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::BBox;

const ON_PLANE_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn of(self, point: &Point3<f64>) -> f64 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
            Axis::Z => point.z,
        }
    }

    #[inline]
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::new(1.0, 0.0, 0.0),
            Axis::Y => Vector3::new(0.0, 1.0, 0.0),
            Axis::Z => Vector3::new(0.0, 0.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Positive,
    Negative,
}

impl Side {
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Positive => 1.0,
            Side::Negative => -1.0,
        }
    }
}

/// One of the six section faces, in storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipFace {
    Up,
    Down,
    Front,
    Back,
    Left,
    Right,
}

impl ClipFace {
    pub const ALL: [ClipFace; 6] = [
        ClipFace::Up,
        ClipFace::Down,
        ClipFace::Front,
        ClipFace::Back,
        ClipFace::Left,
        ClipFace::Right,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn axis(self) -> Axis {
        match self {
            ClipFace::Up | ClipFace::Down => Axis::Y,
            ClipFace::Front | ClipFace::Back => Axis::Z,
            ClipFace::Left | ClipFace::Right => Axis::X,
        }
    }

    pub fn side(self) -> Side {
        match self {
            ClipFace::Up | ClipFace::Front | ClipFace::Right => Side::Positive,
            ClipFace::Down | ClipFace::Back | ClipFace::Left => Side::Negative,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClipFace::Up => "Up",
            ClipFace::Down => "Down",
            ClipFace::Front => "Front",
            ClipFace::Back => "Back",
            ClipFace::Left => "Left",
            ClipFace::Right => "Right",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipPlane {
    pub axis: Axis,
    pub side: Side,
    pub constant: f64,
}

impl ClipPlane {
    #[inline]
    pub fn new(face: ClipFace, constant: f64) -> Self {
        Self {
            axis: face.axis(),
            side: face.side(),
            constant,
        }
    }

    /// Outward normal of the kept half-space.
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        self.side.sign() * self.axis.unit()
    }

    /// Points on the plane, within rounding, are kept.
    #[inline]
    pub fn keeps(&self, point: &Point3<f64>) -> bool {
        let tolerance = ON_PLANE_TOLERANCE * self.constant.abs().max(1.0);
        self.side.sign() * self.axis.of(point) <= self.constant + tolerance
    }

    /// `(normal, constant)` as packed for the shader.
    #[inline]
    pub fn to_gpu(&self) -> [f32; 4] {
        let n = self.normal();
        [n.x as f32, n.y as f32, n.z as f32, self.constant as f32]
    }
}

/// Constants that leave the whole of `bbox` visible.
pub fn defaults_for(bbox: &BBox) -> [ClipPlane; 6] {
    let constants = default_constants(bbox);
    ClipFace::ALL.map(|face| ClipPlane::new(face, constants[face.index()]))
}

fn default_constants(bbox: &BBox) -> [f64; 6] {
    [
        bbox.max.y,
        -bbox.min.y,
        bbox.max.z,
        -bbox.min.z,
        -bbox.min.x,
        bbox.max.x,
    ]
}

/// Left and Right trade places at the external boundary.
#[inline]
fn external_slot(index: usize) -> usize {
    match index {
        4 => 5,
        5 => 4,
        i => i,
    }
}

/// Clip state as stored by the external tool.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalClip {
    pub statuses: [bool; 6],
    pub constants: [f64; 6],
}

/// Planes for a stored record. Disabled faces, and every face when the record
/// has no constants at all, sit on the bounding-box default.
pub fn apply_external(
    statuses: &[bool; 6],
    constants: Option<&[f64; 6]>,
    bbox: &BBox,
) -> [ClipPlane; 6] {
    let mut planes = defaults_for(bbox);
    if let Some(constants) = constants {
        for (i, plane) in planes.iter_mut().enumerate() {
            if statuses[i] {
                plane.constant = -constants[external_slot(i)];
            }
        }
    }
    planes
}

/// Record form of `planes`; a face counts as enabled once it has moved off
/// its bounding-box default.
pub fn to_external(planes: &[ClipPlane; 6], bbox: &BBox) -> ExternalClip {
    let defaults = default_constants(bbox);
    let mut statuses = [false; 6];
    let mut constants = [0.0; 6];
    for i in 0..6 {
        statuses[i] = planes[i].constant != defaults[i];
        constants[i] = -planes[external_slot(i)].constant;
    }
    ExternalClip {
        statuses,
        constants,
    }
}

/// Live clip state of the loaded model.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPlaneSet {
    bbox: BBox,
    planes: [ClipPlane; 6],
}

impl ClipPlaneSet {
    pub fn new(bbox: BBox) -> Self {
        Self {
            planes: defaults_for(&bbox),
            bbox,
        }
    }

    #[inline]
    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    #[inline]
    pub fn planes(&self) -> &[ClipPlane; 6] {
        &self.planes
    }

    #[inline]
    pub fn plane(&self, face: ClipFace) -> &ClipPlane {
        &self.planes[face.index()]
    }

    pub fn reset(&mut self) {
        self.planes = defaults_for(&self.bbox);
    }

    pub fn apply_external(&mut self, statuses: &[bool; 6], constants: Option<&[f64; 6]>) {
        self.planes = apply_external(statuses, constants, &self.bbox);
    }

    pub fn to_external(&self) -> ExternalClip {
        to_external(&self.planes, &self.bbox)
    }

    pub fn set_constant(&mut self, face: ClipFace, constant: f64) {
        self.planes[face.index()].constant = constant;
    }

    /// Moves a face to `value`, given in plain axis coordinates.
    pub fn set_offset(&mut self, face: ClipFace, value: f64) {
        self.set_constant(face, face.side().sign() * value);
    }

    /// Axis coordinate the face currently sits at.
    pub fn offset(&self, face: ClipFace) -> f64 {
        face.side().sign() * self.plane(face).constant
    }

    /// Slider range for a face: the model extent along its axis.
    pub fn offset_range(&self, face: ClipFace) -> (f64, f64) {
        let axis = face.axis();
        (axis.of(&self.bbox.min), axis.of(&self.bbox.max))
    }

    /// True when `point` lies inside every kept half-space.
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.planes.iter().all(|plane| plane.keeps(point))
    }

    pub fn to_gpu(&self) -> [[f32; 4]; 6] {
        self.planes.map(|plane| plane.to_gpu())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn model_box() -> BBox {
        BBox::new(Point3::new(-10.0, 2.0, -30.0), Point3::new(40.0, 50.0, 60.0))
    }

    #[test]
    fn defaults_follow_the_fixed_face_order() {
        let planes = defaults_for(&model_box());
        let constants = planes.map(|p| p.constant);
        assert_eq!(constants, [50.0, -2.0, 60.0, 30.0, 10.0, 40.0]);
        assert_eq!(planes[0].axis, Axis::Y);
        assert_eq!(planes[2].axis, Axis::Z);
        assert_eq!(planes[4].axis, Axis::X);
        assert_eq!(planes[4].side, Side::Negative);
        assert_eq!(planes[5].side, Side::Positive);
    }

    #[test]
    fn default_planes_report_all_disabled() {
        let bbox = model_box();
        let clip = to_external(&defaults_for(&bbox), &bbox);
        assert_eq!(clip.statuses, [false; 6]);
        assert_eq!(ClipPlaneSet::new(bbox).to_external().statuses, [false; 6]);
    }

    #[test]
    fn default_planes_keep_the_interior() {
        let set = ClipPlaneSet::new(model_box());
        assert!(set.contains(&Point3::new(0.0, 10.0, 0.0)));
        assert!(set.contains(&Point3::new(40.0, 50.0, 60.0)));
        assert!(!set.contains(&Point3::new(0.0, 60.0, 0.0)));
        assert!(!set.contains(&Point3::new(-11.0, 10.0, 0.0)));
        assert!(!set.contains(&Point3::new(41.0, 10.0, 0.0)));
    }

    #[test]
    fn missing_constants_fall_back_to_defaults() {
        let bbox = model_box();
        let planes = apply_external(&[true; 6], None, &bbox);
        assert_eq!(planes, defaults_for(&bbox));
    }

    #[test]
    fn disabled_faces_keep_their_defaults() {
        let bbox = model_box();
        let statuses = [true, false, false, false, false, false];
        let constants = [-20.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let planes = apply_external(&statuses, Some(&constants), &bbox);
        assert_eq!(planes[0].constant, 20.0);
        for i in 1..6 {
            assert_eq!(planes[i], defaults_for(&bbox)[i]);
        }
    }

    #[test]
    fn clip_round_trips_for_enabled_faces() {
        let bbox = model_box();
        let subsets = [
            [true, false, true, false, false, false],
            [false, true, false, true, true, true],
            [true; 6],
            [false, false, false, false, true, true],
        ];
        let constants = [-45.0, 5.0, -12.5, 20.0, 0.25, -7.75];
        for statuses in subsets {
            let planes = apply_external(&statuses, Some(&constants), &bbox);
            let back = to_external(&planes, &bbox);
            assert_eq!(back.statuses, statuses);
            for i in 0..6 {
                if statuses[i] {
                    assert_abs_diff_eq!(back.constants[i], constants[i], epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn only_left_and_right_trade_slots() {
        let bbox = model_box();
        let sentinels = [101.0, 202.0, 303.0, 404.0, 505.0, 606.0];
        let planes = apply_external(&[true; 6], Some(&sentinels), &bbox);
        let local = planes.map(|p| p.constant);
        assert_eq!(local, [-101.0, -202.0, -303.0, -404.0, -606.0, -505.0]);

        let mut set = ClipPlaneSet::new(bbox);
        for face in ClipFace::ALL {
            set.set_constant(face, (face.index() as f64 + 1.0) * 11.0);
        }
        let ext = set.to_external();
        assert_eq!(ext.constants, [-11.0, -22.0, -33.0, -44.0, -66.0, -55.0]);
        assert_eq!(ext.statuses, [true; 6]);
    }

    #[test]
    fn mixed_left_right_statuses_pair_status_and_value_by_slot() {
        // status is read per local face, the value from the swapped slot
        let bbox = model_box();
        let statuses = [false, false, false, false, true, false];
        let constants = [0.0, 0.0, 0.0, 0.0, -1.0, -2.0];
        let planes = apply_external(&statuses, Some(&constants), &bbox);
        assert_eq!(planes[4].constant, 2.0);
        assert_eq!(planes[5].constant, bbox.max.x);
        let back = to_external(&planes, &bbox);
        assert_eq!(back.statuses, statuses);
        assert_eq!(back.constants[5], -2.0);
    }

    #[test]
    fn offsets_are_axis_coordinates() {
        let mut set = ClipPlaneSet::new(model_box());
        set.set_offset(ClipFace::Down, 12.0);
        assert_eq!(set.plane(ClipFace::Down).constant, -12.0);
        assert_eq!(set.offset(ClipFace::Down), 12.0);
        assert!(!set.contains(&Point3::new(0.0, 11.0, 0.0)));
        assert!(set.contains(&Point3::new(0.0, 13.0, 0.0)));
        assert_eq!(set.offset(ClipFace::Left), -10.0);
        assert_eq!(set.offset_range(ClipFace::Left), (-10.0, 40.0));

        set.reset();
        assert_eq!(set.planes(), &defaults_for(&model_box()));
    }

    #[test]
    fn gpu_planes_carry_normal_and_constant() {
        let set = ClipPlaneSet::new(model_box());
        let gpu = set.to_gpu();
        assert_eq!(gpu[1], [0.0, -1.0, 0.0, -2.0]);
        assert_eq!(gpu[4], [-1.0, 0.0, 0.0, 10.0]);
    }
}
