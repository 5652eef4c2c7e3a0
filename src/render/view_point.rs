//! Saved views as exchanged with the external store, and the codec that
//! moves them in and out of the camera and clip state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::{camera::CameraRig, clip::ClipPlaneSet};

/// A note attached to a view point. `position` is in the local frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    #[serde(default)]
    pub url: Option<String>,
    pub text: String,
    pub position: [f64; 3],
    #[serde(default)]
    pub view_point: Option<String>,
}

/// Camera and clipping geometry in the external frame plus metadata the
/// viewer only carries along.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewPoint {
    pub position: [f64; 3],
    /// `[x, y, z, w]`.
    pub quaternion: [f64; 4],
    #[serde(default)]
    pub fov: Option<f64>,
    #[serde(default)]
    pub distance_to_target: Option<f64>,
    #[serde(default)]
    pub clip_constants: Option<[f64; 6]>,
    #[serde(default)]
    pub clip_constants_status: [bool; 6],

    #[serde(default)]
    pub pk: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub viewer_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub creation_time: Option<Value>,
    #[serde(default)]
    pub model: Option<Value>,
    #[serde(default)]
    pub notes: Option<Vec<Option<NoteRecord>>>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl Default for ViewPoint {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            quaternion: [0.0, 0.0, 0.0, 1.0],
            fov: None,
            distance_to_target: None,
            clip_constants: None,
            clip_constants_status: [false; 6],
            pk: None,
            url: None,
            viewer_url: None,
            description: None,
            creation_time: None,
            model: None,
            notes: None,
            remark: None,
        }
    }
}

impl ViewPoint {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Prefix used to name the labels of this view point's notes.
    pub fn note_prefix(&self) -> String {
        match &self.pk {
            Some(Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => "null".to_owned(),
        }
    }

    /// Non-null notes with their label names, `"{pk}_{index}"`.
    pub fn named_notes(&self) -> Vec<(String, &NoteRecord)> {
        let prefix = self.note_prefix();
        self.notes
            .iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, note)| note.as_ref().map(|n| (format!("{prefix}_{i}"), n)))
            .collect()
    }
}

/// Loads and saves camera and clip state together.
pub struct ViewPointCodec;

impl ViewPointCodec {
    /// Clip planes first, then the camera.
    pub fn load(vp: &ViewPoint, camera: &mut CameraRig, clip: &mut ClipPlaneSet) {
        clip.apply_external(&vp.clip_constants_status, vp.clip_constants.as_ref());
        camera.apply_view_point(vp);
    }

    /// Current geometry as a view point; metadata left empty for the caller.
    pub fn save(camera: &CameraRig, clip: &ClipPlaneSet) -> ViewPoint {
        let captured = camera.capture();
        let external = clip.to_external();
        ViewPoint {
            position: captured.position,
            quaternion: captured.quaternion,
            fov: Some(captured.fov),
            distance_to_target: Some(captured.distance_to_target),
            clip_constants: Some(external.constants),
            clip_constants_status: external.statuses,
            ..Default::default()
        }
    }
}
