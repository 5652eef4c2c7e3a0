//! Engine tunables.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Viewer settings. Every field has a default, so a partial JSON object is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical field of view in degrees.
    pub default_fov: f64,
    /// How far past the far bounding-box corner the default view sits, as a
    /// fraction of the box extent.
    pub initial_distance: f64,
    /// Clear colour as 0xRRGGBB.
    pub background_color: u32,
    pub near: f64,
    pub far: f64,
    /// Zoom limits on the camera-target distance.
    pub min_distance: f64,
    pub max_distance: f64,
    pub zoom_speed: f64,
    pub pan_speed: f64,
    pub rotate_speed: f64,
    /// Pixels panned per arrow-key press.
    pub key_pan_speed: f64,
    /// Used when a view point carries no distance to its target.
    pub default_distance_to_target: f64,
    /// Maximum characters per line of a note label.
    pub note_line_length: usize,
    /// Radius of the orbit target marker per unit of camera-target distance.
    pub target_marker_scale: f64,
    /// Load inner room volumes hidden.
    pub hide_room_spaces: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_fov: 60.0,
            initial_distance: 0.2,
            background_color: 0xe8f9fc,
            near: 200.0,
            far: 2_000_000.0,
            min_distance: 100.0,
            max_distance: 100_000.0,
            zoom_speed: 1.2,
            pan_speed: 2.0,
            rotate_speed: 1.0,
            key_pan_speed: 150.0,
            default_distance_to_target: 2000.0,
            note_line_length: 20,
            target_marker_scale: 0.01,
            hide_room_spaces: true,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Background as a linear wgpu clear colour.
    pub fn clear_color(&self) -> wgpu::Color {
        let channel = |shift: u32| ((self.background_color >> shift) & 0xff) as f64 / 255.0;
        wgpu::Color {
            r: channel(16),
            g: channel(8),
            b: channel(0),
            a: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(r#"{ "default_fov": 45.0, "near": 1.0 }"#).unwrap();
        assert_eq!(config.default_fov, 45.0);
        assert_eq!(config.near, 1.0);
        assert_eq!(config.default_distance_to_target, 2000.0);
        assert!(config.hide_room_spaces);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json("{ \"default_fov\": \"wide\" }").is_err());
    }

    #[test]
    fn clear_color_unpacks_rgb() {
        let config = ViewerConfig {
            background_color: 0xff0080,
            ..Default::default()
        };
        let color = config.clear_color();
        assert_eq!(color.r, 1.0);
        assert_eq!(color.g, 0.0);
        assert_eq!(color.b, 128.0 / 255.0);
    }
}
