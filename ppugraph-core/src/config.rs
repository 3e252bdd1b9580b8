//! Configuration
//!
//! Graph-wide settings and declarative unit descriptions. Both deserialize
//! from JSON so a pipeline can be described outside of code.

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::UnitResult;
use crate::render::{PixelFormat, Viewport};
use crate::unit::Unit;

/// Orthographic projection volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// 2D volume with the depth range fixed to [-1, 1].
    pub fn ortho_2d(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            near: -1.0,
            far: 1.0,
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh_gl(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

impl Default for Frustum {
    /// The unit square, depth [0, 1].
    fn default() -> Self {
        Self {
            left: 0.0,
            right: 1.0,
            bottom: 0.0,
            top: 1.0,
            near: 0.0,
            far: 1.0,
        }
    }
}

/// Settings shared by every unit of one graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// How many forced ancestor updates may be nested before resolution
    /// gives up.
    pub max_resolve_depth: usize,

    /// How many edges an upward walk or a traversal may follow from its
    /// starting node.
    pub max_walk_depth: usize,

    /// Projection every new unit starts with.
    pub default_frustum: Frustum,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            max_resolve_depth: 256,
            max_walk_depth: 1024,
            default_frustum: Frustum::default(),
        }
    }
}

impl GraphSettings {
    pub fn from_json(json: &str) -> UnitResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Declarative description of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    pub name: String,
    pub index: i32,
    pub active: bool,
    pub offline: bool,
    pub output_format: PixelFormat,
    pub viewport: Option<Viewport>,
    /// Negative values disable viewport derivation.
    pub viewport_reference_input: i32,
    pub ignore_inputs: Vec<usize>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            name: String::from("unit"),
            index: -1,
            active: true,
            offline: false,
            output_format: PixelFormat::default(),
            viewport: None,
            viewport_reference_input: 0,
            ignore_inputs: Vec::new(),
        }
    }
}

impl UnitConfig {
    pub fn from_json(json: &str) -> UnitResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a dirty unit from this description.
    pub fn build(&self) -> Unit {
        self.build_with_frustum(Frustum::default())
    }

    /// Build a dirty unit whose default projection is `frustum`.
    pub fn build_with_frustum(&self, frustum: Frustum) -> Unit {
        let mut unit = Unit::with_frustum(frustum);
        unit.set_index(self.index);
        unit.set_active(self.active);
        unit.set_offline(self.offline);
        unit.set_output_internal_format(self.output_format);
        if let Some(viewport) = self.viewport {
            unit.set_viewport(viewport);
        }
        unit.set_viewport_reference_input(usize::try_from(self.viewport_reference_input).ok());
        for &position in &self.ignore_inputs {
            unit.set_ignore_input(position, true);
        }
        unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings = GraphSettings::from_json(r#"{ "max_resolve_depth": 8 }"#).unwrap();
        assert_eq!(settings.max_resolve_depth, 8);
        assert_eq!(settings.max_walk_depth, 1024);
        assert_eq!(settings.default_frustum, Frustum::default());
    }

    #[test]
    fn unit_config_from_json() {
        let config = UnitConfig::from_json(
            r#"{
                "name": "bright",
                "offline": true,
                "output_format": "rgba32_f",
                "viewport": { "x": 4, "y": 2, "width": 256, "height": 128 },
                "viewport_reference_input": -1,
                "ignore_inputs": [1]
            }"#,
        )
        .unwrap();

        assert_eq!(config.name, "bright");
        assert!(config.active);
        assert_eq!(config.output_format, PixelFormat::Rgba32F);

        let unit = config.build();
        assert!(unit.is_offline());
        assert!(unit.is_dirty());
        assert_eq!(unit.viewport(), Some(Viewport::new(4, 2, 256, 128)));
        assert_eq!(unit.viewport_reference_input(), None);
        assert!(unit.is_input_ignored(1));
        assert!(!unit.is_input_ignored(0));
    }

    #[test]
    fn default_unit_references_first_input() {
        let unit = UnitConfig::default().build();
        assert_eq!(unit.viewport_reference_input(), Some(0));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(UnitConfig::from_json("{ \"index\": \"three\" }").is_err());
    }

    #[test]
    fn ortho_2d_maps_corners() {
        let proj = Frustum::ortho_2d(0.0, 1.0, 1.0, 0.0).projection();
        let corner = proj.project_point3(glam::Vec3::new(1.0, 1.0, 0.0));
        assert!((corner.x - 1.0).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);
    }
}
