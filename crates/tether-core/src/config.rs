//! Tunable constants for binding, text layout and transforms.

use crate::scene::{SceneError, SceneResult};
use serde::{Deserialize, Serialize};

/// Binding catch-zone and geometry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Whether connectors may bind to shapes at all.
    pub enabled: bool,
    /// Lower clamp of the catch zone around a shape.
    pub min_gap: f64,
    /// Upper clamp of the catch zone around a shape.
    pub max_gap: f64,
    /// Fraction of the smaller shape side used for the catch zone.
    pub gap_size_factor: f64,
    /// Smallest gap stored on a binding.
    pub min_binding_gap: f64,
    /// Fixed-point iterations of the ellipse closest-point search.
    /// Extreme aspect ratios may need more.
    pub ellipse_iterations: usize,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_gap: 16.0,
            max_gap: 32.0,
            gap_size_factor: 0.25,
            min_binding_gap: 1.0,
            ellipse_iterations: 4,
        }
    }
}

/// Bound text layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Padding between a container's edge and its text.
    pub bound_text_padding: f64,
    /// Multiple of the padding removed along a connector carrying a label.
    pub arrow_padding_multiple: f64,
    /// Fitted font sizes below this reject the resize.
    pub min_font_size: f64,
    /// Line height multiplier for new text layers.
    pub default_line_height: f64,
    /// Font size for new text layers.
    pub default_font_size: f64,
}

impl TextConfig {
    /// Total padding removed from a connector's length for its label.
    pub fn arrow_label_padding(&self) -> f64 {
        self.bound_text_padding * 2.0 * self.arrow_padding_multiple
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            bound_text_padding: 5.0,
            arrow_padding_multiple: 8.0,
            min_font_size: 1.0,
            default_line_height: 1.25,
            default_font_size: 20.0,
        }
    }
}

/// Resize and rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Angle step in radians for discrete rotation and perfect lines (15°).
    pub angle_snap_step: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            angle_snap_step: std::f64::consts::PI / 12.0,
        }
    }
}

/// Engine-wide configuration owned by a [`Scene`](crate::Scene).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub binding: BindingConfig,
    pub text: TextConfig,
    pub transform: TransformConfig,
}

impl EngineConfig {
    /// Parse a configuration, filling missing fields with defaults.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        serde_json::from_str(json).map_err(|e| SceneError::Serialization(e.to_string()))
    }

    /// Serialize the configuration.
    pub fn to_json(&self) -> SceneResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SceneError::Serialization(e.to_string()))
    }
}
