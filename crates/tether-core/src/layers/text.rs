//! Text layer data.

use super::LayerId;
use serde::{Deserialize, Serialize};

/// Font family of a text layer. Measurement differs per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    GelPen,
    NotoSans,
    GelPenSerif,
}

/// Family and size, the key used for measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: FontFamily,
    pub size: f64,
}

impl FontSpec {
    pub fn new(family: FontFamily, size: f64) -> Self {
        Self { family, size }
    }

    pub fn with_size(self, size: f64) -> Self {
        Self { size, ..self }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: FontFamily::default(),
            size: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Text payload of a text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    /// Displayed text, wrapped to the container.
    pub text: String,
    /// Source text before wrapping.
    pub original_text: String,
    pub font_size: f64,
    #[serde(default)]
    pub font_family: FontFamily,
    /// Multiplier of the font size.
    pub line_height: f64,
    #[serde(default)]
    pub baseline: f64,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub vertical_align: VerticalAlign,
    /// Shape this text is laid out inside.
    #[serde(default)]
    pub container_id: Option<LayerId>,
}

impl TextData {
    pub fn new(content: &str, font: FontSpec, line_height: f64) -> Self {
        Self {
            text: content.to_string(),
            original_text: content.to_string(),
            font_size: font.size,
            font_family: font.family,
            line_height,
            baseline: 0.0,
            text_align: TextAlign::default(),
            vertical_align: VerticalAlign::default(),
            container_id: None,
        }
    }

    pub fn font(&self) -> FontSpec {
        FontSpec::new(self.font_family, self.font_size)
    }
}
