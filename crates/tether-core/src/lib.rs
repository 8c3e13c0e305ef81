//! Tether Core
//!
//! Geometric binding and constraint engine for a vector drawing editor:
//! connectors that stay attached to shapes, text that wraps inside its
//! container, and transforms that keep both consistent.

pub mod binding;
pub mod config;
pub mod editor;
pub mod geometry;
pub mod layers;
pub mod scene;
pub mod text;
pub mod transform;

pub use binding::{BindingSpec, EligibleEdges};
pub use config::{BindingConfig, EngineConfig, TextConfig, TransformConfig};
pub use editor::Editor;
pub use layers::{BoundLayer, BoundLayerKind, Edge, Layer, LayerId, LayerKind, LayerUpdate, PointBinding};
pub use scene::{Scene, SceneChange, SceneError, SceneRegistry, SceneResult, ShapeCache};
pub use text::{ApproximateMetrics, FontMetrics, TextLayout, TextMetrics};
pub use transform::{MultiRotateState, ResizeModifiers, TransformHandle, TransformState, UpdateOptions};
