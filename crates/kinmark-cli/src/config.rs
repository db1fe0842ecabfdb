//! Overlay configuration files.
//!
//! ```toml
//! [style]
//! rgba = [0.5, 0.5, 0.5, 0.9]
//! slide_compensation = "downward_only"
//!
//! [[overlay]]
//! target_body = "hand"
//! root_body = "world"
//! position = [0.3, 0.6, 0.2]
//! quat = [0.0, 1.0, 0.0, 0.0]
//! joint_values = { r_close = 0.0, l_close = 0.0 }
//! label = "grasp"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use kinmark_kinematics::{NamedRequest, SlideCompensation, DEFAULT_RGBA};
use serde::{Deserialize, Serialize};

/// A full overlay file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default)]
    pub style: Style,
    #[serde(default, rename = "overlay")]
    pub overlays: Vec<Overlay>,
}

/// Settings shared by every overlay in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default = "default_rgba")]
    pub rgba: [f32; 4],
    #[serde(default)]
    pub slide_compensation: SlideCompensation,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            rgba: DEFAULT_RGBA,
            slide_compensation: SlideCompensation::default(),
        }
    }
}

fn default_rgba() -> [f32; 4] {
    DEFAULT_RGBA
}

/// One projection plus its styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(flatten)]
    pub request: NamedRequest,
    /// Overrides the file-wide color.
    #[serde(default)]
    pub rgba: Option<[f32; 4]>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Overlay {
    /// Color for this overlay's markers under `style`.
    pub fn rgba(&self, style: &Style) -> [f32; 4] {
        self.rgba.unwrap_or(style.rgba)
    }

    /// Label for this overlay's markers, empty if unset.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_default()
    }
}

impl OverlayConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading overlay config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing overlay config {}", path.display()))
    }
}
