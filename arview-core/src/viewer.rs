//! Contract with the external 3D/AR viewer.
//!
//! The core never looks inside the viewer's scene graph. It only relies on
//! bounding-box output, AR activation and frame export.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ArViewResult, Customization, Dimensions};

/// Exports the viewer's currently rendered frame.
#[async_trait(?Send)]
pub trait FrameSource {
    /// Encode the current frame as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be read or encoded.
    async fn to_png(&self) -> ArViewResult<Vec<u8>>;
}

/// The capabilities the core needs from the viewer.
pub trait ModelViewer: FrameSource {
    /// Whether the viewer can start an AR session on this device.
    fn can_activate_ar(&self) -> bool;

    /// Start an AR session.
    ///
    /// # Errors
    ///
    /// Returns an error if the viewer refuses to activate.
    fn activate_ar(&self) -> ArViewResult<()>;

    /// Apply color, material and scale to the loaded model.
    ///
    /// Returns the scaled bounding box, or `None` when no model is loaded.
    fn apply_customization(&self, customization: &Customization) -> Option<Dimensions>;
}

/// Model URLs handed to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSources {
    /// glTF/GLB model for general rendering.
    pub src: String,
    /// USDZ model for iOS Quick Look.
    pub ios_src: String,
}

impl Default for ModelSources {
    fn default() -> Self {
        Self {
            src: "models/product.glb".to_string(),
            ios_src: "models/product.usdz".to_string(),
        }
    }
}

impl ModelSources {
    /// Sources with customization hints applied.
    ///
    /// Quick Look cannot recolor a model at runtime, so when the color is not
    /// the default the iOS URL carries `color` (without `#`) and `scale` query
    /// hints. Nothing regenerates the asset server-side; the hint is only
    /// useful if whatever serves `ios_src` honours it.
    #[must_use]
    pub fn for_customization(&self, customization: &Customization) -> Self {
        if customization.is_default_color() {
            return self.clone();
        }

        let color = customization.color.trim_start_matches('#');
        let hints = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("color", color)
            .append_pair("scale", &customization.scale.to_string())
            .finish();
        let separator = if self.ios_src.contains('?') { '&' } else { '?' };

        Self {
            src: self.src.clone(),
            ios_src: format!("{}{separator}{hints}", self.ios_src),
        }
    }
}
