//! Customization parameters resolved from page input.
//!
//! Input arrives as URL-style key/value pairs (`?color=%23FF0000&scale=1.5`).
//! Every key is optional and every malformed value falls back to its default
//! silently; resolution never fails.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;

use serde::{Deserialize, Serialize};

/// Default base color.
pub const DEFAULT_COLOR: &str = "#FFFFFF";
/// Default uniform scale.
pub const DEFAULT_SCALE: f64 = 1.0;
/// Default surface pattern.
pub const DEFAULT_PATTERN: &str = "solid";

/// Surface material preset applied by the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    /// Whatever the model ships with.
    #[default]
    Default,
    /// High metalness, low roughness.
    Metallic,
    /// No metalness, high roughness.
    Matte,
    /// No metalness, very low roughness.
    Glossy,
}

impl Material {
    /// Parse a material name, case-insensitively.
    ///
    /// Unknown names resolve to [`Material::Default`].
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "metallic" => Self::Metallic,
            "matte" => Self::Matte,
            "glossy" => Self::Glossy,
            "default" | "" => Self::Default,
            other => {
                tracing::debug!("Unknown material {other:?}, using default");
                Self::Default
            }
        }
    }

    /// Wire name of the material.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Metallic => "metallic",
            Self::Matte => "matte",
            Self::Glossy => "glossy",
        }
    }

    /// PBR `(metallic, roughness)` factors, or `None` to keep the model's own.
    #[must_use]
    pub const fn pbr_factors(self) -> Option<(f32, f32)> {
        match self {
            Self::Default => None,
            Self::Metallic => Some((1.0, 0.2)),
            Self::Matte => Some((0.0, 0.9)),
            Self::Glossy => Some((0.0, 0.05)),
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable customization snapshot.
///
/// Replaced wholesale when the source parameters change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    /// Base color as a hex string (not validated).
    pub color: String,
    /// Uniform scale factor.
    pub scale: f64,
    /// Surface pattern name.
    pub pattern: String,
    /// Material preset.
    pub material: Material,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            scale: DEFAULT_SCALE,
            pattern: DEFAULT_PATTERN.to_string(),
            material: Material::Default,
        }
    }
}

impl Customization {
    /// Resolve a customization from a raw query string.
    ///
    /// A leading `?` is ignored; keys and values are percent-decoded.
    /// When a key repeats, the last occurrence wins.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        resolve(&params)
    }

    /// Whether the color is the default white.
    #[must_use]
    pub fn is_default_color(&self) -> bool {
        self.color.eq_ignore_ascii_case(DEFAULT_COLOR)
    }

    /// Whether the scale is a usable positive number.
    ///
    /// Non-positive scales are kept as given; what the viewer does with them
    /// is undefined.
    #[must_use]
    pub fn has_valid_scale(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0
    }

    /// Base color as RGBA factors in `0.0..=1.0`.
    ///
    /// Accepts `#RGB`, `#RRGGBB` and `#RRGGBBAA`. Returns `None` for anything
    /// else so the viewer can leave the model's color untouched.
    #[must_use]
    pub fn base_color_factor(&self) -> Option<[f32; 4]> {
        let hex = self.color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 | 8 => hex.to_string(),
            _ => return None,
        };

        let mut out = [1.0; 4];
        for (slot, pair) in out.iter_mut().zip(expanded.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).ok()?;
            *slot = f32::from(u8::from_str_radix(pair, 16).ok()?) / 255.0;
        }
        Some(out)
    }
}

/// Resolve raw key/value parameters into a [`Customization`].
///
/// Total: every field has a default and no input is rejected.
#[must_use]
pub fn resolve<S: BuildHasher>(raw: &HashMap<String, String, S>) -> Customization {
    let color = raw
        .get("color")
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COLOR)
        .to_string();

    let scale = raw
        .get("scale")
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite())
        .unwrap_or(DEFAULT_SCALE);
    if scale <= 0.0 {
        tracing::warn!("Non-positive scale {scale} passed through unchanged");
    }

    let pattern = raw
        .get("pattern")
        .filter(|p| !p.is_empty())
        .map_or_else(|| DEFAULT_PATTERN.to_string(), Clone::clone);

    let material = raw
        .get("material")
        .map_or(Material::Default, |m| Material::parse_lenient(m));

    Customization {
        color,
        scale,
        pattern,
        material,
    }
}
