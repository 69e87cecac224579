//! Shell configuration.

use serde::{Deserialize, Serialize};

use crate::{session::DEFAULT_NOTICE_CLEAR_MS, ArViewResult, ModelSources, RoomEnvelope};

/// How long transient capture status messages stay visible.
pub const DEFAULT_STATUS_CLEAR_MS: u32 = 2000;

/// Configuration for the viewer shell.
///
/// Every field has a default, so a partial JSON object (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Assumed room size for the fit check.
    pub room: RoomEnvelope,
    /// Delay before a capture status message clears, in milliseconds.
    pub status_clear_ms: u32,
    /// Delay before an AR notice clears, in milliseconds.
    pub notice_clear_ms: u32,
    /// Model URLs.
    pub models: ModelSources,
    /// AR modes passed to the viewer, in preference order.
    pub ar_modes: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            room: RoomEnvelope::STANDARD,
            status_clear_ms: DEFAULT_STATUS_CLEAR_MS,
            notice_clear_ms: DEFAULT_NOTICE_CLEAR_MS,
            models: ModelSources::default(),
            ar_modes: "webxr scene-viewer quick-look".to_string(),
        }
    }
}

impl ShellConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> ArViewResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
