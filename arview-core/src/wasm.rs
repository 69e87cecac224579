//! WebAssembly bindings for arview-core.
//!
//! A JSON-in/JSON-out wrapper around [`ViewerShell`] for hosts that drive the
//! core from JavaScript instead of through `arview-app`.

use wasm_bindgen::prelude::*;

use crate::{evaluate, Action, Customization, DeviceProfile, Dimensions, ShellConfig, ViewerShell};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
}

/// Viewer shell instance for WASM.
#[wasm_bindgen]
pub struct WasmShell {
    shell: ViewerShell,
}

#[wasm_bindgen]
impl WasmShell {
    /// Create a shell from a JSON config, the page query string and the user agent.
    ///
    /// # Errors
    ///
    /// Returns an error string if the config JSON is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, query: &str, user_agent: &str) -> Result<WasmShell, String> {
        let config = if config_json.trim().is_empty() {
            ShellConfig::default()
        } else {
            ShellConfig::from_json(config_json).map_err(|e| e.to_string())?
        };
        Ok(Self {
            shell: ViewerShell::new(
                config,
                Customization::from_query(query),
                DeviceProfile::optimistic(user_agent),
            ),
        })
    }

    /// Dispatch a JSON-encoded action and return the effects as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if the action cannot be parsed.
    pub fn dispatch(&mut self, action_json: &str) -> Result<String, String> {
        let action: Action = serde_json::from_str(action_json).map_err(|e| e.to_string())?;
        let effects = self.shell.dispatch(action);
        serde_json::to_string(&effects).map_err(|e| e.to_string())
    }

    /// Get the render snapshot as JSON.
    #[wasm_bindgen(js_name = getSnapshotJson)]
    #[must_use]
    pub fn get_snapshot_json(&self) -> String {
        serde_json::to_string(&self.shell.snapshot()).unwrap_or_default()
    }

    /// Start a capture and return its ticket.
    #[wasm_bindgen(js_name = beginCapture)]
    #[allow(clippy::cast_precision_loss)]
    pub fn begin_capture(&mut self) -> f64 {
        // JS numbers are exact up to 2^53, far beyond any capture count.
        self.shell.begin_capture() as f64
    }
}

/// Evaluate a fit check without a shell. Returns the verdict as JSON.
#[wasm_bindgen(js_name = evaluateFit)]
#[must_use]
pub fn evaluate_fit(width: f64, height: f64, depth: f64) -> String {
    let result = evaluate(
        &Dimensions::new(width, height, depth),
        &ShellConfig::default().room,
    );
    serde_json::to_string(&result).unwrap_or_default()
}
