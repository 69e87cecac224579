//! Browser implementations of the core's platform hooks.

use arview_core::{ArSupportProbe, ArViewError, ArViewResult, DownloadSink, HapticPattern};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

/// Convert a rejected JS call into a platform error.
pub(crate) fn js_error(context: &str, value: &JsValue) -> ArViewError {
    let detail = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"));
    ArViewError::Platform(format!("{context}: {detail}"))
}

/// Convert JS `Date.now()` milliseconds into a UTC timestamp.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn datetime_from_js_millis(millis: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis as i64).unwrap_or_default()
}

/// Current time according to the browser clock.
pub(crate) fn now_utc() -> DateTime<Utc> {
    datetime_from_js_millis(js_sys::Date::now())
}

/// Run `callback` once after `delay_ms`.
///
/// # Errors
///
/// Returns an error if there is no window or the timer cannot be registered.
pub(crate) fn schedule_timeout(delay_ms: u32, callback: impl FnOnce() + 'static) -> ArViewResult<()> {
    let window = web_sys::window().ok_or_else(|| ArViewError::Platform("No window object".into()))?;
    let callback: Function = Closure::once_into_js(callback).unchecked_into();
    let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(&callback, delay)
        .map_err(|e| js_error("setTimeout failed", &e))?;
    Ok(())
}

/// `navigator.vibrate`, ignored where unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BrowserHaptics;

impl BrowserHaptics {
    pub(crate) fn pulse(self, pattern: HapticPattern) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let navigator = window.navigator();
        // Feature-detect first: calling a missing method would throw.
        let supported = Reflect::has(&navigator, &JsValue::from_str("vibrate")).unwrap_or(false);
        if !supported {
            return;
        }
        let durations: Array = pattern
            .durations_ms()
            .iter()
            .map(|ms| JsValue::from(*ms))
            .collect();
        if !navigator.vibrate_with_pattern(&durations) {
            tracing::debug!(?pattern, "Vibration rejected by the browser");
        }
    }
}

/// Downloads through a `blob:` URL and a temporary anchor.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BrowserDownloads;

impl DownloadSink for BrowserDownloads {
    fn create_object_url(&self, png: &[u8]) -> ArViewResult<String> {
        let bytes = Uint8Array::from(png);
        let parts = Array::of1(&bytes);
        let options = BlobPropertyBag::new();
        options.set_type("image/png");
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| js_error("Blob creation failed", &e))?;
        Url::create_object_url_with_blob(&blob).map_err(|e| js_error("createObjectURL failed", &e))
    }

    fn revoke_object_url(&self, url: &str) {
        if let Err(e) = Url::revoke_object_url(url) {
            tracing::warn!("revokeObjectURL failed: {:?}", e);
        }
    }

    fn trigger_download(&self, url: &str, file_name: &str) -> ArViewResult<()> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ArViewError::Capture("No document object".into()))?;
        let anchor = document
            .create_element("a")
            .map_err(|e| js_error("Anchor creation failed", &e))?
            .dyn_into::<HtmlAnchorElement>()
            .map_err(|_| ArViewError::Capture("Element is not an anchor".into()))?;
        anchor.set_href(url);
        anchor.set_download(file_name);
        anchor.click();
        Ok(())
    }
}

/// WebXR support probe over `navigator.xr`.
pub(crate) struct XrProbe {
    xr: JsValue,
    is_session_supported: Function,
}

impl XrProbe {
    /// The probe, or `None` when the browser has no WebXR API.
    pub(crate) fn from_navigator() -> Option<Self> {
        let navigator = web_sys::window()?.navigator();
        let xr = Reflect::get(&navigator, &JsValue::from_str("xr")).ok()?;
        if xr.is_undefined() || xr.is_null() {
            return None;
        }
        let is_session_supported = Reflect::get(&xr, &JsValue::from_str("isSessionSupported"))
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        Some(Self {
            xr,
            is_session_supported,
        })
    }
}

#[async_trait(?Send)]
impl ArSupportProbe for XrProbe {
    async fn is_session_supported(&self, mode: &str) -> ArViewResult<bool> {
        let promise: Promise = self
            .is_session_supported
            .call1(&self.xr, &JsValue::from_str(mode))
            .map_err(|e| js_error("isSessionSupported threw", &e))?
            .dyn_into()
            .map_err(|_| ArViewError::Platform("isSessionSupported did not return a promise".into()))?;
        let supported = JsFuture::from(promise)
            .await
            .map_err(|e| js_error("isSessionSupported rejected", &e))?;
        Ok(supported.as_bool().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_millis_convert_to_utc() {
        let at = datetime_from_js_millis(1_767_323_045_123.0);
        assert_eq!(
            at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2026-01-02T03:04:05.123Z"
        );
    }

    #[test]
    fn out_of_range_millis_fall_back_to_epoch() {
        let at = datetime_from_js_millis(f64::MAX);
        assert_eq!(at, DateTime::<Utc>::default());
    }
}
