//! Device class and AR capability detection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ArViewResult;

/// Session mode probed for AR support.
pub const IMMERSIVE_AR: &str = "immersive-ar";

const MOBILE_MARKERS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

const IOS_MARKERS: &[&str] = &["iphone", "ipad", "ipod"];

/// Platform hook answering whether an XR session mode is supported.
///
/// `?Send` because browser promises are not `Send`.
#[async_trait(?Send)]
pub trait ArSupportProbe {
    /// Whether `mode` (for example `"immersive-ar"`) can be started.
    ///
    /// # Errors
    ///
    /// Implementations may fail for any platform reason; callers treat an
    /// error as "not supported".
    async fn is_session_supported(&self, mode: &str) -> ArViewResult<bool>;
}

/// What the current device can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Phone or tablet.
    pub is_mobile: bool,
    /// iPhone, iPad or iPod.
    pub is_ios: bool,
    /// WebXR immersive AR is available.
    pub supports_ar: bool,
}

impl DeviceProfile {
    /// The synchronous part of detection, with AR support assumed absent.
    ///
    /// Used to render before the asynchronous probe resolves.
    #[must_use]
    pub fn optimistic(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        Self {
            is_mobile: MOBILE_MARKERS.iter().any(|m| ua.contains(m)),
            is_ios: IOS_MARKERS.iter().any(|m| ua.contains(m)),
            supports_ar: false,
        }
    }
}

/// Detect the device profile.
///
/// Never fails: a missing probe or a probe error resolves `supports_ar` to
/// `false`. No timeout is applied to the probe.
pub async fn detect(user_agent: &str, probe: Option<&dyn ArSupportProbe>) -> DeviceProfile {
    let mut profile = DeviceProfile::optimistic(user_agent);

    profile.supports_ar = match probe {
        Some(probe) => match probe.is_session_supported(IMMERSIVE_AR).await {
            Ok(supported) => supported,
            Err(e) => {
                tracing::debug!("AR support probe failed, assuming unsupported: {e}");
                false
            }
        },
        None => {
            tracing::debug!("No AR support API available");
            false
        }
    };

    tracing::info!(
        is_mobile = profile.is_mobile,
        is_ios = profile.is_ios,
        supports_ar = profile.supports_ar,
        "Device capabilities detected"
    );
    profile
}
