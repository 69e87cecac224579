//! AR session state machine.
//!
//! ```text
//!            request_entry (mobile)          confirm (can activate)
//!   idle ─────────────────────────▶ prompt ─────────────────────▶ detecting
//!    ▲                                │ decline                      │
//!    │                                ▼                              │
//!    │                              idle                             │
//!    │        viewer events (from any state)                         │
//!    ├──── not-presenting ◀──────────────────────────────────────────┤
//!    │     session-started ─▶ session-started                        │
//!    │     object-placed   ─▶ placed                                 │
//!    │     failed          ─▶ failed ──(notice cleared)──▶ idle       │
//! ```
//!
//! "idle" above reads `ready` on devices that support AR.
//!
//! Notices are transient. Setting one returns
//! [`Effect::ScheduleNoticeClear`]; each notice gets a new generation so an
//! older timer never clears a newer notice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ArViewError, Effect, HapticPattern};

/// How long AR notices stay visible.
pub const DEFAULT_NOTICE_CLEAR_MS: u32 = 3000;
/// Notice shown when the viewer reports a failed session.
pub const AR_FAILED_NOTICE: &str = "AR session failed. Please try again.";

/// Current AR session status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArStatus {
    /// No session.
    #[default]
    Idle,
    /// Activation requested, waiting for the viewer.
    Detecting,
    /// AR is supported and nothing is running.
    Ready,
    /// The object was placed in the scene.
    Placed,
    /// The device session is running.
    SessionStarted,
    /// The session failed.
    Failed,
}

/// AR status values reported by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerArStatus {
    /// The viewer left AR.
    NotPresenting,
    /// The device session is running.
    SessionStarted,
    /// The user placed the object.
    ObjectPlaced,
    /// The session failed to start or crashed.
    Failed,
}

impl ViewerArStatus {
    /// Wire name used by the viewer's `ar-status` event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotPresenting => "not-presenting",
            Self::SessionStarted => "session-started",
            Self::ObjectPlaced => "object-placed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ViewerArStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewerArStatus {
    type Err = ArViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-presenting" => Ok(Self::NotPresenting),
            "session-started" => Ok(Self::SessionStarted),
            "object-placed" => Ok(Self::ObjectPlaced),
            "failed" => Ok(Self::Failed),
            other => Err(ArViewError::UnknownStatus(other.to_string())),
        }
    }
}

/// Tracks the AR session and the UI flags that depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArSessionController {
    status: ArStatus,
    overlay_visible: bool,
    prompt_visible: bool,
    notice: Option<String>,
    notice_generation: u64,
    notice_clear_ms: u32,
    supports_ar: bool,
}

impl Default for ArSessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl ArSessionController {
    /// A controller in the `idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_notice_clear_ms(DEFAULT_NOTICE_CLEAR_MS)
    }

    /// A controller whose notices clear after `notice_clear_ms`.
    #[must_use]
    pub fn with_notice_clear_ms(notice_clear_ms: u32) -> Self {
        Self {
            status: ArStatus::Idle,
            overlay_visible: false,
            prompt_visible: false,
            notice: None,
            notice_generation: 0,
            notice_clear_ms,
            supports_ar: false,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ArStatus {
        self.status
    }

    /// Whether the measurement overlay is shown.
    #[must_use]
    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Whether the AR confirmation prompt is shown.
    #[must_use]
    pub fn prompt_visible(&self) -> bool {
        self.prompt_visible
    }

    /// User-visible notice, if any.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Generation of the current notice.
    #[must_use]
    pub fn notice_generation(&self) -> u64 {
        self.notice_generation
    }

    /// Capability detection finished.
    ///
    /// Moves `idle` to `ready` when AR is supported, and `ready` back to
    /// `idle` when it is not.
    pub fn mark_ready(&mut self, supports_ar: bool) {
        self.supports_ar = supports_ar;
        if matches!(self.status, ArStatus::Idle | ArStatus::Ready) {
            self.transition(self.resting_status());
        }
    }

    /// The user asked to view the product in AR.
    ///
    /// Mobile devices get a confirmation prompt. Other devices get the
    /// viewer's QR-code handoff. Neither changes the status.
    pub fn request_entry(&mut self, is_mobile: bool) -> Vec<Effect> {
        if is_mobile {
            tracing::debug!("AR entry requested, showing confirmation");
            self.prompt_visible = true;
            Vec::new()
        } else {
            tracing::debug!("AR entry requested on non-mobile device, showing QR code");
            vec![Effect::ShowQrCode]
        }
    }

    /// The user accepted the confirmation prompt.
    ///
    /// Without AR capability a transient notice is shown and the status is
    /// unchanged.
    pub fn confirm(&mut self, can_activate: bool) -> Vec<Effect> {
        self.prompt_visible = false;
        if can_activate {
            self.transition(ArStatus::Detecting);
            vec![Effect::ActivateAr]
        } else {
            tracing::warn!("AR activation requested but viewer cannot activate AR");
            vec![self.show_notice(ArViewError::ArUnavailable.to_string())]
        }
    }

    /// The user declined the confirmation prompt.
    pub fn decline(&mut self) {
        self.prompt_visible = false;
    }

    /// Apply a status reported by the viewer.
    pub fn on_viewer_status(&mut self, reported: ViewerArStatus) -> Vec<Effect> {
        match reported {
            ViewerArStatus::NotPresenting => {
                self.transition(self.resting_status());
                self.overlay_visible = false;
                Vec::new()
            }
            ViewerArStatus::SessionStarted => {
                self.transition(ArStatus::SessionStarted);
                self.overlay_visible = true;
                vec![Effect::Haptic(HapticPattern::TriplePulse)]
            }
            ViewerArStatus::ObjectPlaced => {
                self.transition(ArStatus::Placed);
                vec![Effect::Haptic(HapticPattern::LongPulse)]
            }
            ViewerArStatus::Failed => {
                self.transition(ArStatus::Failed);
                vec![self.show_notice(AR_FAILED_NOTICE.to_string())]
            }
        }
    }

    /// Clear the user-visible notice. A failed session returns to rest.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
        if self.status == ArStatus::Failed {
            self.transition(self.resting_status());
        }
    }

    /// A notice clear timer fired. Ignored unless `generation` is current.
    pub fn clear_notice(&mut self, generation: u64) {
        if generation != self.notice_generation {
            tracing::debug!(
                generation,
                current = self.notice_generation,
                "Stale notice timer ignored"
            );
            return;
        }
        self.dismiss_notice();
    }

    fn show_notice(&mut self, notice: String) -> Effect {
        self.notice_generation += 1;
        self.notice = Some(notice);
        Effect::ScheduleNoticeClear {
            generation: self.notice_generation,
            delay_ms: self.notice_clear_ms,
        }
    }

    fn resting_status(&self) -> ArStatus {
        if self.supports_ar {
            ArStatus::Ready
        } else {
            ArStatus::Idle
        }
    }

    fn transition(&mut self, next: ArStatus) {
        if self.status != next {
            tracing::debug!(from = ?self.status, to = ?next, "AR status transition");
        }
        self.status = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let session = ArSessionController::new();
        assert_eq!(session.status(), ArStatus::Idle);
        assert!(!session.overlay_visible());
        assert!(!session.prompt_visible());
        assert!(session.notice().is_none());
    }

    #[test]
    fn full_session_returns_to_idle() {
        let mut session = ArSessionController::new();

        let effects = session.on_viewer_status(ViewerArStatus::SessionStarted);
        assert_eq!(session.status(), ArStatus::SessionStarted);
        assert!(session.overlay_visible());
        assert_eq!(effects, vec![Effect::Haptic(HapticPattern::TriplePulse)]);

        let effects = session.on_viewer_status(ViewerArStatus::ObjectPlaced);
        assert_eq!(session.status(), ArStatus::Placed);
        assert_eq!(effects, vec![Effect::Haptic(HapticPattern::LongPulse)]);

        let effects = session.on_viewer_status(ViewerArStatus::NotPresenting);
        assert_eq!(session.status(), ArStatus::Idle);
        assert!(!session.overlay_visible());
        assert!(effects.is_empty());
    }

    #[test]
    fn non_mobile_entry_stays_idle() {
        let mut session = ArSessionController::new();
        let effects = session.request_entry(false);
        assert_eq!(session.status(), ArStatus::Idle);
        assert!(!session.prompt_visible());
        assert_eq!(effects, vec![Effect::ShowQrCode]);
    }

    #[test]
    fn mobile_entry_shows_prompt_without_transition() {
        let mut session = ArSessionController::new();
        let effects = session.request_entry(true);
        assert!(effects.is_empty());
        assert!(session.prompt_visible());
        assert_eq!(session.status(), ArStatus::Idle);
    }

    #[test]
    fn confirm_with_capability_starts_detecting() {
        let mut session = ArSessionController::new();
        session.request_entry(true);
        let effects = session.confirm(true);
        assert_eq!(session.status(), ArStatus::Detecting);
        assert!(!session.prompt_visible());
        assert_eq!(effects, vec![Effect::ActivateAr]);
    }

    #[test]
    fn confirm_without_capability_keeps_status() {
        let mut session = ArSessionController::new();
        session.request_entry(true);
        let effects = session.confirm(false);
        assert_eq!(
            effects,
            vec![Effect::ScheduleNoticeClear {
                generation: 1,
                delay_ms: DEFAULT_NOTICE_CLEAR_MS
            }]
        );
        assert_eq!(session.status(), ArStatus::Idle);
        assert_eq!(session.notice(), Some("AR is not supported on this device"));

        session.clear_notice(1);
        assert!(session.notice().is_none());
        assert_eq!(session.status(), ArStatus::Idle);
    }

    #[test]
    fn decline_makes_no_viewer_call() {
        let mut session = ArSessionController::new();
        session.request_entry(true);
        session.decline();
        assert_eq!(session.status(), ArStatus::Idle);
        assert!(!session.prompt_visible());
    }

    #[test]
    fn failure_notice_clears_on_timer() {
        let mut session = ArSessionController::with_notice_clear_ms(1500);
        session.mark_ready(true);

        let effects = session.on_viewer_status(ViewerArStatus::Failed);
        assert_eq!(
            effects,
            vec![Effect::ScheduleNoticeClear {
                generation: 1,
                delay_ms: 1500
            }]
        );
        assert_eq!(session.status(), ArStatus::Failed);
        assert_eq!(session.notice(), Some(AR_FAILED_NOTICE));

        session.clear_notice(1);
        assert!(session.notice().is_none());
        assert_eq!(session.status(), ArStatus::Ready);
    }

    #[test]
    fn stale_notice_timer_keeps_newer_notice() {
        let mut session = ArSessionController::new();
        session.on_viewer_status(ViewerArStatus::Failed);
        let first = session.notice_generation();
        session.on_viewer_status(ViewerArStatus::Failed);

        session.clear_notice(first);
        assert_eq!(session.notice(), Some(AR_FAILED_NOTICE));
        assert_eq!(session.status(), ArStatus::Failed);

        session.clear_notice(session.notice_generation());
        assert!(session.notice().is_none());
        assert_eq!(session.status(), ArStatus::Idle);
    }

    #[test]
    fn failure_is_reenterable() {
        let mut session = ArSessionController::new();
        session.on_viewer_status(ViewerArStatus::Failed);
        assert_eq!(session.status(), ArStatus::Failed);

        session.dismiss_notice();
        assert!(session.notice().is_none());
        assert_eq!(session.status(), ArStatus::Idle);

        let effects = session.confirm(true);
        assert_eq!(session.status(), ArStatus::Detecting);
        assert_eq!(effects, vec![Effect::ActivateAr]);
    }

    #[test]
    fn ready_only_from_idle() {
        let mut session = ArSessionController::new();
        session.mark_ready(false);
        assert_eq!(session.status(), ArStatus::Idle);
        session.mark_ready(true);
        assert_eq!(session.status(), ArStatus::Ready);

        session.mark_ready(false);
        assert_eq!(session.status(), ArStatus::Idle);

        let mut placed = ArSessionController::new();
        placed.on_viewer_status(ViewerArStatus::ObjectPlaced);
        placed.mark_ready(true);
        assert_eq!(placed.status(), ArStatus::Placed);
    }

    #[test]
    fn capable_device_returns_to_ready_after_session() {
        let mut session = ArSessionController::new();
        session.mark_ready(true);
        session.confirm(true);
        session.on_viewer_status(ViewerArStatus::SessionStarted);
        session.on_viewer_status(ViewerArStatus::NotPresenting);
        assert_eq!(session.status(), ArStatus::Ready);
    }

    #[test]
    fn viewer_status_parses_wire_names() {
        for status in [
            ViewerArStatus::NotPresenting,
            ViewerArStatus::SessionStarted,
            ViewerArStatus::ObjectPlaced,
            ViewerArStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ViewerArStatus>().ok(), Some(status));
        }
        assert!(matches!(
            "presenting".parse::<ViewerArStatus>(),
            Err(ArViewError::UnknownStatus(s)) if s == "presenting"
        ));
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&ArStatus::SessionStarted).expect("json");
        assert_eq!(json, "\"session-started\"");
    }
}
