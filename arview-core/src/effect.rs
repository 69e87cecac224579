//! Side effects requested by the core.
//!
//! Transitions never touch the platform. They return [`Effect`] values which
//! the host shell executes, so every state transition stays testable without
//! a browser.

use serde::{Deserialize, Serialize};

use crate::Customization;

/// A vibration cue. Best effort: hosts without haptics ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HapticPattern {
    /// Short single pulse.
    Pulse,
    /// Single longer pulse.
    LongPulse,
    /// Three short pulses.
    TriplePulse,
}

impl HapticPattern {
    /// Alternating vibrate/pause durations in milliseconds.
    #[must_use]
    pub const fn durations_ms(self) -> &'static [u32] {
        match self {
            Self::Pulse => &[50],
            Self::LongPulse => &[200],
            Self::TriplePulse => &[50, 50, 50, 50, 50],
        }
    }
}

/// A side effect for the host shell to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Effect {
    /// Fire a haptic cue.
    Haptic(HapticPattern),

    /// Ask the viewer to start an AR session.
    ActivateAr,

    /// Apply a customization to the loaded model and report its dimensions.
    ApplyCustomization(Customization),

    /// Non-mobile AR entry: the viewer shows its QR-code handoff.
    ShowQrCode,

    /// Clear the capture status after `delay_ms`, if `generation` is still current.
    ScheduleStatusClear {
        /// Status generation this timer belongs to.
        generation: u64,
        /// Delay before clearing.
        delay_ms: u32,
    },

    /// Clear the AR notice after `delay_ms`, if `generation` is still current.
    ScheduleNoticeClear {
        /// Notice generation this timer belongs to.
        generation: u64,
        /// Delay before clearing.
        delay_ms: u32,
    },
}
