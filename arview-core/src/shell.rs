//! Viewer shell: the state container that wires every component together.
//!
//! All state is owned here and changes only through [`ViewerShell::dispatch`].
//! Each dispatch returns the [`Effect`]s the host has to execute.

use serde::{Deserialize, Serialize};

use crate::{
    evaluate, ArSessionController, ArStatus, CaptureArtifact, CaptureStatus, Customization,
    DeviceProfile, Dimensions, Effect, FitCheckResult, HapticPattern, ModelSources, ShellConfig,
    ViewerArStatus,
};

/// Something that happened: a user action or a viewer/platform event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Action {
    /// The asynchronous capability probe resolved.
    CapabilitiesDetected(DeviceProfile),

    /// The customization source changed.
    CustomizationChanged(Customization),

    /// The viewer finished loading the model.
    ModelLoaded,

    /// The viewer removed its model.
    ModelUnloaded,

    /// The viewer measured the customized model.
    DimensionsReported {
        /// Scaled bounding box.
        dimensions: Dimensions,
        /// Scale the bounding box was computed with.
        scale: f64,
    },

    /// The user pressed "View in AR".
    ArEntryRequested,

    /// The user accepted the AR prompt.
    ArConfirmed {
        /// Whether the viewer reports it can activate AR.
        can_activate: bool,
    },

    /// The user declined the AR prompt.
    ArDeclined,

    /// The viewer reported an AR status change.
    ArStatusReported(ViewerArStatus),

    /// The user dismissed the current notice.
    NoticeDismissed,

    /// A notice clear timer fired.
    NoticeClearElapsed {
        /// Notice generation the timer was scheduled for.
        generation: u64,
    },

    /// The user requested a capture.
    CaptureStarted,

    /// A capture finished.
    CaptureFinished {
        /// Ticket issued when the capture started.
        ticket: u64,
        /// The artifact, or the failure message.
        outcome: Result<CaptureArtifact, String>,
    },

    /// A status clear timer fired.
    StatusClearElapsed {
        /// Generation the timer was scheduled for.
        generation: u64,
    },
}

/// Everything the shell owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellState {
    /// Active configuration.
    pub config: ShellConfig,
    /// Active customization.
    pub customization: Customization,
    /// Detected device capabilities.
    pub profile: DeviceProfile,
    /// Measured model size for the active customization.
    dimensions: Option<Dimensions>,
    /// Verdict for `dimensions`.
    fit: Option<FitCheckResult>,
    /// AR session state.
    pub session: ArSessionController,
    /// Capture status message.
    pub capture: CaptureStatus,
}

impl ShellState {
    /// Measured model size, if a model is loaded.
    #[must_use]
    pub fn dimensions(&self) -> Option<&Dimensions> {
        self.dimensions.as_ref()
    }

    /// Fit verdict for the current dimensions.
    #[must_use]
    pub fn fit(&self) -> Option<&FitCheckResult> {
        self.fit.as_ref()
    }

    fn set_dimensions(&mut self, dimensions: Option<Dimensions>) {
        self.fit = dimensions.as_ref().map(|d| evaluate(d, &self.config.room));
        self.dimensions = dimensions;
    }
}

/// Render-ready view of the shell state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ShellSnapshot {
    /// Active customization.
    pub customization: Customization,
    /// Whether the customization's scale is a usable positive number.
    pub scale_valid: bool,
    /// Model URLs with customization hints.
    pub models: ModelSources,
    /// Device is a phone or tablet.
    pub is_mobile: bool,
    /// Device runs iOS.
    pub is_ios: bool,
    /// WebXR AR is supported.
    pub supports_ar: bool,
    /// Measured dimensions.
    pub dimensions: Option<Dimensions>,
    /// Fit verdict.
    pub fit: Option<FitCheckResult>,
    /// AR session status.
    pub ar_status: ArStatus,
    /// Measurement overlay visible.
    pub overlay_visible: bool,
    /// AR confirmation prompt visible.
    pub prompt_visible: bool,
    /// User-visible notice.
    pub notice: Option<String>,
    /// Transient capture status.
    pub capture_message: Option<String>,
}

/// The composition root.
#[derive(Debug, Clone)]
pub struct ViewerShell {
    state: ShellState,
}

impl ViewerShell {
    /// Create a shell with an initial customization and device profile.
    ///
    /// Pass [`DeviceProfile::optimistic`] to render before capability
    /// detection resolves, then dispatch [`Action::CapabilitiesDetected`].
    #[must_use]
    pub fn new(config: ShellConfig, customization: Customization, profile: DeviceProfile) -> Self {
        let mut session = ArSessionController::with_notice_clear_ms(config.notice_clear_ms);
        session.mark_ready(profile.supports_ar);
        Self {
            state: ShellState {
                config,
                customization,
                profile,
                dimensions: None,
                fit: None,
                session,
                capture: CaptureStatus::default(),
            },
        }
    }

    /// Read access to the state.
    #[must_use]
    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Apply an action and return the effects it requires.
    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        tracing::trace!(?action, "Dispatch");
        let state = &mut self.state;

        match action {
            Action::CapabilitiesDetected(profile) => {
                state.profile = profile;
                state.session.mark_ready(profile.supports_ar);
                Vec::new()
            }
            Action::CustomizationChanged(customization) => {
                if customization == state.customization {
                    return Vec::new();
                }
                // Old dimensions belong to the old scale.
                state.set_dimensions(None);
                state.customization = customization.clone();
                vec![Effect::ApplyCustomization(customization)]
            }
            Action::ModelLoaded => {
                vec![Effect::ApplyCustomization(state.customization.clone())]
            }
            Action::ModelUnloaded => {
                state.set_dimensions(None);
                Vec::new()
            }
            Action::DimensionsReported { dimensions, scale } => {
                if scale.to_bits() != state.customization.scale.to_bits() {
                    tracing::warn!(
                        reported = scale,
                        active = state.customization.scale,
                        "Ignoring dimensions measured for a stale scale"
                    );
                    return Vec::new();
                }
                if !state.customization.has_valid_scale() || !dimensions.is_valid() {
                    // No verdict for a model whose size is undefined.
                    tracing::warn!(?dimensions, scale, "Ignoring dimensions for an invalid scale");
                    state.set_dimensions(None);
                    return Vec::new();
                }
                state.set_dimensions(Some(dimensions));
                match state.fit() {
                    Some(fit) if fit.fits => vec![Effect::Haptic(HapticPattern::Pulse)],
                    _ => Vec::new(),
                }
            }
            Action::ArEntryRequested => state.session.request_entry(state.profile.is_mobile),
            Action::ArConfirmed { can_activate } => state.session.confirm(can_activate),
            Action::ArDeclined => {
                state.session.decline();
                Vec::new()
            }
            Action::ArStatusReported(status) => state.session.on_viewer_status(status),
            Action::NoticeDismissed => {
                state.session.dismiss_notice();
                Vec::new()
            }
            Action::NoticeClearElapsed { generation } => {
                state.session.clear_notice(generation);
                Vec::new()
            }
            Action::CaptureStarted => {
                state.capture.begin();
                Vec::new()
            }
            Action::CaptureFinished { ticket, outcome } => {
                let succeeded = match &outcome {
                    Ok(artifact) => {
                        tracing::debug!(file = %artifact.file_name, "Capture finished");
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Capture failed: {e}");
                        false
                    }
                };
                let mut effects: Vec<Effect> = state
                    .capture
                    .finish(ticket, succeeded, state.config.status_clear_ms)
                    .into_iter()
                    .collect();
                if succeeded {
                    effects.push(Effect::Haptic(HapticPattern::TriplePulse));
                }
                effects
            }
            Action::StatusClearElapsed { generation } => {
                state.capture.clear(generation);
                Vec::new()
            }
        }
    }

    /// Start a capture and return its ticket.
    pub fn begin_capture(&mut self) -> u64 {
        self.dispatch(Action::CaptureStarted);
        self.state.capture.generation()
    }

    /// Model URLs for the active customization.
    #[must_use]
    pub fn model_sources(&self) -> ModelSources {
        self.state
            .config
            .models
            .for_customization(&self.state.customization)
    }

    /// Render-ready view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ShellSnapshot {
        let state = &self.state;
        ShellSnapshot {
            customization: state.customization.clone(),
            scale_valid: state.customization.has_valid_scale(),
            models: self.model_sources(),
            is_mobile: state.profile.is_mobile,
            is_ios: state.profile.is_ios,
            supports_ar: state.profile.supports_ar,
            dimensions: state.dimensions,
            fit: state.fit.clone(),
            ar_status: state.session.status(),
            overlay_visible: state.session.overlay_visible(),
            prompt_visible: state.session.prompt_visible(),
            notice: state.session.notice().map(str::to_string),
            capture_message: state.capture.message().map(str::to_string),
        }
    }
}

impl Default for ViewerShell {
    fn default() -> Self {
        Self::new(
            ShellConfig::default(),
            Customization::default(),
            DeviceProfile::default(),
        )
    }
}
