//! End-to-end viewer flow tests.
//!
//! Drives a [`ViewerShell`] against an in-memory viewer the way the browser
//! shell does:
//! - customization from the query string
//! - model load → customization → dimensions → fit verdict
//! - AR session lifecycle
//! - capture with status tickets

use std::cell::{Cell, RefCell};

use arview_core::{
    Action, ArStatus, ArViewError, ArViewResult, CaptureService, Customization, DeviceProfile,
    Dimensions, DownloadSink, Effect, FitSeverity, FrameSource, HapticPattern, ModelViewer,
    ShellConfig, ViewerArStatus, ViewerShell,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

/// In-memory viewer with a 1 m cube model.
struct FakeViewer {
    base: Dimensions,
    loaded: bool,
    ar_capable: bool,
    activations: Cell<u32>,
    applied: RefCell<Vec<Customization>>,
}

impl FakeViewer {
    fn new(ar_capable: bool) -> Self {
        Self {
            base: Dimensions::new(1.0, 1.0, 1.0),
            loaded: true,
            ar_capable,
            activations: Cell::new(0),
            applied: RefCell::new(Vec::new()),
        }
    }
}

#[async_trait(?Send)]
impl FrameSource for FakeViewer {
    async fn to_png(&self) -> ArViewResult<Vec<u8>> {
        Ok(vec![137, 80, 78, 71, 13, 10, 26, 10])
    }
}

impl ModelViewer for FakeViewer {
    fn can_activate_ar(&self) -> bool {
        self.ar_capable
    }

    fn activate_ar(&self) -> ArViewResult<()> {
        if !self.ar_capable {
            return Err(ArViewError::ArUnavailable);
        }
        self.activations.set(self.activations.get() + 1);
        Ok(())
    }

    fn apply_customization(&self, customization: &Customization) -> Option<Dimensions> {
        self.applied.borrow_mut().push(customization.clone());
        self.loaded.then(|| self.base.scaled(customization.scale))
    }
}

#[derive(Default)]
struct MemorySink {
    live_urls: RefCell<Vec<String>>,
    downloads: RefCell<Vec<String>>,
}

impl DownloadSink for MemorySink {
    fn create_object_url(&self, _png: &[u8]) -> ArViewResult<String> {
        let url = "blob:memory/1".to_string();
        self.live_urls.borrow_mut().push(url.clone());
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) {
        self.live_urls.borrow_mut().retain(|u| u != url);
    }

    fn trigger_download(&self, _url: &str, file_name: &str) -> ArViewResult<()> {
        self.downloads.borrow_mut().push(file_name.to_string());
        Ok(())
    }
}

/// Execute effects the way a host would, feeding results back as actions.
fn run_effects(shell: &mut ViewerShell, viewer: &FakeViewer, effects: Vec<Effect>) -> Vec<Effect> {
    let mut unhandled = Vec::new();
    for effect in effects {
        match effect {
            Effect::ApplyCustomization(customization) => {
                match viewer.apply_customization(&customization) {
                    Some(dimensions) => {
                        let more = shell.dispatch(Action::DimensionsReported {
                            dimensions,
                            scale: customization.scale,
                        });
                        unhandled.extend(run_effects(shell, viewer, more));
                    }
                    None => {
                        shell.dispatch(Action::ModelUnloaded);
                    }
                }
            }
            Effect::ActivateAr => viewer.activate_ar().expect("activate"),
            other => unhandled.push(other),
        }
    }
    unhandled
}

fn mobile() -> DeviceProfile {
    DeviceProfile {
        is_mobile: true,
        is_ios: false,
        supports_ar: true,
    }
}

// ============================================================================
// Customization → fit verdict
// ============================================================================

#[test]
fn test_scaled_model_gets_tight_fit_verdict() {
    let viewer = FakeViewer {
        base: Dimensions::new(1.75, 1.0, 1.5),
        ..FakeViewer::new(false)
    };
    let mut shell = ViewerShell::new(
        ShellConfig::default(),
        Customization::from_query("?scale=2&material=glossy"),
        DeviceProfile::default(),
    );

    let effects = shell.dispatch(Action::ModelLoaded);
    let leftover = run_effects(&mut shell, &viewer, effects);

    assert_eq!(leftover, vec![Effect::Haptic(HapticPattern::Pulse)]);
    let snapshot = shell.snapshot();
    assert_eq!(snapshot.dimensions, Some(Dimensions::new(3.5, 2.0, 3.0)));
    let fit = snapshot.fit.expect("verdict");
    assert_eq!(fit.color, FitSeverity::Warning);
    assert_eq!(fit.message, "Tight fit - Limited space around object");
}

#[test]
fn test_rescale_replaces_verdict() {
    let viewer = FakeViewer::new(false);
    let mut shell = ViewerShell::default();
    let effects = shell.dispatch(Action::ModelLoaded);
    run_effects(&mut shell, &viewer, effects);
    assert_eq!(
        shell.snapshot().fit.expect("verdict").color,
        FitSeverity::Excellent
    );

    let huge = Customization {
        scale: 5.0,
        ..Customization::default()
    };
    let effects = shell.dispatch(Action::CustomizationChanged(huge));
    assert!(shell.snapshot().fit.is_none());
    let leftover = run_effects(&mut shell, &viewer, effects);

    assert!(leftover.is_empty());
    let fit = shell.snapshot().fit.expect("verdict");
    assert!(!fit.fits);
    assert_eq!(fit.color, FitSeverity::Critical);
    assert_eq!(viewer.applied.borrow().len(), 2);
}

#[test]
fn test_unloaded_viewer_leaves_no_dimensions() {
    let viewer = FakeViewer {
        loaded: false,
        ..FakeViewer::new(false)
    };
    let mut shell = ViewerShell::default();
    let effects = shell.dispatch(Action::ModelLoaded);
    run_effects(&mut shell, &viewer, effects);
    assert!(shell.snapshot().dimensions.is_none());
    assert!(shell.snapshot().fit.is_none());
}

#[test]
fn test_negative_scale_is_flagged_without_verdict() {
    let viewer = FakeViewer::new(false);
    let mut shell = ViewerShell::new(
        ShellConfig::default(),
        Customization::from_query("scale=-2"),
        DeviceProfile::default(),
    );

    let effects = shell.dispatch(Action::ModelLoaded);
    let leftover = run_effects(&mut shell, &viewer, effects);

    assert!(leftover.is_empty());
    let snapshot = shell.snapshot();
    assert!(!snapshot.scale_valid);
    assert!(snapshot.dimensions.is_none());
    assert!(snapshot.fit.is_none());
}

// ============================================================================
// AR session lifecycle
// ============================================================================

#[test]
fn test_full_ar_session() {
    let viewer = FakeViewer::new(true);
    let mut shell = ViewerShell::new(ShellConfig::default(), Customization::default(), mobile());

    shell.dispatch(Action::ArEntryRequested);
    let effects = shell.dispatch(Action::ArConfirmed {
        can_activate: viewer.can_activate_ar(),
    });
    run_effects(&mut shell, &viewer, effects);
    assert_eq!(viewer.activations.get(), 1);
    assert_eq!(shell.snapshot().ar_status, ArStatus::Detecting);

    let effects = shell.dispatch(Action::ArStatusReported(ViewerArStatus::SessionStarted));
    assert_eq!(effects, vec![Effect::Haptic(HapticPattern::TriplePulse)]);
    let effects = shell.dispatch(Action::ArStatusReported(ViewerArStatus::ObjectPlaced));
    assert_eq!(effects, vec![Effect::Haptic(HapticPattern::LongPulse)]);
    shell.dispatch(Action::ArStatusReported(ViewerArStatus::NotPresenting));

    let snapshot = shell.snapshot();
    assert_eq!(snapshot.ar_status, ArStatus::Ready);
    assert!(!snapshot.overlay_visible);
}

#[test]
fn test_ar_without_capability_never_activates() {
    let viewer = FakeViewer::new(false);
    let mut shell = ViewerShell::new(ShellConfig::default(), Customization::default(), mobile());

    shell.dispatch(Action::ArEntryRequested);
    let effects = shell.dispatch(Action::ArConfirmed {
        can_activate: viewer.can_activate_ar(),
    });
    let leftover = run_effects(&mut shell, &viewer, effects);

    assert_eq!(viewer.activations.get(), 0);
    let snapshot = shell.snapshot();
    assert_eq!(snapshot.ar_status, ArStatus::Ready);
    assert_eq!(
        snapshot.notice.as_deref(),
        Some(ArViewError::ArUnavailable.to_string().as_str())
    );

    let [Effect::ScheduleNoticeClear { generation, .. }] = leftover[..] else {
        panic!("expected one notice clear, got {leftover:?}");
    };
    shell.dispatch(Action::NoticeClearElapsed { generation });
    assert!(shell.snapshot().notice.is_none());
}

#[test]
fn test_failed_session_recovers_after_notice_timer() {
    let mut shell = ViewerShell::new(ShellConfig::default(), Customization::default(), mobile());

    let effects = shell.dispatch(Action::ArStatusReported(ViewerArStatus::Failed));
    let [Effect::ScheduleNoticeClear { generation, delay_ms }] = effects[..] else {
        panic!("expected one notice clear, got {effects:?}");
    };
    assert_eq!(delay_ms, ShellConfig::default().notice_clear_ms);

    // A second failure restarts the timer; the first one must not clear it.
    let effects = shell.dispatch(Action::ArStatusReported(ViewerArStatus::Failed));
    let [Effect::ScheduleNoticeClear { generation: latest, .. }] = effects[..] else {
        panic!("expected one notice clear, got {effects:?}");
    };
    shell.dispatch(Action::NoticeClearElapsed { generation });
    assert_eq!(shell.snapshot().ar_status, ArStatus::Failed);

    shell.dispatch(Action::NoticeClearElapsed { generation: latest });
    let snapshot = shell.snapshot();
    assert_eq!(snapshot.ar_status, ArStatus::Ready);
    assert!(snapshot.notice.is_none());
}

#[test]
fn test_failed_session_can_retry() {
    let viewer = FakeViewer::new(true);
    let mut shell = ViewerShell::new(ShellConfig::default(), Customization::default(), mobile());

    shell.dispatch(Action::ArStatusReported(ViewerArStatus::Failed));
    assert_eq!(shell.snapshot().ar_status, ArStatus::Failed);

    shell.dispatch(Action::ArEntryRequested);
    let effects = shell.dispatch(Action::ArConfirmed { can_activate: true });
    run_effects(&mut shell, &viewer, effects);
    assert_eq!(shell.snapshot().ar_status, ArStatus::Detecting);
    assert_eq!(viewer.activations.get(), 1);
}

// ============================================================================
// Capture
// ============================================================================

#[tokio::test]
async fn test_capture_round_trip_through_shell() {
    let viewer = FakeViewer::new(false);
    let sink = MemorySink::default();
    let service = CaptureService::default();
    let mut shell = ViewerShell::default();
    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let ticket = shell.begin_capture();
    let outcome = service
        .capture(Some(&viewer as &dyn FrameSource), &sink, at)
        .await
        .map_err(|e| e.to_string());
    let effects = shell.dispatch(Action::CaptureFinished { ticket, outcome });

    assert_eq!(
        *sink.downloads.borrow(),
        vec!["ar-product-2026-01-02T03-04-05-000Z.png".to_string()]
    );
    assert!(sink.live_urls.borrow().is_empty());
    assert!(effects.contains(&Effect::Haptic(HapticPattern::TriplePulse)));
    assert_eq!(shell.snapshot().capture_message.as_deref(), Some("Image saved ✓"));
}

#[tokio::test]
async fn test_capture_without_viewer_reports_failure() {
    let sink = MemorySink::default();
    let mut shell = ViewerShell::default();
    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let ticket = shell.begin_capture();
    let outcome = CaptureService::default()
        .capture(None, &sink, at)
        .await
        .map_err(|e| e.to_string());
    assert_eq!(outcome, Err("Viewer not ready".to_string()));

    let effects = shell.dispatch(Action::CaptureFinished { ticket, outcome });
    assert!(!effects.contains(&Effect::Haptic(HapticPattern::TriplePulse)));
    assert!(sink.downloads.borrow().is_empty());
    assert_eq!(
        shell.snapshot().capture_message.as_deref(),
        Some("Capture failed ✗")
    );
}

#[tokio::test]
async fn test_overlapping_captures_last_started_wins() {
    let viewer = FakeViewer::new(false);
    let sink = MemorySink::default();
    let service = CaptureService::default();
    let mut shell = ViewerShell::default();
    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let first = shell.begin_capture();
    let second = shell.begin_capture();

    let outcome = service
        .capture(Some(&viewer as &dyn FrameSource), &sink, at)
        .await
        .map_err(|e| e.to_string());
    let stale = shell.dispatch(Action::CaptureFinished {
        ticket: first,
        outcome: outcome.clone(),
    });
    assert!(!stale
        .iter()
        .any(|e| matches!(e, Effect::ScheduleStatusClear { .. })));

    let effects = shell.dispatch(Action::CaptureFinished {
        ticket: second,
        outcome,
    });
    assert!(effects.contains(&Effect::ScheduleStatusClear {
        generation: second,
        delay_ms: 2000,
    }));

    shell.dispatch(Action::StatusClearElapsed { generation: first });
    assert!(shell.snapshot().capture_message.is_some());
    shell.dispatch(Action::StatusClearElapsed { generation: second });
    assert!(shell.snapshot().capture_message.is_none());
}
