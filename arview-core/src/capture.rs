//! Frame capture to a downloadable PNG.
//!
//! ```text
//! FrameSource::to_png ──▶ DownloadSink::create_object_url ──▶ trigger_download
//!                                     │                              │
//!                                     └──── ObjectUrl (revoke on drop) ◀┘
//! ```

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{ArViewError, ArViewResult, Effect, FrameSource};

/// Message shown while a capture is running.
pub const CAPTURING_MESSAGE: &str = "Capturing...";
/// Message shown after a successful capture.
pub const SAVED_MESSAGE: &str = "Image saved ✓";
/// Message shown after a failed capture.
pub const FAILED_MESSAGE: &str = "Capture failed ✗";

/// Platform hook that turns bytes into a client-side download.
pub trait DownloadSink {
    /// Register `png` as a temporary object URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot create the URL.
    fn create_object_url(&self, png: &[u8]) -> ArViewResult<String>;

    /// Release a URL returned by [`DownloadSink::create_object_url`].
    fn revoke_object_url(&self, url: &str);

    /// Start downloading `url` as `file_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download cannot be started.
    fn trigger_download(&self, url: &str, file_name: &str) -> ArViewResult<()>;
}

/// A temporary object URL, revoked when dropped.
pub struct ObjectUrl<'a> {
    url: String,
    sink: &'a dyn DownloadSink,
}

impl<'a> ObjectUrl<'a> {
    /// Create an object URL for `png` on `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot create the URL.
    pub fn acquire(sink: &'a dyn DownloadSink, png: &[u8]) -> ArViewResult<Self> {
        let url = sink.create_object_url(png)?;
        Ok(Self { url, sink })
    }

    /// The URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl<'_> {
    fn drop(&mut self) {
        self.sink.revoke_object_url(&self.url);
    }
}

impl fmt::Debug for ObjectUrl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectUrl").field("url", &self.url).finish()
    }
}

/// A successfully downloaded capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArtifact {
    /// Download file name.
    pub file_name: String,
    /// Encoded PNG size in bytes.
    pub byte_len: usize,
}

/// Exports viewer frames as timestamped PNG downloads.
#[derive(Debug, Clone)]
pub struct CaptureService {
    prefix: String,
}

impl Default for CaptureService {
    fn default() -> Self {
        Self::new("ar-product")
    }
}

impl CaptureService {
    /// A service naming files `<prefix>-<timestamp>.png`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// File name for a capture taken at `at`.
    ///
    /// ISO 8601 with millisecond precision, `:` and `.` replaced by `-`.
    #[must_use]
    pub fn file_name(&self, at: DateTime<Utc>) -> String {
        let stamp = at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        format!("{}-{stamp}.png", self.prefix)
    }

    /// Capture the current frame and download it.
    ///
    /// The object URL is revoked whether or not the download starts.
    ///
    /// # Errors
    ///
    /// Returns [`ArViewError::ViewerNotReady`] when `viewer` is `None`, and
    /// [`ArViewError::Capture`] when export or download fails.
    pub async fn capture(
        &self,
        viewer: Option<&dyn FrameSource>,
        sink: &dyn DownloadSink,
        at: DateTime<Utc>,
    ) -> ArViewResult<CaptureArtifact> {
        let viewer = viewer.ok_or(ArViewError::ViewerNotReady)?;

        let png = viewer.to_png().await.map_err(|e| match e {
            ArViewError::Capture(_) => e,
            other => ArViewError::Capture(other.to_string()),
        })?;
        let file_name = self.file_name(at);

        let url = ObjectUrl::acquire(sink, &png)?;
        sink.trigger_download(url.as_str(), &file_name)?;
        drop(url);

        tracing::info!(%file_name, bytes = png.len(), "Capture saved");
        Ok(CaptureArtifact {
            file_name,
            byte_len: png.len(),
        })
    }
}

/// Transient capture status message.
///
/// Every capture start bumps the generation. Results and clear timers from
/// an older generation are ignored, so the most recently started capture
/// owns the message and its clear timer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStatus {
    message: Option<String>,
    generation: u64,
}

impl CaptureStatus {
    /// Current message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A capture started. Returns its ticket.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.message = Some(CAPTURING_MESSAGE.to_string());
        self.generation
    }

    /// The capture with `ticket` finished.
    ///
    /// Returns the clear timer to schedule, or `None` if a newer capture has
    /// started since.
    pub fn finish(&mut self, ticket: u64, succeeded: bool, delay_ms: u32) -> Option<Effect> {
        if ticket != self.generation {
            tracing::debug!(ticket, current = self.generation, "Stale capture result ignored");
            return None;
        }
        self.message = Some(if succeeded { SAVED_MESSAGE } else { FAILED_MESSAGE }.to_string());
        Some(Effect::ScheduleStatusClear {
            generation: ticket,
            delay_ms,
        })
    }

    /// A clear timer fired. Clears only if `generation` is current.
    pub fn clear(&mut self, generation: u64) {
        if generation == self.generation {
            self.message = None;
        }
    }
}
