//! Room fit check.
//!
//! Compares the customized model's bounding box against an assumed room
//! envelope and classifies the result. Nothing here measures a real room.
//!
//! ```text
//!   usage = max(w/W, h/H, d/D) × 100
//!
//!   any axis over │ usage > 80 │ usage > 60 │ otherwise
//!   ──────────────┼────────────┼────────────┼───────────
//!   critical      │ warning    │ good       │ excellent
//! ```

use serde::{Deserialize, Serialize};

/// Usage above this percentage is a tight fit.
pub const TIGHT_USAGE_PERCENT: f64 = 80.0;
/// Usage above this percentage is a comfortable fit.
pub const COMFORTABLE_USAGE_PERCENT: f64 = 60.0;

/// Axis-aligned extents of the rendered model after scale, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Extent along X.
    pub width: f64,
    /// Extent along Y.
    pub height: f64,
    /// Extent along Z.
    pub depth: f64,
}

impl Dimensions {
    /// Create a new set of dimensions.
    #[must_use]
    pub const fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Dimensions multiplied uniformly by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor, self.depth * factor)
    }

    /// Whether every extent is a finite, non-negative number.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.width, self.height, self.depth]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// The assumed room size the fit check compares against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomEnvelope {
    /// Room width in meters.
    pub width: f64,
    /// Room height in meters.
    pub height: f64,
    /// Room depth in meters.
    pub depth: f64,
}

impl RoomEnvelope {
    /// A 4 m × 2.8 m × 5 m room.
    pub const STANDARD: Self = Self {
        width: 4.0,
        height: 2.8,
        depth: 5.0,
    };
}

impl Default for RoomEnvelope {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Severity of a fit verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitSeverity {
    /// Does not fit.
    Critical,
    /// Fits with little room to spare.
    Warning,
    /// Fits comfortably.
    Good,
    /// Fits with plenty of room.
    Excellent,
}

/// Symbolic icon shown next to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitIcon {
    /// Cross / stop sign.
    Cross,
    /// Warning triangle.
    Warning,
    /// Check mark.
    Check,
    /// Star.
    Star,
}

/// Verdict of a fit check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitCheckResult {
    /// Whether the object fits inside the envelope on every axis.
    pub fits: bool,
    /// User-facing message.
    pub message: String,
    /// Icon tag.
    pub icon: FitIcon,
    /// Severity tag.
    pub color: FitSeverity,
    /// Largest per-axis usage in percent, `None` when undefined.
    pub usage_percent: Option<f64>,
}

impl FitCheckResult {
    fn new(severity: FitSeverity, usage_percent: Option<f64>) -> Self {
        let (fits, message, icon) = match severity {
            FitSeverity::Critical => (
                false,
                "Object may not fit here - Too large for space",
                FitIcon::Cross,
            ),
            FitSeverity::Warning => (
                true,
                "Tight fit - Limited space around object",
                FitIcon::Warning,
            ),
            FitSeverity::Good => (true, "Good fit - Comfortable space", FitIcon::Check),
            FitSeverity::Excellent => (true, "Perfect fit - Plenty of space!", FitIcon::Star),
        };
        Self {
            fits,
            message: message.to_string(),
            icon,
            color: severity,
            usage_percent,
        }
    }
}

/// Classify how well `dim` fits inside `room`.
///
/// Pure and total. A NaN usage (for example from a zero-sized envelope axis
/// divided into a zero-sized object) is treated as not fitting. Boundaries
/// are exclusive: exactly 80 % is `Good`, exactly 60 % is `Excellent`.
#[must_use]
pub fn evaluate(dim: &Dimensions, room: &RoomEnvelope) -> FitCheckResult {
    let fits_all = dim.width <= room.width && dim.height <= room.height && dim.depth <= room.depth;

    let ratios = [
        dim.width / room.width,
        dim.height / room.height,
        dim.depth / room.depth,
    ];
    // f64::max ignores NaN, so any NaN ratio has to poison the result explicitly.
    let usage = if ratios.iter().any(|r| r.is_nan()) {
        None
    } else {
        Some(ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max) * 100.0)
    };

    let severity = match usage {
        Some(u) if fits_all && u > TIGHT_USAGE_PERCENT => FitSeverity::Warning,
        Some(u) if fits_all && u > COMFORTABLE_USAGE_PERCENT => FitSeverity::Good,
        Some(_) if fits_all => FitSeverity::Excellent,
        _ => FitSeverity::Critical,
    };

    tracing::debug!(?dim, ?usage, ?severity, "Fit check evaluated");
    FitCheckResult::new(severity, usage)
}
