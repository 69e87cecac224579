//! # ARView Core
//!
//! Platform-independent logic for a customizable 3D product viewer with
//! AR preview, a room fit check and frame capture.
//! Compiles to WASM; every browser side effect is described as an [`Effect`]
//! and executed by the host shell.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               ViewerShell                   │
//! │        (state container, dispatch)          │
//! ├──────────────────────┬──────────────────────┤
//! │  Customization       │  Capability          │
//! │  - query parsing     │  - device class      │
//! │  - material / color  │  - AR support probe  │
//! ├──────────────────────┼──────────────────────┤
//! │  ArSession           │  FitChecker          │
//! │  - status machine    │  - room envelope     │
//! │  - overlay / prompt  │  - verdict           │
//! ├──────────────────────┴──────────────────────┤
//! │  Capture: frame → PNG → download, status    │
//! └─────────────────────────────────────────────┘
//!            │ Effects              ▲ Actions
//!            ▼                      │
//!        host shell (arview-app, <model-viewer>)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod capture;
pub mod config;
pub mod customization;
pub mod effect;
pub mod error;
pub mod fit;
pub mod session;
pub mod shell;
pub mod viewer;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use capability::{detect, ArSupportProbe, DeviceProfile};
pub use capture::{CaptureArtifact, CaptureService, CaptureStatus, DownloadSink, ObjectUrl};
pub use config::ShellConfig;
pub use customization::{resolve, Customization, Material};
pub use effect::{Effect, HapticPattern};
pub use error::{ArViewError, ArViewResult};
pub use fit::{evaluate, Dimensions, FitCheckResult, FitIcon, FitSeverity, RoomEnvelope};
pub use session::{ArSessionController, ArStatus, ViewerArStatus};
pub use shell::{Action, ShellSnapshot, ShellState, ViewerShell};
pub use viewer::{FrameSource, ModelSources, ModelViewer};

/// ARView core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
