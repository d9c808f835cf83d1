// =============================================================================
// STEREO CAPTURE LAYER - Redirect a flat renderer's targets into XR layers
// =============================================================================
//
// The host application's renderer was patched to clear its render targets
// with sentinel colors. This layer sits between the host and the Vulkan
// driver, recognizes those clears, copies the marked images into textures
// shared with an external XR compositor, and attaches the timeline semaphore
// waits/signals that make the hand-off race-free.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  Host application                                               │
// │    └── CaptureLayer (entry point overrides)                     │
// │          ├── marker      sentinel decoding                      │
// │          ├── registry    candidate render targets               │
// │          ├── runtime     XR renderer / layers / overlay traits  │
// │          ├── handoff     copies waiting for their submit        │
// │          ├── submit      semaphore injection                    │
// │          └── backend     DeviceDispatch ──> next layer / driver │
// └─────────────────────────────────────────────────────────────────┘
//
// =============================================================================

pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod handoff;
pub mod logging;
pub mod marker;
pub mod registry;
pub mod runtime;
pub mod submit;

pub use backend::{AshDispatch, DeviceDispatch};
pub use capture::CaptureLayer;
pub use config::LayerConfig;
pub use error::MarkerError;
pub use frame::{FrameCaptures, FrameIndex, FrameTracker};
pub use marker::{CapturePass, ColorMarker, DepthMarker, Eye, Marker};
pub use runtime::{Layer2D, Layer3D, Layers, Overlay, Renderer, SharedTexture, XrRuntime};

use std::sync::Arc;

/// Load config, set up logging and build the capture state for a device
pub fn init(dispatch: Arc<dyn DeviceDispatch>, runtime: Arc<dyn XrRuntime>) -> CaptureLayer {
    let config = LayerConfig::load();
    logging::init_logging(&config.logging);
    log::info!("Starting stereo capture layer v{}", env!("CARGO_PKG_VERSION"));

    CaptureLayer::new(dispatch, runtime, &config.capture)
}
