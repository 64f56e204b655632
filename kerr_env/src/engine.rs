//! The tracing-engine interface.

use crate::error::EngineError;
use crate::frame::CameraFrame;
use crate::types::{RayBatch, TexelBuffer, TraceRequest};

/// Anything that integrates rays backwards from a camera.
///
/// The engine keeps whatever compiled per-camera state it needs between
/// traces. Callers must invoke `rebuild` after any change to the camera
/// before calling `trace` again.
///
/// # Implementations
///
/// - **Production**: a GR integrator (out of tree)
/// - **Harness**: `kerr_sim::FlatSpaceTracer`, straight rays in flat space
pub trait TracingEngine {
    /// Discards compiled state and prepares for `frame`.
    fn rebuild(&mut self, frame: &CameraFrame) -> Result<(), EngineError>;

    /// Traces every pixel of `frame`.
    ///
    /// The returned batch must satisfy `RayBatch::validate`, with
    /// `shape.slices == request.slices`.
    fn trace(&mut self, frame: &CameraFrame, request: &TraceRequest) -> Result<RayBatch, EngineError>;

    /// Colour buffer for the most recent trace, if the engine textures.
    fn texels(&self) -> Option<TexelBuffer> {
        None
    }

    /// Wall time spent by the most recent trace, in seconds.
    fn last_trace_secs(&self) -> f64 {
        0.0
    }
}
