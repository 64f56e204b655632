//! Kerr Core - Camera Geometry and Geodesic Congruences
//!
//! This library models a pinhole camera near a rotating black hole and
//! organizes the output of an external ray tracer:
//! 1. **Metric**: closed-form Kerr scalars at the camera's position
//! 2. **Camera**: position, orientation and sensor kept in sync with the metric
//! 3. **Geodesics**: per-ray collision classification and truncation
//! 4. **Congruences**: per-instant snapshots and per-pixel time series

pub mod camera;
pub mod congruence;
pub mod error;
pub mod geodesic;
pub mod metric;
pub mod universe;

// Re-export key types for convenience
pub use camera::{Camera, CameraSpec, SpeedMode, TraceState};
pub use congruence::{downsampling_unit, Congruence, CongruenceSnapshot, StatusCounts};
pub use error::{KerrError, Result};
pub use geodesic::Geodesic;
pub use metric::BlackHole;
pub use universe::{CameraRegistry, RegisteredCamera, Universe};

pub use kerr_env::{
    BatchShape, CameraFrame, CameraId, EngineError, MetricSnapshot, RayBatch, RayStatus, TexelBuffer,
    TraceRequest, TracingEngine,
};
