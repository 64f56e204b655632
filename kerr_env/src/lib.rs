//! Kerr Tracing-Engine Boundary
//!
//! This crate holds the types shared between the camera core and any
//! engine that integrates null geodesics:
//! - **Frames**: immutable camera values (`CameraFrame`, `MetricSnapshot`)
//! - **Batches**: raw per-pixel status codes and coordinate histories
//! - **Engines**: the `TracingEngine` trait
//!
//! # Data Flow
//!
//! ```text
//! Camera ──frame()──► CameraFrame ──► TracingEngine::trace ──► RayBatch
//!                                                                │
//!                       Congruence / CongruenceSnapshot ◄────────┘
//! ```

mod engine;
mod error;
mod frame;
mod types;

pub use engine::TracingEngine;
pub use error::EngineError;
pub use frame::{CameraFrame, MetricSnapshot};
pub use types::{BatchShape, CameraId, RayBatch, RayStatus, TexelBuffer, TraceRequest};
