//! Kerr Simulation Harness
//!
//! Drives the camera core end to end without a relativistic integrator:
//! a flat-space reference tracer stands in for the engine, preset
//! scenarios place the camera, and the runner checks what comes back.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    ScenarioRunner                     │
//! │  ┌───────────┐   create_camera   ┌────────────────┐   │
//! │  │ Universe  │──────────────────►│     Camera     │   │
//! │  │ (registry)│                   │ (Fresh/Stale)  │   │
//! │  └───────────┘                   └───────┬────────┘   │
//! │                                rebuild / │ trace      │
//! │                                  ┌───────▼────────┐   │
//! │                                  │FlatSpaceTracer │   │
//! │                                  └───────┬────────┘   │
//! │                                 RayBatch │            │
//! │                   ┌──────────────────────▼─────────┐  │
//! │                   │ CongruenceSnapshot / Congruence│  │
//! │                   └────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use kerr_sim::{ScenarioRunner, ScenarioId};
//!
//! let runner = ScenarioRunner::new(0.9).with_slices(50);
//! let outcome = runner.run(ScenarioId::Inclined)?;
//! outcome.snapshot.save("inclined.png")?;
//! ```

pub mod error;
pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod tracer;

pub use error::{Result, SimError};
pub use exporter::{CongruenceExport, GeodesicSummary, SnapshotExport};
pub use runner::{ScenarioOutcome, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use tracer::{FlatSpaceTracer, SimConfig};
