//! Scenario runner - places a camera, traces it and checks the output.

use std::time::Instant;

use kerr_core::{
    CameraFrame, CameraSpec, Congruence, CongruenceSnapshot, RayStatus, StatusCounts, Universe,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scenarios::ScenarioId;
use crate::tracer::{FlatSpaceTracer, SimConfig};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario name, or the config file's label
    pub name: String,

    /// Black hole spin
    pub spin: f64,

    /// Whether the output passed all checks
    pub passed: bool,

    /// Final-instant class counts
    pub counts: StatusCounts,

    /// Smallest raster with the sensor's aspect ratio
    pub image_size: (usize, usize),

    pub downsampling_unit: usize,

    /// Per-instant class counts, when a sliced trace was requested
    pub slice_counts: Option<Vec<StatusCounts>>,

    /// Wall time of the whole run
    pub elapsed_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub result: ScenarioResult,
    pub frame: CameraFrame,
    pub snapshot: CongruenceSnapshot,
    pub congruence: Option<Congruence>,
}

/// Runs camera scenarios against the reference tracer.
pub struct ScenarioRunner {
    /// Black hole spin
    spin: f64,

    /// Tracer parameters
    config: SimConfig,

    /// Affine parameter to integrate to (negative: backwards in time)
    final_time: f64,

    /// Number of instants for the sliced trace, if any
    slices: Option<usize>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(spin: f64) -> Self {
        Self {
            spin,
            config: SimConfig::default(),
            final_time: -150.0,
            slices: None,
        }
    }

    /// Sets the tracer parameters.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the integration end point.
    pub fn with_final_time(mut self, final_time: f64) -> Self {
        self.final_time = final_time;
        self
    }

    /// Also trace a congruence with this many instants.
    pub fn with_slices(mut self, slices: usize) -> Self {
        self.slices = Some(slices);
        self
    }

    /// Runs a preset scenario.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioOutcome> {
        info!("Starting scenario: {} ({})", scenario.name(), scenario.description());
        self.run_spec(scenario.name(), scenario.spec())
    }

    /// Runs an arbitrary camera placement.
    ///
    /// Errors from the core (bad geometry, engine failures) are returned;
    /// output that traced fine but fails a check comes back with
    /// `passed == false`.
    pub fn run_spec(&self, name: &str, spec: CameraSpec) -> Result<ScenarioOutcome> {
        let started = Instant::now();

        let universe = Universe::with_spin(self.spin)?;
        let (snapshot, congruence, frame) = {
            let tracer = FlatSpaceTracer::new(self.config.clone());
            let mut camera = universe.create_camera(spec, tracer)?;

            debug!(
                "  camera {} at r={} theta={:.3} speed={:.4}",
                camera.id(),
                camera.r(),
                camera.theta(),
                camera.speed()
            );

            let snapshot = camera.shoot(self.final_time)?;
            let congruence = match self.slices {
                Some(slices) => Some(camera.sliced_shoot(self.final_time, slices)?),
                None => None,
            };
            (snapshot, congruence, camera.frame())
        };

        let failure_reason = check_snapshot(&snapshot)
            .err()
            .or_else(|| congruence.as_ref().and_then(|c| check_congruence(c, &snapshot).err()))
            .or_else(|| {
                (universe.active_cameras() != 0).then(|| "camera still registered after it was dropped".to_string())
            });

        if let Some(reason) = &failure_reason {
            warn!("  {}: {}", name, reason);
        }

        let counts = snapshot.status_counts();
        info!(
            "  {} | sphere={} disk={} horizon={} | image {}x{} (unit {})",
            name,
            counts.sphere,
            counts.disk,
            counts.horizon,
            snapshot.image_size().0,
            snapshot.image_size().1,
            snapshot.downsampling_unit()
        );

        let result = ScenarioResult {
            name: name.to_string(),
            spin: self.spin,
            passed: failure_reason.is_none(),
            counts,
            image_size: snapshot.image_size(),
            downsampling_unit: snapshot.downsampling_unit(),
            slice_counts: congruence.as_ref().map(Congruence::status_counts),
            elapsed_secs: started.elapsed().as_secs_f64(),
            failure_reason,
        };

        Ok(ScenarioOutcome {
            result,
            frame,
            snapshot,
            congruence,
        })
    }
}

/// Every pixel is classified, the image size tiles the sensor, and the
/// camera sees the shadow.
fn check_snapshot(snapshot: &CongruenceSnapshot) -> std::result::Result<(), String> {
    let counts = snapshot.status_counts();
    if counts.total() != snapshot.num_pixels() {
        return Err(format!(
            "{} classified pixels for a {}-pixel sensor",
            counts.total(),
            snapshot.num_pixels()
        ));
    }

    let (h, w) = snapshot.image_size();
    let unit = snapshot.downsampling_unit();
    if (h * unit, w * unit) != (snapshot.rows(), snapshot.cols()) {
        return Err(format!(
            "image size {}x{} x{} does not tile a {}x{} sensor",
            h,
            w,
            unit,
            snapshot.rows(),
            snapshot.cols()
        ));
    }

    if counts.horizon == 0 {
        return Err("no pixel reached the horizon".to_string());
    }

    Ok(())
}

/// The last instant agrees with the single-instant trace, and every
/// geodesic's classification matches the status its pixel ends in.
fn check_congruence(congruence: &Congruence, snapshot: &CongruenceSnapshot) -> std::result::Result<(), String> {
    let last = congruence
        .snapshot(congruence.slices() - 1)
        .map_err(|e| e.to_string())?;
    if last.status() != snapshot.status() {
        return Err("last instant differs from the single-instant trace".to_string());
    }

    for row in 0..congruence.rows() {
        for col in 0..congruence.cols() {
            let geodesic = congruence.geodesic(row, col).map_err(|e| e.to_string())?;
            let expected = last.status_at(row, col).map_err(|e| e.to_string())?;
            if geodesic.status() != expected {
                return Err(format!(
                    "pixel ({}, {}) classified {} but ends in {}",
                    row,
                    col,
                    geodesic.status().name(),
                    expected.name()
                ));
            }
            if geodesic.status() == RayStatus::Sphere && geodesic.len() != congruence.slices() {
                return Err(format!("escaping pixel ({}, {}) lost steps", row, col));
            }
        }
    }

    Ok(())
}
