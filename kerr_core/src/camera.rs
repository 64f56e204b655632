//! The Camera Geometry Model
//!
//! A pinhole camera placed at Boyer-Lindquist coordinates `(r, θ, φ)`
//! around a Kerr black hole. The camera keeps every derived quantity
//! (pixel size, metric, orbital speed) consistent with its inputs:
//!
//! - position setters re-evaluate the metric and the speed
//! - sensor setters recompute the pixel size only
//! - every setter marks the camera `Stale`, forcing an engine rebuild
//!   before the next trace
//!
//! Each camera owns its tracing engine, so the compiled state the
//! Fresh/Stale flag describes is always the camera's own.

use kerr_env::{CameraFrame, CameraId, MetricSnapshot, TraceRequest, TracingEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::congruence::{Congruence, CongruenceSnapshot};
use crate::error::{KerrError, Result};
use crate::metric::{self, BlackHole};

/// How the camera's orbital speed is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    /// Camera at rest, β = 0
    #[default]
    Static,

    /// Circular equatorial orbit, formula (A.7)
    Keplerian,
}

/// Whether the engine's compiled state matches the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// Engine was rebuilt for the current camera
    Fresh,

    /// Camera changed since the last rebuild
    Stale,
}

/// Camera construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSpec {
    /// Distance to the black hole centre
    pub r: f64,

    /// Inclination
    pub theta: f64,

    /// Azimuth
    pub phi: f64,

    /// Distance between focal point and sensor plane
    pub focal_length: f64,

    /// (rows, cols)
    pub sensor_shape: (usize, usize),

    /// (height, width) in physical units
    pub sensor_size: (f64, f64),

    /// CCD rotation on its own plane
    pub roll: f64,

    /// Above/below look direction
    pub pitch: f64,

    /// Left/right look direction
    pub yaw: f64,

    pub speed_mode: SpeedMode,
}

impl Default for CameraSpec {
    fn default() -> Self {
        Self {
            r: 40.0,
            theta: 1.511,
            phi: 0.0,
            focal_length: 3.0,
            sensor_shape: (120, 160),
            sensor_size: (1.5, 2.0),
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            speed_mode: SpeedMode::Static,
        }
    }
}

impl CameraSpec {
    /// Spec at `(r, theta, phi)` with default lens and sensor.
    pub fn at(r: f64, theta: f64, phi: f64) -> Self {
        Self {
            r,
            theta,
            phi,
            ..Default::default()
        }
    }
}

/// A camera in Kerr spacetime, traced by its own engine `E`.
#[derive(Debug)]
pub struct Camera<E> {
    id: CameraId,
    black_hole: BlackHole,

    r: f64,
    r2: f64,
    theta: f64,
    phi: f64,

    focal_length: f64,
    sensor_shape: (usize, usize),
    sensor_size: (f64, f64),

    roll: f64,
    pitch: f64,
    yaw: f64,

    pixel_width: f64,
    pixel_height: f64,

    metric: MetricSnapshot,
    speed_mode: SpeedMode,
    speed: f64,

    state: TraceState,
    engine: E,
}

impl<E> Camera<E> {
    /// Build a camera, locate it at `spec`'s coordinates and hand it the
    /// engine that will trace it.
    ///
    /// # Errors
    /// * `Configuration` - zero/negative sensor dimensions or focal length
    /// * `InvalidGeometry` - the metric is undefined at the position
    pub fn new(black_hole: BlackHole, spec: CameraSpec, engine: E) -> Result<Self> {
        Self::with_id(CameraId::new(), black_hole, spec, engine)
    }

    /// Same as `new` with a caller-chosen id.
    pub fn with_id(id: CameraId, black_hole: BlackHole, spec: CameraSpec, engine: E) -> Result<Self> {
        validate_focal_length(spec.focal_length)?;
        let (pixel_width, pixel_height) = pixel_size(spec.sensor_shape, spec.sensor_size)?;
        let (metric, speed) = derive_motion(&black_hole, spec.r, spec.theta, spec.speed_mode)?;

        debug!(
            "camera {} at r={} theta={} phi={} speed={}",
            id, spec.r, spec.theta, spec.phi, speed
        );

        Ok(Self {
            id,
            black_hole,
            r: spec.r,
            r2: spec.r * spec.r,
            theta: spec.theta,
            phi: spec.phi,
            focal_length: spec.focal_length,
            sensor_shape: spec.sensor_shape,
            sensor_size: spec.sensor_size,
            roll: spec.roll,
            pitch: spec.pitch,
            yaw: spec.yaw,
            pixel_width,
            pixel_height,
            metric,
            speed_mode: spec.speed_mode,
            speed,
            state: TraceState::Stale,
            engine,
        })
    }

    pub fn id(&self) -> CameraId {
        self.id
    }

    pub fn black_hole(&self) -> &BlackHole {
        &self.black_hole
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn r2(&self) -> f64 {
        self.r2
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn sensor_shape(&self) -> (usize, usize) {
        self.sensor_shape
    }

    pub fn sensor_size(&self) -> (f64, f64) {
        self.sensor_size
    }

    pub fn roll(&self) -> f64 {
        self.roll
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> f64 {
        self.pixel_height
    }

    pub fn metric(&self) -> &MetricSnapshot {
        &self.metric
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn speed_mode(&self) -> SpeedMode {
        self.speed_mode
    }

    pub fn trace_state(&self) -> TraceState {
        self.state
    }

    /// Whether the next trace will rebuild the engine first.
    pub fn needs_retrace(&self) -> bool {
        self.state == TraceState::Stale
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Swap in another engine and return the old one. The new engine has
    /// never seen this camera, so the camera goes `Stale`.
    pub fn replace_engine(&mut self, engine: E) -> E {
        self.mark_stale("engine");
        std::mem::replace(&mut self.engine, engine)
    }

    /// Take the engine back, consuming the camera.
    pub fn into_engine(self) -> E {
        self.engine
    }

    // ========== Position ==========

    /// Move the camera radially. Re-evaluates metric and speed.
    ///
    /// On error the camera is left untouched.
    pub fn set_r(&mut self, r: f64) -> Result<()> {
        let (metric, speed) = derive_motion(&self.black_hole, r, self.theta, self.speed_mode)?;
        self.r = r;
        self.r2 = r * r;
        self.apply_motion(metric, speed);
        Ok(())
    }

    /// Change the inclination. Re-evaluates metric and speed.
    pub fn set_theta(&mut self, theta: f64) -> Result<()> {
        let (metric, speed) = derive_motion(&self.black_hole, self.r, theta, self.speed_mode)?;
        self.theta = theta;
        self.apply_motion(metric, speed);
        Ok(())
    }

    /// Change the azimuth.
    ///
    /// The spacetime is axisymmetric so the metric cannot change, but the
    /// ray directions do.
    pub fn set_phi(&mut self, phi: f64) {
        self.phi = phi;
        self.mark_stale("phi");
    }

    /// Switch between a static and an orbiting camera.
    pub fn set_speed_mode(&mut self, speed_mode: SpeedMode) -> Result<()> {
        let speed = speed_for(&self.black_hole, self.r, self.theta, &self.metric, speed_mode)?;
        self.speed_mode = speed_mode;
        self.speed = speed;
        self.mark_stale("speed mode");
        Ok(())
    }

    // ========== Orientation & lens ==========

    pub fn set_roll(&mut self, roll: f64) {
        self.roll = roll;
        self.mark_stale("roll");
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch;
        self.mark_stale("pitch");
    }

    pub fn set_yaw(&mut self, yaw: f64) {
        self.yaw = yaw;
        self.mark_stale("yaw");
    }

    pub fn set_focal_length(&mut self, focal_length: f64) -> Result<()> {
        validate_focal_length(focal_length)?;
        self.focal_length = focal_length;
        self.mark_stale("focal length");
        Ok(())
    }

    // ========== Sensor ==========

    /// Change the pixel grid. Metric and speed are untouched.
    pub fn set_sensor_shape(&mut self, sensor_shape: (usize, usize)) -> Result<()> {
        let (w, h) = pixel_size(sensor_shape, self.sensor_size)?;
        self.sensor_shape = sensor_shape;
        self.pixel_width = w;
        self.pixel_height = h;
        self.mark_stale("sensor shape");
        Ok(())
    }

    /// Change the physical sensor size. Metric and speed are untouched.
    pub fn set_sensor_size(&mut self, sensor_size: (f64, f64)) -> Result<()> {
        let (w, h) = pixel_size(self.sensor_shape, sensor_size)?;
        self.sensor_size = sensor_size;
        self.pixel_width = w;
        self.pixel_height = h;
        self.mark_stale("sensor size");
        Ok(())
    }

    /// Immutable value copy of the camera for an engine.
    pub fn frame(&self) -> CameraFrame {
        CameraFrame {
            id: self.id,
            spin: self.black_hole.spin(),
            spin_squared: self.black_hole.spin_squared(),
            r: self.r,
            theta: self.theta,
            phi: self.phi,
            focal_length: self.focal_length,
            sensor_shape: self.sensor_shape,
            sensor_size: self.sensor_size,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            roll: self.roll,
            pitch: self.pitch,
            yaw: self.yaw,
            metric: self.metric,
            speed: self.speed,
        }
    }

    // ========== Private Helper Methods ==========

    fn check_grid(&self, rows: usize, cols: usize) -> Result<()> {
        if (rows, cols) != self.sensor_shape {
            return Err(KerrError::shape(format!(
                "engine returned a {}x{} grid for a {}x{} sensor",
                rows, cols, self.sensor_shape.0, self.sensor_shape.1
            )));
        }
        Ok(())
    }

    fn apply_motion(&mut self, metric: MetricSnapshot, speed: f64) {
        self.metric = metric;
        self.speed = speed;
        self.mark_stale("position");
    }

    fn mark_stale(&mut self, cause: &str) {
        if self.state != TraceState::Stale {
            debug!("camera {} {} changed, state Stale", self.id, cause);
        }
        self.state = TraceState::Stale;
    }
}

// ========== Tracing ==========

impl<E: TracingEngine> Camera<E> {
    /// Trace a single instant and wrap the result.
    ///
    /// Rebuilds the engine first if the camera is `Stale`.
    pub fn shoot(&mut self, final_time: f64) -> Result<CongruenceSnapshot> {
        let frame = self.prepare()?;
        let batch = self.engine.trace(&frame, &TraceRequest::snapshot(final_time))?;
        self.check_grid(batch.shape.rows, batch.shape.cols)?;

        let snapshot = CongruenceSnapshot::from_batch(batch, self.engine.texels())?;
        info!(
            "camera {} traced {}x{} pixels in {:.3}s",
            self.id,
            snapshot.rows(),
            snapshot.cols(),
            self.engine.last_trace_secs()
        );
        Ok(snapshot)
    }

    /// Trace `slices` instants up to `final_time`.
    pub fn sliced_shoot(&mut self, final_time: f64, slices: usize) -> Result<Congruence> {
        if slices == 0 {
            return Err(KerrError::configuration("a sliced trace needs at least one slice"));
        }

        let frame = self.prepare()?;
        let batch = self.engine.trace(&frame, &TraceRequest::sliced(final_time, slices))?;
        self.check_grid(batch.shape.rows, batch.shape.cols)?;

        let congruence = Congruence::from_batch(batch)?;
        info!(
            "camera {} traced {}x{}x{} congruence in {:.3}s",
            self.id,
            congruence.rows(),
            congruence.cols(),
            congruence.slices(),
            self.engine.last_trace_secs()
        );
        Ok(congruence)
    }

    /// Stale -> rebuild -> Fresh. A Fresh camera reuses the engine as is.
    ///
    /// A failed rebuild leaves the camera `Stale`.
    fn prepare(&mut self) -> Result<CameraFrame> {
        let frame = self.frame();
        if self.state == TraceState::Stale {
            self.engine.rebuild(&frame)?;
            self.state = TraceState::Fresh;
            debug!("camera {} engine rebuilt, state Fresh", self.id);
        }
        Ok(frame)
    }
}

/// Width and height of one pixel in physical units.
fn pixel_size(sensor_shape: (usize, usize), sensor_size: (f64, f64)) -> Result<(f64, f64)> {
    let (rows, cols) = sensor_shape;
    let (height, width) = sensor_size;

    if rows == 0 || cols == 0 {
        return Err(KerrError::configuration(format!(
            "sensor shape must be non-zero, got {}x{}",
            rows, cols
        )));
    }
    if !(height.is_finite() && width.is_finite()) || height <= 0.0 || width <= 0.0 {
        return Err(KerrError::configuration(format!(
            "sensor size must be positive, got {}x{}",
            height, width
        )));
    }

    Ok((width / cols as f64, height / rows as f64))
}

fn validate_focal_length(focal_length: f64) -> Result<()> {
    if !focal_length.is_finite() || focal_length <= 0.0 {
        return Err(KerrError::configuration(format!(
            "focal length must be positive, got {}",
            focal_length
        )));
    }
    Ok(())
}

fn derive_motion(black_hole: &BlackHole, r: f64, theta: f64, mode: SpeedMode) -> Result<(MetricSnapshot, f64)> {
    let metric = black_hole.metric_at(r, theta)?;
    let speed = speed_for(black_hole, r, theta, &metric, mode)?;
    Ok((metric, speed))
}

fn speed_for(black_hole: &BlackHole, r: f64, theta: f64, metric: &MetricSnapshot, mode: SpeedMode) -> Result<f64> {
    match mode {
        SpeedMode::Static => Ok(0.0),
        SpeedMode::Keplerian => metric::keplerian_speed(black_hole.spin(), r, theta, metric),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::evaluate;
    use approx::assert_relative_eq;
    use kerr_env::{BatchShape, EngineError, RayBatch};
    use proptest::prelude::*;

    fn spec() -> CameraSpec {
        CameraSpec {
            r: 30.0,
            theta: 1.4,
            phi: 0.3,
            focal_length: 2.0,
            sensor_shape: (6, 8),
            sensor_size: (0.6, 1.6),
            ..Default::default()
        }
    }

    fn kerr() -> BlackHole {
        BlackHole::new(0.9).unwrap()
    }

    /// Engine that fills every pixel with one status and counts rebuilds.
    #[derive(Debug)]
    struct ConstantEngine {
        rebuilds: usize,
        built_for: Option<CameraFrame>,
        code: u8,
        fail_rebuild: bool,
    }

    impl ConstantEngine {
        fn new(code: u8) -> Self {
            Self {
                rebuilds: 0,
                built_for: None,
                code,
                fail_rebuild: false,
            }
        }
    }

    impl TracingEngine for ConstantEngine {
        fn rebuild(&mut self, frame: &CameraFrame) -> std::result::Result<(), EngineError> {
            if self.fail_rebuild {
                return Err(EngineError::trace("rebuild refused"));
            }
            self.rebuilds += 1;
            self.built_for = Some(*frame);
            Ok(())
        }

        fn trace(
            &mut self,
            frame: &CameraFrame,
            request: &TraceRequest,
        ) -> std::result::Result<RayBatch, EngineError> {
            if self.built_for.as_ref() != Some(frame) {
                return Err(EngineError::NotBuilt(frame.id.to_string()));
            }
            let (rows, cols) = frame.sensor_shape;
            let shape = BatchShape {
                rows,
                cols,
                coord_dim: 3,
                slices: request.slices,
            };
            RayBatch::new(
                shape,
                vec![self.code; shape.status_len()],
                vec![1.0; shape.coordinates_len()],
            )
        }
    }

    #[test]
    fn test_construction_round_trip() {
        let camera = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();

        assert_relative_eq!(camera.pixel_width(), 1.6 / 8.0, epsilon = 1e-15);
        assert_relative_eq!(camera.pixel_height(), 0.6 / 6.0, epsilon = 1e-15);
        assert_relative_eq!(camera.r2(), 900.0);

        let expected = evaluate(0.9, 0.81, 30.0, 900.0, 1.4).unwrap();
        assert_eq!(*camera.metric(), expected);
        assert_eq!(camera.speed(), 0.0);
        assert_eq!(camera.trace_state(), TraceState::Stale);
    }

    #[test]
    fn test_zero_sensor_dimensions_rejected() {
        let mut bad = spec();
        bad.sensor_shape = (0, 8);
        assert!(matches!(Camera::new(kerr(), bad, ConstantEngine::new(0)), Err(KerrError::Configuration(_))));

        let mut bad = spec();
        bad.sensor_size = (0.6, -1.0);
        assert!(matches!(Camera::new(kerr(), bad, ConstantEngine::new(0)), Err(KerrError::Configuration(_))));

        let mut bad = spec();
        bad.focal_length = 0.0;
        assert!(matches!(Camera::new(kerr(), bad, ConstantEngine::new(0)), Err(KerrError::Configuration(_))));
    }

    #[test]
    fn test_set_r_recomputes_metric_and_speed() {
        let mut s = spec();
        s.speed_mode = SpeedMode::Keplerian;
        let mut camera = Camera::new(kerr(), s, ConstantEngine::new(0)).unwrap();
        let before_metric = *camera.metric();
        let before_speed = camera.speed();

        camera.set_r(12.0).unwrap();

        assert_relative_eq!(camera.r2(), 144.0);
        assert_ne!(*camera.metric(), before_metric);
        assert_ne!(camera.speed(), before_speed);
        assert_eq!(*camera.metric(), evaluate(0.9, 0.81, 12.0, 144.0, 1.4).unwrap());
    }

    #[test]
    fn test_set_theta_recomputes_metric_and_speed() {
        let mut s = spec();
        s.speed_mode = SpeedMode::Keplerian;
        let mut camera = Camera::new(kerr(), s, ConstantEngine::new(0)).unwrap();
        camera.shoot(-100.0).unwrap();
        let before_speed = camera.speed();

        camera.set_theta(0.7).unwrap();

        assert_eq!(camera.theta(), 0.7);
        assert_eq!(*camera.metric(), evaluate(0.9, 0.81, 30.0, 900.0, 0.7).unwrap());
        assert_ne!(camera.speed(), before_speed);
        assert!(camera.needs_retrace());

        // r is untouched
        assert_relative_eq!(camera.r2(), 900.0);
    }

    #[test]
    fn test_set_theta_rejects_non_finite() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();
        let before = camera.frame();

        assert!(matches!(camera.set_theta(f64::NAN), Err(KerrError::InvalidGeometry { .. })));
        assert_eq!(camera.frame(), before);
    }

    #[test]
    fn test_failed_setter_leaves_camera_untouched() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();
        let before = camera.frame();

        assert!(matches!(camera.set_r(-3.0), Err(KerrError::InvalidGeometry { .. })));
        assert!(camera.set_sensor_shape((4, 0)).is_err());

        assert_eq!(camera.frame(), before);
    }

    #[test]
    fn test_sensor_shape_keeps_metric() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();
        let metric = *camera.metric();

        camera.set_sensor_shape((12, 32)).unwrap();

        assert_relative_eq!(camera.pixel_width(), 1.6 / 32.0, epsilon = 1e-15);
        assert_relative_eq!(camera.pixel_height(), 0.6 / 12.0, epsilon = 1e-15);
        assert_eq!(*camera.metric(), metric);
    }

    #[test]
    fn test_sensor_size_keeps_metric_and_speed() {
        let mut s = spec();
        s.speed_mode = SpeedMode::Keplerian;
        let mut camera = Camera::new(kerr(), s, ConstantEngine::new(0)).unwrap();
        camera.shoot(-100.0).unwrap();
        let metric = *camera.metric();
        let speed = camera.speed();

        camera.set_sensor_size((1.2, 4.0)).unwrap();

        assert_relative_eq!(camera.pixel_width(), 4.0 / 8.0, epsilon = 1e-15);
        assert_relative_eq!(camera.pixel_height(), 1.2 / 6.0, epsilon = 1e-15);
        assert_eq!(camera.sensor_size(), (1.2, 4.0));
        assert_eq!(*camera.metric(), metric);
        assert_eq!(camera.speed(), speed);
        assert!(camera.needs_retrace());

        assert!(matches!(camera.set_sensor_size((0.0, 4.0)), Err(KerrError::Configuration(_))));
        assert_eq!(camera.sensor_size(), (1.2, 4.0));
    }

    #[test]
    fn test_phi_keeps_metric_but_goes_stale() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();
        camera.shoot(-100.0).unwrap();
        assert_eq!(camera.trace_state(), TraceState::Fresh);

        let metric = *camera.metric();
        camera.set_phi(2.0);

        assert_eq!(*camera.metric(), metric);
        assert!(camera.needs_retrace());
    }

    #[test]
    fn test_speed_mode_switch() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();
        assert_eq!(camera.speed(), 0.0);

        camera.set_speed_mode(SpeedMode::Keplerian).unwrap();
        let m = camera.metric();
        let omega_k = 1.0 / (0.9 + 30.0_f64.powf(1.5));
        let expected = m.pomega * (omega_k - m.omega) / m.alpha;
        assert_relative_eq!(camera.speed(), expected, epsilon = 1e-12);

        camera.set_speed_mode(SpeedMode::Static).unwrap();
        assert_eq!(camera.speed(), 0.0);
    }

    #[test]
    fn test_shoot_rebuilds_only_when_stale() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(1)).unwrap();

        camera.shoot(-100.0).unwrap();
        camera.shoot(-100.0).unwrap();
        assert_eq!(camera.engine().rebuilds, 1);

        camera.set_yaw(0.1);
        let snapshot = camera.shoot(-100.0).unwrap();
        assert_eq!(camera.engine().rebuilds, 2);
        assert_eq!(snapshot.rows(), 6);
        assert_eq!(snapshot.cols(), 8);
        assert_eq!(snapshot.status_counts().disk, 48);
    }

    #[test]
    fn test_replaced_engine_is_rebuilt_before_tracing() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(1)).unwrap();
        camera.shoot(-100.0).unwrap();
        assert_eq!(camera.trace_state(), TraceState::Fresh);

        let old = camera.replace_engine(ConstantEngine::new(2));
        assert_eq!(old.rebuilds, 1);
        assert!(camera.needs_retrace());

        let snapshot = camera.shoot(-100.0).unwrap();
        assert_eq!(camera.engine().rebuilds, 1);
        assert_eq!(snapshot.status_counts().horizon, 48);
    }

    #[test]
    fn test_cameras_interleaved_keep_their_own_engines() {
        let mut near = Camera::new(kerr(), CameraSpec { r: 12.0, ..spec() }, ConstantEngine::new(1)).unwrap();
        let mut far = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();

        for _ in 0..3 {
            assert_eq!(near.shoot(-100.0).unwrap().status_counts().disk, 48);
            assert_eq!(far.shoot(-100.0).unwrap().status_counts().sphere, 48);
        }

        assert_eq!(near.engine().rebuilds, 1);
        assert_eq!(far.engine().rebuilds, 1);
        assert_eq!(near.engine().built_for.map(|f| f.r), Some(12.0));
        assert_eq!(far.into_engine().built_for.map(|f| f.r), Some(30.0));
    }

    #[test]
    fn test_failed_rebuild_stays_stale() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(0)).unwrap();
        camera.engine.fail_rebuild = true;

        assert!(matches!(camera.shoot(-100.0), Err(KerrError::Engine(_))));
        assert_eq!(camera.trace_state(), TraceState::Stale);

        camera.engine.fail_rebuild = false;
        assert!(camera.shoot(-100.0).is_ok());
    }

    #[test]
    fn test_sliced_shoot_builds_congruence() {
        let mut camera = Camera::new(kerr(), spec(), ConstantEngine::new(2)).unwrap();

        let congruence = camera.sliced_shoot(-100.0, 4).unwrap();
        assert_eq!(congruence.slices(), 4);
        assert_eq!(congruence.num_pixels(), 48);

        assert!(matches!(camera.sliced_shoot(-100.0, 0), Err(KerrError::Configuration(_))));
    }

    #[test]
    fn test_spec_from_partial_json() {
        let spec: CameraSpec =
            serde_json::from_str(r#"{"r": 12.5, "sensor_shape": [60, 80], "speed_mode": "keplerian"}"#).unwrap();

        assert_eq!(spec.r, 12.5);
        assert_eq!(spec.sensor_shape, (60, 80));
        assert_eq!(spec.speed_mode, SpeedMode::Keplerian);
        assert_eq!(spec.focal_length, CameraSpec::default().focal_length);

        let camera = Camera::new(BlackHole::schwarzschild(), spec, ConstantEngine::new(0)).unwrap();
        assert!(camera.speed() > 0.0);
    }

    proptest! {
        #[test]
        fn prop_pixel_size_tiles_sensor(
            rows in 1usize..2000,
            cols in 1usize..2000,
            height in 1e-3f64..10.0,
            width in 1e-3f64..10.0,
        ) {
            let mut s = spec();
            s.sensor_shape = (rows, cols);
            s.sensor_size = (height, width);
            let camera = Camera::new(BlackHole::schwarzschild(), s, ConstantEngine::new(0)).unwrap();

            prop_assert!((camera.pixel_width() * cols as f64 - width).abs() < 1e-9 * width.max(1.0));
            prop_assert!((camera.pixel_height() * rows as f64 - height).abs() < 1e-9 * height.max(1.0));
        }
    }
}
