//! Flat-space reference tracer.
//!
//! Marches straight rays backwards from the camera through a scene made of
//! an event horizon, a thin equatorial disk and a celestial sphere. There
//! is no curvature: the tracer exists to drive the core end to end with
//! plausible, deterministic batches.
//!
//! Coordinates are recorded as spherical `(r, θ, φ)`.

use std::time::Instant;

use kerr_env::{
    BatchShape, CameraFrame, EngineError, RayBatch, RayStatus, TexelBuffer, TraceRequest, TracingEngine,
};
use nalgebra::{Matrix3, Rotation3, Vector3};
use tracing::debug;

/// Number of coordinate components recorded per step.
pub const COORD_DIM: usize = 3;

/// Scene and integration parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Integration steps between the camera and `final_time`
    pub steps: usize,

    /// Disk inner radius
    pub disk_inner: f64,

    /// Disk outer radius
    pub disk_outer: f64,

    /// Rays beyond this radius have escaped
    pub sphere_radius: f64,

    /// Produce a procedural texel buffer on snapshot traces
    pub texture: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            steps: 400,
            disk_inner: 6.0,
            disk_outer: 20.0,
            sphere_radius: 60.0,
            texture: false,
        }
    }
}

/// Per-camera state compiled by `rebuild`.
#[derive(Debug)]
struct Compiled {
    frame: CameraFrame,
    origin: Vector3<f64>,
    directions: Vec<Vector3<f64>>,
    horizon_radius: f64,
}

/// One ray's state while marching.
#[derive(Debug, Clone, Copy)]
struct RayState {
    position: Vector3<f64>,
    status: RayStatus,
    escaped: bool,
}

/// Straight-ray tracer implementing `TracingEngine`.
#[derive(Debug, Default)]
pub struct FlatSpaceTracer {
    config: SimConfig,
    compiled: Option<Compiled>,
    texels: Option<TexelBuffer>,
    last_trace_secs: f64,
    rebuilds: usize,
}

impl FlatSpaceTracer {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of times `rebuild` has run.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Advance one ray by one segment of length `ds`.
    fn step(&self, ray: &mut RayState, direction: &Vector3<f64>, ds: f64, horizon_radius: f64) {
        if ray.status.is_terminal() || ray.escaped {
            return;
        }

        let start = ray.position;
        let end = start + direction * ds;

        let horizon_hit = segment_sphere_entry(&start, &end, horizon_radius);
        let disk_hit = segment_disk_crossing(&start, &end, self.config.disk_inner, self.config.disk_outer);

        let hit = match (horizon_hit, disk_hit) {
            (Some(h), Some(d)) if d < h => Some((d, RayStatus::Disk)),
            (Some(h), _) => Some((h, RayStatus::Horizon)),
            (None, Some(d)) => Some((d, RayStatus::Disk)),
            (None, None) => None,
        };

        match hit {
            Some((s, status)) => {
                ray.position = start + (end - start) * s;
                ray.status = status;
            }
            None => {
                ray.position = end;
                ray.escaped = end.norm() >= self.config.sphere_radius;
            }
        }
    }

    /// Step index at which slice `t` of `slices` is recorded.
    fn slice_step(&self, t: usize, slices: usize) -> usize {
        ((t + 1) * self.config.steps) / slices
    }

    fn procedural_texel(&self, ray: &RayState) -> [f32; 3] {
        let (r, theta, phi) = to_spherical(&ray.position);
        match ray.status {
            RayStatus::Horizon => [0.0, 0.0, 0.0],
            RayStatus::Disk => {
                // Alternating radial bands
                let band = ((r - self.config.disk_inner) / 2.0).floor() as i64;
                if band % 2 == 0 {
                    [1.0, 0.55, 0.0]
                } else {
                    [0.6, 0.2, 0.0]
                }
            }
            RayStatus::Sphere => {
                // 10° checkerboard on the celestial sphere
                let cell = 10f64.to_radians();
                let i = (theta / cell).floor() as i64 + (phi / cell).floor() as i64;
                if i.rem_euclid(2) == 0 {
                    [0.9, 0.9, 1.0]
                } else {
                    [0.25, 0.41, 0.88]
                }
            }
        }
    }
}

impl TracingEngine for FlatSpaceTracer {
    fn rebuild(&mut self, frame: &CameraFrame) -> Result<(), EngineError> {
        let (rows, cols) = frame.sensor_shape;
        let basis = camera_basis(frame.theta, frame.phi);
        let orientation = Rotation3::from_axis_angle(&Vector3::y_axis(), frame.yaw)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), frame.pitch)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), frame.roll);

        let mut directions = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = frame.pixel_centre(row, col);
                let local = Vector3::new(x, y, frame.focal_length).normalize();
                directions.push(basis * (orientation * local));
            }
        }

        self.compiled = Some(Compiled {
            frame: *frame,
            origin: spherical_to_cartesian(frame.r, frame.theta, frame.phi),
            directions,
            horizon_radius: 1.0 + (1.0 - frame.spin_squared).max(0.0).sqrt(),
        });
        self.rebuilds += 1;

        debug!("tracer compiled {} directions for camera {}", rows * cols, frame.id);
        Ok(())
    }

    fn trace(&mut self, frame: &CameraFrame, request: &TraceRequest) -> Result<RayBatch, EngineError> {
        let started = Instant::now();

        let compiled = match &self.compiled {
            Some(c) if c.frame == *frame => c,
            _ => return Err(EngineError::NotBuilt(frame.id.to_string())),
        };
        if self.config.steps == 0 {
            return Err(EngineError::trace("integration needs at least one step"));
        }
        if request.slices == Some(0) {
            return Err(EngineError::trace("a sliced trace needs at least one slice"));
        }

        let (rows, cols) = frame.sensor_shape;
        let shape = BatchShape {
            rows,
            cols,
            coord_dim: COORD_DIM,
            slices: request.slices,
        };
        let depth = shape.depth();
        let ds = request.final_time.abs() / self.config.steps as f64;

        let mut status = Vec::with_capacity(shape.status_len());
        let mut coordinates = vec![0.0; shape.coordinates_len()];
        let mut finals = Vec::with_capacity(rows * cols);

        for (pixel, direction) in compiled.directions.iter().enumerate() {
            let mut ray = RayState {
                position: compiled.origin,
                status: RayStatus::Sphere,
                escaped: false,
            };

            let mut taken = 0;
            for t in 0..depth {
                let target = match request.slices {
                    Some(slices) => self.slice_step(t, slices),
                    None => self.config.steps,
                };
                while taken < target {
                    self.step(&mut ray, direction, ds, compiled.horizon_radius);
                    taken += 1;
                }

                status.push(ray.status.code());
                let (r, theta, phi) = to_spherical(&ray.position);
                for (d, value) in [r, theta, phi].into_iter().enumerate() {
                    coordinates[(pixel * COORD_DIM + d) * depth + t] = value;
                }
            }
            finals.push(ray);
        }

        self.texels = match (self.config.texture, request.slices) {
            (true, None) => {
                let data = finals.iter().flat_map(|ray| self.procedural_texel(ray)).collect();
                Some(TexelBuffer::new(rows, cols, data)?)
            }
            _ => None,
        };

        self.last_trace_secs = started.elapsed().as_secs_f64();
        RayBatch::new(shape, status, coordinates)
    }

    fn texels(&self) -> Option<TexelBuffer> {
        self.texels.clone()
    }

    fn last_trace_secs(&self) -> f64 {
        self.last_trace_secs
    }
}

/// Columns are (right, up, forward) for a camera at `(θ, φ)` looking at
/// the origin, with up along -e_θ.
fn camera_basis(theta: f64, phi: f64) -> Matrix3<f64> {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();

    let e_r = Vector3::new(sin_t * cos_p, sin_t * sin_p, cos_t);
    let e_theta = Vector3::new(cos_t * cos_p, cos_t * sin_p, -sin_t);
    let e_phi = Vector3::new(-sin_p, cos_p, 0.0);

    Matrix3::from_columns(&[e_phi, -e_theta, -e_r])
}

fn spherical_to_cartesian(r: f64, theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    Vector3::new(r * sin_t * cos_p, r * sin_t * sin_p, r * cos_t)
}

fn to_spherical(p: &Vector3<f64>) -> (f64, f64, f64) {
    let r = p.norm();
    if r == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    (r, (p.z / r).clamp(-1.0, 1.0).acos(), p.y.atan2(p.x))
}

/// Fraction of segment `a -> b` at which it first enters the ball of
/// `radius` around the origin.
fn segment_sphere_entry(a: &Vector3<f64>, b: &Vector3<f64>, radius: f64) -> Option<f64> {
    if a.norm() <= radius {
        return Some(0.0);
    }

    let d = b - a;
    let qa = d.dot(&d);
    if qa == 0.0 {
        return None;
    }
    let qb = 2.0 * a.dot(&d);
    let qc = a.dot(a) - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }

    let s = (-qb - disc.sqrt()) / (2.0 * qa);
    (0.0..=1.0).contains(&s).then_some(s)
}

/// Fraction of segment `a -> b` at which it crosses the equatorial plane
/// inside the disk annulus.
fn segment_disk_crossing(a: &Vector3<f64>, b: &Vector3<f64>, inner: f64, outer: f64) -> Option<f64> {
    let crosses = (a.z > 0.0 && b.z <= 0.0) || (a.z < 0.0 && b.z >= 0.0);
    if !crosses {
        return None;
    }

    let s = a.z / (a.z - b.z);
    let q = a + (b - a) * s;
    let radius = (q.x * q.x + q.y * q.y).sqrt();
    (inner..=outer).contains(&radius).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kerr_core::{BlackHole, Camera, CameraSpec, Congruence};
    use proptest::prelude::*;

    /// Inclined camera with an odd sensor so the central pixel sits on the
    /// optical axis.
    fn inclined() -> CameraSpec {
        CameraSpec {
            r: 30.0,
            theta: 1.2,
            phi: 0.0,
            focal_length: 1.0,
            sensor_shape: (41, 41),
            sensor_size: (2.0, 2.0),
            ..Default::default()
        }
    }

    fn camera_with(config: SimConfig) -> Camera<FlatSpaceTracer> {
        Camera::new(BlackHole::schwarzschild(), inclined(), FlatSpaceTracer::new(config)).unwrap()
    }

    fn camera() -> Camera<FlatSpaceTracer> {
        camera_with(SimConfig::default())
    }

    #[test]
    fn test_trace_requires_rebuild() {
        let camera = camera();
        let mut tracer = FlatSpaceTracer::new(SimConfig::default());

        let result = tracer.trace(&camera.frame(), &TraceRequest::snapshot(-150.0));
        assert!(matches!(result, Err(EngineError::NotBuilt(_))));
    }

    #[test]
    fn test_known_pixels_classify() {
        let mut camera = camera();
        let snapshot = camera.shoot(-150.0).unwrap();

        // optical axis passes through the origin
        assert_eq!(snapshot.status_at(20, 20).unwrap(), RayStatus::Horizon);
        // tilted 44° up, escapes
        assert_eq!(snapshot.status_at(0, 20).unwrap(), RayStatus::Sphere);
        // tilted 26° down, lands at r ≈ 18
        assert_eq!(snapshot.status_at(30, 20).unwrap(), RayStatus::Disk);

        let axis = snapshot.coordinate(20, 20).unwrap();
        assert_relative_eq!(axis[0], 2.0, epsilon = 1e-9);

        let counts = snapshot.status_counts();
        assert_eq!(counts.total(), 41 * 41);
        assert!(counts.sphere > 0 && counts.disk > 0 && counts.horizon > 0);
    }

    #[test]
    fn test_sliced_statuses_are_sticky() {
        let mut camera = camera();
        let congruence: Congruence = camera.sliced_shoot(-150.0, 20).unwrap();

        for row in 0..congruence.rows() {
            for col in 0..congruence.cols() {
                let mut seen_terminal = None;
                for t in 0..congruence.slices() {
                    let s = congruence.status_at(row, col, t).unwrap();
                    if let Some(first) = seen_terminal {
                        assert_eq!(s, first);
                    } else if s.is_terminal() {
                        seen_terminal = Some(s);
                    }
                }
            }
        }

        // the last slice agrees with a single-instant trace
        let last = congruence.snapshot(19).unwrap();
        let single = camera.shoot(-150.0).unwrap();
        assert_eq!(last.status(), single.status());
    }

    #[test]
    fn test_geodesic_from_tracer_stops_before_collision() {
        let mut camera = camera();
        let congruence = camera.sliced_shoot(-150.0, 40).unwrap();

        let g = congruence.geodesic(20, 20).unwrap();
        assert_eq!(g.status(), RayStatus::Horizon);
        let index = g.terminal_index().unwrap();
        assert_eq!(g.len(), index);
        // every kept step is outside the horizon
        assert!(g.coordinates().column(0).iter().all(|&r| r > 2.0));
    }

    #[test]
    fn test_orientation_change_forces_rebuild() {
        let mut camera = camera();

        let before = camera.shoot(-150.0).unwrap();
        camera.set_pitch(0.5);
        let after = camera.shoot(-150.0).unwrap();

        assert_eq!(camera.engine().rebuilds(), 2);
        assert_ne!(before.status(), after.status());
    }

    #[test]
    fn test_swapped_tracer_is_rebuilt() {
        let mut camera = camera();
        let first = camera.shoot(-150.0).unwrap();

        let old = camera.replace_engine(FlatSpaceTracer::new(SimConfig::default()));
        assert_eq!(old.rebuilds(), 1);

        let second = camera.shoot(-150.0).unwrap();
        assert_eq!(camera.engine().rebuilds(), 1);
        assert_eq!(first.status(), second.status());
    }

    #[test]
    fn test_tracer_handed_between_cameras_is_rebuilt() {
        let mut far = camera();
        let far_snapshot = far.shoot(-150.0).unwrap();

        // same tracer, different camera
        let tracer = far.into_engine();
        let spec = CameraSpec { r: 15.0, ..inclined() };
        let mut near = Camera::new(BlackHole::schwarzschild(), spec, tracer).unwrap();
        let near_snapshot = near.shoot(-150.0).unwrap();

        assert_eq!(near.engine().rebuilds(), 2);
        let axis = near_snapshot.coordinate(20, 20).unwrap();
        assert_relative_eq!(axis[0], 2.0, epsilon = 1e-9);
        assert!(near_snapshot.status_counts().horizon > far_snapshot.status_counts().horizon);
    }

    #[test]
    fn test_texture_only_on_snapshots() {
        let mut camera = camera_with(SimConfig {
            texture: true,
            ..Default::default()
        });

        let snapshot = camera.shoot(-150.0).unwrap();
        let texels = snapshot.texels().unwrap();
        assert_eq!(texels.texel(20, 20), Some([0.0, 0.0, 0.0]));

        camera.sliced_shoot(-150.0, 5).unwrap();
        assert!(camera.engine().texels().is_none());
    }

    #[test]
    fn test_segment_helpers() {
        let a = Vector3::new(10.0, 0.0, 1.0);
        let b = Vector3::new(10.0, 0.0, -1.0);
        assert_relative_eq!(segment_disk_crossing(&a, &b, 6.0, 20.0).unwrap(), 0.5);
        assert!(segment_disk_crossing(&a, &b, 12.0, 20.0).is_none());

        let a = Vector3::new(-5.0, 0.0, 0.0);
        let b = Vector3::new(5.0, 0.0, 0.0);
        assert_relative_eq!(segment_sphere_entry(&a, &b, 2.0).unwrap(), 0.3);
        assert!(segment_sphere_entry(&a, &Vector3::new(-5.0, 4.0, 0.0), 2.0).is_none());
    }

    proptest! {
        #[test]
        fn prop_hits_land_on_the_segment(
            ax in -50.0..50.0f64, ay in -50.0..50.0f64, az in -50.0..50.0f64,
            bx in -50.0..50.0f64, by in -50.0..50.0f64, bz in -50.0..50.0f64,
        ) {
            let a = Vector3::new(ax, ay, az);
            let b = Vector3::new(bx, by, bz);

            if let Some(s) = segment_disk_crossing(&a, &b, 6.0, 20.0) {
                prop_assert!((0.0..=1.0).contains(&s));
                let q = a + (b - a) * s;
                prop_assert!(q.z.abs() < 1e-9);
            }
            if let Some(s) = segment_sphere_entry(&a, &b, 2.0) {
                prop_assert!((0.0..=1.0).contains(&s));
                prop_assert!((a + (b - a) * s).norm() <= 2.0 + 1e-3);
            }
        }
    }
}
