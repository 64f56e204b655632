//! Common types exchanged with tracing engines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Unique identifier for a camera.
///
/// Random (v4) for live cameras; name-based (v5) for replayable ones, so a
/// given seed always names the same camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraId(pub Uuid);

/// Namespace for seeded camera ids.
const CAMERA_NAMESPACE: Uuid = Uuid::from_u128(0x6b65_7272_2d63_616d_6572_6100_0000_0001);

impl CameraId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id for `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self(Uuid::new_v5(&CAMERA_NAMESPACE, &seed.to_be_bytes()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CameraId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // cam-<first 32 bits>
        write!(f, "cam-{:08x}", self.0.as_fields().0)
    }
}

/// Terminal state of a ray at one traced step.
///
/// The discriminants are the raw codes engines write into `RayBatch::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RayStatus {
    /// Still travelling, or escaped to the celestial sphere
    Sphere = 0,
    /// Hit the accretion disk
    Disk = 1,
    /// Crossed the event horizon
    Horizon = 2,
}

impl RayStatus {
    /// All statuses, ordered by raw code.
    pub const ALL: [RayStatus; 3] = [RayStatus::Sphere, RayStatus::Disk, RayStatus::Horizon];

    /// Returns the raw code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this status ends a ray's history.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RayStatus::Sphere)
    }

    /// Returns the status name.
    pub fn name(&self) -> &'static str {
        match self {
            RayStatus::Sphere => "sphere",
            RayStatus::Disk => "disk",
            RayStatus::Horizon => "horizon",
        }
    }
}

impl TryFrom<u8> for RayStatus {
    type Error = EngineError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RayStatus::Sphere),
            1 => Ok(RayStatus::Disk),
            2 => Ok(RayStatus::Horizon),
            other => Err(EngineError::UnknownStatusCode(other)),
        }
    }
}

/// Axes of a ray batch.
///
/// `slices` is `None` for a single-instant trace and `Some(n)` for an
/// animated trace with a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchShape {
    pub rows: usize,
    pub cols: usize,
    pub coord_dim: usize,
    pub slices: Option<usize>,
}

impl BatchShape {
    /// Shape of a single-instant batch.
    pub fn snapshot(rows: usize, cols: usize, coord_dim: usize) -> Self {
        Self { rows, cols, coord_dim, slices: None }
    }

    /// Shape of a batch with a time axis.
    pub fn sliced(rows: usize, cols: usize, coord_dim: usize, slices: usize) -> Self {
        Self { rows, cols, coord_dim, slices: Some(slices) }
    }

    /// Number of time slices (1 for single-instant batches).
    pub fn depth(&self) -> usize {
        self.slices.unwrap_or(1)
    }

    /// Expected length of the status array.
    pub fn status_len(&self) -> usize {
        self.rows * self.cols * self.depth()
    }

    /// Expected length of the coordinate array.
    pub fn coordinates_len(&self) -> usize {
        self.rows * self.cols * self.coord_dim * self.depth()
    }
}

/// Raw output of one trace.
///
/// Layout is row-major: status over `(rows, cols[, slices])`,
/// coordinates over `(rows, cols, coord_dim[, slices])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayBatch {
    pub shape: BatchShape,
    pub status: Vec<u8>,
    pub coordinates: Vec<f64>,
}

impl RayBatch {
    /// Creates a batch and checks the shape contract.
    pub fn new(shape: BatchShape, status: Vec<u8>, coordinates: Vec<f64>) -> Result<Self, EngineError> {
        let batch = Self { shape, status, coordinates };
        batch.validate()?;
        Ok(batch)
    }

    /// Checks array lengths against the declared shape.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.status.len() != self.shape.status_len() {
            return Err(EngineError::shape(format!(
                "status has {} entries, shape {:?} needs {}",
                self.status.len(),
                self.shape,
                self.shape.status_len()
            )));
        }
        if self.coordinates.len() != self.shape.coordinates_len() {
            return Err(EngineError::shape(format!(
                "coordinates have {} entries, shape {:?} needs {}",
                self.coordinates.len(),
                self.shape,
                self.shape.coordinates_len()
            )));
        }
        Ok(())
    }

    /// Decodes the raw status codes.
    pub fn decode_status(&self) -> Result<Vec<RayStatus>, EngineError> {
        self.status.iter().map(|&code| RayStatus::try_from(code)).collect()
    }
}

/// What the caller asks an engine to trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceRequest {
    /// Affine end time of the backward integration (negative)
    pub final_time: f64,

    /// Number of time slices to record, `None` for a single instant
    pub slices: Option<usize>,
}

impl TraceRequest {
    /// Single-instant trace.
    pub fn snapshot(final_time: f64) -> Self {
        Self { final_time, slices: None }
    }

    /// Trace recording `slices` instants.
    pub fn sliced(final_time: f64, slices: usize) -> Self {
        Self { final_time, slices: Some(slices) }
    }
}

/// Pre-rendered colour buffer, `rows × cols × 3` floats in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TexelBuffer {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl TexelBuffer {
    /// Creates a texel buffer, checking its length.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, EngineError> {
        if data.len() != rows * cols * 3 {
            return Err(EngineError::shape(format!(
                "texel buffer has {} values, {}x{}x3 needs {}",
                data.len(),
                rows,
                cols,
                rows * cols * 3
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// RGB triple at `(row, col)`.
    pub fn texel(&self, row: usize, col: usize) -> Option<[f32; 3]> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let i = (row * self.cols + col) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }
}
