//! JSON exporter for traced scenarios.
//!
//! Writes the camera frame, the final-instant class counts and, when a
//! congruence was traced, its per-instant counts and geodesic summaries.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use kerr_core::{CameraFrame, Congruence, StatusCounts};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::runner::ScenarioOutcome;

/// One pixel's classified geodesic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeodesicSummary {
    pub row: usize,
    pub col: usize,
    pub status: String,

    /// Step of the first collision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_index: Option<usize>,

    /// Steps kept before the collision
    pub kept_steps: usize,

    /// Last kept coordinate vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_coordinate: Option<Vec<f64>>,
}

/// Time-sliced part of an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongruenceExport {
    pub slices: usize,
    pub coord_dim: usize,

    /// Class counts per instant
    pub slice_counts: Vec<StatusCounts>,

    /// Geodesics sampled every `stride` pixels in both directions
    pub stride: usize,
    pub geodesics: Vec<GeodesicSummary>,
}

impl CongruenceExport {
    /// Summarize `congruence`, keeping one geodesic per `stride x stride`
    /// block of pixels.
    pub fn new(congruence: &Congruence, stride: usize) -> Result<Self> {
        let stride = stride.max(1);
        let mut geodesics = Vec::new();

        for row in (0..congruence.rows()).step_by(stride) {
            for col in (0..congruence.cols()).step_by(stride) {
                let g = congruence.geodesic(row, col)?;
                geodesics.push(GeodesicSummary {
                    row,
                    col,
                    status: g.status().name().to_string(),
                    terminal_index: g.terminal_index(),
                    kept_steps: g.len(),
                    last_coordinate: g.final_coordinate(),
                });
            }
        }

        Ok(Self {
            slices: congruence.slices(),
            coord_dim: congruence.coord_dim(),
            slice_counts: congruence.status_counts(),
            stride,
            geodesics,
        })
    }
}

/// Complete scenario export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotExport {
    /// Scenario name
    pub scenario: String,

    pub spin: f64,

    /// Camera as handed to the tracer
    pub frame: CameraFrame,

    pub image_size: (usize, usize),
    pub downsampling_unit: usize,

    /// Final-instant class counts
    pub counts: StatusCounts,

    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub congruence: Option<CongruenceExport>,
}

impl SnapshotExport {
    /// Build an export from a finished run.
    pub fn from_outcome(outcome: &ScenarioOutcome, stride: usize) -> Result<Self> {
        let congruence = outcome
            .congruence
            .as_ref()
            .map(|c| CongruenceExport::new(c, stride))
            .transpose()?;

        Ok(Self {
            scenario: outcome.result.name.clone(),
            spin: outcome.result.spin,
            frame: outcome.frame,
            image_size: outcome.result.image_size,
            downsampling_unit: outcome.result.downsampling_unit,
            counts: outcome.result.counts,
            passed: outcome.result.passed,
            failure_reason: outcome.result.failure_reason.clone(),
            congruence,
        })
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
