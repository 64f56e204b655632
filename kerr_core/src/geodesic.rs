//! The Geodesic Classifier
//!
//! Turns one ray's raw history into a terminal classification and a
//! trajectory that stops right before the first collision.

use image::Rgb;
use kerr_env::RayStatus;
use nalgebra::DMatrix;

use crate::error::{KerrError, Result};

/// Display colour of a single geodesic.
pub fn geodesic_colour(status: RayStatus) -> Rgb<u8> {
    match status {
        // royal blue
        RayStatus::Sphere => Rgb([65, 105, 225]),
        // dark orange
        RayStatus::Disk => Rgb([255, 140, 0]),
        // maroon
        RayStatus::Horizon => Rgb([128, 0, 0]),
    }
}

/// A classified null geodesic.
///
/// `coordinates` is step-major: one row per traced step, one column per
/// coordinate component.
#[derive(Debug, Clone, PartialEq)]
pub struct Geodesic {
    status: RayStatus,
    coordinates: DMatrix<f64>,
    terminal_index: Option<usize>,
    colour: Rgb<u8>,
}

impl Geodesic {
    /// Classify a ray and truncate it at its first collision.
    ///
    /// Both DISK and HORIZON end a ray; whichever occurs at the earliest
    /// step wins, and only the steps strictly before it are kept. A ray
    /// with no collision keeps its full history and is classified SPHERE.
    ///
    /// # Errors
    /// `ShapeMismatch` if `status.len() != coordinates.nrows()`.
    pub fn classify(status: &[RayStatus], coordinates: DMatrix<f64>) -> Result<Self> {
        if status.len() != coordinates.nrows() {
            return Err(KerrError::shape(format!(
                "{} status codes for {} coordinate steps",
                status.len(),
                coordinates.nrows()
            )));
        }

        // One code per step, so the first terminal code is the earliest of
        // the first DISK and the first HORIZON.
        let terminal_index = status.iter().position(|s| s.is_terminal());

        let (kind, coordinates) = match terminal_index {
            None => (RayStatus::Sphere, coordinates),
            Some(index) => (status[index], coordinates.rows(0, index).into_owned()),
        };

        Ok(Self {
            status: kind,
            coordinates,
            terminal_index,
            colour: geodesic_colour(kind),
        })
    }

    /// Terminal classification.
    pub fn status(&self) -> RayStatus {
        self.status
    }

    pub fn coordinates(&self) -> &DMatrix<f64> {
        &self.coordinates
    }

    /// Step at which the ray collided, if it did.
    pub fn terminal_index(&self) -> Option<usize> {
        self.terminal_index
    }

    pub fn colour(&self) -> Rgb<u8> {
        self.colour
    }

    /// Number of kept steps.
    pub fn len(&self) -> usize {
        self.coordinates.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Last kept coordinate vector.
    pub fn final_coordinate(&self) -> Option<Vec<f64>> {
        let last = self.len().checked_sub(1)?;
        Some(self.coordinates.row(last).iter().copied().collect())
    }
}
