//! Immutable camera values handed to tracing engines.

use serde::{Deserialize, Serialize};

use crate::types::CameraId;

/// Kerr metric quantities evaluated at one position.
///
/// Boyer-Lindquist scalars from Thorne et al. (A.1)-(A.2): `rho`, `delta`,
/// `sigma`, lapse `alpha`, frame-dragging rate `omega` and cylindrical
/// radius `pomega`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub rho: f64,
    pub delta: f64,
    pub sigma: f64,
    pub alpha: f64,
    pub omega: f64,
    pub pomega: f64,
}

impl MetricSnapshot {
    /// Whether every field is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.rho, self.delta, self.sigma, self.alpha, self.omega, self.pomega]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Snapshot of everything an engine needs to know about a camera.
///
/// Engines only ever see this value copy, so a camera can be mutated
/// freely between traces without racing an in-flight one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraFrame {
    pub id: CameraId,

    /// Black hole spin `a` and `a²`
    pub spin: f64,
    pub spin_squared: f64,

    /// Position (r, θ, φ)
    pub r: f64,
    pub theta: f64,
    pub phi: f64,

    pub focal_length: f64,

    /// (rows, cols)
    pub sensor_shape: (usize, usize),

    /// (height, width) in physical units
    pub sensor_size: (f64, f64),

    pub pixel_width: f64,
    pub pixel_height: f64,

    /// CCD orientation in radians
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,

    pub metric: MetricSnapshot,

    /// Orbital speed β
    pub speed: f64,
}

impl CameraFrame {
    /// Physical position of the centre of pixel `(row, col)` on the sensor
    /// plane, as `(x, y)` with the origin at the optical axis, x to the
    /// right and y upwards.
    pub fn pixel_centre(&self, row: usize, col: usize) -> (f64, f64) {
        let (rows, cols) = self.sensor_shape;
        let x = (col as f64 + 0.5 - cols as f64 / 2.0) * self.pixel_width;
        let y = (rows as f64 / 2.0 - row as f64 - 0.5) * self.pixel_height;
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: usize, cols: usize) -> CameraFrame {
        CameraFrame {
            id: CameraId::from_seed(1),
            spin: 0.0,
            spin_squared: 0.0,
            r: 40.0,
            theta: std::f64::consts::FRAC_PI_2,
            phi: 0.0,
            focal_length: 1.0,
            sensor_shape: (rows, cols),
            sensor_size: (rows as f64 * 0.1, cols as f64 * 0.1),
            pixel_width: 0.1,
            pixel_height: 0.1,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            metric: MetricSnapshot {
                rho: 40.0,
                delta: 1600.0,
                sigma: 1600.0,
                alpha: 1.0,
                omega: 0.0,
                pomega: 40.0,
            },
            speed: 0.0,
        }
    }

    #[test]
    fn test_pixel_centres_are_symmetric() {
        let f = frame(2, 4);
        let (x0, y0) = f.pixel_centre(0, 0);
        let (x1, y1) = f.pixel_centre(1, 3);
        assert!((x0 + x1).abs() < 1e-12);
        assert!((y0 + y1).abs() < 1e-12);
        assert!((x0 + 0.15).abs() < 1e-12);
        assert!((y0 - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_metric_finiteness() {
        let mut m = frame(1, 1).metric;
        assert!(m.is_finite());
        m.alpha = f64::NAN;
        assert!(!m.is_finite());
    }
}
