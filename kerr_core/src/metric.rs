//! The Spacetime Metric Evaluator
//!
//! Closed-form Kerr quantities at a position, following the constants
//! defined between (A.1) and (A.2) of Thorne et al. (2015), and the orbital
//! speed of a circular equatorial orbit, formula (A.7).
//!
//! All functions are pure. Instead of letting NaN leak into the camera's
//! speed and ray setup, every evaluation is checked and reported as
//! `KerrError::InvalidGeometry`.

use kerr_env::MetricSnapshot;
use serde::{Deserialize, Serialize};

use crate::error::{KerrError, Result};

/// A rotating, uncharged black hole of unit mass at the coordinate origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackHole {
    spin: f64,
    spin_squared: f64,
}

impl BlackHole {
    /// Create a black hole with dimensionless spin `a`, `|a| <= 1`.
    pub fn new(spin: f64) -> Result<Self> {
        if !spin.is_finite() || spin.abs() > 1.0 {
            return Err(KerrError::configuration(format!(
                "spin must satisfy |a| <= 1, got {}",
                spin
            )));
        }

        Ok(Self {
            spin,
            spin_squared: spin * spin,
        })
    }

    /// Non-rotating (Schwarzschild) black hole.
    pub fn schwarzschild() -> Self {
        Self {
            spin: 0.0,
            spin_squared: 0.0,
        }
    }

    pub fn spin(&self) -> f64 {
        self.spin
    }

    pub fn spin_squared(&self) -> f64 {
        self.spin_squared
    }

    /// Radius of the outer event horizon, `1 + sqrt(1 - a²)`.
    pub fn horizon_radius(&self) -> f64 {
        1.0 + (1.0 - self.spin_squared).sqrt()
    }

    /// Evaluate the metric at `(r, theta)`.
    pub fn metric_at(&self, r: f64, theta: f64) -> Result<MetricSnapshot> {
        evaluate(self.spin, self.spin_squared, r, r * r, theta)
    }
}

impl Default for BlackHole {
    fn default() -> Self {
        Self::schwarzschild()
    }
}

/// Evaluate the Kerr metric scalars at `(r, theta)`.
///
/// # Arguments
/// * `a`, `a2` - Spin and its square
/// * `r`, `r2` - Radial coordinate and its square
/// * `theta` - Polar angle
///
/// # Formulas
/// ```text
/// ρ = sqrt(r² + a² cos²θ)
/// Δ = r² + a²
/// Σ = sqrt((r² + a²)² - a² Δ sin²θ)
/// α = ρ sqrt(Δ) / Σ
/// ω = 2 a r / Σ²
/// ϖ = Σ sinθ / ρ
/// ```
pub fn evaluate(a: f64, a2: f64, r: f64, r2: f64, theta: f64) -> Result<MetricSnapshot> {
    if !(a.is_finite() && a2.is_finite() && r.is_finite() && r2.is_finite() && theta.is_finite()) {
        return Err(KerrError::geometry(r, theta, "non-finite input"));
    }
    if r <= 0.0 {
        return Err(KerrError::geometry(r, theta, "radial coordinate must be positive"));
    }

    let (sin_theta, cos_theta) = theta.sin_cos();

    let rho_squared = r2 + a2 * cos_theta * cos_theta;
    if rho_squared <= 0.0 {
        return Err(KerrError::geometry(r, theta, "rho vanishes (ring singularity)"));
    }
    let rho = rho_squared.sqrt();

    let delta = r2 + a2;

    let sigma_radicand = (r2 + a2).powi(2) - a2 * delta * sin_theta * sin_theta;
    if sigma_radicand < 0.0 {
        return Err(KerrError::geometry(
            r,
            theta,
            format!("sigma radicand is negative ({})", sigma_radicand),
        ));
    }
    let sigma = sigma_radicand.sqrt();
    if sigma == 0.0 {
        return Err(KerrError::geometry(r, theta, "sigma vanishes"));
    }

    let alpha = rho * delta.sqrt() / sigma;
    let omega = 2.0 * a * r / (sigma * sigma);

    // ϖ, the "variant pi" cylindrical radius
    let pomega = sigma * sin_theta / rho;

    let metric = MetricSnapshot {
        rho,
        delta,
        sigma,
        alpha,
        omega,
        pomega,
    };

    if !metric.is_finite() {
        return Err(KerrError::geometry(r, theta, "metric evaluated to a non-finite value"));
    }

    Ok(metric)
}

/// Speed of a camera on a circular equatorial orbit, formula (A.7):
///
/// ```text
/// β = ϖ (Ω - ω) / α,    Ω = 1 / (a + r^{3/2})
/// ```
pub fn keplerian_speed(a: f64, r: f64, theta: f64, metric: &MetricSnapshot) -> Result<f64> {
    let denominator = a + r.powf(1.5);
    if denominator == 0.0 {
        return Err(KerrError::geometry(r, theta, "Keplerian angular velocity is unbounded"));
    }

    let angular_velocity = 1.0 / denominator;
    let beta = metric.pomega * (angular_velocity - metric.omega) / metric.alpha;

    if !beta.is_finite() {
        return Err(KerrError::geometry(r, theta, "orbital speed is non-finite"));
    }

    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_schwarzschild_reduces_to_flat_scalars() {
        let m = BlackHole::schwarzschild().metric_at(10.0, FRAC_PI_2).unwrap();

        assert_relative_eq!(m.rho, 10.0, epsilon = 1e-12);
        assert_relative_eq!(m.delta, 100.0, epsilon = 1e-12);
        assert_relative_eq!(m.sigma, 100.0, epsilon = 1e-12);
        assert_relative_eq!(m.alpha, 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.omega, 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.pomega, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kerr_values_match_formulas() {
        let (a, r, theta) = (0.8_f64, 7.5_f64, 1.1_f64);
        let m = evaluate(a, a * a, r, r * r, theta).unwrap();

        let rho = (r * r + a * a * theta.cos().powi(2)).sqrt();
        let delta = r * r + a * a;
        let sigma = ((r * r + a * a).powi(2) - a * a * delta * theta.sin().powi(2)).sqrt();

        assert_relative_eq!(m.rho, rho, epsilon = 1e-12);
        assert_relative_eq!(m.delta, delta, epsilon = 1e-12);
        assert_relative_eq!(m.sigma, sigma, epsilon = 1e-12);
        assert_relative_eq!(m.alpha, rho * delta.sqrt() / sigma, epsilon = 1e-12);
        assert_relative_eq!(m.omega, 2.0 * a * r / (sigma * sigma), epsilon = 1e-12);
        assert_relative_eq!(m.pomega, sigma * theta.sin() / rho, epsilon = 1e-12);
    }

    #[test]
    fn test_pole_has_zero_cylindrical_radius() {
        let bh = BlackHole::new(0.5).unwrap();
        let m = bh.metric_at(20.0, 0.0).unwrap();
        assert_relative_eq!(m.pomega, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ring_singularity_is_invalid_geometry() {
        // r -> 0 on the equator: rho and sigma both vanish
        let result = evaluate(0.9, 0.81, 0.0, 0.0, FRAC_PI_2);
        assert!(matches!(result, Err(KerrError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_non_finite_input_is_invalid_geometry() {
        let result = evaluate(0.5, 0.25, f64::NAN, f64::NAN, 1.0);
        assert!(matches!(result, Err(KerrError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_spin_out_of_range_rejected() {
        assert!(matches!(BlackHole::new(1.2), Err(KerrError::Configuration(_))));
        assert!(matches!(BlackHole::new(f64::INFINITY), Err(KerrError::Configuration(_))));
        assert!(BlackHole::new(-1.0).is_ok());
    }

    #[test]
    fn test_horizon_radius() {
        assert_relative_eq!(BlackHole::schwarzschild().horizon_radius(), 2.0);
        assert_relative_eq!(BlackHole::new(1.0).unwrap().horizon_radius(), 1.0);
    }

    #[test]
    fn test_keplerian_speed_schwarzschild() {
        // a = 0: β = r (r^{-3/2}) = r^{-1/2}
        let bh = BlackHole::schwarzschild();
        let m = bh.metric_at(16.0, FRAC_PI_2).unwrap();
        let beta = keplerian_speed(0.0, 16.0, FRAC_PI_2, &m).unwrap();
        assert_relative_eq!(beta, 0.25, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_metric_is_real_outside_horizon(
            a in -1.0f64..=1.0,
            offset in 1e-3f64..500.0,
            theta in 0.0f64..=PI,
        ) {
            let bh = BlackHole::new(a).unwrap();
            let r = bh.horizon_radius() + offset;
            let m = bh.metric_at(r, theta).unwrap();

            prop_assert!(m.rho > 0.0);
            prop_assert!(m.delta >= r * r);
            prop_assert!(m.sigma >= 0.0);
            prop_assert!(m.is_finite());
        }
    }
}
