//! Preset camera placements.

use std::f64::consts::FRAC_PI_2;

use kerr_core::{CameraSpec, SpeedMode};

use crate::error::SimError;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// KRR-001: camera just above the disk plane
    EdgeOn,

    /// KRR-002: camera 21° above the disk plane
    Inclined,

    /// KRR-003: camera looking down the spin axis
    FaceOn,

    /// KRR-004: camera on a close Keplerian orbit
    CloseOrbit,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::EdgeOn,
            ScenarioId::Inclined,
            ScenarioId::FaceOn,
            ScenarioId::CloseOrbit,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::EdgeOn => "edge_on",
            ScenarioId::Inclined => "inclined",
            ScenarioId::FaceOn => "face_on",
            ScenarioId::CloseOrbit => "close_orbit",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::EdgeOn => "Static camera at r=40 grazing the disk plane",
            ScenarioId::Inclined => "Static camera at r=30, theta=1.2",
            ScenarioId::FaceOn => "Static camera at r=40 near the pole",
            ScenarioId::CloseOrbit => "Keplerian camera at r=10 just above the disk",
        }
    }

    /// Camera placement for this scenario.
    pub fn spec(&self) -> CameraSpec {
        match self {
            ScenarioId::EdgeOn => CameraSpec::default(),
            ScenarioId::Inclined => CameraSpec {
                focal_length: 1.5,
                ..CameraSpec::at(30.0, 1.2, 0.0)
            },
            ScenarioId::FaceOn => CameraSpec {
                focal_length: 1.5,
                ..CameraSpec::at(40.0, 0.05, 0.0)
            },
            ScenarioId::CloseOrbit => CameraSpec {
                focal_length: 0.8,
                speed_mode: SpeedMode::Keplerian,
                ..CameraSpec::at(10.0, FRAC_PI_2 - 0.1, 0.0)
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "edge_on" | "edgeon" | "krr-001" => Ok(ScenarioId::EdgeOn),
            "inclined" | "krr-002" => Ok(ScenarioId::Inclined),
            "face_on" | "faceon" | "krr-003" => Ok(ScenarioId::FaceOn),
            "close_orbit" | "closeorbit" | "krr-004" => Ok(ScenarioId::CloseOrbit),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}
