//! Built-in tracking-shot scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// TS-001: The demo's 20-waypoint ring, several laps
    Ring,

    /// TS-002: Four-point square with one-second segments, exact timing
    Square,

    /// TS-003: Very uneven waypoint spacing, centripetal stability
    Uneven,

    /// TS-004: Ring driven by a heavily jittered frame clock
    Jitter,

    /// TS-005: Seeded random closed path
    RandomPath,

    /// TS-006: Waypoints recorded live with the edit camera
    Recorded,

    /// TS-007: Speed ramped up and down to a standstill
    SpeedRamp,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Ring,
            ScenarioId::Square,
            ScenarioId::Uneven,
            ScenarioId::Jitter,
            ScenarioId::RandomPath,
            ScenarioId::Recorded,
            ScenarioId::SpeedRamp,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Ring => "ring",
            ScenarioId::Square => "square",
            ScenarioId::Uneven => "uneven",
            ScenarioId::Jitter => "jitter",
            ScenarioId::RandomPath => "random_path",
            ScenarioId::Recorded => "recorded",
            ScenarioId::SpeedRamp => "speed_ramp",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Ring => "20 waypoints on a radius-8 ring, three laps, boundary continuity",
            ScenarioId::Square => "4-point square, speed = side length: t=0.5 at 0.5s, curved midpoint",
            ScenarioId::Uneven => "short segment between long ones: no cusps, no flips",
            ScenarioId::Jitter => "ring under Gaussian frame-time jitter, lap time preserved",
            ScenarioId::RandomPath => "seeded random closed loop with spaced waypoints",
            ScenarioId::Recorded => "fly the edit camera and record waypoints; tracking starts at four",
            ScenarioId::SpeedRamp => "speed keys ramp up then clamp at zero; camera halts",
        }
    }

    /// Simulated seconds the scenario needs to exercise its checks.
    pub fn default_duration(&self) -> f64 {
        match self {
            ScenarioId::Ring => 62.0,
            ScenarioId::Square => 8.5,
            ScenarioId::Uneven => 30.0,
            ScenarioId::Jitter => 45.0,
            ScenarioId::RandomPath => 40.0,
            ScenarioId::Recorded => 20.0,
            ScenarioId::SpeedRamp => 10.0,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ring" | "ts-001" => Ok(ScenarioId::Ring),
            "square" | "ts-002" => Ok(ScenarioId::Square),
            "uneven" | "ts-003" => Ok(ScenarioId::Uneven),
            "jitter" | "ts-004" => Ok(ScenarioId::Jitter),
            "random_path" | "randompath" | "random" | "ts-005" => Ok(ScenarioId::RandomPath),
            "recorded" | "ts-006" => Ok(ScenarioId::Recorded),
            "speed_ramp" | "speedramp" | "ts-007" => Ok(ScenarioId::SpeedRamp),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
