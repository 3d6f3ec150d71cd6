//! Tunable thresholds shared by the pipeline stages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Thresholds for conflict detection and the overall request deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Flyer readings below this confidence are treated as unreliable.
    pub low_confidence_threshold: f64,
    /// Flyer readings at or above this confidence (with evidence) are trusted
    /// over a contradicting estimate without re-verification.
    pub high_confidence_threshold: f64,
    /// Wall-clock budget for one diagnosis request.
    #[serde(with = "duration_secs")]
    pub deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.7,
            high_confidence_threshold: 0.9,
            deadline: Duration::from_secs(120),
        }
    }
}

/// Weights for the risk score heuristic.
///
/// `risk = discount_ratio × 100 + cut × count(cut) + negotiable × count(negotiable)`,
/// clamped to 0..=100. The per-item weights are a heuristic, not a calibrated
/// model; adjust them freely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub cut: f64,
    pub negotiable: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            cut: 10.0,
            negotiable: 5.0,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
