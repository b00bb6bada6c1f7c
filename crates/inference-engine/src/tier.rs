//! Risk Tier Mapping

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete risk level derived from a single class probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Safe,
    Warning,
    Danger,
}

impl RiskTier {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Safe => "safe",
            RiskTier::Warning => "warning",
            RiskTier::Danger => "danger",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability cut-offs between tiers, inclusive on the lower bound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Probability at or above which a class is `danger` (default: 0.70)
    pub danger: f64,
    /// Probability at or above which a class is `warning` (default: 0.40)
    pub warning: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            danger: 0.70,
            warning: 0.40,
        }
    }
}

impl RiskThresholds {
    /// Check that `0 <= warning <= danger <= 1`
    pub fn validate(&self) -> Result<(), String> {
        let ordered = 0.0 <= self.warning && self.warning <= self.danger && self.danger <= 1.0;
        if ordered {
            Ok(())
        } else {
            Err(format!(
                "risk thresholds must satisfy 0 <= warning ({}) <= danger ({}) <= 1",
                self.warning, self.danger
            ))
        }
    }

    /// Tier for a probability in [0, 1]
    pub fn tier(&self, probability: f64) -> RiskTier {
        if probability >= self.danger {
            RiskTier::Danger
        } else if probability >= self.warning {
            RiskTier::Warning
        } else {
            RiskTier::Safe
        }
    }
}
