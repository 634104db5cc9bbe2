//! Score-to-verdict classification
//!
//! The thresholds are a configurable pair per scoring policy. High-severity
//! alerts force RED and any other alert caps the verdict at YELLOW.

use crate::error::{ReadyRsError, Result};
use crate::scoring::ScoringPolicy;
use crate::trends::Alert;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical readiness verdict, ordered by severity (GREEN < YELLOW < RED)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Green,
    Yellow,
    Red,
}

impl Verdict {
    pub fn symbol(&self) -> &'static str {
        match self {
            Verdict::Green => "🟢",
            Verdict::Yellow => "🟡",
            Verdict::Red => "🔴",
        }
    }

    /// Training recommendation attached to the verdict
    pub fn advice(&self) -> &'static str {
        match self {
            Verdict::Green => "Ready to train hard",
            Verdict::Yellow => "Train with caution, keep intensity moderate",
            Verdict::Red => "Prioritize recovery today",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Green => write!(f, "GREEN"),
            Verdict::Yellow => write!(f, "YELLOW"),
            Verdict::Red => write!(f, "RED"),
        }
    }
}

/// Score cut-offs: GREEN at or above `green`, RED below `yellow`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictThresholds {
    pub green: u8,
    pub yellow: u8,
}

impl VerdictThresholds {
    pub fn new(green: u8, yellow: u8) -> Result<Self> {
        let thresholds = VerdictThresholds { green, yellow };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Default pair for a scoring policy (75/50 simple, 80/60 statistical)
    pub fn for_policy(policy: ScoringPolicy) -> Self {
        match policy {
            ScoringPolicy::SimpleAverage => VerdictThresholds {
                green: 75,
                yellow: 50,
            },
            ScoringPolicy::StatisticalRange => VerdictThresholds {
                green: 80,
                yellow: 60,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.yellow > self.green || self.green > 100 {
            return Err(ReadyRsError::Configuration(format!(
                "verdict thresholds must satisfy yellow <= green <= 100 (got green {}, yellow {})",
                self.green, self.yellow
            )));
        }
        Ok(())
    }

    /// Classify a score together with the day's alerts
    ///
    /// RED on any high-severity alert or a score below `yellow`; otherwise
    /// YELLOW on a score below `green` or any alert; otherwise GREEN.
    pub fn classify(&self, score: u8, alerts: &[Alert]) -> Verdict {
        if alerts.iter().any(Alert::is_high) || score < self.yellow {
            Verdict::Red
        } else if score < self.green || !alerts.is_empty() {
            Verdict::Yellow
        } else {
            Verdict::Green
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::{AlertKind, Severity};

    fn alert(severity: Severity) -> Alert {
        Alert {
            kind: AlertKind::HrvDepression,
            severity,
            message: "test".to_string(),
        }
    }

    #[test]
    fn test_score_bands() {
        let t = VerdictThresholds::for_policy(ScoringPolicy::SimpleAverage);
        assert_eq!(t.classify(75, &[]), Verdict::Green);
        assert_eq!(t.classify(74, &[]), Verdict::Yellow);
        assert_eq!(t.classify(50, &[]), Verdict::Yellow);
        assert_eq!(t.classify(49, &[]), Verdict::Red);
    }

    #[test]
    fn test_statistical_defaults() {
        let t = VerdictThresholds::for_policy(ScoringPolicy::StatisticalRange);
        assert_eq!(t.classify(80, &[]), Verdict::Green);
        assert_eq!(t.classify(79, &[]), Verdict::Yellow);
        assert_eq!(t.classify(59, &[]), Verdict::Red);
    }

    #[test]
    fn test_high_alert_forces_red() {
        let t = VerdictThresholds::for_policy(ScoringPolicy::StatisticalRange);
        assert_eq!(t.classify(95, &[alert(Severity::High)]), Verdict::Red);
    }

    #[test]
    fn test_medium_alert_caps_at_yellow() {
        let t = VerdictThresholds::for_policy(ScoringPolicy::StatisticalRange);
        assert_eq!(t.classify(95, &[alert(Severity::Medium)]), Verdict::Yellow);
        assert_eq!(t.classify(10, &[alert(Severity::Medium)]), Verdict::Red);
    }

    #[test]
    fn test_verdicts_are_ordered() {
        assert!(Verdict::Green < Verdict::Yellow);
        assert!(Verdict::Yellow < Verdict::Red);
        assert_eq!(serde_json::to_string(&Verdict::Red).unwrap(), "\"RED\"");
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(VerdictThresholds::new(50, 75).is_err());
        assert!(VerdictThresholds::new(120, 60).is_err());
        assert!(VerdictThresholds::new(70, 70).is_ok());
    }
}
