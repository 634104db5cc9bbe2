//! Short-window trend and anomaly detection
//!
//! These checks run alongside the score and can override the verdict: a
//! high-severity alert forces RED, any alert at least YELLOW.
//!
//! - **Resting HR spike**: resting HR today minus resting HR two calendar days
//!   earlier is at least 3 bpm (high severity)
//! - **Sustained HRV depression**: of the last 4 recorded days, at least 3
//!   sit below 90 % of the mean of their own previous 7 recorded days
//!   (medium severity)
//!
//! The daily digest adds deviation checks against a 14-day mean. Those are
//! informational and never feed the verdict.

use crate::models::{DateRange, Metric, WellnessSample};
use crate::stats;
use crate::store::WellnessStore;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Alert severity, ordered by urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Medium => "⚠️",
            Severity::High => "🚨",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    RestingHrSpike,
    HrvDepression,
    HrvDrop,
    RestingHrRise,
    RestingHrWatch,
    RestingHrCritical,
}

/// A detected anomaly with a human-readable explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
}

impl Alert {
    fn new(kind: AlertKind, severity: Severity, message: String) -> Self {
        Alert {
            kind,
            severity,
            message,
        }
    }

    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.symbol(), self.message)
    }
}

/// Thresholds of the daily digest deviation checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestThresholds {
    /// Calendar days averaged as reference, the digest date included
    pub window_days: u32,
    /// HRV drop against the reference mean, in percent
    pub hrv_drop_pct: f64,
    /// Resting HR rise against the reference mean, in bpm
    pub rhr_rise_bpm: f64,
    /// Absolute resting HR watch level (arrhythmia follow-up)
    pub rhr_watch_bpm: f64,
    /// Absolute resting HR critical level
    pub rhr_critical_bpm: f64,
}

impl Default for DigestThresholds {
    fn default() -> Self {
        DigestThresholds {
            window_days: 14,
            hrv_drop_pct: 15.0,
            rhr_rise_bpm: 5.0,
            rhr_watch_bpm: 50.0,
            rhr_critical_bpm: 90.0,
        }
    }
}

/// Trend detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Resting HR rise that counts as a spike, in bpm
    pub rhr_spike_bpm: f64,
    /// Calendar days between the two compared resting HR readings
    pub rhr_spike_days: u32,
    /// A day is depressed below this share of its reference HRV
    pub hrv_depression_ratio: f64,
    /// Recent recorded days inspected for depression
    pub hrv_depression_window: usize,
    /// Depressed days within the window needed to alert
    pub hrv_depression_min_days: usize,
    /// Previous recorded days averaged as each day's HRV reference
    pub hrv_reference_samples: usize,
    /// HRV values required for a reference to exist
    pub hrv_reference_min_values: usize,
    pub digest: DigestThresholds,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            rhr_spike_bpm: 3.0,
            rhr_spike_days: 2,
            hrv_depression_ratio: 0.90,
            hrv_depression_window: 4,
            hrv_depression_min_days: 3,
            hrv_reference_samples: 7,
            hrv_reference_min_values: 3,
            digest: DigestThresholds::default(),
        }
    }
}

/// Runs the trend checks over a store
#[derive(Debug, Clone, Default)]
pub struct TrendDetector {
    config: TrendConfig,
}

impl TrendDetector {
    pub fn new(config: TrendConfig) -> Self {
        TrendDetector { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Verdict-relevant alerts for `date`
    pub fn detect(&self, store: &WellnessStore, date: NaiveDate) -> Vec<Alert> {
        let alerts: Vec<Alert> = [
            self.resting_hr_spike(store, date),
            self.hrv_depression(store, date),
        ]
        .into_iter()
        .flatten()
        .collect();

        debug!(%date, alerts = alerts.len(), "Trend checks complete");
        alerts
    }

    /// Resting HR rise over `rhr_spike_days` calendar days
    pub fn resting_hr_spike(&self, store: &WellnessStore, date: NaiveDate) -> Option<Alert> {
        let earlier_date = date.checked_sub_days(Days::new(self.config.rhr_spike_days as u64))?;
        let today = store.get(date)?.metric(Metric::RestingHr)?;
        let earlier = store.get(earlier_date)?.metric(Metric::RestingHr)?;
        let rise = today - earlier;

        (rise >= self.config.rhr_spike_bpm).then(|| {
            Alert::new(
                AlertKind::RestingHrSpike,
                Severity::High,
                format!(
                    "Resting HR up {:.0} bpm in {}h ({:.0} -> {:.0} bpm)",
                    rise,
                    self.config.rhr_spike_days * 24,
                    earlier,
                    today
                ),
            )
        })
    }

    /// Reference HRV for one day: mean of its previous recorded days
    fn hrv_reference(&self, store: &WellnessStore, date: NaiveDate) -> Option<f64> {
        let values = WellnessStore::values(
            store.before(date, self.config.hrv_reference_samples),
            Metric::Hrv,
        );
        if values.len() < self.config.hrv_reference_min_values {
            return None;
        }
        stats::mean(&values)
    }

    fn is_depressed(&self, store: &WellnessStore, sample: &WellnessSample) -> bool {
        match (
            sample.metric(Metric::Hrv),
            self.hrv_reference(store, sample.date),
        ) {
            (Some(hrv), Some(reference)) => hrv < self.config.hrv_depression_ratio * reference,
            _ => false,
        }
    }

    /// HRV held below its own rolling reference on most recent days
    pub fn hrv_depression(&self, store: &WellnessStore, date: NaiveDate) -> Option<Alert> {
        let window = store.up_to(date, self.config.hrv_depression_window);
        let depressed = window
            .iter()
            .filter(|sample| self.is_depressed(store, sample))
            .count();

        debug!(%date, depressed, window = window.len(), "HRV depression check");

        (depressed >= self.config.hrv_depression_min_days).then(|| {
            Alert::new(
                AlertKind::HrvDepression,
                Severity::Medium,
                format!(
                    "HRV below {:.0}% of its {}-day mean on {} of the last {} days",
                    self.config.hrv_depression_ratio * 100.0,
                    self.config.hrv_reference_samples,
                    depressed,
                    window.len()
                ),
            )
        })
    }

    /// Informational deviations for the daily digest
    ///
    /// Today's HRV and resting HR are compared against their mean over the
    /// digest window ending on `date`.
    pub fn digest_deviations(&self, store: &WellnessStore, date: NaiveDate) -> Vec<Alert> {
        let thresholds = &self.config.digest;
        let mut alerts = Vec::new();

        let Some(today) = store.get(date) else {
            return alerts;
        };
        let window = DateRange::ending_on(date, thresholds.window_days);
        let hrv_mean = stats::mean(&WellnessStore::values(store.range(window), Metric::Hrv));
        let rhr_mean = stats::mean(&WellnessStore::values(
            store.range(window),
            Metric::RestingHr,
        ));

        if let (Some(hrv), Some(mean)) = (today.metric(Metric::Hrv), hrv_mean) {
            if mean > 0.0 {
                let drop = (mean - hrv) / mean * 100.0;
                if drop > thresholds.hrv_drop_pct {
                    alerts.push(Alert::new(
                        AlertKind::HrvDrop,
                        Severity::Medium,
                        format!(
                            "HRV down {:.1}% ({}-day mean {:.1}, today {:.1})",
                            drop, thresholds.window_days, mean, hrv
                        ),
                    ));
                }
            }
        }

        if let Some(rhr) = today.metric(Metric::RestingHr) {
            if let Some(mean) = rhr_mean {
                let rise = rhr - mean;
                if rise > thresholds.rhr_rise_bpm {
                    alerts.push(Alert::new(
                        AlertKind::RestingHrRise,
                        Severity::Medium,
                        format!(
                            "Resting HR up {:.1} bpm ({}-day mean {:.1}, today {:.1})",
                            rise, thresholds.window_days, mean, rhr
                        ),
                    ));
                }
            }
            if rhr > thresholds.rhr_watch_bpm {
                alerts.push(Alert::new(
                    AlertKind::RestingHrWatch,
                    Severity::High,
                    format!(
                        "Resting HR {:.1} bpm above watch level (> {:.0} bpm)",
                        rhr, thresholds.rhr_watch_bpm
                    ),
                ));
            }
            if rhr > thresholds.rhr_critical_bpm {
                alerts.push(Alert::new(
                    AlertKind::RestingHrCritical,
                    Severity::High,
                    format!(
                        "Resting HR {:.1} bpm above critical level (> {:.0} bpm)",
                        rhr, thresholds.rhr_critical_bpm
                    ),
                ));
            }
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Days::new(offset)
    }

    fn rhr(offset: u64, value: f64) -> WellnessSample {
        WellnessSample {
            resting_hr: Some(value),
            ..WellnessSample::new(day(offset))
        }
    }

    fn hrv_store(values: &[f64]) -> WellnessStore {
        WellnessStore::from_samples(values.iter().enumerate().map(|(i, v)| WellnessSample {
            hrv: Some(*v),
            ..WellnessSample::new(day(i as u64))
        }))
    }

    #[test]
    fn test_rhr_spike_detected() {
        let store = WellnessStore::from_samples(vec![rhr(0, 46.0), rhr(1, 47.0), rhr(2, 50.0)]);
        let alert = TrendDetector::default()
            .resting_hr_spike(&store, day(2))
            .unwrap();
        assert_eq!(alert.kind, AlertKind::RestingHrSpike);
        assert_eq!(alert.severity, Severity::High);
        assert!(alert.message.contains("4 bpm"));
    }

    #[test]
    fn test_rhr_spike_threshold_is_inclusive() {
        let store = WellnessStore::from_samples(vec![rhr(0, 46.0), rhr(2, 49.0)]);
        assert!(TrendDetector::default()
            .resting_hr_spike(&store, day(2))
            .is_some());

        let store = WellnessStore::from_samples(vec![rhr(0, 46.0), rhr(2, 48.0)]);
        assert!(TrendDetector::default()
            .resting_hr_spike(&store, day(2))
            .is_none());
    }

    #[test]
    fn test_rhr_spike_needs_both_days() {
        // The day two calendar days back is missing
        let store = WellnessStore::from_samples(vec![rhr(1, 40.0), rhr(3, 50.0)]);
        assert!(TrendDetector::default()
            .resting_hr_spike(&store, day(3))
            .is_none());
    }

    #[test]
    fn test_hrv_depression_on_three_of_four_days() {
        // Stable at 60 then four days at 50 (83 % of the reference)
        let mut values = vec![60.0; 7];
        values.extend([50.0, 50.0, 50.0, 50.0]);
        let store = hrv_store(&values);
        let alert = TrendDetector::default()
            .hrv_depression(&store, day(10))
            .unwrap();
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.kind, AlertKind::HrvDepression);
    }

    #[test]
    fn test_single_low_day_is_not_depression() {
        let mut values = vec![60.0; 10];
        values.push(45.0);
        let store = hrv_store(&values);
        assert!(TrendDetector::default()
            .hrv_depression(&store, day(10))
            .is_none());
    }

    #[test]
    fn test_hrv_reference_needs_three_values() {
        // Only two prior values: no reference, so nothing can be flagged
        let store = hrv_store(&[60.0, 60.0, 40.0, 40.0]);
        let detector = TrendDetector::default();
        assert!(detector.hrv_reference(&store, day(2)).is_none());
        assert!(detector.hrv_depression(&store, day(3)).is_none());
    }

    #[test]
    fn test_detect_collects_all_alerts() {
        let mut samples: Vec<WellnessSample> = (0..7)
            .map(|d| WellnessSample {
                hrv: Some(60.0),
                resting_hr: Some(45.0),
                ..WellnessSample::new(day(d))
            })
            .collect();
        for d in 7..11 {
            samples.push(WellnessSample {
                hrv: Some(48.0),
                resting_hr: Some(45.0 + (d - 7) as f64 * 2.0),
                ..WellnessSample::new(day(d))
            });
        }
        let store = WellnessStore::from_samples(samples);
        let alerts = TrendDetector::default().detect(&store, day(10));
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().any(|a| a.is_high()));
    }

    #[test]
    fn test_digest_deviations() {
        let mut samples: Vec<WellnessSample> = (0..14)
            .map(|d| WellnessSample {
                hrv: Some(60.0),
                resting_hr: Some(44.0),
                ..WellnessSample::new(day(d))
            })
            .collect();
        samples.push(WellnessSample {
            hrv: Some(40.0),
            resting_hr: Some(55.0),
            ..WellnessSample::new(day(14))
        });
        let store = WellnessStore::from_samples(samples);
        let alerts = TrendDetector::default().digest_deviations(&store, day(14));
        let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::HrvDrop,
                AlertKind::RestingHrRise,
                AlertKind::RestingHrWatch
            ]
        );
    }

    #[test]
    fn test_digest_quiet_day() {
        let store = WellnessStore::from_samples((0..15).map(|d| WellnessSample {
            hrv: Some(60.0),
            resting_hr: Some(44.0),
            ..WellnessSample::new(day(d))
        }));
        assert!(TrendDetector::default()
            .digest_deviations(&store, day(14))
            .is_empty());
        assert!(TrendDetector::default()
            .digest_deviations(&store, day(20))
            .is_empty());
    }

    #[test]
    fn test_digest_window_excludes_older_days() {
        // Day 0 sits one day outside the 14-day window ending on day 14
        let mut samples = vec![WellnessSample {
            hrv: Some(600.0),
            resting_hr: Some(44.0),
            ..WellnessSample::new(day(0))
        }];
        samples.extend((1..15).map(|d| WellnessSample {
            hrv: Some(60.0),
            resting_hr: Some(44.0),
            ..WellnessSample::new(day(d))
        }));
        let store = WellnessStore::from_samples(samples);

        assert!(TrendDetector::default()
            .digest_deviations(&store, day(14))
            .is_empty());
    }
}
