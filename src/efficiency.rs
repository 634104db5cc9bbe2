//! Rolling aerobic efficiency of rides
//!
//! Each ride yields up to three ratios: normalized power per heartbeat (EF),
//! average power per heartbeat and the upstream zone 2 power/HR value. The
//! analyzer reports the reference day's ride and rolling means of every
//! ratio over several calendar periods ending on that day. Zero or missing
//! ratios are left out of the means.

use crate::models::{ActivitySample, DateRange};
use crate::stats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rolling efficiency settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyConfig {
    /// Calendar periods in days, shortest first
    pub periods: Vec<u32>,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        EfficiencyConfig {
            periods: vec![7, 30, 60],
        }
    }
}

/// The three efficiency ratios
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyValues {
    pub efficiency: Option<f64>,
    pub power_to_hr: Option<f64>,
    pub power_hr_z2: Option<f64>,
}

impl EfficiencyValues {
    pub fn from_activity(activity: &ActivitySample) -> Self {
        EfficiencyValues {
            efficiency: activity.efficiency_factor(),
            power_to_hr: activity.power_to_hr(),
            power_hr_z2: activity.power_hr_z2.filter(|v| v.is_finite() && *v > 0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.efficiency.is_none() && self.power_to_hr.is_none() && self.power_hr_z2.is_none()
    }

    /// Per-ratio difference, present where both sides are
    pub fn minus(&self, other: &EfficiencyValues) -> EfficiencyValues {
        let diff = |a: Option<f64>, b: Option<f64>| Some(a? - b?);
        EfficiencyValues {
            efficiency: diff(self.efficiency, other.efficiency),
            power_to_hr: diff(self.power_to_hr, other.power_to_hr),
            power_hr_z2: diff(self.power_hr_z2, other.power_hr_z2),
        }
    }
}

/// One ride's efficiency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideEfficiency {
    pub date: NaiveDate,
    pub name: Option<String>,
    pub values: EfficiencyValues,
}

/// Means over one calendar period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingEfficiency {
    pub period_days: u32,
    pub means: EfficiencyValues,
    /// Rides that fed the means, oldest first
    pub rides: Vec<RideEfficiency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub date: NaiveDate,
    /// First ride of the reference day, when it carried any ratio
    pub today: Option<RideEfficiency>,
    pub rolling: Vec<RollingEfficiency>,
}

impl EfficiencyReport {
    /// Today's ratios minus the means of the shortest period
    pub fn today_vs_shortest(&self) -> Option<EfficiencyValues> {
        let today = self.today.as_ref()?;
        let shortest = self.rolling.first()?;
        Some(today.values.minus(&shortest.means))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EfficiencyAnalyzer {
    config: EfficiencyConfig,
}

impl EfficiencyAnalyzer {
    pub fn new(mut config: EfficiencyConfig) -> Self {
        config.periods.retain(|p| *p > 0);
        config.periods.sort_unstable();
        config.periods.dedup();
        EfficiencyAnalyzer { config }
    }

    pub fn periods(&self) -> &[u32] {
        &self.config.periods
    }

    /// Span covering the longest period
    pub fn window(&self, date: NaiveDate) -> DateRange {
        let longest = self.config.periods.last().copied().unwrap_or(1);
        DateRange::ending_on(date, longest)
    }

    pub fn analyze(&self, activities: &[ActivitySample], date: NaiveDate) -> EfficiencyReport {
        let mut rides: Vec<RideEfficiency> = activities
            .iter()
            .filter(|a| a.activity_type.is_cycling() && a.date <= date)
            .map(|a| RideEfficiency {
                date: a.date,
                name: a.name.clone(),
                values: EfficiencyValues::from_activity(a),
            })
            .filter(|r| !r.values.is_empty())
            .collect();
        rides.sort_by_key(|r| r.date);

        let today = activities
            .iter()
            .find(|a| a.date == date && a.activity_type.is_cycling())
            .map(|a| RideEfficiency {
                date,
                name: a.name.clone(),
                values: EfficiencyValues::from_activity(a),
            })
            .filter(|r| !r.values.is_empty());

        let rolling = self
            .config
            .periods
            .iter()
            .map(|&period_days| {
                let range = DateRange::ending_on(date, period_days);
                let in_period: Vec<RideEfficiency> = rides
                    .iter()
                    .filter(|r| range.contains(r.date))
                    .cloned()
                    .collect();
                let mean_of = |pick: fn(&EfficiencyValues) -> Option<f64>| {
                    let values: Vec<f64> =
                        in_period.iter().filter_map(|r| pick(&r.values)).collect();
                    stats::mean(&values)
                };
                RollingEfficiency {
                    period_days,
                    means: EfficiencyValues {
                        efficiency: mean_of(|v| v.efficiency),
                        power_to_hr: mean_of(|v| v.power_to_hr),
                        power_hr_z2: mean_of(|v| v.power_hr_z2),
                    },
                    rides: in_period,
                }
            })
            .collect();

        debug!(%date, rides = rides.len(), "Efficiency analysis complete");
        EfficiencyReport {
            date,
            today,
            rolling,
        }
    }
}
