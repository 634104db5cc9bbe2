//! Weekly training load analysis
//!
//! Summarizes the last few 7-day blocks ending on a reference date (normally
//! a Sunday): realized vs planned training stress, time in zones, cycling
//! efficiency, wellness averages and the end-of-week load balance.
//!
//! # Load status
//!
//! The ATL/CTL ratio on the last day of the week classifies the block:
//! - **> 1.3**: very high load
//! - **> 1.1**: productive load
//! - otherwise: recovery load

use crate::models::{ActivitySample, ActivityType, DateRange, Metric, WellnessSample, ZONE_COUNT};
use crate::stats;
use crate::store::WellnessStore;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Longest review, one year of 7-day blocks
pub const MAX_WEEKS: u32 = 52;

/// Weekly analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyConfig {
    /// Number of 7-day blocks analyzed
    pub weeks: u32,

    /// Training stress credited to a strength session
    pub strength_session_load: f64,

    /// Planned weekly training stress, oldest week first
    pub planned_tss: Vec<f64>,

    /// ATL/CTL ratio above which load is very high
    pub very_high_ratio: f64,

    /// ATL/CTL ratio above which load is productive
    pub productive_ratio: f64,

    /// Weekly sleep average below which rest is insufficient
    pub min_sleep_score: f64,
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        WeeklyConfig {
            weeks: 4,
            strength_session_load: 10.0,
            planned_tss: vec![330.0, 350.0, 385.0, 195.0],
            very_high_ratio: 1.3,
            productive_ratio: 1.1,
            min_sleep_score: 75.0,
        }
    }
}

/// Load classification from the end-of-week ATL/CTL ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    VeryHigh,
    Productive,
    Recovery,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::VeryHigh => write!(f, "very high load"),
            LoadStatus::Productive => write!(f, "productive load"),
            LoadStatus::Recovery => write!(f, "recovery load"),
        }
    }
}

/// Training totals of one week of activities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingTotals {
    pub sessions: usize,
    pub realized_tss: f64,
    pub hr_zone_times: [u32; ZONE_COUNT],
    pub power_zone_times: [u32; ZONE_COUNT],
    /// Mean normalized power per heartbeat over rides
    pub efficiency: Option<f64>,
    /// Mean average power per heartbeat over rides
    pub power_to_hr: Option<f64>,
    /// Mean upstream zone 2 power/HR
    pub power_hr_z2: Option<f64>,
}

impl TrainingTotals {
    /// Fold activities; strength sessions count a fixed load
    pub fn from_activities<'a, I>(activities: I, strength_session_load: f64) -> Self
    where
        I: IntoIterator<Item = &'a ActivitySample>,
    {
        let mut totals = TrainingTotals::default();
        let mut efficiency = Vec::new();
        let mut power_to_hr = Vec::new();
        let mut power_hr_z2 = Vec::new();

        for activity in activities {
            totals.sessions += 1;
            totals.realized_tss += match activity.activity_type {
                ActivityType::WeightTraining => strength_session_load,
                _ => activity.training_load.filter(|l| l.is_finite()).unwrap_or(0.0),
            };

            for (total, secs) in totals.hr_zone_times.iter_mut().zip(activity.hr_zone_times) {
                *total = total.saturating_add(secs);
            }
            for (total, secs) in totals
                .power_zone_times
                .iter_mut()
                .zip(activity.power_zone_times)
            {
                *total = total.saturating_add(secs);
            }

            if activity.activity_type.is_cycling() {
                efficiency.extend(activity.efficiency_factor());
                power_to_hr.extend(activity.power_to_hr());
                power_hr_z2.extend(activity.power_hr_z2.filter(|v| *v > 0.0));
            }
        }

        totals.efficiency = stats::mean(&efficiency);
        totals.power_to_hr = stats::mean(&power_to_hr);
        totals.power_hr_z2 = stats::mean(&power_hr_z2);
        totals
    }
}

/// Summary of one 7-day block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub range: DateRange,
    pub planned_tss: Option<f64>,
    pub training: TrainingTotals,
    pub resting_hr: Option<f64>,
    pub hrv: Option<f64>,
    pub body_battery_max: Option<f64>,
    /// Mean over days with a positive minimum only
    pub body_battery_min: Option<f64>,
    pub sleep_score: Option<f64>,
    /// Load values on the last day of the block
    pub ctl_end: Option<f64>,
    pub atl_end: Option<f64>,
    pub tsb_end: Option<f64>,
}

impl WeekSummary {
    /// Realized over planned stress in percent
    pub fn compliance_pct(&self) -> Option<f64> {
        self.planned_tss
            .filter(|p| *p > 0.0)
            .map(|planned| self.training.realized_tss / planned * 100.0)
    }

    /// End-of-week ATL/CTL ratio
    pub fn load_ratio(&self) -> Option<f64> {
        match (self.atl_end, self.ctl_end) {
            (Some(atl), Some(ctl)) if ctl > 0.0 => Some(atl / ctl),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.range.start.format("%d/%m"),
            self.range.end.format("%d/%m")
        )
    }
}

/// Builds weekly summaries and coaching insights
#[derive(Debug, Clone, Default)]
pub struct WeeklyAnalyzer {
    config: WeeklyConfig,
}

impl WeeklyAnalyzer {
    pub fn new(config: WeeklyConfig) -> Self {
        WeeklyAnalyzer { config }
    }

    pub fn config(&self) -> &WeeklyConfig {
        &self.config
    }

    /// Analyzed block count, kept within `1..=MAX_WEEKS`
    pub fn weeks(&self) -> u32 {
        self.config.weeks.clamp(1, MAX_WEEKS)
    }

    /// Calendar span covering every analyzed week
    pub fn window(&self, end: NaiveDate) -> DateRange {
        DateRange::ending_on(end, self.weeks().saturating_mul(7))
    }

    /// 7-day blocks ending on `end`, oldest first
    pub fn week_ranges(&self, end: NaiveDate) -> Vec<DateRange> {
        let mut ranges: Vec<DateRange> = (0..u64::from(self.weeks()))
            .filter_map(|i| {
                let week_end = end.checked_sub_days(Days::new(7 * i))?;
                Some(DateRange::ending_on(week_end, 7))
            })
            .collect();
        ranges.reverse();
        ranges
    }

    /// Planned stress for the week at `index` (oldest first)
    ///
    /// When fewer plans than weeks are configured the plans align with the
    /// most recent weeks.
    fn planned_for(&self, index: usize, weeks: usize) -> Option<f64> {
        let plans = &self.config.planned_tss;
        let offset = weeks.saturating_sub(plans.len());
        let shift = plans.len().saturating_sub(weeks);
        index
            .checked_sub(offset)
            .and_then(|i| plans.get(i + shift))
            .copied()
    }

    pub fn analyze(
        &self,
        store: &WellnessStore,
        activities: &[ActivitySample],
        end: NaiveDate,
    ) -> Vec<WeekSummary> {
        let ranges = self.week_ranges(end);
        let count = ranges.len();
        let weeks: Vec<WeekSummary> = ranges
            .into_iter()
            .enumerate()
            .map(|(i, range)| {
                let days: Vec<&WellnessSample> = store.range(range).collect();
                let week_activities = activities.iter().filter(|a| range.contains(a.date));
                self.summarize(range, &days, week_activities, self.planned_for(i, count))
            })
            .collect();

        debug!(%end, weeks = weeks.len(), "Weekly analysis complete");
        weeks
    }

    fn summarize<'a>(
        &self,
        range: DateRange,
        days: &[&WellnessSample],
        activities: impl Iterator<Item = &'a ActivitySample>,
        planned_tss: Option<f64>,
    ) -> WeekSummary {
        let mean_of = |metric: Metric| {
            stats::mean(&WellnessStore::values(days.iter().copied(), metric))
        };
        let last_day = days.iter().find(|s| s.date == range.end);
        let positive_min: Vec<f64> = WellnessStore::values(days.iter().copied(), Metric::BodyBatteryMin)
            .into_iter()
            .filter(|v| *v > 0.0)
            .collect();

        WeekSummary {
            range,
            planned_tss,
            training: TrainingTotals::from_activities(activities, self.config.strength_session_load),
            resting_hr: mean_of(Metric::RestingHr),
            hrv: mean_of(Metric::Hrv),
            body_battery_max: mean_of(Metric::BodyBatteryMax),
            body_battery_min: stats::mean(&positive_min),
            sleep_score: mean_of(Metric::SleepScore),
            ctl_end: last_day.and_then(|s| s.metric(Metric::Ctl)),
            atl_end: last_day.and_then(|s| s.metric(Metric::Atl)),
            tsb_end: last_day.and_then(|s| s.tsb()),
        }
    }

    pub fn load_status(&self, week: &WeekSummary) -> Option<LoadStatus> {
        let ratio = week.load_ratio()?;
        Some(if ratio > self.config.very_high_ratio {
            LoadStatus::VeryHigh
        } else if ratio > self.config.productive_ratio {
            LoadStatus::Productive
        } else {
            LoadStatus::Recovery
        })
    }

    /// Coaching remarks for one week
    pub fn insights(&self, week: &WeekSummary) -> Vec<String> {
        let mut notes = Vec::new();

        if let (Some(status), Some(ratio)) = (self.load_status(week), week.load_ratio()) {
            notes.push(format!("ATL/CTL ratio {:.2}: {}", ratio, status));
        }
        if let Some(ef) = week.training.efficiency {
            notes.push(format!("Efficiency (NP/HR): {:.2}", ef));
        }
        if let Some(sleep) = week.sleep_score.filter(|s| *s < self.config.min_sleep_score) {
            notes.push(format!("Sleep {:.1}: insufficient rest", sleep));
        }
        notes
    }
}
