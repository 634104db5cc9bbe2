//! Multi-horizon baselines
//!
//! Daily samples are first folded into weekly means, which smooths day to day
//! noise. Three reference points are derived from that weekly table:
//!
//! - **Recovery**: the athlete's "fresh" state, averaged over low-load weeks
//!   (weeks whose mean ATL is at or below the mean ATL of the whole table)
//! - **Chronic**: the 4 most recent weeks
//! - **Historic**: the 8 most recent weeks
//!
//! A baseline whose data requirement is not met is absent, never zero.
//!
//! The calculator also provides the daily rolling references used by the
//! scorer: a trailing mean over the previous N recorded days and the HRV
//! mean/standard deviation over the previous 28 recorded days.

use crate::models::{DateRange, Metric, WellnessSample};
use crate::stats;
use crate::store::WellnessStore;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// How the window is cut into weeks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WeekBoundary {
    /// Calendar weeks beginning on `week_start`; the current week is partial
    Calendar { week_start: Weekday },
    /// 7-day blocks ending on the reference date
    Rolling,
}

impl Default for WeekBoundary {
    fn default() -> Self {
        WeekBoundary::Calendar {
            week_start: Weekday::Mon,
        }
    }
}

/// Baseline horizons, in weeks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Week partitioning rule
    pub boundary: WeekBoundary,

    /// Weeks of history folded into the weekly table (default: 12)
    pub history_weeks: u32,

    /// Weeks averaged for the chronic baseline (default: 4)
    pub chronic_weeks: u32,

    /// Weeks averaged for the historic baseline (default: 8)
    pub historic_weeks: u32,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        BaselineConfig {
            boundary: WeekBoundary::default(),
            history_weeks: 12,
            chronic_weeks: 4,
            historic_weeks: 8,
        }
    }
}

/// Means of one week bucket; only weeks holding at least one sample exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAggregate {
    pub range: DateRange,
    pub sample_count: usize,
    pub resting_hr: Option<f64>,
    pub hrv: Option<f64>,
    pub sleep_score: Option<f64>,
    pub atl: Option<f64>,
    pub ctl: Option<f64>,
}

impl WeeklyAggregate {
    fn from_samples(range: DateRange, samples: &[&WellnessSample]) -> Self {
        let mean_of = |metric: Metric| {
            stats::mean(&WellnessStore::values(samples.iter().copied(), metric))
        };
        WeeklyAggregate {
            range,
            sample_count: samples.len(),
            resting_hr: mean_of(Metric::RestingHr),
            hrv: mean_of(Metric::Hrv),
            sleep_score: mean_of(Metric::SleepScore),
            atl: mean_of(Metric::Atl),
            ctl: mean_of(Metric::Ctl),
        }
    }

    /// Short label such as `03/06-09/06`
    pub fn label(&self) -> String {
        format!(
            "{}-{}",
            self.range.start.format("%d/%m"),
            self.range.end.format("%d/%m")
        )
    }
}

/// Baseline horizon kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineKind {
    Recovery,
    Chronic,
    Historic,
}

impl fmt::Display for BaselineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineKind::Recovery => write!(f, "Recovery"),
            BaselineKind::Chronic => write!(f, "Chronic"),
            BaselineKind::Historic => write!(f, "Historic"),
        }
    }
}

/// A reference point for today's metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub kind: BaselineKind,
    pub resting_hr: Option<f64>,
    pub hrv: Option<f64>,
    pub sleep_score: Option<f64>,
    /// Number of weekly buckets averaged
    pub weeks_used: usize,
}

impl Baseline {
    fn from_weeks(kind: BaselineKind, weeks: &[&WeeklyAggregate]) -> Option<Self> {
        let mean_of = |pick: fn(&WeeklyAggregate) -> Option<f64>| {
            let values: Vec<f64> = weeks.iter().filter_map(|w| pick(w)).collect();
            stats::mean(&values)
        };
        let baseline = Baseline {
            kind,
            resting_hr: mean_of(|w| w.resting_hr),
            hrv: mean_of(|w| w.hrv),
            sleep_score: mean_of(|w| w.sleep_score),
            weeks_used: weeks.len(),
        };

        if baseline.resting_hr.is_none() && baseline.hrv.is_none() && baseline.sleep_score.is_none()
        {
            None
        } else {
            Some(baseline)
        }
    }
}

/// All three baselines for one reference date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSet {
    pub recovery: Option<Baseline>,
    pub chronic: Option<Baseline>,
    pub historic: Option<Baseline>,
}

impl BaselineSet {
    pub fn iter(&self) -> impl Iterator<Item = &Baseline> {
        [&self.recovery, &self.chronic, &self.historic]
            .into_iter()
            .flatten()
    }
}

/// HRV mean and spread over a trailing window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvDistribution {
    pub mean: f64,
    pub std_dev: f64,
    pub samples: usize,
}

/// Derives baselines and rolling references from a store
#[derive(Debug, Clone, Default)]
pub struct BaselineCalculator {
    config: BaselineConfig,
}

impl BaselineCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BaselineConfig) -> Self {
        BaselineCalculator { config }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Week buckets covering the history window, oldest first
    ///
    /// Buckets never extend past `reference`; empty buckets are dropped.
    pub fn week_ranges(&self, reference: NaiveDate) -> Vec<DateRange> {
        let last_week_start = match self.config.boundary {
            WeekBoundary::Calendar { week_start } => {
                let offset = (7 + reference.weekday().num_days_from_monday()
                    - week_start.num_days_from_monday())
                    % 7;
                reference - Days::new(offset as u64)
            }
            WeekBoundary::Rolling => reference - Days::new(6),
        };

        let mut ranges: Vec<DateRange> = (0..self.config.history_weeks as u64)
            .filter_map(|i| {
                let start = last_week_start.checked_sub_days(Days::new(7 * i))?;
                let end = (start + Days::new(6)).min(reference);
                DateRange::new(start, end)
            })
            .collect();
        ranges.reverse();
        ranges
    }

    /// Weekly means over the history window, oldest first
    pub fn weekly_table(&self, store: &WellnessStore, reference: NaiveDate) -> Vec<WeeklyAggregate> {
        self.week_ranges(reference)
            .into_iter()
            .filter_map(|range| {
                let samples: Vec<&WellnessSample> = store.range(range).collect();
                (!samples.is_empty()).then(|| WeeklyAggregate::from_samples(range, &samples))
            })
            .collect()
    }

    /// Recovery, chronic and historic baselines for `reference`
    pub fn compute(&self, store: &WellnessStore, reference: NaiveDate) -> BaselineSet {
        let weeks = self.weekly_table(store, reference);
        let set = self.from_weekly(&weeks);
        debug!(
            %reference,
            weeks = weeks.len(),
            recovery = set.recovery.is_some(),
            chronic = set.chronic.is_some(),
            historic = set.historic.is_some(),
            "Baselines computed"
        );
        set
    }

    /// Baselines from an already built weekly table
    pub fn from_weekly(&self, weeks: &[WeeklyAggregate]) -> BaselineSet {
        BaselineSet {
            recovery: Self::recovery(weeks),
            chronic: Self::most_recent(weeks, self.config.chronic_weeks as usize, BaselineKind::Chronic),
            historic: Self::most_recent(weeks, self.config.historic_weeks as usize, BaselineKind::Historic),
        }
    }

    /// Mean over weeks whose ATL is at or below the table's mean ATL
    pub fn recovery(weeks: &[WeeklyAggregate]) -> Option<Baseline> {
        let loads: Vec<f64> = weeks.iter().filter_map(|w| w.atl).collect();
        let mean_atl = stats::mean(&loads)?;

        let low_load: Vec<&WeeklyAggregate> = weeks
            .iter()
            .filter(|w| w.atl.is_some_and(|atl| atl <= mean_atl))
            .collect();

        if low_load.is_empty() {
            return None;
        }
        Baseline::from_weeks(BaselineKind::Recovery, &low_load)
    }

    fn most_recent(weeks: &[WeeklyAggregate], count: usize, kind: BaselineKind) -> Option<Baseline> {
        if count == 0 || weeks.len() < count {
            return None;
        }
        let recent: Vec<&WeeklyAggregate> = weeks[weeks.len() - count..].iter().collect();
        Baseline::from_weeks(kind, &recent)
    }

    /// Mean of a metric over the previous `count` recorded days
    pub fn trailing_mean(
        store: &WellnessStore,
        date: NaiveDate,
        count: usize,
        metric: Metric,
    ) -> Option<f64> {
        stats::mean(&WellnessStore::values(store.before(date, count), metric))
    }

    /// HRV mean and sample deviation over the previous `count` recorded days
    pub fn hrv_distribution(
        store: &WellnessStore,
        date: NaiveDate,
        count: usize,
    ) -> Option<HrvDistribution> {
        let values = WellnessStore::values(store.before(date, count), Metric::Hrv);
        Some(HrvDistribution {
            mean: stats::mean(&values)?,
            std_dev: stats::std_dev(&values)?,
            samples: values.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: u64) -> NaiveDate {
        // 2024-01-01 is a Monday
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(offset)
    }

    fn sample(offset: u64, rhr: f64, hrv: f64, atl: f64) -> WellnessSample {
        WellnessSample {
            resting_hr: Some(rhr),
            hrv: Some(hrv),
            sleep_score: Some(80.0),
            atl: Some(atl),
            ..WellnessSample::new(day(offset))
        }
    }

    /// `weeks` full calendar weeks, each day of week `w` carrying `atl_for(w)`
    fn weeks_of(weeks: u64, atl_for: impl Fn(u64) -> f64) -> WellnessStore {
        WellnessStore::from_samples((0..weeks * 7).map(|d| {
            let w = d / 7;
            sample(d, 45.0 + w as f64, 50.0 + w as f64, atl_for(w))
        }))
    }

    fn last_day(weeks: u64) -> NaiveDate {
        day(weeks * 7 - 1)
    }

    #[test]
    fn test_calendar_week_ranges_start_on_configured_day() {
        let calc = BaselineCalculator::new();
        // Wednesday 2024-01-10
        let reference = day(9);
        let ranges = calc.week_ranges(reference);
        let current = ranges.last().unwrap();
        assert_eq!(current.start, day(7));
        assert_eq!(current.end, reference);
        assert_eq!(current.start.weekday(), Weekday::Mon);

        let sunday_weeks = BaselineCalculator::with_config(BaselineConfig {
            boundary: WeekBoundary::Calendar {
                week_start: Weekday::Sun,
            },
            ..BaselineConfig::default()
        });
        let current = *sunday_weeks.week_ranges(reference).last().unwrap();
        assert_eq!(current.start.weekday(), Weekday::Sun);
        assert_eq!(current.start, day(6));
    }

    #[test]
    fn test_rolling_week_ranges_end_on_reference() {
        let calc = BaselineCalculator::with_config(BaselineConfig {
            boundary: WeekBoundary::Rolling,
            history_weeks: 3,
            ..BaselineConfig::default()
        });
        let ranges = calc.week_ranges(day(20));
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[2], DateRange::new(day(14), day(20)).unwrap());
        assert_eq!(ranges[0], DateRange::new(day(0), day(6)).unwrap());
    }

    #[test]
    fn test_empty_weeks_are_excluded() {
        // Week 0 and week 2 have data, week 1 has none
        let store = WellnessStore::from_samples(vec![
            sample(0, 45.0, 50.0, 40.0),
            sample(15, 47.0, 52.0, 60.0),
        ]);
        let calc = BaselineCalculator::new();
        let table = calc.weekly_table(&store, day(20));
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].sample_count, 1);
        assert_eq!(table[1].resting_hr, Some(47.0));
    }

    #[test]
    fn test_weekly_means_ignore_missing_days() {
        let mut samples = vec![sample(0, 44.0, 50.0, 30.0), sample(1, 46.0, 60.0, 30.0)];
        samples.push(WellnessSample::new(day(2)));
        let store = WellnessStore::from_samples(samples);
        let table = BaselineCalculator::new().weekly_table(&store, day(6));
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].sample_count, 3);
        assert_eq!(table[0].resting_hr, Some(45.0));
        assert_eq!(table[0].hrv, Some(55.0));
    }

    #[test]
    fn test_recovery_keeps_only_low_load_weeks() {
        // ATL per week: 30, 70, 40, 80 -> mean 55 -> weeks 0 and 2 kept
        let loads = [30.0, 70.0, 40.0, 80.0];
        let store = weeks_of(4, |w| loads[w as usize]);
        let set = BaselineCalculator::new().compute(&store, last_day(4));

        let recovery = set.recovery.unwrap();
        assert_eq!(recovery.weeks_used, 2);
        // RHR of week 0 is 45, week 2 is 47
        assert_eq!(recovery.resting_hr, Some(46.0));
        assert_eq!(recovery.hrv, Some(51.0));
    }

    #[test]
    fn test_recovery_includes_ties() {
        let store = weeks_of(3, |_| 50.0);
        let recovery = BaselineCalculator::new()
            .compute(&store, last_day(3))
            .recovery
            .unwrap();
        assert_eq!(recovery.weeks_used, 3);
    }

    #[test]
    fn test_recovery_absent_without_load_data() {
        let store = WellnessStore::from_samples((0..14).map(|d| WellnessSample {
            resting_hr: Some(45.0),
            ..WellnessSample::new(day(d))
        }));
        let set = BaselineCalculator::new().compute(&store, day(13));
        assert!(set.recovery.is_none());
    }

    #[test]
    fn test_chronic_requires_four_weeks() {
        let calc = BaselineCalculator::new();

        let three = weeks_of(3, |_| 50.0);
        assert!(calc.compute(&three, last_day(3)).chronic.is_none());

        let four = weeks_of(4, |_| 50.0);
        let chronic = calc.compute(&four, last_day(4)).chronic.unwrap();
        assert_eq!(chronic.weeks_used, 4);
        // RHR 45, 46, 47, 48
        assert_eq!(chronic.resting_hr, Some(46.5));
    }

    #[test]
    fn test_historic_requires_eight_weeks() {
        let calc = BaselineCalculator::new();

        let seven = weeks_of(7, |_| 50.0);
        let set = calc.compute(&seven, last_day(7));
        assert!(set.historic.is_none());
        assert!(set.chronic.is_some());

        let ten = weeks_of(10, |_| 50.0);
        let historic = calc.compute(&ten, last_day(10)).historic.unwrap();
        assert_eq!(historic.weeks_used, 8);
        // most recent 8 weeks are weeks 2..=9 -> RHR 47..=54
        assert_eq!(historic.resting_hr, Some(50.5));
    }

    #[test]
    fn test_baselines_are_deterministic() {
        let store = weeks_of(10, |w| 30.0 + (w * 7 % 5) as f64 * 10.0);
        let calc = BaselineCalculator::new();
        let first = calc.compute(&store, last_day(10));
        let second = calc.compute(&store, last_day(10));
        assert_eq!(first, second);
        assert_eq!(
            first.chronic.as_ref().and_then(|b| b.hrv).map(f64::to_bits),
            second.chronic.as_ref().and_then(|b| b.hrv).map(f64::to_bits)
        );
    }

    #[test]
    fn test_trailing_mean_uses_previous_recorded_days() {
        let store = WellnessStore::from_samples(
            [50.0, 48.0, 47.0, 46.0, 45.0, 44.0, 43.0, 42.0]
                .iter()
                .enumerate()
                .map(|(i, hrv)| WellnessSample {
                    hrv: Some(*hrv),
                    ..WellnessSample::new(day(i as u64))
                }),
        );
        let mean = BaselineCalculator::trailing_mean(&store, day(7), 7, Metric::Hrv).unwrap();
        assert!((mean - 323.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_hrv_distribution_needs_two_values() {
        let store = WellnessStore::from_samples(vec![
            WellnessSample {
                hrv: Some(50.0),
                ..WellnessSample::new(day(0))
            },
            WellnessSample::new(day(1)),
        ]);
        assert!(BaselineCalculator::hrv_distribution(&store, day(2), 28).is_none());

        let store = WellnessStore::from_samples((0..4).map(|d| WellnessSample {
            hrv: Some(48.0 + 2.0 * d as f64),
            ..WellnessSample::new(day(d))
        }));
        let dist = BaselineCalculator::hrv_distribution(&store, day(4), 28).unwrap();
        assert_eq!(dist.samples, 4);
        assert_eq!(dist.mean, 51.0);
        assert!((dist.std_dev - (20.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }
}
