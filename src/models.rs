//! Domain records shared by every module: daily wellness rows, completed
//! activities, planned workouts and closed date ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of zone buckets tracked for power and heart rate time-in-zone
pub const ZONE_COUNT: usize = 7;

/// Physiological metrics carried by a daily wellness sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Hrv,
    RestingHr,
    SleepScore,
    BodyBatteryMax,
    BodyBatteryMin,
    Atl,
    Ctl,
}

impl Metric {
    /// Display label used in breakdowns and tables
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Hrv => "HRV",
            Metric::RestingHr => "Resting HR",
            Metric::SleepScore => "Sleep score",
            Metric::BodyBatteryMax => "Body battery max",
            Metric::BodyBatteryMin => "Body battery min",
            Metric::Atl => "Acute load (ATL)",
            Metric::Ctl => "Chronic load (CTL)",
        }
    }

    /// Unit suffix for rendered values
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Hrv => "ms",
            Metric::RestingHr => "bpm",
            _ => "",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One calendar day of an athlete's physiology
///
/// Every field except `date` may be missing; a missing field contributes
/// nothing to any mean, deviation or score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessSample {
    /// Calendar day (unique key)
    #[serde(rename = "id")]
    pub date: NaiveDate,

    /// Heart rate variability in milliseconds
    #[serde(default)]
    pub hrv: Option<f64>,

    /// Resting heart rate in beats per minute
    #[serde(default, rename = "restingHR")]
    pub resting_hr: Option<f64>,

    /// Sleep score (0-100)
    #[serde(default, rename = "sleepScore")]
    pub sleep_score: Option<f64>,

    /// Highest body battery of the day (0-100)
    #[serde(default, rename = "BodyBatteryMax")]
    pub body_battery_max: Option<f64>,

    /// Lowest body battery of the day (0-100)
    #[serde(default, rename = "BodyBatteryMin")]
    pub body_battery_min: Option<f64>,

    /// Acute training load
    #[serde(default)]
    pub atl: Option<f64>,

    /// Chronic training load
    #[serde(default)]
    pub ctl: Option<f64>,
}

impl WellnessSample {
    /// Empty sample for a date; fill fields with struct update syntax
    pub fn new(date: NaiveDate) -> Self {
        WellnessSample {
            date,
            hrv: None,
            resting_hr: None,
            sleep_score: None,
            body_battery_max: None,
            body_battery_min: None,
            atl: None,
            ctl: None,
        }
    }

    /// Typed accessor for a metric
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        let value = match metric {
            Metric::Hrv => self.hrv,
            Metric::RestingHr => self.resting_hr,
            Metric::SleepScore => self.sleep_score,
            Metric::BodyBatteryMax => self.body_battery_max,
            Metric::BodyBatteryMin => self.body_battery_min,
            Metric::Atl => self.atl,
            Metric::Ctl => self.ctl,
        };
        value.filter(|v| v.is_finite())
    }

    /// Training stress balance (CTL - ATL)
    pub fn tsb(&self) -> Option<f64> {
        match (self.metric(Metric::Ctl), self.metric(Metric::Atl)) {
            (Some(ctl), Some(atl)) => Some(ctl - atl),
            _ => None,
        }
    }
}

/// Activity categories reported by the upstream feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Ride,
    VirtualRide,
    WeightTraining,
    Run,
    Other(String),
}

impl ActivityType {
    /// Parse the upstream `type` string
    pub fn from_api(value: &str) -> Self {
        match value {
            "Ride" => ActivityType::Ride,
            "VirtualRide" => ActivityType::VirtualRide,
            "WeightTraining" => ActivityType::WeightTraining,
            "Run" => ActivityType::Run,
            other => ActivityType::Other(other.to_string()),
        }
    }

    /// Only rides feed power/heart-rate efficiency metrics
    pub fn is_cycling(&self) -> bool {
        matches!(self, ActivityType::Ride | ActivityType::VirtualRide)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Ride => write!(f, "Ride"),
            ActivityType::VirtualRide => write!(f, "VirtualRide"),
            ActivityType::WeightTraining => write!(f, "WeightTraining"),
            ActivityType::Run => write!(f, "Run"),
            ActivityType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One completed training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySample {
    /// Local calendar day the session started on
    pub date: NaiveDate,

    /// Session category
    pub activity_type: ActivityType,

    /// Session title
    pub name: Option<String>,

    /// Moving time in seconds
    pub moving_time: Option<u32>,

    /// Training stress (TSS-like)
    pub training_load: Option<f64>,

    /// Intensity factor as a fraction (0.75 = 75 %)
    pub intensity_factor: Option<f64>,

    /// Normalized (weighted average) power in watts
    pub normalized_power: Option<f64>,

    /// Average power in watts
    pub average_power: Option<f64>,

    /// Average heart rate in bpm
    pub average_hr: Option<f64>,

    /// Maximum heart rate in bpm
    pub max_hr: Option<f64>,

    /// Aerobic decoupling (Pw:HR) in percent
    pub decoupling: Option<f64>,

    /// Power/HR ratio for zone 2 work, as computed upstream
    pub power_hr_z2: Option<f64>,

    /// Seconds spent in each heart-rate zone
    pub hr_zone_times: [u32; ZONE_COUNT],

    /// Seconds spent in each power zone
    pub power_zone_times: [u32; ZONE_COUNT],

    /// CTL after the session
    pub ctl: Option<f64>,

    /// ATL after the session
    pub atl: Option<f64>,
}

impl ActivitySample {
    /// Bare session of a given type; fill fields with struct update syntax
    pub fn new(date: NaiveDate, activity_type: ActivityType) -> Self {
        ActivitySample {
            date,
            activity_type,
            name: None,
            moving_time: None,
            training_load: None,
            intensity_factor: None,
            normalized_power: None,
            average_power: None,
            average_hr: None,
            max_hr: None,
            decoupling: None,
            power_hr_z2: None,
            hr_zone_times: [0; ZONE_COUNT],
            power_zone_times: [0; ZONE_COUNT],
            ctl: None,
            atl: None,
        }
    }

    /// Normalized power per heartbeat (efficiency factor)
    pub fn efficiency_factor(&self) -> Option<f64> {
        ratio(self.normalized_power, self.average_hr)
    }

    /// Average power per heartbeat
    pub fn power_to_hr(&self) -> Option<f64> {
        ratio(self.average_power, self.average_hr)
    }
}

/// One workout scheduled on the training calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedWorkout {
    pub date: NaiveDate,
    pub name: Option<String>,
    /// Free-text interval structure
    pub description: Option<String>,
    /// Planned duration in seconds
    pub moving_time: Option<u32>,
    pub training_load: Option<f64>,
    /// Planned intensity factor as a fraction
    pub intensity_factor: Option<f64>,
    /// Planned normalized power in watts
    pub target_power: Option<f64>,
}

impl PlannedWorkout {
    pub fn new(date: NaiveDate) -> Self {
        PlannedWorkout {
            date,
            name: None,
            description: None,
            moving_time: None,
            training_load: None,
            intensity_factor: None,
            target_power: None,
        }
    }

    /// A workout without positive planned stress counts as no plan
    pub fn has_load(&self) -> bool {
        self.training_load.is_some_and(|l| l > 0.0)
    }

    /// Interval structure, `None` for blank or placeholder descriptions
    pub fn structure(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("none"))
    }
}

fn ratio(power: Option<f64>, hr: Option<f64>) -> Option<f64> {
    match (power, hr) {
        (Some(p), Some(h)) if p > 0.0 && h > 0.0 => Some(p / h),
        _ => None,
    }
}

/// Closed calendar interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting inverted bounds
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(DateRange { start, end })
    }

    /// Range of `days` calendar days ending on `end` (inclusive)
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        let span = days.saturating_sub(1) as u64;
        let start = end
            .checked_sub_days(chrono::Days::new(span))
            .unwrap_or(NaiveDate::MIN);
        DateRange { start, end }
    }

    /// Monday to Sunday of an ISO week; `None` for a week the year lacks
    pub fn iso_week(year: i32, week: u32) -> Option<Self> {
        let start = NaiveDate::from_isoywd_opt(year, week, chrono::Weekday::Mon)?;
        let end = NaiveDate::from_isoywd_opt(year, week, chrono::Weekday::Sun)?;
        Some(DateRange { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_wellness_sample_from_upstream_json() {
        let json = r#"{
            "id": "2024-05-02",
            "hrv": 52.0,
            "restingHR": 44,
            "sleepScore": 81,
            "BodyBatteryMax": 90,
            "BodyBatteryMin": 20,
            "atl": 55.3,
            "ctl": 61.0,
            "weight": 71.2
        }"#;

        let sample: WellnessSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.date, date(2024, 5, 2));
        assert_eq!(sample.hrv, Some(52.0));
        assert_eq!(sample.resting_hr, Some(44.0));
        assert_eq!(sample.sleep_score, Some(81.0));
        assert_eq!(sample.body_battery_max, Some(90.0));
        assert!((sample.tsb().unwrap() - 5.7).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fields_are_none() {
        let sample: WellnessSample =
            serde_json::from_str(r#"{"id": "2024-05-02", "hrv": null}"#).unwrap();
        assert_eq!(sample.metric(Metric::Hrv), None);
        assert_eq!(sample.metric(Metric::RestingHr), None);
        assert_eq!(sample.tsb(), None);
    }

    #[test]
    fn test_non_finite_values_are_treated_as_missing() {
        let sample = WellnessSample {
            hrv: Some(f64::NAN),
            ..WellnessSample::new(date(2024, 5, 2))
        };
        assert_eq!(sample.metric(Metric::Hrv), None);
    }

    #[test]
    fn test_activity_efficiency() {
        let ride = ActivitySample {
            normalized_power: Some(210.0),
            average_power: Some(180.0),
            average_hr: Some(140.0),
            ..ActivitySample::new(date(2024, 5, 2), ActivityType::Ride)
        };
        assert!((ride.efficiency_factor().unwrap() - 1.5).abs() < 1e-9);
        assert!((ride.power_to_hr().unwrap() - 180.0 / 140.0).abs() < 1e-9);

        let no_hr = ActivitySample::new(date(2024, 5, 2), ActivityType::Ride);
        assert_eq!(no_hr.efficiency_factor(), None);
    }

    #[test]
    fn test_activity_type_parsing() {
        assert_eq!(ActivityType::from_api("VirtualRide"), ActivityType::VirtualRide);
        assert!(ActivityType::from_api("Ride").is_cycling());
        assert!(!ActivityType::from_api("Swim").is_cycling());
        assert_eq!(ActivityType::from_api("Swim").to_string(), "Swim");
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::ending_on(date(2024, 5, 7), 7);
        assert_eq!(range.start, date(2024, 5, 1));
        assert_eq!(range.days(), 7);
        assert!(range.contains(date(2024, 5, 4)));
        assert!(!range.contains(date(2024, 4, 30)));
        assert!(DateRange::new(date(2024, 5, 2), date(2024, 5, 1)).is_none());
    }

    #[test]
    fn test_iso_week_range() {
        // ISO week 1 of 2025 starts in December 2024
        let week = DateRange::iso_week(2025, 1).unwrap();
        assert_eq!(week.start, date(2024, 12, 30));
        assert_eq!(week.end, date(2025, 1, 5));
        assert_eq!(week.days(), 7);

        assert!(DateRange::iso_week(2020, 53).is_some());
        assert!(DateRange::iso_week(2021, 53).is_none());
        assert!(DateRange::iso_week(2024, 0).is_none());
    }

    #[test]
    fn test_planned_workout_structure() {
        let mut workout = PlannedWorkout {
            training_load: Some(0.0),
            description: Some("  None ".to_string()),
            ..PlannedWorkout::new(date(2024, 5, 2))
        };
        assert!(!workout.has_load());
        assert_eq!(workout.structure(), None);

        workout.training_load = Some(65.0);
        workout.description = Some("3x10min Z4\n".to_string());
        assert!(workout.has_load());
        assert_eq!(workout.structure(), Some("3x10min Z4"));
    }
}
