//! Per-ride training load history
//!
//! One row per ride in a date range, newest first, carrying the session's
//! stress and intensity next to the fitness (CTL), fatigue (ATL) and form
//! (TSB = CTL - ATL) values recorded after it.

use crate::error::{ReadyRsError, Result};
use crate::models::{ActivitySample, DateRange};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideLoad {
    pub date: NaiveDate,
    pub name: Option<String>,
    pub moving_time: Option<u32>,
    pub training_load: Option<f64>,
    pub intensity_factor: Option<f64>,
    pub normalized_power: Option<f64>,
    pub average_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub decoupling: Option<f64>,
    pub ctl: Option<f64>,
    pub atl: Option<f64>,
    pub tsb: Option<f64>,
}

impl RideLoad {
    pub fn from_activity(activity: &ActivitySample) -> Self {
        let tsb = match (activity.ctl, activity.atl) {
            (Some(ctl), Some(atl)) => Some(ctl - atl),
            _ => None,
        };
        RideLoad {
            date: activity.date,
            name: activity.name.clone(),
            moving_time: activity.moving_time,
            training_load: activity.training_load,
            intensity_factor: activity.intensity_factor,
            normalized_power: activity.normalized_power,
            average_hr: activity.average_hr,
            max_hr: activity.max_hr,
            decoupling: activity.decoupling,
            ctl: activity.ctl,
            atl: activity.atl,
            tsb,
        }
    }
}

/// Inclusive range from explicit bounds, rejecting `from > to`
pub fn history_range(from: NaiveDate, to: NaiveDate) -> Result<DateRange> {
    DateRange::new(from, to).ok_or_else(|| {
        ReadyRsError::Configuration(format!("start {} is after end {}", from, to))
    })
}

/// Rides within `range`, newest first
///
/// Rides on the same day keep their upstream order.
pub fn ride_history(activities: &[ActivitySample], range: DateRange) -> Vec<RideLoad> {
    let mut rows: Vec<RideLoad> = activities
        .iter()
        .filter(|a| a.activity_type.is_cycling() && range.contains(a.date))
        .map(RideLoad::from_activity)
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn ride(d: u32, name: &str, ctl: f64, atl: f64) -> ActivitySample {
        ActivitySample {
            name: Some(name.to_string()),
            ctl: Some(ctl),
            atl: Some(atl),
            ..ActivitySample::new(day(d), ActivityType::VirtualRide)
        }
    }

    #[test]
    fn test_history_is_newest_first_with_form() {
        let activities = vec![
            ride(2, "Endurance", 60.0, 55.0),
            ActivitySample::new(day(3), ActivityType::WeightTraining),
            ride(4, "VO2", 61.5, 70.0),
            ride(4, "Cooldown", 61.6, 70.5),
            ride(12, "Outside", 62.0, 60.0),
        ];
        let rows = ride_history(&activities, history_range(day(1), day(10)).unwrap());

        let names: Vec<&str> = rows.iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["VO2", "Cooldown", "Endurance"]);
        assert_eq!(rows[0].tsb, Some(-8.5));
        assert_eq!(rows[2].tsb, Some(5.0));
    }

    #[test]
    fn test_missing_load_values_leave_form_empty() {
        let activity = ActivitySample {
            ctl: Some(50.0),
            ..ActivitySample::new(day(5), ActivityType::Ride)
        };
        assert_eq!(RideLoad::from_activity(&activity).tsb, None);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(matches!(
            history_range(day(10), day(1)),
            Err(ReadyRsError::Configuration(_))
        ));
    }
}
