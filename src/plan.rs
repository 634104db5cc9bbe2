//! Planned workouts and plan-vs-actual session review
//!
//! [`WeekPlan`] lists the workouts scheduled in one ISO week.
//! [`SessionReview`] sets the first ride of a day against the first workout
//! planned for it: duration, training stress and intensity factor deltas,
//! aerobic decoupling and time in zones.
//!
//! A planned workout with no positive training stress is treated as no plan,
//! so rest-day placeholders never produce deltas.

use crate::error::{ReadyRsError, Result};
use crate::models::{ActivitySample, DateRange, PlannedWorkout, ZONE_COUNT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoupling (Pw:HR drift) below this percentage is a good aerobic session
pub const DECOUPLING_LIMIT_PCT: f64 = 5.0;

/// Workouts planned within one ISO week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub year: i32,
    pub week: u32,
    pub range: DateRange,
    pub workouts: Vec<PlannedWorkout>,
}

impl WeekPlan {
    /// Monday to Sunday of `week`, rejecting weeks the year does not have
    pub fn range_of(year: i32, week: u32) -> Result<DateRange> {
        DateRange::iso_week(year, week).ok_or_else(|| {
            ReadyRsError::Configuration(format!("{} has no ISO week {}", year, week))
        })
    }

    pub fn new(year: i32, week: u32, workouts: Vec<PlannedWorkout>) -> Result<Self> {
        let range = Self::range_of(year, week)?;
        let workouts = workouts
            .into_iter()
            .filter(|w| range.contains(w.date))
            .collect();
        Ok(WeekPlan {
            year,
            week,
            range,
            workouts,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    /// Planned stress summed over the week
    pub fn total_load(&self) -> f64 {
        self.workouts
            .iter()
            .filter_map(|w| w.training_load)
            .filter(|l| l.is_finite())
            .sum()
    }

    /// Planned time in seconds summed over the week
    pub fn total_time(&self) -> u32 {
        self.workouts
            .iter()
            .filter_map(|w| w.moving_time)
            .fold(0u32, u32::saturating_add)
    }
}

/// Planned against realized value of one session metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanDelta {
    pub planned: f64,
    pub actual: f64,
}

impl PlanDelta {
    /// Only a positive plan yields a delta; a missing actual counts as zero
    pub fn new(planned: Option<f64>, actual: Option<f64>) -> Option<Self> {
        let planned = planned.filter(|p| p.is_finite() && *p > 0.0)?;
        Some(PlanDelta {
            planned,
            actual: actual.filter(|a| a.is_finite()).unwrap_or(0.0),
        })
    }

    /// Actual minus planned
    pub fn change(&self) -> f64 {
        self.actual - self.planned
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecouplingStatus {
    /// Below the limit: heart rate held steady against power
    Good,
    /// At or above the limit: aerobic drift
    Drifting,
}

impl DecouplingStatus {
    pub fn classify(decoupling_pct: f64) -> Self {
        if decoupling_pct < DECOUPLING_LIMIT_PCT {
            DecouplingStatus::Good
        } else {
            DecouplingStatus::Drifting
        }
    }
}

impl fmt::Display for DecouplingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limit = DECOUPLING_LIMIT_PCT;
        match self {
            DecouplingStatus::Good => write!(f, "good aerobic efficiency (< {:.0}%)", limit),
            DecouplingStatus::Drifting => write!(f, "high decoupling (>= {:.0}%)", limit),
        }
    }
}

/// Share of total time per zone in percent; `None` when no time was recorded
pub fn zone_shares(times: &[u32; ZONE_COUNT]) -> Option<[f64; ZONE_COUNT]> {
    let total: u64 = times.iter().map(|t| u64::from(*t)).sum();
    if total == 0 {
        return None;
    }
    let mut shares = [0.0; ZONE_COUNT];
    for (share, secs) in shares.iter_mut().zip(times) {
        *share = f64::from(*secs) / total as f64 * 100.0;
    }
    Some(shares)
}

/// One day's ride set against its plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReview {
    pub date: NaiveDate,
    /// First workout with planned stress on the day
    pub planned: Option<PlannedWorkout>,
    /// First ride on the day
    pub actual: ActivitySample,
    pub duration: Option<PlanDelta>,
    pub training_load: Option<PlanDelta>,
    pub intensity: Option<PlanDelta>,
    pub decoupling: Option<DecouplingStatus>,
}

impl SessionReview {
    /// Review of `date`; `None` when no ride was recorded that day
    pub fn build(
        date: NaiveDate,
        workouts: &[PlannedWorkout],
        activities: &[ActivitySample],
    ) -> Option<Self> {
        let actual = activities
            .iter()
            .find(|a| a.date == date && a.activity_type.is_cycling())?
            .clone();
        let planned = workouts
            .iter()
            .find(|w| w.date == date)
            .filter(|w| w.has_load())
            .cloned();

        let plan = planned.as_ref();
        Some(SessionReview {
            date,
            duration: PlanDelta::new(
                plan.and_then(|p| p.moving_time).map(f64::from),
                actual.moving_time.map(f64::from),
            ),
            training_load: PlanDelta::new(
                plan.and_then(|p| p.training_load),
                actual.training_load,
            ),
            intensity: PlanDelta::new(
                plan.and_then(|p| p.intensity_factor),
                actual.intensity_factor,
            ),
            decoupling: actual
                .decoupling
                .filter(|d| d.is_finite())
                .map(DecouplingStatus::classify),
            planned,
            actual,
        })
    }

    pub fn was_planned(&self) -> bool {
        self.planned.is_some()
    }

    pub fn power_zone_shares(&self) -> Option<[f64; ZONE_COUNT]> {
        zone_shares(&self.actual.power_zone_times)
    }

    pub fn hr_zone_shares(&self) -> Option<[f64; ZONE_COUNT]> {
        zone_shares(&self.actual.hr_zone_times)
    }
}
