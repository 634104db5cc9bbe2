//! Load/wellness correlations over weekly means
//!
//! Builds the weekly table (training stress plus mean ATL, CTL, resting HR,
//! HRV and sleep score), computes a pairwise Pearson matrix and reads the
//! pairs that matter for training: ATL vs HRV, CTL vs HRV and weekly stress
//! vs sleep.

use crate::baseline::{BaselineCalculator, WeeklyAggregate};
use crate::models::ActivitySample;
use crate::stats;
use crate::store::WellnessStore;
use crate::weekly::TrainingTotals;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Columns of the weekly correlation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeeklyColumn {
    WeeklyTss,
    Atl,
    Ctl,
    RestingHr,
    Hrv,
    SleepScore,
}

impl WeeklyColumn {
    pub const ALL: [WeeklyColumn; 6] = [
        WeeklyColumn::WeeklyTss,
        WeeklyColumn::Atl,
        WeeklyColumn::Ctl,
        WeeklyColumn::RestingHr,
        WeeklyColumn::Hrv,
        WeeklyColumn::SleepScore,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WeeklyColumn::WeeklyTss => "Weekly TSS",
            WeeklyColumn::Atl => "ATL",
            WeeklyColumn::Ctl => "CTL",
            WeeklyColumn::RestingHr => "RHR",
            WeeklyColumn::Hrv => "HRV",
            WeeklyColumn::SleepScore => "Sleep",
        }
    }
}

impl fmt::Display for WeeklyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One week of the correlation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRow {
    pub week: WeeklyAggregate,
    pub weekly_tss: f64,
}

impl WeeklyRow {
    pub fn value(&self, column: WeeklyColumn) -> Option<f64> {
        match column {
            WeeklyColumn::WeeklyTss => Some(self.weekly_tss),
            WeeklyColumn::Atl => self.week.atl,
            WeeklyColumn::Ctl => self.week.ctl,
            WeeklyColumn::RestingHr => self.week.resting_hr,
            WeeklyColumn::Hrv => self.week.hrv,
            WeeklyColumn::SleepScore => self.week.sleep_score,
        }
    }
}

/// Symmetric Pearson matrix over [`WeeklyColumn::ALL`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub weeks: usize,
    /// Row-major coefficients, `None` where the pair cannot be correlated
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn from_rows(rows: &[WeeklyRow]) -> Self {
        let values = WeeklyColumn::ALL
            .iter()
            .map(|&a| {
                WeeklyColumn::ALL
                    .iter()
                    .map(|&b| {
                        let pairs: Vec<(Option<f64>, Option<f64>)> =
                            rows.iter().map(|r| (r.value(a), r.value(b))).collect();
                        stats::pearson(&pairs)
                    })
                    .collect()
            })
            .collect();

        CorrelationMatrix {
            weeks: rows.len(),
            values,
        }
    }

    pub fn get(&self, a: WeeklyColumn, b: WeeklyColumn) -> Option<f64> {
        let i = WeeklyColumn::ALL.iter().position(|c| *c == a)?;
        let j = WeeklyColumn::ALL.iter().position(|c| *c == b)?;
        self.values.get(i)?.get(j).copied().flatten()
    }
}

/// Tone of a coaching interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Info,
    Warning,
}

/// Plain-language reading of one coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub first: WeeklyColumn,
    pub second: WeeklyColumn,
    pub coefficient: f64,
    pub tone: Tone,
    pub message: String,
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} ({:.2}): {}",
            self.first, self.second, self.coefficient, self.message
        )
    }
}

/// Weekly table builder and interpreter
#[derive(Debug, Clone, Default)]
pub struct CorrelationAnalyzer {
    baselines: BaselineCalculator,
    strength_session_load: f64,
}

impl CorrelationAnalyzer {
    pub fn new(baselines: BaselineCalculator, strength_session_load: f64) -> Self {
        CorrelationAnalyzer {
            baselines,
            strength_session_load,
        }
    }

    /// Weekly rows, oldest first; weeks lacking RHR, HRV, ATL or CTL are dropped
    pub fn weekly_rows(
        &self,
        store: &WellnessStore,
        activities: &[ActivitySample],
        reference: NaiveDate,
    ) -> Vec<WeeklyRow> {
        self.baselines
            .weekly_table(store, reference)
            .into_iter()
            .filter(|w| {
                w.resting_hr.is_some() && w.hrv.is_some() && w.atl.is_some() && w.ctl.is_some()
            })
            .map(|week| {
                let in_week = activities.iter().filter(|a| week.range.contains(a.date));
                let totals = TrainingTotals::from_activities(in_week, self.strength_session_load);
                WeeklyRow {
                    weekly_tss: totals.realized_tss,
                    week,
                }
            })
            .collect()
    }

    pub fn analyze(
        &self,
        store: &WellnessStore,
        activities: &[ActivitySample],
        reference: NaiveDate,
    ) -> (Vec<WeeklyRow>, CorrelationMatrix) {
        let rows = self.weekly_rows(store, activities, reference);
        let matrix = CorrelationMatrix::from_rows(&rows);
        debug!(%reference, weeks = rows.len(), "Correlation matrix built");
        (rows, matrix)
    }

    /// Read the training-relevant pairs of a matrix
    pub fn interpret(matrix: &CorrelationMatrix) -> Vec<Interpretation> {
        let mut notes = Vec::new();
        let mut push = |first, second, coefficient, tone, message: &str| {
            notes.push(Interpretation {
                first,
                second,
                coefficient,
                tone,
                message: message.to_string(),
            })
        };

        if let Some(r) = matrix.get(WeeklyColumn::Atl, WeeklyColumn::Hrv) {
            if r < -0.5 {
                push(
                    WeeklyColumn::Atl,
                    WeeklyColumn::Hrv,
                    r,
                    Tone::Info,
                    "strong negative relation: HRV drops predictably as acute fatigue rises",
                );
            } else if r < -0.2 {
                push(
                    WeeklyColumn::Atl,
                    WeeklyColumn::Hrv,
                    r,
                    Tone::Info,
                    "moderate negative relation: HRV tends to fall with load, other stressors also weigh in",
                );
            } else {
                push(
                    WeeklyColumn::Atl,
                    WeeklyColumn::Hrv,
                    r,
                    Tone::Info,
                    "no clear negative relation: fatigue is well tolerated or HRV responds to other stimuli",
                );
            }
        }

        if let Some(r) = matrix.get(WeeklyColumn::Ctl, WeeklyColumn::Hrv) {
            if r > 0.4 {
                push(
                    WeeklyColumn::Ctl,
                    WeeklyColumn::Hrv,
                    r,
                    Tone::Positive,
                    "positive relation: HRV has risen along with fitness, training is being absorbed",
                );
            }
        }

        if let Some(r) = matrix.get(WeeklyColumn::WeeklyTss, WeeklyColumn::SleepScore) {
            if r < -0.4 {
                push(
                    WeeklyColumn::WeeklyTss,
                    WeeklyColumn::SleepScore,
                    r,
                    Tone::Warning,
                    "negative relation: heavy weeks come with worse sleep, watch recovery",
                );
            } else {
                push(
                    WeeklyColumn::WeeklyTss,
                    WeeklyColumn::SleepScore,
                    r,
                    Tone::Info,
                    "no clear relation between weekly load and sleep",
                );
            }
        }

        notes
    }
}
