//! Readiness scoring
//!
//! Turns today's wellness sample and its rolling references into a bounded
//! 0-100 score with a per-metric breakdown.
//!
//! # Policies
//!
//! Two policies share the [`ScoringStrategy`] seam and are selected through
//! configuration:
//!
//! - **Simple average** (40/30/20/10 points): HRV and resting HR relative to
//!   the mean of the previous 7 recorded days, sleep score and acute load
//!   against fixed bands.
//! - **Statistical range** (45/35/20 points): HRV placed within the
//!   distribution (mean and standard deviation) of the previous 28 recorded
//!   days, resting HR and sleep score against fixed absolute bands.
//!
//! # Missing data
//!
//! A metric that is missing today, or whose reference cannot be computed,
//! contributes no points and no breakdown line. `max_attainable` shrinks by
//! that metric's maximum so a partial score can be read in context.

use crate::baseline::{BaselineCalculator, HrvDistribution};
use crate::models::{Metric, WellnessSample};
use crate::store::WellnessStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of every readiness score
pub const MAX_SCORE: u8 = 100;

/// Scoring policy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Relative to 7-day means, 40/30/20/10 weights
    SimpleAverage,
    /// HRV distribution over 28 days, absolute RHR bands, 45/35/20 weights
    #[default]
    StatisticalRange,
}

impl ScoringPolicy {
    /// Strategy implementing this policy
    pub fn strategy(&self) -> Box<dyn ScoringStrategy> {
        match self {
            ScoringPolicy::SimpleAverage => Box::new(SimpleAverageScorer),
            ScoringPolicy::StatisticalRange => Box::new(StatisticalRangeScorer),
        }
    }
}

impl fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringPolicy::SimpleAverage => write!(f, "simple-average"),
            ScoringPolicy::StatisticalRange => write!(f, "statistical-range"),
        }
    }
}

impl std::str::FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "simple" | "simple-average" => Ok(ScoringPolicy::SimpleAverage),
            "statistical" | "statistical-range" => Ok(ScoringPolicy::StatisticalRange),
            _ => Err(format!("Invalid scoring policy: {}", s)),
        }
    }
}

/// Checklist assessment of one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Good,
    Caution,
    Poor,
}

impl Assessment {
    pub fn symbol(&self) -> &'static str {
        match self {
            Assessment::Good => "✅",
            Assessment::Caution => "⚠️",
            Assessment::Poor => "❌",
        }
    }
}

/// How one metric contributed to the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub metric: Metric,
    /// Today's raw value
    pub value: f64,
    /// Comparison the value was judged against
    pub band: String,
    pub points: u8,
    pub max_points: u8,
    pub assessment: Assessment,
}

impl fmt::Display for BreakdownLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.metric.unit();
        let sep = if unit.is_empty() { "" } else { " " };
        write!(
            f,
            "{} {}: {:.1}{}{} ({}) -> {}/{} pts",
            self.assessment.symbol(),
            self.metric.label(),
            self.value,
            sep,
            unit,
            self.band,
            self.points,
            self.max_points
        )
    }
}

/// Score with its breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Composite score, 0..=100
    pub score: u8,
    /// Sum of the maxima of the metrics that were scored
    pub max_attainable: u8,
    pub breakdown: Vec<BreakdownLine>,
}

impl ScoreCard {
    fn from_lines(breakdown: Vec<BreakdownLine>) -> Self {
        let total: u32 = breakdown.iter().map(|l| l.points as u32).sum();
        let max: u32 = breakdown.iter().map(|l| l.max_points as u32).sum();
        ScoreCard {
            score: total.min(MAX_SCORE as u32) as u8,
            max_attainable: max.min(MAX_SCORE as u32) as u8,
            breakdown,
        }
    }

    pub fn line(&self, metric: Metric) -> Option<&BreakdownLine> {
        self.breakdown.iter().find(|l| l.metric == metric)
    }
}

/// Everything a strategy may look at for one day
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringInput<'a> {
    pub today: &'a WellnessSample,
    /// Number of previous recorded days behind the trailing means
    pub trailing_samples: usize,
    pub hrv_trailing_mean: Option<f64>,
    pub rhr_trailing_mean: Option<f64>,
    pub hrv_distribution: Option<HrvDistribution>,
}

impl<'a> ScoringInput<'a> {
    /// Derive the rolling references for `today` from the store
    pub fn gather(
        store: &WellnessStore,
        today: &'a WellnessSample,
        trailing_samples: usize,
        distribution_samples: usize,
    ) -> Self {
        let date: NaiveDate = today.date;
        ScoringInput {
            today,
            trailing_samples,
            hrv_trailing_mean: BaselineCalculator::trailing_mean(
                store,
                date,
                trailing_samples,
                Metric::Hrv,
            ),
            rhr_trailing_mean: BaselineCalculator::trailing_mean(
                store,
                date,
                trailing_samples,
                Metric::RestingHr,
            ),
            hrv_distribution: BaselineCalculator::hrv_distribution(
                store,
                date,
                distribution_samples,
            ),
        }
    }
}

/// A readiness scoring policy
pub trait ScoringStrategy {
    fn policy(&self) -> ScoringPolicy;

    /// Score one day; must stay within 0..=100 and never exceed `max_attainable`
    fn score(&self, input: &ScoringInput<'_>) -> ScoreCard;
}

/// One tier of a banded metric: points and assessment when the predicate holds
struct Tier {
    hit: bool,
    points: u8,
    assessment: Assessment,
}

fn first_tier(tiers: &[Tier], fallback: Assessment) -> (u8, Assessment) {
    tiers
        .iter()
        .find(|t| t.hit)
        .map(|t| (t.points, t.assessment))
        .unwrap_or((0, fallback))
}

fn tier(hit: bool, points: u8, assessment: Assessment) -> Tier {
    Tier {
        hit,
        points,
        assessment,
    }
}

/// 40/30/20/10 policy relative to trailing means
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAverageScorer;

impl SimpleAverageScorer {
    pub const HRV_MAX: u8 = 40;
    pub const RHR_MAX: u8 = 30;
    pub const SLEEP_MAX: u8 = 20;
    pub const LOAD_MAX: u8 = 10;

    /// HRV as a share of its trailing mean
    ///
    /// - ≥ 95 % → 40
    /// - ≥ 90 % → 20
    /// - below → 0
    fn hrv(input: &ScoringInput<'_>) -> Option<BreakdownLine> {
        let hrv = input.today.metric(Metric::Hrv)?;
        let mean = input.hrv_trailing_mean.filter(|m| *m > 0.0)?;
        let ratio = hrv / mean;
        let (points, assessment) = first_tier(
            &[
                tier(ratio >= 0.95, Self::HRV_MAX, Assessment::Good),
                tier(ratio >= 0.90, 20, Assessment::Caution),
            ],
            Assessment::Poor,
        );
        Some(BreakdownLine {
            metric: Metric::Hrv,
            value: hrv,
            band: format!(
                "{:.0}% of {}-day mean {:.1} ms",
                ratio * 100.0,
                input.trailing_samples,
                mean
            ),
            points,
            max_points: Self::HRV_MAX,
            assessment,
        })
    }

    /// Resting HR as a share of its trailing mean; lower is better
    ///
    /// - ≤ 105 % → 30
    /// - ≤ 110 % → 15
    /// - above → 0
    fn resting_hr(input: &ScoringInput<'_>) -> Option<BreakdownLine> {
        let rhr = input.today.metric(Metric::RestingHr)?;
        let mean = input.rhr_trailing_mean.filter(|m| *m > 0.0)?;
        let ratio = rhr / mean;
        let (points, assessment) = first_tier(
            &[
                tier(ratio <= 1.05, Self::RHR_MAX, Assessment::Good),
                tier(ratio <= 1.10, 15, Assessment::Caution),
            ],
            Assessment::Poor,
        );
        Some(BreakdownLine {
            metric: Metric::RestingHr,
            value: rhr,
            band: format!(
                "{:.0}% of {}-day mean {:.1} bpm",
                ratio * 100.0,
                input.trailing_samples,
                mean
            ),
            points,
            max_points: Self::RHR_MAX,
            assessment,
        })
    }

    fn sleep(input: &ScoringInput<'_>) -> Option<BreakdownLine> {
        let sleep = input.today.metric(Metric::SleepScore)?;
        let (points, assessment) = first_tier(
            &[
                tier(sleep >= 75.0, Self::SLEEP_MAX, Assessment::Good),
                tier(sleep >= 65.0, 10, Assessment::Caution),
            ],
            Assessment::Poor,
        );
        Some(BreakdownLine {
            metric: Metric::SleepScore,
            value: sleep,
            band: "good >= 75, fair >= 65".to_string(),
            points,
            max_points: Self::SLEEP_MAX,
            assessment,
        })
    }

    fn acute_load(input: &ScoringInput<'_>) -> Option<BreakdownLine> {
        let atl = input.today.metric(Metric::Atl)?;
        let (points, assessment) = first_tier(
            &[
                tier(atl < 50.0, Self::LOAD_MAX, Assessment::Good),
                tier(atl < 70.0, 5, Assessment::Caution),
            ],
            Assessment::Poor,
        );
        Some(BreakdownLine {
            metric: Metric::Atl,
            value: atl,
            band: "low < 50, moderate < 70".to_string(),
            points,
            max_points: Self::LOAD_MAX,
            assessment,
        })
    }
}

impl ScoringStrategy for SimpleAverageScorer {
    fn policy(&self) -> ScoringPolicy {
        ScoringPolicy::SimpleAverage
    }

    fn score(&self, input: &ScoringInput<'_>) -> ScoreCard {
        let lines = [
            Self::hrv(input),
            Self::resting_hr(input),
            Self::sleep(input),
            Self::acute_load(input),
        ];
        ScoreCard::from_lines(lines.into_iter().flatten().collect())
    }
}

/// 45/35/20 policy using the HRV distribution and absolute bands
///
/// Resting HR is judged against fixed absolute bands rather than the
/// athlete's own history, unlike HRV.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalRangeScorer;

impl StatisticalRangeScorer {
    pub const HRV_MAX: u8 = 45;
    pub const RHR_MAX: u8 = 35;
    pub const SLEEP_MAX: u8 = 20;

    /// HRV against the trailing distribution (mean μ, deviation σ)
    ///
    /// - ≥ μ + 0.5σ → 45
    /// - ≥ μ − 0.75σ → 30 (normal range)
    /// - ≥ μ − σ → 15
    /// - below → 0
    fn hrv(input: &ScoringInput<'_>) -> Option<BreakdownLine> {
        let hrv = input.today.metric(Metric::Hrv)?;
        let dist = input.hrv_distribution?;
        let upper = dist.mean + 0.5 * dist.std_dev;
        let lower = dist.mean - 0.75 * dist.std_dev;
        let floor = dist.mean - dist.std_dev;
        let (points, assessment) = first_tier(
            &[
                tier(hrv >= upper, Self::HRV_MAX, Assessment::Good),
                tier(hrv >= lower, 30, Assessment::Good),
                tier(hrv >= floor, 15, Assessment::Caution),
            ],
            Assessment::Poor,
        );
        Some(BreakdownLine {
            metric: Metric::Hrv,
            value: hrv,
            band: format!(
                "normal range {:.1}-{:.1} ms ({}-day mean {:.1}, sd {:.1})",
                lower, upper, dist.samples, dist.mean, dist.std_dev
            ),
            points,
            max_points: Self::HRV_MAX,
            assessment,
        })
    }

    fn resting_hr(input: &ScoringInput<'_>) -> Option<BreakdownLine> {
        let rhr = input.today.metric(Metric::RestingHr)?;
        let (points, assessment) = first_tier(
            &[
                tier(rhr <= 45.0, Self::RHR_MAX, Assessment::Good),
                tier(rhr <= 48.0, 25, Assessment::Good),
                tier(rhr <= 52.0, 10, Assessment::Caution),
            ],
            Assessment::Poor,
        );
        Some(BreakdownLine {
            metric: Metric::RestingHr,
            value: rhr,
            band: "optimal <= 45, good <= 48, fair <= 52 bpm".to_string(),
            points,
            max_points: Self::RHR_MAX,
            assessment,
        })
    }

    fn sleep(input: &ScoringInput<'_>) -> Option<BreakdownLine> {
        let sleep = input.today.metric(Metric::SleepScore)?;
        let (points, assessment) = first_tier(
            &[
                tier(sleep >= 80.0, Self::SLEEP_MAX, Assessment::Good),
                tier(sleep >= 70.0, 10, Assessment::Caution),
            ],
            Assessment::Poor,
        );
        Some(BreakdownLine {
            metric: Metric::SleepScore,
            value: sleep,
            band: "good >= 80, fair >= 70".to_string(),
            points,
            max_points: Self::SLEEP_MAX,
            assessment,
        })
    }
}

impl ScoringStrategy for StatisticalRangeScorer {
    fn policy(&self) -> ScoringPolicy {
        ScoringPolicy::StatisticalRange
    }

    fn score(&self, input: &ScoringInput<'_>) -> ScoreCard {
        let lines = [
            Self::hrv(input),
            Self::resting_hr(input),
            Self::sleep(input),
        ];
        ScoreCard::from_lines(lines.into_iter().flatten().collect())
    }
}
