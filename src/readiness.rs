//! Readiness assessment pipeline
//!
//! [`ReadinessEngine`] runs the pure part of one request over an in-memory
//! store: rolling references, score, trend alerts, verdict and baselines.
//! [`ReadinessService`] adds the fetch: it pulls a bounded window from a
//! [`WellnessSource`], builds the store and hands it to the engine.
//!
//! Nothing is kept between requests; each call re-derives everything from a
//! freshly fetched window.

use crate::baseline::{BaselineCalculator, BaselineConfig, BaselineSet, WeeklyAggregate};
use crate::correlation::{CorrelationAnalyzer, CorrelationMatrix, WeeklyRow};
use crate::efficiency::{EfficiencyAnalyzer, EfficiencyReport};
use crate::error::{ReadyRsError, Result};
use crate::history::{self, RideLoad};
use crate::models::{ActivitySample, DateRange, Metric, PlannedWorkout, WellnessSample};
use crate::notify::NotificationSink;
use crate::plan::{SessionReview, WeekPlan};
use crate::scoring::{Assessment, BreakdownLine, ScoringInput, ScoringPolicy, ScoringStrategy};
use crate::source::WellnessSource;
use crate::store::{MetricDelta, WellnessStore};
use crate::trends::{Alert, TrendConfig, TrendDetector};
use crate::verdict::{Verdict, VerdictThresholds};
use crate::weekly::{WeekSummary, WeeklyAnalyzer};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Rolling windows and fetch spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Horizons {
    /// Previous recorded days behind the trailing HRV/RHR means
    pub trailing_samples: usize,

    /// Previous recorded days behind the HRV distribution
    pub distribution_samples: usize,

    /// Widest span between two compared days, counted inclusively
    pub recent_days: u32,

    /// Calendar days fetched for assessments and baselines
    pub history_days: u32,
}

impl Default for Horizons {
    fn default() -> Self {
        Horizons {
            trailing_samples: 7,
            distribution_samples: 28,
            recent_days: 60,
            history_days: 84,
        }
    }
}

/// Everything the engine needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub policy: ScoringPolicy,
    pub thresholds: VerdictThresholds,
    pub horizons: Horizons,
    pub baseline: BaselineConfig,
    pub trends: TrendConfig,
}

impl EngineConfig {
    /// Defaults for a policy, including its verdict thresholds
    pub fn for_policy(policy: ScoringPolicy) -> Self {
        EngineConfig {
            policy,
            thresholds: VerdictThresholds::for_policy(policy),
            horizons: Horizons::default(),
            baseline: BaselineConfig::default(),
            trends: TrendConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_policy(ScoringPolicy::default())
    }
}

/// Outcome of one readiness assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub date: NaiveDate,
    pub policy: ScoringPolicy,
    /// Composite score, 0..=100
    pub score: u8,
    pub max_attainable: u8,
    pub breakdown: Vec<BreakdownLine>,
    pub verdict: Verdict,
    pub alerts: Vec<Alert>,
    pub baselines: BaselineSet,
    /// The scored day as fetched
    pub snapshot: WellnessSample,
}

impl ReadinessResult {
    /// Quick checklist: one assessment per scored metric
    pub fn checklist(&self) -> Vec<(Metric, Assessment)> {
        self.breakdown
            .iter()
            .map(|line| (line.metric, line.assessment))
            .collect()
    }

    /// True when some metric could not be scored
    pub fn is_partial(&self) -> bool {
        self.max_attainable < crate::scoring::MAX_SCORE
    }
}

/// Daily digest content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub date: NaiveDate,
    /// `None` when the day has no wellness row
    pub snapshot: Option<WellnessSample>,
    pub alerts: Vec<Alert>,
}

/// Pure assessment over an in-memory store
pub struct ReadinessEngine {
    config: EngineConfig,
    strategy: Box<dyn ScoringStrategy>,
    baselines: BaselineCalculator,
    trends: TrendDetector,
}

impl ReadinessEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.thresholds.validate()?;
        if config.horizons.trailing_samples == 0 || config.horizons.distribution_samples == 0 {
            return Err(ReadyRsError::Configuration(
                "rolling windows must hold at least one sample".to_string(),
            ));
        }

        Ok(ReadinessEngine {
            strategy: config.policy.strategy(),
            baselines: BaselineCalculator::with_config(config.baseline.clone()),
            trends: TrendDetector::new(config.trends.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn baseline_calculator(&self) -> &BaselineCalculator {
        &self.baselines
    }

    pub fn trend_detector(&self) -> &TrendDetector {
        &self.trends
    }

    /// Score `date` against the history held in `store`
    ///
    /// Fails with `DataUnavailable` when the store is empty or has no row for
    /// `date`; no score is ever fabricated.
    pub fn analyze(&self, store: &WellnessStore, date: NaiveDate) -> Result<ReadinessResult> {
        if store.is_empty() {
            return Err(ReadyRsError::no_data(date, "no wellness rows in the fetched window"));
        }
        let today = store
            .get(date)
            .ok_or_else(|| ReadyRsError::no_data(date, "no wellness row for the day"))?;

        let input = ScoringInput::gather(
            store,
            today,
            self.config.horizons.trailing_samples,
            self.config.horizons.distribution_samples,
        );
        let card = self.strategy.score(&input);
        let alerts = self.trends.detect(store, date);
        let verdict = self.config.thresholds.classify(card.score, &alerts);
        let baselines = self.baselines.compute(store, date);

        debug!(
            %date,
            score = card.score,
            max = card.max_attainable,
            alerts = alerts.len(),
            %verdict,
            "Assessment complete"
        );

        Ok(ReadinessResult {
            date,
            policy: self.strategy.policy(),
            score: card.score,
            max_attainable: card.max_attainable,
            breakdown: card.breakdown,
            verdict,
            alerts,
            baselines,
            snapshot: today.clone(),
        })
    }
}

/// Fetch-then-assess front end over a wellness source
pub struct ReadinessService<S> {
    source: S,
    athlete_id: String,
    engine: ReadinessEngine,
}

impl<S: WellnessSource> ReadinessService<S> {
    pub fn new(source: S, athlete_id: impl Into<String>, engine: ReadinessEngine) -> Self {
        ReadinessService {
            source,
            athlete_id: athlete_id.into(),
            engine,
        }
    }

    pub fn engine(&self) -> &ReadinessEngine {
        &self.engine
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Window fetched for an assessment of `date`
    pub fn history_window(&self, date: NaiveDate) -> DateRange {
        DateRange::ending_on(date, self.engine.config.horizons.history_days)
    }

    pub fn fetch_store(&self, range: DateRange) -> Result<WellnessStore> {
        let rows = self.source.fetch_wellness(&self.athlete_id, range)?;
        Ok(WellnessStore::from_samples(rows))
    }

    pub fn fetch_activities(&self, range: DateRange) -> Result<Vec<ActivitySample>> {
        self.source.fetch_activities(&self.athlete_id, range)
    }

    pub fn fetch_events(&self, range: DateRange) -> Result<Vec<PlannedWorkout>> {
        self.source.fetch_events(&self.athlete_id, range)
    }

    /// Full readiness assessment of one day
    #[instrument(skip(self), fields(athlete = %self.athlete_id))]
    pub fn assess(&self, date: NaiveDate) -> Result<ReadinessResult> {
        let range = self.history_window(date);
        let store = self.fetch_store(range)?;
        info!(rows = store.len(), %range, "Wellness window loaded");

        let result = self.engine.analyze(&store, date)?;
        info!(score = result.score, verdict = %result.verdict, "Readiness assessed");
        Ok(result)
    }

    /// Assess and push the rendered result to a sink
    ///
    /// A delivery failure is logged and does not fail the assessment.
    pub fn assess_and_notify<F>(
        &self,
        date: NaiveDate,
        sink: &dyn NotificationSink,
        render: F,
    ) -> Result<ReadinessResult>
    where
        F: FnOnce(&ReadinessResult) -> String,
    {
        let result = self.assess(date)?;
        if let Err(e) = sink.deliver(&render(&result)) {
            warn!(sink = sink.name(), error = %e, "Notification not delivered");
        }
        Ok(result)
    }

    /// Weekly table and baselines as of `date`
    #[instrument(skip(self), fields(athlete = %self.athlete_id))]
    pub fn baselines(&self, date: NaiveDate) -> Result<(Vec<WeeklyAggregate>, BaselineSet)> {
        let store = self.fetch_store(self.history_window(date))?;
        if store.is_empty() {
            return Err(ReadyRsError::no_data(date, "no wellness rows in the fetched window"));
        }
        let calculator = self.engine.baseline_calculator();
        let weeks = calculator.weekly_table(&store, date);
        let set = calculator.from_weekly(&weeks);
        Ok((weeks, set))
    }

    /// Metric-by-metric comparison of two days
    #[instrument(skip(self), fields(athlete = %self.athlete_id))]
    pub fn compare(&self, first: NaiveDate, second: NaiveDate) -> Result<Vec<MetricDelta>> {
        let (start, end) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        let recent_days = self.engine.config.horizons.recent_days;
        let range = DateRange::ending_on(end, recent_days);
        if !range.contains(start) {
            return Err(ReadyRsError::Configuration(format!(
                "{} and {} are more than {} days apart",
                start, end, recent_days
            )));
        }
        let store = self.fetch_store(range)?;

        for day in [first, second] {
            if store.get(day).is_none() {
                return Err(ReadyRsError::no_data(day, "no wellness row for the day"));
            }
        }
        Ok(store.compare(first, second))
    }

    /// Snapshot plus digest deviations for `date`
    #[instrument(skip(self), fields(athlete = %self.athlete_id))]
    pub fn digest(&self, date: NaiveDate) -> Result<Digest> {
        let detector = self.engine.trend_detector();
        let range = DateRange::ending_on(date, detector.config().digest.window_days);
        let store = self.fetch_store(range)?;

        Ok(Digest {
            date,
            snapshot: store.get(date).cloned(),
            alerts: detector.digest_deviations(&store, date),
        })
    }

    /// Weekly load summaries ending on `end`
    #[instrument(skip(self, analyzer), fields(athlete = %self.athlete_id))]
    pub fn weekly(&self, analyzer: &WeeklyAnalyzer, end: NaiveDate) -> Result<Vec<WeekSummary>> {
        let range = analyzer.window(end);
        let store = self.fetch_store(range)?;
        if store.is_empty() {
            return Err(ReadyRsError::no_data(end, "no wellness rows in the analyzed weeks"));
        }
        let activities = self.fetch_activities(range)?;
        Ok(analyzer.analyze(&store, &activities, end))
    }

    /// Weekly correlation table and matrix as of `reference`
    #[instrument(skip(self, analyzer), fields(athlete = %self.athlete_id))]
    pub fn correlations(
        &self,
        analyzer: &CorrelationAnalyzer,
        reference: NaiveDate,
    ) -> Result<(Vec<WeeklyRow>, CorrelationMatrix)> {
        let range = self.history_window(reference);
        let store = self.fetch_store(range)?;
        if store.is_empty() {
            return Err(ReadyRsError::no_data(
                reference,
                "no wellness rows in the fetched window",
            ));
        }
        let activities = self.fetch_activities(range)?;
        Ok(analyzer.analyze(&store, &activities, reference))
    }

    /// Workouts planned in an ISO week; an empty plan is not an error
    #[instrument(skip(self), fields(athlete = %self.athlete_id))]
    pub fn week_plan(&self, year: i32, week: u32) -> Result<WeekPlan> {
        let range = WeekPlan::range_of(year, week)?;
        let workouts = self.fetch_events(range)?;
        info!(workouts = workouts.len(), %range, "Week plan loaded");
        WeekPlan::new(year, week, workouts)
    }

    /// Plan-vs-actual review of the day's first ride
    #[instrument(skip(self), fields(athlete = %self.athlete_id))]
    pub fn review(&self, date: NaiveDate) -> Result<SessionReview> {
        let range = DateRange::ending_on(date, 1);
        let activities = self.fetch_activities(range)?;
        let workouts = self.fetch_events(range)?;
        SessionReview::build(date, &workouts, &activities)
            .ok_or_else(|| ReadyRsError::no_data(date, "no ride recorded on the day"))
    }

    /// Rolling ride efficiency as of `date`
    #[instrument(skip(self, analyzer), fields(athlete = %self.athlete_id))]
    pub fn efficiency(
        &self,
        analyzer: &EfficiencyAnalyzer,
        date: NaiveDate,
    ) -> Result<EfficiencyReport> {
        let activities = self.fetch_activities(analyzer.window(date))?;
        if !activities.iter().any(|a| a.activity_type.is_cycling()) {
            return Err(ReadyRsError::no_data(date, "no rides in the analyzed periods"));
        }
        Ok(analyzer.analyze(&activities, date))
    }

    /// Rides in `range` with their load values, newest first
    #[instrument(skip(self), fields(athlete = %self.athlete_id))]
    pub fn ride_history(&self, range: DateRange) -> Result<Vec<RideLoad>> {
        let activities = self.fetch_activities(range)?;
        Ok(history::ride_history(&activities, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::Severity;
    use chrono::Days;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + Days::new(offset)
    }

    fn steady(days: u64) -> Vec<WellnessSample> {
        (0..days)
            .map(|d| WellnessSample {
                hrv: Some(if d % 2 == 0 { 50.0 } else { 54.0 }),
                resting_hr: Some(44.0),
                sleep_score: Some(84.0),
                atl: Some(40.0),
                ctl: Some(55.0),
                ..WellnessSample::new(day(d))
            })
            .collect()
    }

    #[test]
    fn test_empty_store_is_data_unavailable() {
        let engine = ReadinessEngine::new(EngineConfig::default()).unwrap();
        let err = engine
            .analyze(&WellnessStore::default(), day(0))
            .err()
            .unwrap();
        assert!(err.is_data_unavailable());
    }

    #[test]
    fn test_missing_day_is_data_unavailable() {
        let engine = ReadinessEngine::new(EngineConfig::default()).unwrap();
        let store = WellnessStore::from_samples(steady(10));
        let err = engine.analyze(&store, day(20)).err().unwrap();
        assert!(err.is_data_unavailable());
    }

    #[test]
    fn test_steady_athlete_is_green() {
        let engine = ReadinessEngine::new(EngineConfig::default()).unwrap();
        let store = WellnessStore::from_samples(steady(40));
        let result = engine.analyze(&store, day(39)).unwrap();

        // HRV 54 sits above mean + 0.5 sd of the alternating series
        assert_eq!(result.score, 100);
        assert_eq!(result.verdict, Verdict::Green);
        assert!(result.alerts.is_empty());
        assert!(!result.is_partial());
        assert!(result.baselines.chronic.is_some());
        assert_eq!(result.checklist().len(), 3);
    }

    #[test]
    fn test_spike_forces_red_despite_high_score() {
        let mut samples = steady(40);
        samples[39].resting_hr = Some(45.0);
        samples[37].resting_hr = Some(41.0);
        let store = WellnessStore::from_samples(samples);

        let engine = ReadinessEngine::new(EngineConfig::default()).unwrap();
        let result = engine.analyze(&store, day(39)).unwrap();
        assert!(result.score >= 90);
        assert!(result.alerts.iter().any(|a| a.severity == Severity::High));
        assert_eq!(result.verdict, Verdict::Red);
    }

    #[test]
    fn test_policy_switch_changes_thresholds() {
        let config = EngineConfig::for_policy(ScoringPolicy::SimpleAverage);
        assert_eq!(config.thresholds.green, 75);
        let engine = ReadinessEngine::new(config).unwrap();
        let store = WellnessStore::from_samples(steady(40));
        let result = engine.analyze(&store, day(39)).unwrap();
        assert_eq!(result.policy, ScoringPolicy::SimpleAverage);
        assert_eq!(result.breakdown.len(), 4);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let mut config = EngineConfig::default();
        config.thresholds = VerdictThresholds {
            green: 40,
            yellow: 60,
        };
        assert!(ReadinessEngine::new(config).is_err());

        let mut config = EngineConfig::default();
        config.horizons.trailing_samples = 0;
        assert!(ReadinessEngine::new(config).is_err());
    }
}
