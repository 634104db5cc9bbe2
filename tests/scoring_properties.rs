use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use readyrs::baseline::BaselineCalculator;
use readyrs::scoring::ScoringPolicy;
use readyrs::{EngineConfig, Metric, ReadinessEngine, Verdict, WellnessSample, WellnessStore};

type Row = (Option<f64>, Option<f64>, Option<f64>, Option<f64>, Option<f64>);

fn row() -> impl Strategy<Value = Row> {
    (
        prop::option::of(20.0f64..120.0),
        prop::option::of(35.0f64..90.0),
        prop::option::of(0.0f64..100.0),
        prop::option::of(0.0f64..150.0),
        prop::option::of(0.0f64..120.0),
    )
}

fn store_from(rows: &[Row]) -> (WellnessStore, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let samples: Vec<WellnessSample> = rows
        .iter()
        .enumerate()
        .map(|(i, (hrv, rhr, sleep, atl, ctl))| WellnessSample {
            hrv: *hrv,
            resting_hr: *rhr,
            sleep_score: *sleep,
            atl: *atl,
            ctl: *ctl,
            ..WellnessSample::new(start + Days::new(i as u64))
        })
        .collect();
    let last = start + Days::new(rows.len() as u64 - 1);
    (WellnessStore::from_samples(samples), last)
}

proptest! {
    #[test]
    fn test_score_bounds_hold_for_both_policies(rows in prop::collection::vec(row(), 1..60)) {
        let (store, today) = store_from(&rows);

        for policy in [ScoringPolicy::SimpleAverage, ScoringPolicy::StatisticalRange] {
            let engine = ReadinessEngine::new(EngineConfig::for_policy(policy)).unwrap();
            let result = engine.analyze(&store, today).unwrap();

            prop_assert!(result.score <= 100);
            prop_assert!(result.score <= result.max_attainable);

            let points: u32 = result.breakdown.iter().map(|l| l.points as u32).sum();
            prop_assert_eq!(points, result.score as u32);

            if store.get(today).and_then(|s| s.hrv).is_none() {
                prop_assert!(result.breakdown.iter().all(|l| l.metric != Metric::Hrv));
            }
            if result.alerts.iter().any(|a| a.is_high()) {
                prop_assert_eq!(result.verdict, Verdict::Red);
            }
        }
    }

    #[test]
    fn test_analysis_is_repeatable(rows in prop::collection::vec(row(), 1..40)) {
        let (store, today) = store_from(&rows);
        let engine = ReadinessEngine::new(EngineConfig::default()).unwrap();

        let first = engine.analyze(&store, today).unwrap();
        let second = engine.analyze(&store, today).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_baselines_are_bit_identical(rows in prop::collection::vec(row(), 1..90)) {
        let (store, today) = store_from(&rows);
        let calculator = BaselineCalculator::new();

        let first = calculator.compute(&store, today);
        let second = calculator.compute(&store, today);
        let bits = |set: &readyrs::BaselineSet| -> Vec<Option<u64>> {
            set.iter()
                .flat_map(|b| [b.resting_hr, b.hrv, b.sleep_score])
                .map(|v| v.map(f64::to_bits))
                .collect()
        };
        prop_assert_eq!(bits(&first), bits(&second));
        if let Some(chronic) = &first.chronic {
            prop_assert_eq!(chronic.weeks_used, 4);
        }
    }
}
