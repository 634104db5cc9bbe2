//! Date-indexed store of daily wellness samples
//!
//! The store is the snapshot every analysis of one request reads from. It is
//! built once from the fetched rows and never mutated afterwards.

use crate::models::{DateRange, Metric, WellnessSample};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics shown by the day-comparison view
pub const COMPARED_METRICS: [Metric; 6] = [
    Metric::RestingHr,
    Metric::Hrv,
    Metric::SleepScore,
    Metric::BodyBatteryMax,
    Metric::BodyBatteryMin,
    Metric::Atl,
];

/// Ordered, de-duplicated wellness samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WellnessStore {
    samples: BTreeMap<NaiveDate, WellnessSample>,
}

/// Change of one metric between two days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: Metric,
    pub first: Option<f64>,
    pub second: Option<f64>,
}

impl MetricDelta {
    /// `second - first` when both days carry the metric
    pub fn change(&self) -> Option<f64> {
        match (self.first, self.second) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        }
    }
}

impl WellnessStore {
    /// Build the store; later samples for the same date replace earlier ones
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = WellnessSample>,
    {
        let mut map = BTreeMap::new();
        for sample in samples {
            map.insert(sample.date, sample);
        }
        WellnessStore { samples: map }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.samples.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.samples.keys().next_back().copied()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&WellnessSample> {
        self.samples.get(&date)
    }

    /// All samples, ascending by date
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &WellnessSample> {
        self.samples.values()
    }

    /// Samples whose date falls in the closed interval
    pub fn range(&self, range: DateRange) -> impl DoubleEndedIterator<Item = &WellnessSample> {
        self.samples.range(range.start..=range.end).map(|(_, s)| s)
    }

    /// The last `count` samples strictly before `date`, ascending
    pub fn before(&self, date: NaiveDate, count: usize) -> Vec<&WellnessSample> {
        let mut window: Vec<&WellnessSample> = self
            .samples
            .range(..date)
            .rev()
            .take(count)
            .map(|(_, s)| s)
            .collect();
        window.reverse();
        window
    }

    /// The last `count` samples on or before `date`, ascending
    pub fn up_to(&self, date: NaiveDate, count: usize) -> Vec<&WellnessSample> {
        let mut window: Vec<&WellnessSample> = self
            .samples
            .range(..=date)
            .rev()
            .take(count)
            .map(|(_, s)| s)
            .collect();
        window.reverse();
        window
    }

    /// Present values of one metric over a slice of samples
    pub fn values<'a, I>(samples: I, metric: Metric) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a WellnessSample>,
    {
        samples
            .into_iter()
            .filter_map(|s| s.metric(metric))
            .collect()
    }

    /// Per-metric comparison between two days
    ///
    /// A day missing from the store compares as all-missing.
    pub fn compare(&self, first: NaiveDate, second: NaiveDate) -> Vec<MetricDelta> {
        let a = self.get(first);
        let b = self.get(second);
        COMPARED_METRICS
            .iter()
            .map(|&metric| MetricDelta {
                metric,
                first: a.and_then(|s| s.metric(metric)),
                second: b.and_then(|s| s.metric(metric)),
            })
            .collect()
    }
}
