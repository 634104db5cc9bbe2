//! Upstream wellness and activity sources
//!
//! [`WellnessSource`] is the seam between the scoring core and the outside
//! world. Two implementations ship with the crate:
//!
//! - [`IntervalsClient`]: blocking HTTP client for the intervals.icu REST API
//! - [`FileSource`]: a JSON export on disk, for offline runs and fixtures
//!
//! Both return plain typed records: wellness rows, completed activities and
//! the workouts planned on the calendar. An empty result is not an error;
//! only a transport failure or an undecodable body is.

use crate::config::AthleteConfig;
use crate::error::{ConnectivityError, ReadyRsError, Result};
use crate::models::{
    ActivitySample, ActivityType, DateRange, PlannedWorkout, WellnessSample, ZONE_COUNT,
};
use base64::Engine;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use ureq::Agent;

/// Provider of an athlete's daily wellness rows and completed activities
pub trait WellnessSource {
    /// Wellness rows with `range.start <= date <= range.end`
    fn fetch_wellness(&self, athlete_id: &str, range: DateRange) -> Result<Vec<WellnessSample>>;

    /// Activities started within the range
    fn fetch_activities(&self, athlete_id: &str, range: DateRange) -> Result<Vec<ActivitySample>>;

    /// Planned workouts within the range, in calendar order
    fn fetch_events(&self, athlete_id: &str, range: DateRange) -> Result<Vec<PlannedWorkout>>;
}

impl<S: WellnessSource + ?Sized> WellnessSource for Box<S> {
    fn fetch_wellness(&self, athlete_id: &str, range: DateRange) -> Result<Vec<WellnessSample>> {
        (**self).fetch_wellness(athlete_id, range)
    }

    fn fetch_activities(&self, athlete_id: &str, range: DateRange) -> Result<Vec<ActivitySample>> {
        (**self).fetch_activities(athlete_id, range)
    }

    fn fetch_events(&self, athlete_id: &str, range: DateRange) -> Result<Vec<PlannedWorkout>> {
        (**self).fetch_events(athlete_id, range)
    }
}

/// Activity as delivered by the intervals.icu API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiActivity {
    /// Local start timestamp, `YYYY-MM-DDTHH:MM:SS`
    pub start_date_local: String,
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub moving_time: Option<f64>,
    #[serde(default)]
    pub icu_training_load: Option<f64>,
    /// Intensity in percent
    #[serde(default)]
    pub icu_intensity: Option<f64>,
    #[serde(default)]
    pub icu_weighted_avg_watts: Option<f64>,
    #[serde(default)]
    pub icu_average_watts: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub decoupling: Option<f64>,
    #[serde(default)]
    pub icu_power_hr_z2: Option<f64>,
    /// Seconds per heart-rate zone, Z1 first
    #[serde(default)]
    pub icu_hr_zone_times: Option<Vec<f64>>,
    #[serde(default)]
    pub icu_zone_times: Option<Vec<ApiZoneTime>>,
    #[serde(default)]
    pub icu_ctl: Option<f64>,
    #[serde(default)]
    pub icu_atl: Option<f64>,
}

/// One power zone entry, e.g. `{"id": "Z2", "secs": 1200}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiZoneTime {
    pub id: String,
    #[serde(default)]
    pub secs: f64,
}

fn seconds(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

fn hr_zones(times: Option<&[f64]>) -> [u32; ZONE_COUNT] {
    let mut zones = [0; ZONE_COUNT];
    for (slot, secs) in zones.iter_mut().zip(times.unwrap_or_default()) {
        *slot = seconds(*secs);
    }
    zones
}

/// Map `Z1`..`Z7` entries onto buckets; other ids (sweet spot etc.) are ignored
fn power_zones(times: Option<&[ApiZoneTime]>) -> [u32; ZONE_COUNT] {
    let mut zones = [0u32; ZONE_COUNT];
    for entry in times.unwrap_or_default() {
        let index = entry
            .id
            .strip_prefix('Z')
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| (1..=ZONE_COUNT).contains(n));
        if let Some(n) = index {
            zones[n - 1] = zones[n - 1].saturating_add(seconds(entry.secs));
        }
    }
    zones
}

impl ApiActivity {
    /// Local calendar day of the start timestamp
    pub fn date(&self) -> Option<NaiveDate> {
        let day = self.start_date_local.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Convert into the typed record; `None` when the start date is unreadable
    pub fn into_sample(self) -> Option<ActivitySample> {
        let date = self.date()?;
        let activity_type = self
            .activity_type
            .as_deref()
            .map(ActivityType::from_api)
            .unwrap_or_else(|| ActivityType::Other("Unknown".to_string()));

        Some(ActivitySample {
            hr_zone_times: hr_zones(self.icu_hr_zone_times.as_deref()),
            power_zone_times: power_zones(self.icu_zone_times.as_deref()),
            name: self.name,
            moving_time: self.moving_time.map(seconds),
            training_load: self.icu_training_load,
            intensity_factor: self.icu_intensity.map(|pct| pct / 100.0),
            normalized_power: self.icu_weighted_avg_watts,
            average_power: self.icu_average_watts,
            average_hr: self.average_heartrate,
            max_hr: self.max_heartrate,
            decoupling: self.decoupling,
            power_hr_z2: self.icu_power_hr_z2,
            ctl: self.icu_ctl,
            atl: self.icu_atl,
            ..ActivitySample::new(date, activity_type)
        })
    }
}

/// Calendar event as delivered by the intervals.icu API
///
/// Older event payloads carry `duration` and `intensity` instead of
/// `moving_time` and `icu_intensity`; both spellings are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEvent {
    pub start_date_local: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub moving_time: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub icu_training_load: Option<f64>,
    /// Intensity in percent
    #[serde(default)]
    pub icu_intensity: Option<f64>,
    #[serde(default)]
    pub intensity: Option<f64>,
    /// Resolved power target, present when requested with `resolve=true`
    #[serde(rename = "_power", default)]
    pub power: Option<ApiTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTarget {
    #[serde(default)]
    pub value: Option<f64>,
}

impl ApiEvent {
    pub const WORKOUT: &'static str = "WORKOUT";

    pub fn is_workout(&self) -> bool {
        self.category.as_deref() == Some(Self::WORKOUT)
    }

    /// Convert into a planned workout; `None` for unreadable dates
    pub fn into_workout(self) -> Option<PlannedWorkout> {
        let day = self.start_date_local.get(..10)?;
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;

        Some(PlannedWorkout {
            name: self.name,
            description: self.description,
            moving_time: self.moving_time.or(self.duration).map(seconds),
            training_load: self.icu_training_load,
            intensity_factor: self.icu_intensity.or(self.intensity).map(|pct| pct / 100.0),
            target_power: self.power.and_then(|p| p.value),
            ..PlannedWorkout::new(date)
        })
    }
}

/// Keep workout events only, sorted by start time
pub fn workouts_from_wire(mut rows: Vec<ApiEvent>) -> Vec<PlannedWorkout> {
    rows.retain(ApiEvent::is_workout);
    rows.sort_by(|a, b| a.start_date_local.cmp(&b.start_date_local));
    rows.into_iter().filter_map(ApiEvent::into_workout).collect()
}

/// Decode a JSON array body; blank or `null` bodies are an empty result
pub fn decode_rows<T: DeserializeOwned>(url: &str, body: &str) -> Result<Vec<T>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rows: Option<Vec<T>> =
        serde_json::from_str(body).map_err(|e| ConnectivityError::MalformedResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    Ok(rows.unwrap_or_default())
}

/// Convert wire activities, dropping rows without a readable start date
pub fn activities_from_wire(rows: Vec<ApiActivity>) -> Vec<ActivitySample> {
    let total = rows.len();
    let samples: Vec<ActivitySample> = rows
        .into_iter()
        .filter_map(ApiActivity::into_sample)
        .collect();
    if samples.len() < total {
        warn!(
            dropped = total - samples.len(),
            "Skipped activities with unreadable start dates"
        );
    }
    samples
}

/// Blocking client for the intervals.icu REST API
pub struct IntervalsClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
}

impl IntervalsClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://intervals.icu/api/v1";

    pub fn new(base_url: impl Into<String>, api_key: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        IntervalsClient {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: Self::basic_auth(api_key),
        }
    }

    /// Build a client from the athlete section; the API key is mandatory
    pub fn from_config(config: &AthleteConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ReadyRsError::Configuration(
                    "an API key is required (set athlete.api_key or READYRS_API_KEY)".to_string(),
                )
            })?;
        Ok(Self::new(
            config.base_url.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    /// `Basic` header value for the `API_KEY:<key>` credential pair
    pub fn basic_auth(api_key: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("API_KEY:{}", api_key));
        format!("Basic {}", encoded)
    }

    /// Endpoint URL for an athlete collection (`wellness`, `activities`, `events`)
    pub fn endpoint(&self, athlete_id: &str, collection: &str) -> String {
        format!("{}/athlete/{}/{}", self.base_url, athlete_id, collection)
    }

    fn get_rows<T: DeserializeOwned>(
        &self,
        url: &str,
        range: DateRange,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let oldest = range.start.format("%Y-%m-%d").to_string();
        let newest = range.end.format("%Y-%m-%d").to_string();

        let response = extra
            .iter()
            .fold(
                self.agent
                    .get(url)
                    .set("Authorization", &self.auth_header)
                    .query("oldest", &oldest)
                    .query("newest", &newest),
                |request, (name, value)| request.query(name, value),
            )
            .call();

        match response {
            Ok(resp) if resp.status() == 200 => {
                let body = resp
                    .into_string()
                    .map_err(|e| ConnectivityError::MalformedResponse {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })?;
                decode_rows(url, &body)
            }
            Ok(resp) => {
                warn!(url, status = resp.status(), "Unexpected status, treating as empty");
                Ok(Vec::new())
            }
            Err(ureq::Error::Status(status, _)) => {
                warn!(url, status, "Upstream refused request, treating as empty");
                Ok(Vec::new())
            }
            Err(ureq::Error::Transport(transport)) => Err(ConnectivityError::Unreachable {
                url: url.to_string(),
                reason: transport.to_string(),
            }
            .into()),
        }
    }
}

impl WellnessSource for IntervalsClient {
    #[instrument(skip(self))]
    fn fetch_wellness(&self, athlete_id: &str, range: DateRange) -> Result<Vec<WellnessSample>> {
        let url = self.endpoint(athlete_id, "wellness");
        let rows: Vec<WellnessSample> = self.get_rows(&url, range, &[])?;
        info!(rows = rows.len(), "Fetched wellness rows");
        Ok(rows)
    }

    #[instrument(skip(self))]
    fn fetch_activities(&self, athlete_id: &str, range: DateRange) -> Result<Vec<ActivitySample>> {
        let url = self.endpoint(athlete_id, "activities");
        let rows: Vec<ApiActivity> = self.get_rows(&url, range, &[])?;
        let activities = activities_from_wire(rows);
        info!(rows = activities.len(), "Fetched activities");
        Ok(activities)
    }

    #[instrument(skip(self))]
    fn fetch_events(&self, athlete_id: &str, range: DateRange) -> Result<Vec<PlannedWorkout>> {
        let url = self.endpoint(athlete_id, "events");
        let rows: Vec<ApiEvent> = self.get_rows(&url, range, &[("resolve", "true")])?;
        let workouts = workouts_from_wire(rows);
        info!(rows = workouts.len(), "Fetched planned workouts");
        Ok(workouts)
    }
}

/// Layout of an offline export file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Export {
    #[serde(default)]
    pub wellness: Vec<WellnessSample>,
    #[serde(default)]
    pub activities: Vec<ApiActivity>,
    #[serde(default)]
    pub events: Vec<ApiEvent>,
}

/// Reads wellness, activities and planned workouts from a JSON export
///
/// The athlete id is ignored: an export holds exactly one athlete.
#[derive(Debug, Clone)]
pub struct FileSource {
    wellness: Vec<WellnessSample>,
    activities: Vec<ActivitySample>,
    events: Vec<PlannedWorkout>,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let export: Export = serde_json::from_str(&content)?;
        debug!(
            path = %path.as_ref().display(),
            wellness = export.wellness.len(),
            activities = export.activities.len(),
            events = export.events.len(),
            "Loaded offline export"
        );
        Ok(Self::from_export(export))
    }

    pub fn from_export(export: Export) -> Self {
        FileSource {
            wellness: export.wellness,
            activities: activities_from_wire(export.activities),
            events: workouts_from_wire(export.events),
        }
    }
}

impl WellnessSource for FileSource {
    fn fetch_wellness(&self, _athlete_id: &str, range: DateRange) -> Result<Vec<WellnessSample>> {
        Ok(self
            .wellness
            .iter()
            .filter(|s| range.contains(s.date))
            .cloned()
            .collect())
    }

    fn fetch_activities(&self, _athlete_id: &str, range: DateRange) -> Result<Vec<ActivitySample>> {
        Ok(self
            .activities
            .iter()
            .filter(|a| range.contains(a.date))
            .cloned()
            .collect())
    }

    fn fetch_events(&self, _athlete_id: &str, range: DateRange) -> Result<Vec<PlannedWorkout>> {
        Ok(self
            .events
            .iter()
            .filter(|w| range.contains(w.date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_basic_auth_header() {
        // base64("API_KEY:secret")
        assert_eq!(
            IntervalsClient::basic_auth("secret"),
            "Basic QVBJX0tFWTpzZWNyZXQ="
        );
    }

    #[test]
    fn test_endpoint_building() {
        let client = IntervalsClient::new(
            "https://intervals.icu/api/v1/",
            "key",
            Duration::from_secs(5),
        );
        assert_eq!(
            client.endpoint("i10474", "wellness"),
            "https://intervals.icu/api/v1/athlete/i10474/wellness"
        );
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let config = AthleteConfig {
            api_key: None,
            ..AthleteConfig::default()
        };
        let err = IntervalsClient::from_config(&config).err().unwrap();
        assert!(matches!(err, ReadyRsError::Configuration(_)));
    }

    #[test]
    fn test_empty_and_null_bodies_are_empty() {
        let rows: Vec<WellnessSample> = decode_rows("u", "").unwrap();
        assert!(rows.is_empty());
        let rows: Vec<WellnessSample> = decode_rows("u", "null").unwrap();
        assert!(rows.is_empty());
        let rows: Vec<WellnessSample> = decode_rows("u", "[]").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_malformed_body_is_connectivity_error() {
        let err = decode_rows::<WellnessSample>("u", "<html>").err().unwrap();
        assert!(matches!(
            err,
            ReadyRsError::Connectivity(ConnectivityError::MalformedResponse { .. })
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_activity_decoding() {
        let body = r#"[{
            "start_date_local": "2024-06-03T07:15:00",
            "type": "VirtualRide",
            "name": "Zwift",
            "moving_time": 3600,
            "icu_training_load": 72,
            "icu_intensity": 81.5,
            "icu_weighted_avg_watts": 220,
            "icu_average_watts": 205,
            "average_heartrate": 140,
            "icu_hr_zone_times": [600, 1800, 900, 300, 0, 0, 0, 0],
            "icu_zone_times": [{"id": "Z1", "secs": 500}, {"id": "Z2", "secs": 2000},
                               {"id": "SS", "secs": 400}, {"id": "Z4", "secs": 300}]
        }, {
            "start_date_local": "garbage",
            "type": "Ride"
        }]"#;
        let rows: Vec<ApiActivity> = decode_rows("u", body).unwrap();
        let activities = activities_from_wire(rows);
        assert_eq!(activities.len(), 1);

        let ride = &activities[0];
        assert_eq!(ride.date, date(3));
        assert_eq!(ride.activity_type, ActivityType::VirtualRide);
        assert_eq!(ride.moving_time, Some(3600));
        assert!((ride.intensity_factor.unwrap() - 0.815).abs() < 1e-9);
        assert_eq!(ride.hr_zone_times, [600, 1800, 900, 300, 0, 0, 0]);
        assert_eq!(ride.power_zone_times, [500, 2000, 0, 300, 0, 0, 0]);
    }

    #[test]
    fn test_event_decoding_keeps_workouts_in_order() {
        let body = r#"[{
            "start_date_local": "2024-06-05T00:00:00",
            "category": "WORKOUT",
            "name": "Threshold",
            "description": "3x12min @ 95%",
            "moving_time": 4500,
            "icu_training_load": 85,
            "icu_intensity": 88,
            "_power": {"value": 245}
        }, {
            "start_date_local": "2024-06-04T00:00:00",
            "category": "NOTE",
            "name": "Travel"
        }, {
            "start_date_local": "2024-06-03T00:00:00",
            "category": "WORKOUT",
            "name": "Endurance",
            "duration": 5400,
            "icu_training_load": 60,
            "intensity": 65
        }]"#;
        let rows: Vec<ApiEvent> = decode_rows("u", body).unwrap();
        let workouts = workouts_from_wire(rows);
        assert_eq!(workouts.len(), 2);

        let endurance = &workouts[0];
        assert_eq!(endurance.date, date(3));
        assert_eq!(endurance.moving_time, Some(5400));
        assert!((endurance.intensity_factor.unwrap() - 0.65).abs() < 1e-9);
        assert_eq!(endurance.target_power, None);

        let threshold = &workouts[1];
        assert_eq!(threshold.name.as_deref(), Some("Threshold"));
        assert_eq!(threshold.moving_time, Some(4500));
        assert_eq!(threshold.target_power, Some(245.0));
        assert_eq!(threshold.structure(), Some("3x12min @ 95%"));
    }

    #[test]
    fn test_file_source_filters_range() {
        let export = r#"{
            "wellness": [
                {"id": "2024-06-01", "hrv": 50},
                {"id": "2024-06-05", "hrv": 52},
                {"id": "2024-06-09", "hrv": 54}
            ],
            "activities": [
                {"start_date_local": "2024-06-05T18:00:00", "type": "Run"}
            ],
            "events": [
                {"start_date_local": "2024-06-06T00:00:00", "category": "WORKOUT"},
                {"start_date_local": "2024-06-10T00:00:00", "category": "WORKOUT"}
            ]
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(export.as_bytes()).unwrap();

        let source = FileSource::open(file.path()).unwrap();
        let range = DateRange::new(date(2), date(8)).unwrap();
        let wellness = source.fetch_wellness("any", range).unwrap();
        assert_eq!(wellness.len(), 1);
        assert_eq!(wellness[0].hrv, Some(52.0));
        assert_eq!(source.fetch_activities("any", range).unwrap().len(), 1);
        assert_eq!(source.fetch_events("any", range).unwrap().len(), 1);
    }

    #[test]
    fn test_file_source_missing_file() {
        let err = FileSource::open("/nonexistent/readyrs-export.json")
            .err()
            .unwrap();
        assert!(matches!(err, ReadyRsError::Io(_)));
    }
}
