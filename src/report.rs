//! Text, Markdown and table rendering
//!
//! Markdown output targets Telegram's legacy `Markdown` parse mode; tables
//! are rendered with `tabled` for the terminal.

use crate::baseline::{Baseline, BaselineSet, WeeklyAggregate};
use crate::correlation::{CorrelationMatrix, Interpretation, WeeklyColumn, WeeklyRow};
use crate::efficiency::{EfficiencyReport, EfficiencyValues};
use crate::history::RideLoad;
use crate::models::{Metric, ZONE_COUNT};
use crate::plan::{PlanDelta, SessionReview, WeekPlan};
use crate::readiness::{Digest, ReadinessResult};
use crate::store::MetricDelta;
use crate::weekly::WeekSummary;
use std::fmt::Write;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Format an optional value, `N/A` when missing
pub fn opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "N/A".to_string(),
    }
}

/// Zone times as minutes, e.g. `Z1 10m  Z2 35m`; empty zones are skipped
pub fn zone_minutes(zones: &[u32; ZONE_COUNT]) -> String {
    let parts: Vec<String> = zones
        .iter()
        .enumerate()
        .filter(|(_, secs)| **secs > 0)
        .map(|(i, secs)| format!("Z{} {}m", i + 1, (*secs as f64 / 60.0).round()))
        .collect();
    if parts.is_empty() {
        "no data".to_string()
    } else {
        parts.join("  ")
    }
}

/// Seconds as `1h 05m`, or `45m` under an hour
pub fn duration(secs: Option<u32>) -> String {
    let Some(secs) = secs else {
        return "N/A".to_string();
    };
    let minutes = secs / 60;
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, m) => format!("{}h {:02}m", h, m),
    }
}

/// Plain-text readiness report
pub fn result_text(result: &ReadinessResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Readiness {}: {}/{} {} {}",
        result.date.format("%Y-%m-%d"),
        result.score,
        result.max_attainable,
        result.verdict.symbol(),
        result.verdict
    );
    let _ = writeln!(out, "Policy: {}", result.policy);
    for line in &result.breakdown {
        let _ = writeln!(out, "  {}", line);
    }
    if result.is_partial() {
        let _ = writeln!(
            out,
            "  (some metrics missing, at most {} points attainable)",
            result.max_attainable
        );
    }
    for alert in &result.alerts {
        let _ = writeln!(out, "  {}", alert);
    }
    let _ = write!(out, "{}", result.verdict.advice());
    out
}

/// Markdown readiness report for chat delivery
pub fn result_markdown(result: &ReadinessResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} *Readiness {}*: {}/{} ({})",
        result.verdict.symbol(),
        result.date.format("%Y-%m-%d"),
        result.score,
        result.max_attainable,
        result.verdict
    );
    for line in &result.breakdown {
        let _ = writeln!(
            out,
            "{} {}: {:.1} ({}/{})",
            line.assessment.symbol(),
            line.metric.label(),
            line.value,
            line.points,
            line.max_points
        );
    }
    if !result.alerts.is_empty() {
        let _ = writeln!(out, "\n*Alerts:*");
        for alert in &result.alerts {
            let _ = writeln!(out, "{}", alert);
        }
    }
    let _ = write!(out, "\n_{}_", result.verdict.advice());
    out
}

/// Daily digest message
pub fn digest_markdown(digest: &Digest) -> String {
    let mut out = format!(
        "📊 *Wellness data ({})*\n",
        digest.date.format("%Y-%m-%d")
    );

    match &digest.snapshot {
        None => out.push_str("No data for this day.\n"),
        Some(day) => {
            let _ = writeln!(
                out,
                "Body battery - max: {}, min: {}",
                opt(day.body_battery_max, 0),
                opt(day.body_battery_min, 0)
            );
            let _ = writeln!(out, "RHR: {} bpm", opt(day.resting_hr, 0));
            let _ = writeln!(out, "HRV: {} ms", opt(day.hrv, 0));
            let _ = writeln!(out, "Sleep score: {}", opt(day.sleep_score, 0));
        }
    }

    if digest.alerts.is_empty() {
        out.push_str("\n✅ *No alerts*");
    } else {
        out.push_str("\n*Alerts:*\n");
        let lines: Vec<String> = digest.alerts.iter().map(|a| a.to_string()).collect();
        out.push_str(&lines.join("\n"));
    }
    out
}

#[derive(Tabled)]
struct BaselineRow {
    #[tabled(rename = "Baseline")]
    kind: String,
    #[tabled(rename = "RHR (bpm)")]
    resting_hr: String,
    #[tabled(rename = "HRV (ms)")]
    hrv: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
    #[tabled(rename = "Weeks")]
    weeks: String,
}

impl BaselineRow {
    fn new(label: &str, baseline: Option<&Baseline>, required: &str) -> Self {
        match baseline {
            Some(b) => BaselineRow {
                kind: label.to_string(),
                resting_hr: opt(b.resting_hr, 1),
                hrv: opt(b.hrv, 1),
                sleep: opt(b.sleep_score, 1),
                weeks: b.weeks_used.to_string(),
            },
            None => BaselineRow {
                kind: label.to_string(),
                resting_hr: "-".to_string(),
                hrv: "-".to_string(),
                sleep: "-".to_string(),
                weeks: required.to_string(),
            },
        }
    }
}

/// Recovery / chronic / historic table; absent baselines show their requirement
pub fn baselines_table(set: &BaselineSet, chronic_weeks: u32, historic_weeks: u32) -> String {
    let rows = vec![
        BaselineRow::new("Recovery", set.recovery.as_ref(), "no low-load weeks"),
        BaselineRow::new(
            "Chronic",
            set.chronic.as_ref(),
            &format!("needs {} weeks", chronic_weeks),
        ),
        BaselineRow::new(
            "Historic",
            set.historic.as_ref(),
            &format!("needs {} weeks", historic_weeks),
        ),
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct WeeklyAggregateRow {
    #[tabled(rename = "Week")]
    week: String,
    #[tabled(rename = "Days")]
    days: usize,
    #[tabled(rename = "RHR")]
    resting_hr: String,
    #[tabled(rename = "HRV")]
    hrv: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
    #[tabled(rename = "ATL")]
    atl: String,
    #[tabled(rename = "CTL")]
    ctl: String,
}

/// Weekly means table, oldest week first
pub fn weekly_means_table(weeks: &[WeeklyAggregate]) -> String {
    let rows: Vec<WeeklyAggregateRow> = weeks
        .iter()
        .map(|w| WeeklyAggregateRow {
            week: w.label(),
            days: w.sample_count,
            resting_hr: opt(w.resting_hr, 1),
            hrv: opt(w.hrv, 1),
            sleep: opt(w.sleep_score, 1),
            atl: opt(w.atl, 1),
            ctl: opt(w.ctl, 1),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct WeekSummaryRow {
    #[tabled(rename = "Week")]
    week: String,
    #[tabled(rename = "TSS")]
    realized: String,
    #[tabled(rename = "Planned")]
    planned: String,
    #[tabled(rename = "Done %")]
    compliance: String,
    #[tabled(rename = "HRV")]
    hrv: String,
    #[tabled(rename = "RHR")]
    resting_hr: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
    #[tabled(rename = "BB max/min")]
    body_battery: String,
    #[tabled(rename = "TSB")]
    tsb: String,
    #[tabled(rename = "EF")]
    efficiency: String,
}

/// Weekly load table, most recent week first
pub fn week_summary_table(weeks: &[WeekSummary]) -> String {
    let rows: Vec<WeekSummaryRow> = weeks
        .iter()
        .rev()
        .map(|w| WeekSummaryRow {
            week: w.label(),
            realized: format!("{:.0}", w.training.realized_tss),
            planned: opt(w.planned_tss, 0),
            compliance: opt(w.compliance_pct(), 0),
            hrv: opt(w.hrv, 1),
            resting_hr: opt(w.resting_hr, 1),
            sleep: opt(w.sleep_score, 1),
            body_battery: format!("{}/{}", opt(w.body_battery_max, 0), opt(w.body_battery_min, 0)),
            tsb: opt(w.tsb_end, 1),
            efficiency: opt(w.training.efficiency, 2),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "First")]
    first: String,
    #[tabled(rename = "Second")]
    second: String,
    #[tabled(rename = "Change")]
    change: String,
}

/// Day comparison table
pub fn comparison_table(deltas: &[MetricDelta]) -> String {
    let rows: Vec<ComparisonRow> = deltas
        .iter()
        .map(|d| ComparisonRow {
            metric: d.metric.label().to_string(),
            first: opt(d.first, 1),
            second: opt(d.second, 1),
            change: d
                .change()
                .map(|c| format!("{:+.1}", c))
                .unwrap_or_else(|| "N/A".to_string()),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pearson matrix as a square table
pub fn correlation_table(matrix: &CorrelationMatrix) -> String {
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(WeeklyColumn::ALL.iter().map(|c| c.label().to_string()));
    builder.push_record(header);

    for &row in WeeklyColumn::ALL.iter() {
        let mut record = vec![row.label().to_string()];
        record.extend(
            WeeklyColumn::ALL
                .iter()
                .map(|&col| opt(matrix.get(row, col), 2)),
        );
        builder.push_record(record);
    }
    builder.build().with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct WeeklyRowView {
    #[tabled(rename = "Week")]
    week: String,
    #[tabled(rename = "Weekly TSS")]
    tss: String,
    #[tabled(rename = "ATL")]
    atl: String,
    #[tabled(rename = "CTL")]
    ctl: String,
    #[tabled(rename = "RHR")]
    resting_hr: String,
    #[tabled(rename = "HRV")]
    hrv: String,
    #[tabled(rename = "Sleep")]
    sleep: String,
}

/// Weekly correlation input table
pub fn correlation_rows_table(rows: &[WeeklyRow]) -> String {
    let views: Vec<WeeklyRowView> = rows
        .iter()
        .map(|r| WeeklyRowView {
            week: r.week.label(),
            tss: format!("{:.0}", r.weekly_tss),
            atl: opt(r.week.atl, 1),
            ctl: opt(r.week.ctl, 1),
            resting_hr: opt(r.week.resting_hr, 1),
            hrv: opt(r.week.hrv, 1),
            sleep: opt(r.week.sleep_score, 1),
        })
        .collect();
    Table::new(views).with(Style::rounded()).to_string()
}

/// One line per interpretation
pub fn interpretations_text(notes: &[Interpretation]) -> String {
    notes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Tabled)]
struct PlannedRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Workout")]
    name: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "TSS")]
    tss: String,
    #[tabled(rename = "IF")]
    intensity: String,
    #[tabled(rename = "NP (W)")]
    power: String,
    #[tabled(rename = "Structure")]
    structure: String,
}

/// Week plan table in calendar order
pub fn plan_table(plan: &WeekPlan) -> String {
    let rows: Vec<PlannedRow> = plan
        .workouts
        .iter()
        .map(|w| PlannedRow {
            day: w.date.format("%a %d/%m").to_string(),
            name: w.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
            duration: duration(w.moving_time),
            tss: opt(w.training_load, 0),
            intensity: opt(w.intensity_factor, 2),
            power: opt(w.target_power, 0),
            structure: w.structure().unwrap_or("no structure").to_string(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

fn delta_line(label: &str, delta: Option<&PlanDelta>, fmt: fn(f64) -> String) -> String {
    match delta {
        Some(d) => format!(
            "{}: {} planned, {} done ({})",
            label,
            fmt(d.planned),
            fmt(d.actual),
            if d.change() >= 0.0 {
                format!("+{}", fmt(d.change()))
            } else {
                format!("-{}", fmt(-d.change()))
            }
        ),
        None => format!("{}: no plan", label),
    }
}

fn shares_line(shares: Option<[f64; ZONE_COUNT]>) -> String {
    match shares {
        None => "no data".to_string(),
        Some(shares) => shares
            .iter()
            .enumerate()
            .filter(|(_, pct)| **pct > 0.0)
            .map(|(i, pct)| format!("Z{} {:.0}%", i + 1, pct))
            .collect::<Vec<_>>()
            .join("  "),
    }
}

/// Plan-vs-actual session review
pub fn review_text(review: &SessionReview) -> String {
    let ride = &review.actual;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} on {}",
        ride.name.as_deref().unwrap_or("Ride"),
        review.date.format("%Y-%m-%d")
    );
    match &review.planned {
        Some(plan) => {
            let _ = writeln!(
                out,
                "Planned: {}",
                plan.name.as_deref().unwrap_or("Unnamed workout")
            );
        }
        None => out.push_str("Planned: nothing
"),
    }

    let minutes = |secs: f64| duration(Some(secs.max(0.0) as u32));
    let _ = writeln!(out, "  {}", delta_line("Duration", review.duration.as_ref(), minutes));
    let _ = writeln!(
        out,
        "  {}",
        delta_line("TSS", review.training_load.as_ref(), |v| format!("{:.0}", v))
    );
    let _ = writeln!(
        out,
        "  {}",
        delta_line("IF", review.intensity.as_ref(), |v| format!("{:.2}", v))
    );

    let _ = writeln!(
        out,
        "  Avg / max HR: {} / {} bpm",
        opt(ride.average_hr, 0),
        opt(ride.max_hr, 0)
    );
    match (ride.decoupling, review.decoupling) {
        (Some(pct), Some(status)) => {
            let _ = writeln!(out, "  Decoupling: {:.1}%, {}", pct, status);
        }
        _ => out.push_str("  Decoupling: N/A\n"),
    }
    let _ = writeln!(out, "  Power zones: {}", shares_line(review.power_zone_shares()));
    let _ = write!(out, "  HR zones: {}", shares_line(review.hr_zone_shares()));
    out
}

#[derive(Tabled)]
struct EfficiencyRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Rides")]
    rides: usize,
    #[tabled(rename = "EF (NP/HR)")]
    efficiency: String,
    #[tabled(rename = "Power/HR")]
    power_to_hr: String,
    #[tabled(rename = "Z2 Power/HR")]
    power_hr_z2: String,
}

fn signed(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:+.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Today's ride against the shortest period, then one row per period
pub fn efficiency_text(report: &EfficiencyReport) -> String {
    let mut out = String::new();
    match (&report.today, report.today_vs_shortest()) {
        (Some(today), Some(delta)) => {
            let values = &today.values;
            let period = report.rolling.first().map(|r| r.period_days).unwrap_or(0);
            let _ = writeln!(
                out,
                "{}: EF {} ({} vs {}d), Power/HR {} ({}), Z2 {} ({})",
                report.date.format("%Y-%m-%d"),
                opt(values.efficiency, 2),
                signed(delta.efficiency),
                period,
                opt(values.power_to_hr, 2),
                signed(delta.power_to_hr),
                opt(values.power_hr_z2, 2),
                signed(delta.power_hr_z2),
            );
        }
        _ => {
            let _ = writeln!(
                out,
                "{}: no ride with efficiency data",
                report.date.format("%Y-%m-%d")
            );
        }
    }

    let rows: Vec<EfficiencyRow> = report
        .rolling
        .iter()
        .map(|r| {
            let EfficiencyValues {
                efficiency,
                power_to_hr,
                power_hr_z2,
            } = r.means;
            EfficiencyRow {
                period: format!("Last {} days", r.period_days),
                rides: r.rides.len(),
                efficiency: opt(efficiency, 2),
                power_to_hr: opt(power_to_hr, 2),
                power_hr_z2: opt(power_hr_z2, 2),
            }
        })
        .collect();
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out
}

#[derive(Tabled)]
struct RideLoadRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Ride")]
    name: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "TSS")]
    tss: String,
    #[tabled(rename = "IF")]
    intensity: String,
    #[tabled(rename = "NP (W)")]
    power: String,
    #[tabled(rename = "HR avg/max")]
    heart_rate: String,
    #[tabled(rename = "Pw:HR %")]
    decoupling: String,
    #[tabled(rename = "CTL")]
    ctl: String,
    #[tabled(rename = "ATL")]
    atl: String,
    #[tabled(rename = "TSB")]
    tsb: String,
}

/// Ride load history table, newest first
pub fn ride_history_table(rows: &[RideLoad]) -> String {
    let views: Vec<RideLoadRow> = rows
        .iter()
        .map(|r| RideLoadRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            name: r.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
            duration: duration(r.moving_time),
            tss: opt(r.training_load, 0),
            intensity: opt(r.intensity_factor, 2),
            power: opt(r.normalized_power, 0),
            heart_rate: format!("{}/{}", opt(r.average_hr, 0), opt(r.max_hr, 0)),
            decoupling: opt(r.decoupling, 1),
            ctl: opt(r.ctl, 0),
            atl: opt(r.atl, 0),
            tsb: opt(r.tsb, 0),
        })
        .collect();
    Table::new(views).with(Style::rounded()).to_string()
}

/// Label with unit for a metric value
pub fn metric_value(metric: Metric, value: Option<f64>) -> String {
    match value {
        Some(v) if metric.unit().is_empty() => format!("{:.1}", v),
        Some(v) => format!("{:.1} {}", v, metric.unit()),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineKind;
    use crate::models::WellnessSample;
    use crate::trends::{Alert, AlertKind, Severity};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 9).unwrap()
    }

    #[test]
    fn test_opt_formatting() {
        assert_eq!(opt(Some(51.234), 1), "51.2");
        assert_eq!(opt(None, 1), "N/A");
    }

    #[test]
    fn test_zone_minutes() {
        let zones = [600, 2100, 0, 0, 0, 0, 0];
        assert_eq!(zone_minutes(&zones), "Z1 10m  Z2 35m");
        assert_eq!(zone_minutes(&[0; ZONE_COUNT]), "no data");
    }

    #[test]
    fn test_digest_without_data() {
        let digest = Digest {
            date: date(),
            snapshot: None,
            alerts: Vec::new(),
        };
        let text = digest_markdown(&digest);
        assert!(text.contains("2024-06-09"));
        assert!(text.contains("No data for this day."));
        assert!(text.ends_with("✅ *No alerts*"));
    }

    #[test]
    fn test_digest_with_alerts() {
        let digest = Digest {
            date: date(),
            snapshot: Some(WellnessSample {
                resting_hr: Some(55.0),
                hrv: Some(40.0),
                ..WellnessSample::new(date())
            }),
            alerts: vec![Alert {
                kind: AlertKind::RestingHrWatch,
                severity: Severity::High,
                message: "Resting HR 55.0 bpm above watch level (> 50 bpm)".to_string(),
            }],
        };
        let text = digest_markdown(&digest);
        assert!(text.contains("RHR: 55 bpm"));
        assert!(text.contains("Sleep score: N/A"));
        assert!(text.contains("*Alerts:*\n🚨 Resting HR 55.0"));
    }

    #[test]
    fn test_baselines_table_marks_absent_horizons() {
        let set = BaselineSet {
            recovery: Some(Baseline {
                kind: BaselineKind::Recovery,
                resting_hr: Some(45.5),
                hrv: Some(55.0),
                sleep_score: None,
                weeks_used: 3,
            }),
            chronic: None,
            historic: None,
        };
        let table = baselines_table(&set, 4, 8);
        assert!(table.contains("45.5"));
        assert!(table.contains("needs 8 weeks"));
    }

    #[test]
    fn test_metric_value_units() {
        assert_eq!(metric_value(Metric::Hrv, Some(52.0)), "52.0 ms");
        assert_eq!(metric_value(Metric::SleepScore, Some(80.0)), "80.0");
    }

    #[test]
    fn test_result_renderings() {
        use crate::readiness::{EngineConfig, ReadinessEngine};
        use crate::store::WellnessStore;
        use chrono::Days;

        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let store = WellnessStore::from_samples((0..30u64).map(|d| WellnessSample {
            hrv: Some(if d % 2 == 0 { 50.0 } else { 54.0 }),
            resting_hr: Some(44.0),
            sleep_score: Some(84.0),
            ..WellnessSample::new(start + Days::new(d))
        }));
        let engine = ReadinessEngine::new(EngineConfig::default()).unwrap();
        let result = engine.analyze(&store, start + Days::new(29)).unwrap();

        let text = result_text(&result);
        assert!(text.starts_with("Readiness 2024-05-30: 100/100"));
        assert!(text.contains("Policy: statistical-range"));

        let markdown = result_markdown(&result);
        assert!(markdown.contains("*Readiness 2024-05-30*: 100/100 (GREEN)"));
        assert!(!markdown.contains("*Alerts:*"));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(duration(Some(2700)), "45m");
        assert_eq!(duration(Some(3900)), "1h 05m");
        assert_eq!(duration(Some(59)), "0m");
        assert_eq!(duration(None), "N/A");
    }

    #[test]
    fn test_plan_table_marks_missing_structure() {
        use crate::models::PlannedWorkout;

        let day = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let plan = WeekPlan::new(
            2024,
            23,
            vec![PlannedWorkout {
                name: Some("Tempo".to_string()),
                description: Some("none".to_string()),
                moving_time: Some(5400),
                training_load: Some(80.0),
                intensity_factor: Some(0.82),
                ..PlannedWorkout::new(day)
            }],
        )
        .unwrap();
        let table = plan_table(&plan);
        assert!(table.contains("Tue 04/06"));
        assert!(table.contains("1h 30m"));
        assert!(table.contains("0.82"));
        assert!(table.contains("no structure"));
    }

    #[test]
    fn test_review_text() {
        use crate::models::{ActivitySample, ActivityType, PlannedWorkout};

        let day = date();
        let plan = PlannedWorkout {
            name: Some("Endurance".to_string()),
            moving_time: Some(3600),
            training_load: Some(60.0),
            ..PlannedWorkout::new(day)
        };
        let ride = ActivitySample {
            moving_time: Some(3000),
            training_load: Some(66.0),
            intensity_factor: Some(0.7),
            decoupling: Some(6.5),
            hr_zone_times: [0, 1500, 1500, 0, 0, 0, 0],
            ..ActivitySample::new(day, ActivityType::Ride)
        };
        let review = SessionReview::build(day, &[plan], &[ride]).unwrap();
        let text = review_text(&review);

        assert!(text.starts_with("Ride on 2024-06-09"));
        assert!(text.contains("Planned: Endurance"));
        assert!(text.contains("Duration: 1h 00m planned, 50m done (-10m)"));
        assert!(text.contains("TSS: 60 planned, 66 done (+6)"));
        assert!(text.contains("IF: no plan"));
        assert!(text.contains("Decoupling: 6.5%, high decoupling"));
        assert!(text.contains("Power zones: no data"));
        assert!(text.ends_with("HR zones: Z2 50%  Z3 50%"));
    }

    #[test]
    fn test_efficiency_text_without_today() {
        use crate::efficiency::EfficiencyAnalyzer;

        let report = EfficiencyAnalyzer::default().analyze(&[], date());
        let text = efficiency_text(&report);
        assert!(text.contains("no ride with efficiency data"));
        assert!(text.contains("Last 60 days"));
    }

    #[test]
    fn test_ride_history_table() {
        use crate::models::{ActivitySample, ActivityType};

        let ride = ActivitySample {
            name: Some("Hills".to_string()),
            average_hr: Some(142.4),
            max_hr: Some(176.0),
            ctl: Some(58.2),
            atl: Some(64.9),
            ..ActivitySample::new(date(), ActivityType::Ride)
        };
        let table = ride_history_table(&[RideLoad::from_activity(&ride)]);
        assert!(table.contains("Hills"));
        assert!(table.contains("142/176"));
        assert!(table.contains("-7"));
    }
}
