use anyhow::{bail, Result};
use chrono::{Datelike, Days, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn};

use readyrs::config::AppConfig;
use readyrs::correlation::CorrelationAnalyzer;
use readyrs::efficiency::EfficiencyAnalyzer;
use readyrs::error::{ErrorSeverity, ReadyRsError};
use readyrs::history::history_range;
use readyrs::logging::init_logging;
use readyrs::notify::{LogSink, NotificationSink, TelegramSink};
use readyrs::readiness::{ReadinessEngine, ReadinessResult, ReadinessService};
use readyrs::report;
use readyrs::scoring::{Assessment, ScoringPolicy};
use readyrs::source::{FileSource, IntervalsClient, WellnessSource};
use readyrs::verdict::Verdict;
use readyrs::weekly::{WeeklyAnalyzer, MAX_WEEKS};
use readyrs::CachedSource;

/// readyrs - Daily Training Readiness CLI
///
/// Scores today's wellness against rolling and weekly baselines and turns it
/// into a GREEN / YELLOW / RED training verdict.
#[derive(Parser)]
#[command(name = "readyrs")]
#[command(version)]
#[command(about = "Daily training readiness from wellness data", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Read wellness, activities and planned workouts from a JSON export instead of the API
    #[arg(long, value_name = "FILE", global = true)]
    offline: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Scoring policy (simple, statistical); overrides the config file
    #[arg(long, global = true)]
    policy: Option<ScoringPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a day and print the training verdict
    Assess {
        /// Day to assess (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Also send the result to the configured chat
        #[arg(long)]
        notify: bool,
    },

    /// Show weekly means and the recovery / chronic / historic baselines
    Baselines {
        /// Reference day (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Review training load of the last weeks
    Weekly {
        /// Last day of the review (default: today)
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Number of 7-day blocks (1-52)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_WEEKS as i64))]
        weeks: Option<u32>,
    },

    /// Correlate weekly load with recovery markers
    Correlations {
        /// Reference day (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Compare two days metric by metric
    Compare {
        /// First day (YYYY-MM-DD)
        first: NaiveDate,

        /// Second day (YYYY-MM-DD)
        second: NaiveDate,
    },

    /// Daily wellness digest with deviation alerts
    Digest {
        /// Day of the digest (default: yesterday)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Send the digest to the configured chat
        #[arg(long)]
        send: bool,
    },

    /// List the workouts planned in an ISO week
    Plan {
        /// ISO year (default: current)
        #[arg(short, long)]
        year: Option<i32>,

        /// ISO week number (default: current)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=53))]
        week: Option<u32>,
    },

    /// Compare a day's ride with its planned workout
    Review {
        /// Day of the ride (default: yesterday)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Rolling aerobic efficiency of rides
    Efficiency {
        /// Reference day (default: yesterday)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Ride history with training load, fitness and form
    History {
        /// First day (default: a week before the last day)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (default: today)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets masked)
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

type Service = ReadinessService<Box<dyn WellnessSource>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_env();
    if let Some(policy) = cli.policy {
        config.scoring.policy = policy;
    }

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    if let Commands::Config { action } = &cli.command {
        return run_config(&cli, &config, action);
    }

    if let Err(err) = run(&cli, &config) {
        match err.downcast_ref::<ReadyRsError>() {
            Some(e) if e.is_data_unavailable() => {
                let headline = match cli.command {
                    Commands::Assess { .. } => "No verdict could be produced",
                    _ => "Nothing to report",
                };
                eprintln!("{}", headline.red().bold());
                eprintln!("  {}", e.user_message());
                std::process::exit(2);
            }
            Some(e) => {
                match e.severity() {
                    ErrorSeverity::Warning => warn!(error = %e, "Command failed"),
                    _ => error!(error = %e, "Command failed"),
                }
                eprintln!("{} {}", "Error:".red().bold(), e.user_message());
                if e.is_retryable() {
                    eprintln!("  {}", "The failure looks temporary; rerun later.".dimmed());
                }
                std::process::exit(1);
            }
            None => return Err(err),
        }
    }
    Ok(())
}

fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    config.validate()?;
    let service = build_service(cli, config)?;
    let today = Local::now().date_naive();
    let yesterday = today.pred_opt().unwrap_or(today);

    match &cli.command {
        Commands::Assess { date, notify } => {
            let date = date.unwrap_or(today);
            let result = if *notify {
                let sink = build_sink(config)?;
                service.assess_and_notify(date, sink.as_ref(), report::result_markdown)?
            } else {
                service.assess(date)?
            };
            print_assessment(cli.format, &result)
        }

        Commands::Baselines { date } => {
            let date = date.unwrap_or(today);
            let (weeks, set) = service.baselines(date)?;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "weeks": weeks,
                    "baselines": set,
                })),
                OutputFormat::Text => {
                    println!("{}", format!("Weekly means up to {}", date).cyan().bold());
                    println!("{}", report::weekly_means_table(&weeks));
                    println!("{}", "Baselines".cyan().bold());
                    println!(
                        "{}",
                        report::baselines_table(
                            &set,
                            config.weeks.chronic_weeks,
                            config.weeks.historic_weeks
                        )
                    );
                    Ok(())
                }
            }
        }

        Commands::Weekly { end, weeks } => {
            let end = end.unwrap_or(today);
            let mut weekly_config = config.weekly.clone();
            if let Some(weeks) = weeks {
                weekly_config.weeks = *weeks;
            }
            let analyzer = WeeklyAnalyzer::new(weekly_config);
            let summaries = service.weekly(&analyzer, end)?;

            match cli.format {
                OutputFormat::Json => print_json(&summaries),
                OutputFormat::Text => {
                    println!("{}", format!("Weekly review to {}", end).cyan().bold());
                    println!("{}", report::week_summary_table(&summaries));
                    for week in summaries.iter().rev() {
                        let notes = analyzer.insights(week);
                        if notes.is_empty() {
                            continue;
                        }
                        println!("{}", week.label().bold());
                        println!("  Zones (HR): {}", report::zone_minutes(&week.training.hr_zone_times));
                        for note in notes {
                            println!("  - {}", note);
                        }
                    }
                    Ok(())
                }
            }
        }

        Commands::Correlations { date } => {
            let date = date.unwrap_or(today);
            let analyzer = CorrelationAnalyzer::new(
                service.engine().baseline_calculator().clone(),
                config.weekly.strength_session_load,
            );
            let (rows, matrix) = service.correlations(&analyzer, date)?;
            let notes = CorrelationAnalyzer::interpret(&matrix);

            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "weeks": rows,
                    "matrix": matrix,
                    "interpretations": notes,
                })),
                OutputFormat::Text => {
                    println!("{}", report::correlation_rows_table(&rows));
                    if rows.len() < 3 {
                        println!(
                            "{}",
                            format!("Only {} complete weeks; correlations need 3", rows.len())
                                .yellow()
                        );
                        return Ok(());
                    }
                    println!("{}", report::correlation_table(&matrix));
                    if !notes.is_empty() {
                        println!("{}", report::interpretations_text(&notes));
                    }
                    Ok(())
                }
            }
        }

        Commands::Compare { first, second } => {
            let deltas = service.compare(*first, *second)?;
            match cli.format {
                OutputFormat::Json => print_json(&deltas),
                OutputFormat::Text => {
                    println!("{}", format!("{} vs {}", first, second).cyan().bold());
                    println!("{}", report::comparison_table(&deltas));
                    Ok(())
                }
            }
        }

        Commands::Digest { date, send } => {
            let date = date.unwrap_or(yesterday);
            let digest = service.digest(date)?;
            let message = report::digest_markdown(&digest);

            if *send {
                let sink = build_sink(config)?;
                if let Err(e) = sink.deliver(&message) {
                    warn!(sink = sink.name(), error = %e, "Digest not delivered");
                }
            }
            match cli.format {
                OutputFormat::Json => print_json(&digest),
                OutputFormat::Text => {
                    println!("{}", message);
                    Ok(())
                }
            }
        }

        Commands::Plan { year, week } => {
            let current = today.iso_week();
            let year = year.unwrap_or(current.year());
            let week = week.unwrap_or(current.week());
            let plan = service.week_plan(year, week)?;

            match cli.format {
                OutputFormat::Json => print_json(&plan),
                OutputFormat::Text => {
                    println!(
                        "{}",
                        format!("Week {} of {} ({})", week, year, plan.range).cyan().bold()
                    );
                    if plan.is_empty() {
                        println!("{}", "No workouts planned for this week".yellow());
                        return Ok(());
                    }
                    println!("{}", report::plan_table(&plan));
                    println!(
                        "Total: {} TSS over {}",
                        plan.total_load().round(),
                        report::duration(Some(plan.total_time()))
                    );
                    Ok(())
                }
            }
        }

        Commands::Review { date } => {
            let date = date.unwrap_or(yesterday);
            let review = service.review(date)?;
            match cli.format {
                OutputFormat::Json => print_json(&review),
                OutputFormat::Text => {
                    println!("{}", report::review_text(&review));
                    Ok(())
                }
            }
        }

        Commands::Efficiency { date } => {
            let date = date.unwrap_or(yesterday);
            let analyzer = EfficiencyAnalyzer::new(config.efficiency.clone());
            let efficiency = service.efficiency(&analyzer, date)?;
            match cli.format {
                OutputFormat::Json => print_json(&efficiency),
                OutputFormat::Text => {
                    println!("{}", "Aerobic efficiency".cyan().bold());
                    println!("{}", report::efficiency_text(&efficiency));
                    Ok(())
                }
            }
        }

        Commands::History { from, to } => {
            let to = to.unwrap_or(today);
            let from = from.unwrap_or_else(|| to.checked_sub_days(Days::new(7)).unwrap_or(to));
            let rides = service.ride_history(history_range(from, to)?)?;
            match cli.format {
                OutputFormat::Json => print_json(&rides),
                OutputFormat::Text => {
                    if rides.is_empty() {
                        println!("{}", format!("No rides between {} and {}", from, to).yellow());
                    } else {
                        println!("{}", report::ride_history_table(&rides));
                    }
                    Ok(())
                }
            }
        }

        Commands::Config { .. } => Ok(()),
    }
}

fn build_service(cli: &Cli, config: &AppConfig) -> Result<Service> {
    let (source, athlete_id): (Box<dyn WellnessSource>, String) = match &cli.offline {
        Some(path) => (
            Box::new(FileSource::open(path)?),
            config.athlete.athlete_id.clone(),
        ),
        None => (
            Box::new(IntervalsClient::from_config(&config.athlete)?),
            config.athlete_id()?.to_string(),
        ),
    };

    let source: Box<dyn WellnessSource> = if config.cache.enabled {
        Box::new(CachedSource::new(
            source,
            Duration::from_secs(config.cache.ttl_secs),
        ))
    } else {
        source
    };

    let engine = ReadinessEngine::new(config.engine_config()?)?;
    Ok(ReadinessService::new(source, athlete_id, engine))
}

fn build_sink(config: &AppConfig) -> Result<Box<dyn NotificationSink>> {
    if config.notify.has_telegram() {
        Ok(Box::new(TelegramSink::from_config(&config.notify)?))
    } else {
        warn!("Telegram credentials missing, writing the message to the log");
        Ok(Box::new(LogSink))
    }
}

fn paint_verdict(verdict: Verdict) -> ColoredString {
    let text = format!("{} {}", verdict.symbol(), verdict);
    match verdict {
        Verdict::Green => text.green().bold(),
        Verdict::Yellow => text.yellow().bold(),
        Verdict::Red => text.red().bold(),
    }
}

fn print_assessment(format: OutputFormat, result: &ReadinessResult) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(result);
    }

    println!(
        "{} {}  {}/{}  {}",
        "Readiness".bold(),
        result.date,
        result.score.to_string().bold(),
        result.max_attainable,
        paint_verdict(result.verdict)
    );
    println!("{}", format!("Policy: {}", result.policy).dimmed());

    for line in &result.breakdown {
        let text = line.to_string();
        let text = match line.assessment {
            Assessment::Good => text.green(),
            Assessment::Caution => text.yellow(),
            Assessment::Poor => text.red(),
        };
        println!("  {}", text);
    }
    if result.is_partial() {
        println!(
            "  {}",
            format!(
                "Some metrics are missing; at most {} points were attainable",
                result.max_attainable
            )
            .dimmed()
        );
    }

    if !result.alerts.is_empty() {
        println!("{}", "Alerts".bold());
        for alert in &result.alerts {
            println!("  {}", alert);
        }
    }

    println!("{}", "Baselines".bold());
    for baseline in result.baselines.iter() {
        println!(
            "  {}: RHR {} bpm, HRV {} ms, sleep {} ({} weeks)",
            baseline.kind,
            report::opt(baseline.resting_hr, 1),
            report::opt(baseline.hrv, 1),
            report::opt(baseline.sleep_score, 1),
            baseline.weeks_used
        );
    }

    println!("{}", result.verdict.advice().italic());
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_config(cli: &Cli, config: &AppConfig, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut shown = config.clone();
            let mask = |v: &mut Option<String>| {
                if v.is_some() {
                    *v = Some("********".to_string());
                }
            };
            mask(&mut shown.athlete.api_key);
            mask(&mut shown.notify.telegram_token);
            println!("{}", toml::to_string_pretty(&shown)?);
            Ok(())
        }
        ConfigAction::Init { force } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(AppConfig::default_config_path);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            AppConfig::default().save_to_file(&path)?;
            println!("{} {}", "✓ Configuration written to".green(), path.display());
            Ok(())
        }
    }
}
