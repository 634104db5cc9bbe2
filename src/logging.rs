//! Structured logging for readyrs
//!
//! Pretty output for interactive runs, JSON for scheduled runs, and an
//! optional log file that always receives JSON lines.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging section of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Lowest level written when `RUST_LOG` is unset
    pub level: LogLevel,

    /// Terminal output style
    pub format: LogFormat,

    /// Also append JSON lines to this file
    pub file_path: Option<PathBuf>,

    /// Start a new file every day instead of appending to one
    pub rotation: bool,

    /// Report span enter/close events
    pub include_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: LogLevel::Warn,
            format: LogFormat::Pretty,
            file_path: None,
            rotation: true,
            include_spans: false,
        }
    }
}

/// Verbosity ladder, quietest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const LADDER: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// `EnvFilter` directive name
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Step up the ladder once per `-v` flag
    pub fn raised_by(self, verbosity: u8) -> Self {
        let current = self as usize;
        let raised = (current + verbosity as usize).min(Self::LADDER.len() - 1);
        Self::LADDER[raised]
    }
}

/// Terminal output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Colored multi-line events
    Pretty,
    /// JSON lines, for cron runs
    Json,
    /// One line per event
    Compact,
}

fn terminal_layer(config: &LogConfig) -> BoxedLayer {
    let spans = if config.include_spans {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(spans);

    match config.format {
        LogFormat::Pretty => layer.with_line_number(true).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// Writer for the log file, if one is configured
fn file_writer(config: &LogConfig) -> anyhow::Result<Option<BoxMakeWriter>> {
    let Some(path) = &config.file_path else {
        return Ok(None);
    };
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory)?;

    let writer = if config.rotation {
        let prefix = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("readyrs.log");
        BoxMakeWriter::new(tracing_appender::rolling::daily(directory, prefix))
    } else {
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        BoxMakeWriter::new(Mutex::new(file))
    };
    Ok(Some(writer))
}

/// Install the global subscriber
///
/// Events go to stderr so `--format json` output on stdout stays
/// machine-readable. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("readyrs={}", config.level.as_str())));

    let mut layers = vec![terminal_layer(config)];
    if let Some(writer) = file_writer(config)? {
        layers.push(fmt::layer().json().with_writer(writer).with_target(true).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    tracing::debug!(
        level = config.level.as_str(),
        format = ?config.format,
        file = ?config.file_path,
        "Logging initialized"
    );
    Ok(())
}
