//! CLI entry point.
//!
//! # Responsibility
//! - Provide a smoke probe verifying `vigia_core` linkage.
//! - Replay recorded accelerometer traces through the full engine with
//!   console-backed platform ports.
//!
//! # Invariants
//! - Replay never touches durable storage; settings live in an in-memory
//!   database.
//! - Output is deterministic for a given trace and flags.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;
use vigia_core::platform::{
    AccelerometerPort, AlertPrompt, AlertSurface, ClipboardPort, DialerPort, ManualDialPrompt,
    ManualDialSurface, Notice, Notifier,
};
use vigia_core::{
    AccelerationSample, DetectorConfig, EngineConfig, EngineEvent, FallEngine, PlatformError,
    PlatformPorts, SqliteSettingsRepository,
};

#[derive(Debug, Parser)]
#[command(name = "vigia", version, about = "Vigia fall detection tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core ping and version.
    Ping,
    /// Feed a `t,x,y,z` CSV trace through the engine.
    Replay {
        path: PathBuf,
        /// Confirm every alert as soon as it opens.
        #[arg(long)]
        auto_confirm: bool,
        /// Emergency contact used when an alert is confirmed.
        #[arg(long)]
        contact: Option<String>,
        /// Simulate a device without telephony (exercises the fallback).
        #[arg(long)]
        no_dialer: bool,
        /// Impact threshold override, in g.
        #[arg(long)]
        impact_g: Option<f64>,
        /// Stillness threshold override, in g.
        #[arg(long)]
        stillness_g: Option<f64>,
        /// Absolute directory for rolling log files.
        #[arg(long)]
        log_dir: Option<String>,
    },
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, message: String },
    InvalidRow { line: usize, message: String },
    Config(String),
    Logging(String),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read `{}`: {message}", path.display()),
            Self::InvalidRow { line, message } => write!(f, "line {line}: {message}"),
            Self::Config(message) => write!(f, "invalid configuration: {message}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
        }
    }
}

impl Error for CliError {}

#[derive(Debug, Clone, PartialEq)]
struct ReplayOptions {
    auto_confirm: bool,
    contact: Option<String>,
    dialer_supported: bool,
    detector: DetectorConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ReplaySummary {
    samples: usize,
    impacts: usize,
    aborts: usize,
    confirmations: usize,
    dialed: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Ping => {
            println!("vigia_core ping={}", vigia_core::ping());
            println!("vigia_core version={}", vigia_core::core_version());
            Ok(())
        }
        Command::Replay {
            path,
            auto_confirm,
            contact,
            no_dialer,
            impact_g,
            stillness_g,
            log_dir,
        } => {
            let mut detector = DetectorConfig::default();
            if let Some(value) = impact_g {
                detector.impact_threshold_g = value;
            }
            if let Some(value) = stillness_g {
                detector.stillness_threshold_g = value;
            }
            let options = ReplayOptions {
                auto_confirm,
                contact,
                dialer_supported: !no_dialer,
                detector,
            };
            init_cli_logging(log_dir.as_deref())
                .and_then(|()| replay_file(&path, &options))
                .map(|summary| print_summary(&summary))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_cli_logging(log_dir: Option<&str>) -> Result<(), CliError> {
    match log_dir {
        Some(dir) => vigia_core::init_logging(vigia_core::default_log_level(), dir)
            .map_err(|err| CliError::Logging(err.to_string())),
        None => Ok(()),
    }
}

fn replay_file(path: &Path, options: &ReplayOptions) -> Result<ReplaySummary, CliError> {
    let file = File::open(path).map_err(|err| CliError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    replay(BufReader::new(file), options)
}

fn replay(reader: impl BufRead, options: &ReplayOptions) -> Result<ReplaySummary, CliError> {
    let repo = SqliteSettingsRepository::open_in_memory()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let ports = console_ports(options.dialer_supported);
    let config = EngineConfig {
        detector: options.detector.clone(),
        ..EngineConfig::default()
    };
    let mut engine =
        FallEngine::new(repo, ports, config).map_err(|err| CliError::Config(err.to_string()))?;
    engine.subscribe(Box::new(|event: &EngineEvent| {
        println!("event {event:?}");
    }));
    engine.start();
    if let Some(contact) = &options.contact {
        engine
            .set_emergency_contact(contact)
            .map_err(|err| CliError::Config(err.to_string()))?;
    }
    engine.set_fall_detection_enabled(true);
    info!(
        "event=replay_start module=cli auto_confirm={} dialer_supported={}",
        options.auto_confirm, options.dialer_supported
    );

    let mut summary = ReplaySummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|err| CliError::InvalidRow {
            line: line_no,
            message: err.to_string(),
        })?;
        let Some(sample) = parse_row(&line).map_err(|message| CliError::InvalidRow {
            line: line_no,
            message,
        })?
        else {
            continue;
        };

        summary.samples += 1;
        match engine.handle_sample(&sample) {
            Some(EngineEvent::ImpactDetected { .. }) => summary.impacts += 1,
            Some(EngineEvent::DetectionAborted { .. }) => summary.aborts += 1,
            Some(EngineEvent::FallConfirmed { .. }) => {
                summary.confirmations += 1;
                if options.auto_confirm && engine.confirm_alert().is_some() {
                    summary.dialed += 1;
                }
            }
            _ => {}
        }
    }
    info!(
        "event=replay_done module=cli samples={} confirmations={}",
        summary.samples, summary.confirmations
    );
    Ok(summary)
}

/// Parses one `t,x,y,z` row; `Ok(None)` for blanks, comments and a header.
fn parse_row(line: &str) -> Result<Option<AccelerationSample>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('t') {
        return Ok(None);
    }
    let fields = trimmed.split(',').map(str::trim).collect::<Vec<_>>();
    let [t, x, y, z] = fields.as_slice() else {
        return Err(format!("expected 4 fields `t,x,y,z`, got {}", fields.len()));
    };
    let t = t
        .parse::<u64>()
        .map_err(|err| format!("invalid timestamp `{t}`: {err}"))?;
    let axis = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|err| format!("invalid axis value `{value}`: {err}"))
    };
    Ok(Some(AccelerationSample::new(axis(*x)?, axis(*y)?, axis(*z)?, t)))
}

fn print_summary(summary: &ReplaySummary) {
    println!(
        "samples={} impacts={} aborts={} confirmations={} dialed={}",
        summary.samples, summary.impacts, summary.aborts, summary.confirmations, summary.dialed
    );
}

struct ConsolePorts {
    dialer_supported: bool,
}

impl AccelerometerPort for ConsolePorts {
    fn start(&mut self, interval_ms: u64) -> Result<(), PlatformError> {
        println!("sensor start interval_ms={interval_ms}");
        Ok(())
    }

    fn stop(&mut self) {
        println!("sensor stop");
    }
}

impl AlertSurface for ConsolePorts {
    fn show_alert(&self, prompt: &AlertPrompt) {
        println!("alert show {}: {}", prompt.title, prompt.message);
    }

    fn dismiss_alert(&self, session_id: Uuid) {
        println!("alert dismiss {session_id}");
    }
}

impl Notifier for ConsolePorts {
    fn notify(&self, notice: &Notice) {
        match &notice.description {
            Some(description) => {
                println!("notice [{}] {} ({description})", notice.kind.as_str(), notice.message)
            }
            None => println!("notice [{}] {}", notice.kind.as_str(), notice.message),
        }
    }
}

impl DialerPort for ConsolePorts {
    fn is_supported(&self) -> bool {
        self.dialer_supported
    }

    fn launch(&self, uri: &str) -> Result<(), PlatformError> {
        println!("dialer launch {uri}");
        Ok(())
    }
}

impl ClipboardPort for ConsolePorts {
    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        println!("clipboard {text}");
        Ok(())
    }
}

impl ManualDialSurface for ConsolePorts {
    fn show_manual_dial(&self, prompt: &ManualDialPrompt) {
        println!("manual dial {}: {}", prompt.number, prompt.message);
    }
}

fn console_ports(dialer_supported: bool) -> PlatformPorts {
    let shared = Arc::new(ConsolePorts { dialer_supported });
    PlatformPorts {
        accelerometer: Box::new(ConsolePorts { dialer_supported }),
        alert_surface: shared.clone(),
        notifier: shared.clone(),
        dialer: shared.clone(),
        clipboard: shared.clone(),
        manual_dial: shared,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_row, replay, replay_file, ReplayOptions};
    use std::io::{Cursor, Write};
    use vigia_core::DetectorConfig;

    fn trace(magnitudes: &[f64]) -> String {
        let mut csv = String::from("t,x,y,z\n");
        for (index, magnitude) in magnitudes.iter().enumerate() {
            csv.push_str(&format!("{},0,0,{magnitude}\n", index * 200));
        }
        csv
    }

    fn options(auto_confirm: bool) -> ReplayOptions {
        ReplayOptions {
            auto_confirm,
            contact: Some("11987654321".to_string()),
            dialer_supported: false,
            detector: DetectorConfig::default(),
        }
    }

    #[test]
    fn parse_row_skips_header_and_comments() {
        assert_eq!(parse_row("t,x,y,z").expect("header"), None);
        assert_eq!(parse_row("# recorded").expect("comment"), None);
        assert_eq!(parse_row("  ").expect("blank"), None);
        let sample = parse_row("200, 0.0, 0.0, 1.0")
            .expect("valid row")
            .expect("sample");
        assert_eq!(sample.timestamp_ms, 200);
        assert!((sample.magnitude() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parse_row_rejects_bad_fields() {
        assert!(parse_row("1,2,3").is_err());
        assert!(parse_row("-5,0,0,1").is_err());
        assert!(parse_row("0,0,zero,1").is_err());
    }

    #[test]
    fn replay_confirms_fall_and_auto_confirms() {
        let mut magnitudes = vec![1.0, 1.0, 1.0, 3.0, 3.0];
        magnitudes.extend(std::iter::repeat(0.4).take(16));
        let summary = replay(Cursor::new(trace(&magnitudes)), &options(true)).expect("replay");

        assert_eq!(summary.samples, 21);
        assert_eq!(summary.impacts, 1);
        assert_eq!(summary.confirmations, 1);
        assert_eq!(summary.dialed, 1);
    }

    #[test]
    fn replay_of_active_trace_never_confirms() {
        let summary = replay(
            Cursor::new(trace(&[1.0, 1.0, 3.0, 3.0, 4.5, 4.5, 1.0, 1.0, 1.0])),
            &options(false),
        )
        .expect("replay");

        assert_eq!(summary.confirmations, 0);
        assert_eq!(summary.aborts, 1);
    }

    #[test]
    fn replay_file_reports_bad_line_number() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "t,x,y,z").expect("write");
        writeln!(file, "0,0,0,1").expect("write");
        writeln!(file, "200,0,0").expect("write");

        let err = replay_file(file.path(), &options(false))
            .expect_err("short row must fail");
        assert!(err.to_string().starts_with("line 3"));
    }
}
