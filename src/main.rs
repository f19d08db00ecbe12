//! lampcheck - MQTT integration tests for a network-controlled lamp
//!
//! Usage:
//!   lampcheck [OPTIONS] [SUITES]...
//!
//! Options:
//!   -c, --config <FILE>      Configuration file path
//!   -H, --host <HOST>        Broker host
//!   -p, --port <PORT>        Broker port
//!   -t, --topic <TOPIC>      Device topic root
//!   -u, --username <USER>    Broker username
//!   -P, --password <PASS>    Broker password
//!   -l, --log-level          Log level (error, warn, info, debug, trace)
//!       --list               List available suites and exit
//!   -h, --help               Print help

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use lampcheck::config::HarnessConfig;
use lampcheck::orchestrator::run_suites;
use lampcheck::suites;

/// Log level for CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    #[default]
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace messages (very verbose)
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    fn from_config(level: &str) -> Self {
        match level.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Warn,
        }
    }
}

/// lampcheck - lamp firmware MQTT test runner
#[derive(Parser, Debug)]
#[command(name = "lampcheck")]
#[command(author = "lampcheck Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Runs MQTT test scenarios against a network-controlled lamp")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker host
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Broker port
    #[arg(short, long)]
    port: Option<u16>,

    /// Device topic root
    #[arg(short, long)]
    topic: Option<String>,

    /// Broker username
    #[arg(short, long)]
    username: Option<String>,

    /// Broker password
    #[arg(short = 'P', long)]
    password: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,

    /// List available suites and exit
    #[arg(long)]
    list: bool,

    /// Suites to run (default: all)
    suites: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.list {
        for suite in suites::all() {
            println!("{:<15} {}", suite.name, suite.title);
        }
        return ExitCode::SUCCESS;
    }

    // Load configuration file if specified, otherwise defaults plus env overrides
    let loaded = match &args.config {
        Some(path) => HarnessConfig::load(path),
        None => HarnessConfig::from_env(),
    };
    let mut config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // CLI args override file config
    if let Some(host) = args.host {
        config.broker.host = host;
    }
    if let Some(port) = args.port {
        config.broker.port = port;
    }
    if let Some(topic) = args.topic {
        config.device.topic = topic;
    }
    if args.username.is_some() {
        config.broker.username = args.username;
    }
    if args.password.is_some() {
        config.broker.password = args.password;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    // Setup logging - CLI overrides config
    let log_level = args
        .log_level
        .unwrap_or_else(|| LogLevel::from_config(&config.log.level));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level.to_tracing_level())
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    let selected = if args.suites.is_empty() {
        suites::all()
    } else {
        let mut selected = Vec::with_capacity(args.suites.len());
        for name in &args.suites {
            match suites::find(name) {
                Some(suite) => selected.push(suite),
                None => {
                    eprintln!("Unknown suite '{}'. Use --list to see available suites.", name);
                    return ExitCode::FAILURE;
                }
            }
        }
        selected
    };

    let summary = run_suites(&config, &selected).await;
    if summary.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
