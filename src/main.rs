#![allow(dead_code)]

mod adapters;
mod backend;
mod bus;
mod config;
mod core;
mod ports;

use crate::adapters::aws::auth::SdkAuthProvider;
use crate::adapters::aws::profiles;
use crate::adapters::tui::{app::TuiApp, event::InputListener};
use crate::backend::worker::BackendWorker;
use crate::bus::gateway::TriggerGateway;
use crate::config::LoggingConfig;
use crate::ports::AuthProvider;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "AWS session dashboard for the terminal", long_about = None)]
struct CliArgs {
    #[clap(short, long, help = "AWS profile to load on startup")]
    profile: Option<String>,

    #[clap(short, long, help = "AWS region override")]
    region: Option<String>,

    #[clap(long, value_name = "FILE", help = "Path to a config file (TOML)")]
    config: Option<PathBuf>,

    #[clap(long, value_name = "FILE", help = "Log file path")]
    log_file: Option<PathBuf>,

    #[clap(long, help = "Log level filter (error, warn, info, debug, trace)")]
    log_level: Option<String>,
}

/// The previous log file is moved aside with a timestamp suffix so each run
/// starts with a fresh file.
fn rotate_log_file(path: &PathBuf) {
    if !path.exists() {
        return;
    }
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut rotated = path.clone().into_os_string();
    rotated.push(format!(".{timestamp}"));
    if let Err(e) = std::fs::rename(path, &rotated) {
        eprintln!("[PRE-INIT WARN] Could not rotate previous log file {path:?}: {e}");
    }
}

/// Logs go to a file, never to the terminal the TUI owns. RUST_LOG overrides
/// the configured level.
fn init_logger(logging: &LoggingConfig) -> anyhow::Result<()> {
    rotate_log_file(&logging.file);
    let log_file = File::create(&logging.file)?;
    let writer = Mutex::new(log_file);

    let env_filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone());
    let env_filter = EnvFilter::try_new(&env_filter_str).unwrap_or_else(|e| {
        eprintln!(
            "[PRE-INIT WARN] Invalid log filter '{env_filter_str}': {e}. Defaulting to 'info'."
        );
        EnvFilter::new("info")
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = config::load(cli_args.config.as_ref())?;
    let profile = cli_args.profile.or(file_config.profile);
    let region = cli_args.region.or(file_config.region);
    let logging = LoggingConfig {
        level: cli_args.log_level.unwrap_or(file_config.logging.level),
        file: cli_args.log_file.unwrap_or(file_config.logging.file),
    };

    init_logger(&logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        ?profile,
        ?region,
        "awspect starting"
    );

    let profiles = profiles::available_profiles();

    let (gateway, request_rx) = TriggerGateway::channel();
    let gateway = Arc::new(gateway);

    let provider: Arc<dyn AuthProvider> = Arc::new(SdkAuthProvider);
    let worker = BackendWorker::new(request_rx, provider, profile, region);
    let worker_handle = tokio::spawn(worker.run());

    let mut stdout_handle = stdout();
    enable_raw_mode()?;
    execute!(&mut stdout_handle, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout_handle);
    let mut terminal = Terminal::new(backend)?;

    let mut input = InputListener::new();
    input.start();

    let mut app = TuiApp::new(Arc::clone(&gateway), profiles);
    let run_result = app.run(&mut terminal, &mut input).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    input.shutdown();
    gateway.close();
    // Dropping the remaining gateway handles closes the request channel, so
    // the worker exits even if it never saw a quit trigger.
    drop(app);
    drop(gateway);
    if let Err(e) = worker_handle.await {
        tracing::warn!(error = %e, "Backend worker task ended abnormally");
    }

    if let Err(e) = run_result {
        eprintln!("[CRITICAL TUI ERROR] {e}\nCheck the log file for details.");
        return Err(e);
    }
    info!("awspect shut down");
    Ok(())
}
