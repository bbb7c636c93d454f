use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use tapdeck::cli::Args;
use tapdeck::core::{
    CommandFeedback, Feedback, JsonFileStore, LatestScan, Registry, ScanContext, ScanLoop, SilentFeedback, Workers,
};
use tapdeck::device::{KeyboardWedge, LineSource, ScanSource, find_event_device};
use tapdeck::mopidy::MopidyClient;
use tapdeck::paths::{self, PathConfig};
use tapdeck::server::{ApiServer, ApiState};
use tapdeck::settings::{SETTINGS_FILE, Settings};

/// How long shutdown waits for the scanner thread
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

fn init_logging(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| paths::data_file("tapdeck.log", path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("tiny_http", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("tiny_http", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .init();
    }

    Ok(())
}

/// Pick the reader: CLI source flags first, then configured device, then stdin.
fn open_source(args: &Args, settings: &Settings) -> Result<Box<dyn ScanSource>> {
    if args.stdin {
        info!("Reading tags from stdin");
        return Ok(Box::new(LineSource::stdin()));
    }

    if let Some(path) = &args.line_device {
        info!("Reading tags line by line from {}", path.display());
        let source = LineSource::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        return Ok(Box::new(source));
    }

    let device = match (&settings.device, &settings.device_name) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(name)) => {
            Some(find_event_device(name).with_context(|| format!("Reader \"{}\" not found", name))?)
        }
        (None, None) => None,
    };

    match device {
        Some(path) => {
            info!("Reading tags from keyboard reader {}", path.display());
            let source = KeyboardWedge::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(source))
        }
        None => {
            info!("No reader configured, reading tags from stdin");
            Ok(Box::new(LineSource::stdin()))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());

    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &path_config)?;

    info!("Tapdeck starting...");
    debug!("Command-line args: {:?}", args);
    info!("Config path: {}", paths::config_file(SETTINGS_FILE, &path_config).display());

    let settings = Settings::resolve(&args, &path_config)?;
    debug!("Settings: {:?}", settings);

    let registry_path = settings.registry_path(&path_config);
    info!("Registry: {}", registry_path.display());
    let registry = Arc::new(
        Registry::open(JsonFileStore::new(&registry_path))
            .with_context(|| format!("Failed to load registry {}", registry_path.display()))?
            .allow_commands(settings.allow_commands),
    );
    info!("Loaded {} registered tags", registry.len());

    let latest = Arc::new(LatestScan::new());
    let workers = Arc::new(Workers::new(2).context("Failed to start worker threads")?);

    let feedback: Arc<dyn Feedback> = if settings.feedback {
        Arc::new(CommandFeedback::new(
            &settings.player_command,
            settings.sounds_path(&path_config),
            Arc::clone(&workers),
        ))
    } else {
        Arc::new(SilentFeedback)
    };

    let core = Arc::new(MopidyClient::new(&settings.mopidy_url, settings.mopidy_timeout()));
    info!("Mopidy endpoint: {}", core.rpc_url());

    let source = open_source(&args, &settings)?;
    let ctx = ScanContext {
        registry: Arc::clone(&registry),
        latest: Arc::clone(&latest),
        core,
        feedback,
    };
    let scanner = ScanLoop::new(source, ctx)
        .with_debounce(settings.debounce())
        .with_error_backoff(settings.error_backoff())
        .spawn()
        .context("Failed to start scanner thread")?;

    let state = Arc::new(ApiState {
        registry,
        latest,
        scanner: scanner.status(),
    });
    let server = ApiServer::start(&settings.listen_addr(), state)?;
    info!("API listening on http://{}", server.addr());

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("Failed to install signal handler")?;

    let _ = stop_rx.recv();
    info!("Shutting down...");

    scanner.stop();
    server.stop();
    if !scanner.shutdown(SHUTDOWN_TIMEOUT) {
        // Blocked in a device read; the thread goes away with the process
        warn!("Scanner did not stop within {:?}", SHUTDOWN_TIMEOUT);
    }

    info!("Tapdeck stopped");
    Ok(())
}
