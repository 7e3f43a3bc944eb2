//! P2P monitor: Bybit P2P price watcher.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the quote client, the notifier and the terminal view, then
//! ticks the monitor until Ctrl+C.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use p2p_monitor::clock::{SystemClock, Ticker};
use p2p_monitor::config::{AppConfig, LogTarget};
use p2p_monitor::display::layout::Layout;
use p2p_monitor::display::terminal::{self, TerminalRenderer};
use p2p_monitor::display::{PresentationSink, TracingSink};
use p2p_monitor::monitor::{runner, Monitor};
use p2p_monitor::notify::telegram::TelegramNotifier;
use p2p_monitor::notify::{LogNotifier, Notifier};
use p2p_monitor::quotes::bybit::BybitP2pClient;
use p2p_monitor::retry::RetryPolicy;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("P2P_MONITOR_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging(&cfg.display.log_target())?;

    info!(
        config = %config_path,
        currencies = cfg.currencies.len(),
        sleep_after_match_minutes = cfg.monitor.sleep_after_match_minutes,
        fetch_interval_secs = cfg.monitor.fetch_interval_secs,
        max_attempts = cfg.retry.max_attempts,
        "P2P monitor starting up"
    );

    // -- Initialise components -------------------------------------------

    let retry = RetryPolicy::from(&cfg.retry);
    let quotes = BybitP2pClient::from_config(&cfg.quotes, retry)?;

    let notifier: Box<dyn Notifier> = match TelegramNotifier::from_env(&cfg.telegram, retry)? {
        Some(telegram) => {
            info!("Telegram notifications enabled");
            Box::new(telegram)
        }
        None => {
            warn!(
                token_env = %cfg.telegram.bot_token_env,
                chat_env = %cfg.telegram.chat_id_env,
                "No Telegram credentials, notifications go to the log only"
            );
            Box::new(LogNotifier)
        }
    };

    let currencies = cfg.watched_currencies();

    if cfg.monitor.startup_delay_secs > 0 {
        info!(secs = cfg.monitor.startup_delay_secs, "Waiting before first tick");
        tokio::time::sleep(Duration::from_secs(cfg.monitor.startup_delay_secs)).await;
    }

    let layout = Layout::new(&currencies);
    let sink: Box<dyn PresentationSink> = if cfg.display.terminal {
        let mut renderer = TerminalRenderer::stdout();
        renderer.draw(&layout)?;
        Box::new(renderer)
    } else {
        Box::new(TracingSink)
    };

    let mut monitor = Monitor::new(
        currencies,
        Box::new(quotes),
        notifier,
        sink,
        cfg.monitor.sleep_after_match(),
    )
    .with_fetch_interval(cfg.monitor.fetch_interval());

    // -- Main loop -------------------------------------------------------

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let result = runner::run(
        &mut monitor,
        Ticker::new(SystemClock),
        cfg.monitor.tick_interval(),
        cfg.monitor.halt_on_error,
        shutdown,
    )
    .await;

    if cfg.display.terminal {
        terminal::restore(&mut std::io::stdout(), layout.height())?;
    }

    let summary = result?;
    info!(
        ticks = summary.ticks,
        cycles = summary.cycles,
        errors = summary.errors,
        run_time = %monitor.run_time(),
        "P2P monitor shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
///
/// Stdout belongs to the terminal view, so while it is on the log is
/// appended to a file instead of stderr.
fn init_logging(target: &LogTarget) -> Result<()> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("p2p_monitor=info"));

    let json_logging = std::env::var("P2P_MONITOR_LOG_JSON").is_ok();

    let (writer, ansi) = match target {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(writer)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .init();
    }

    Ok(())
}
