//! Tick loop driving the `Monitor`.
//!
//! Ticks come from a `tokio::time::interval` whose first tick is one
//! period after start, not immediately. The handler is awaited
//! inline, so a long fetch cycle delays the next tick instead of
//! overlapping it, and ticks missed meanwhile are skipped. The elapsed
//! time passed to each tick is measured by the `Ticker`, not assumed.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use super::{CycleReport, Monitor};
use crate::clock::{Clock, Ticker};
use crate::types::MonitorError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub cycles: u64,
    pub errors: u64,
}

/// Tick `monitor` every `period` until `shutdown` resolves.
///
/// A tick error is logged and the loop keeps going, unless
/// `halt_on_error` is set, in which case it is returned.
pub async fn run<C, F>(
    monitor: &mut Monitor,
    mut ticker: Ticker<C>,
    period: Duration,
    halt_on_error: bool,
    shutdown: F,
) -> Result<LoopSummary, MonitorError>
where
    C: Clock,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut summary = LoopSummary::default();

    info!(
        period_ms = period.as_millis() as u64,
        currencies = monitor.currencies().len(),
        "Entering tick loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                summary.ticks += 1;
                match monitor.tick(ticker.delta()).await {
                    Ok(report) => {
                        if let Some(cycle) = &report.cycle {
                            summary.cycles += 1;
                            log_cycle_report(cycle);
                        }
                    }
                    Err(e) => {
                        summary.errors += 1;
                        error!(error = %e, "Tick failed");
                        if halt_on_error {
                            return Err(e);
                        }
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    Ok(summary)
}

fn log_cycle_report(report: &CycleReport) {
    info!(
        queried = ?report.queried,
        matched = ?report.matched,
        unavailable = ?report.unavailable,
        undelivered = report.undelivered,
        "Cycle complete"
    );
}
