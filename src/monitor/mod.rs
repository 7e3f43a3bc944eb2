//! Polling scheduler.
//!
//! `Monitor::tick` is the whole state machine. Per tick it:
//!
//! 1. decrements the fetch debounce and every currency cooldown by the
//!    elapsed time (floored at zero) and publishes them;
//! 2. starts a fetch cycle only if the debounce is zero, no cycle is in
//!    flight and at least one currency is awake;
//! 3. re-arms the debounce before the first request goes out;
//! 4. queries each awake currency in configured order, publishes its best
//!    order and notifies + arms the cooldown on a match;
//! 5. clears the in-flight flag whatever happened.
//!
//! A currency whose quotes stay unavailable after all retries just shows
//! "no orders" for that cycle. A malformed response aborts the cycle, is
//! reported through the notifier and returned to the caller.

pub mod runner;

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::display::layout::{
    fetch_timer_text, sleep_timer_text, two_digits, KEY_DELTA_TIME, KEY_FETCH_STATUS,
    KEY_FETCH_TIMER, KEY_HOURS, KEY_MINUTES, KEY_SECONDS,
};
use crate::display::PresentationSink;
use crate::notify::{self, Notifier};
use crate::quotes::QuoteSource;
use crate::types::{BestOrder, MonitorError, RunTime, SchedulerState, WatchedCurrency};

/// Default spacing between the starts of two fetch cycles.
pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened during one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Currencies a request was issued for, in order.
    pub queried: Vec<String>,
    /// Currencies whose best order met the desired price.
    pub matched: Vec<String>,
    /// Currencies with no quotes after all retries.
    pub unavailable: Vec<String>,
    /// Match notifications that could not be delivered.
    pub undelivered: usize,
}

/// Outcome of one tick. `cycle` is `None` when gating skipped the fetch phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub elapsed_ms: u64,
    pub cycle: Option<CycleReport>,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor {
    quotes: Box<dyn QuoteSource>,
    notifier: Box<dyn Notifier>,
    sink: Box<dyn PresentationSink>,
    currencies: Vec<WatchedCurrency>,
    state: SchedulerState,
    run_time: RunTime,
    fetch_interval_ms: u64,
    sleep_after_match_ms: u64,
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Monitor {
    pub fn new(
        currencies: Vec<WatchedCurrency>,
        quotes: Box<dyn QuoteSource>,
        notifier: Box<dyn Notifier>,
        sink: Box<dyn PresentationSink>,
        sleep_after_match: Duration,
    ) -> Self {
        Self {
            quotes,
            notifier,
            sink,
            currencies,
            state: SchedulerState::default(),
            run_time: RunTime::default(),
            fetch_interval_ms: as_millis(DEFAULT_FETCH_INTERVAL),
            sleep_after_match_ms: as_millis(sleep_after_match),
        }
    }

    pub fn with_fetch_interval(mut self, interval: Duration) -> Self {
        self.fetch_interval_ms = as_millis(interval);
        self
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn currencies(&self) -> &[WatchedCurrency] {
        &self.currencies
    }

    pub fn run_time(&self) -> RunTime {
        self.run_time
    }

    pub fn fetch_interval_ms(&self) -> u64 {
        self.fetch_interval_ms
    }

    pub fn sleep_after_match_ms(&self) -> u64 {
        self.sleep_after_match_ms
    }

    /// Put a currency to sleep for `ms`. Returns false for unknown codes.
    pub fn set_sleep_remaining(&mut self, code: &str, ms: u64) -> bool {
        match self.currencies.iter_mut().find(|c| c.code == code) {
            Some(wc) => {
                wc.sleep_remaining_ms = ms;
                true
            }
            None => false,
        }
    }

    /// Override the debounce, e.g. to replay a state.
    pub fn set_fetch_debounce_remaining(&mut self, ms: u64) {
        self.state.fetch_debounce_remaining_ms = ms;
    }

    /// Advance by `elapsed` and run a fetch cycle if one is due.
    pub async fn tick(&mut self, elapsed: Duration) -> Result<TickReport, MonitorError> {
        let elapsed_ms = as_millis(elapsed);

        self.publish(KEY_DELTA_TIME, &elapsed_ms.to_string());
        self.advance_timers(elapsed_ms);

        let cycle = self.check_orders().await?;
        Ok(TickReport { elapsed_ms, cycle })
    }

    /// Step 1: run time and countdowns.
    fn advance_timers(&mut self, elapsed_ms: u64) {
        self.run_time.advance(elapsed_ms);
        self.publish(KEY_HOURS, &two_digits(self.run_time.hours()));
        self.publish(KEY_MINUTES, &two_digits(self.run_time.minutes()));
        self.publish(KEY_SECONDS, &two_digits(self.run_time.seconds()));

        self.state.fetch_debounce_remaining_ms =
            self.state.fetch_debounce_remaining_ms.saturating_sub(elapsed_ms);
        self.publish(
            KEY_FETCH_TIMER,
            &fetch_timer_text(self.state.fetch_debounce_remaining_ms),
        );

        for i in 0..self.currencies.len() {
            let wc = &mut self.currencies[i];
            let was_asleep = !wc.is_awake();
            wc.sleep_remaining_ms = wc.sleep_remaining_ms.saturating_sub(elapsed_ms);
            if was_asleep && wc.is_awake() {
                info!(currency = %wc.code, "Cooldown over, watching again");
            }
            let (key, text) = (wc.sleep_timer_key(), sleep_timer_text(wc.sleep_remaining_ms));
            self.publish(&key, &text);
        }
    }

    /// Step 2: whether a fetch cycle may start this tick.
    pub fn should_fetch(&self) -> bool {
        self.state.fetch_debounce_remaining_ms == 0
            && !self.state.fetch_in_progress
            && self.currencies.iter().any(WatchedCurrency::is_awake)
    }

    /// Steps 2–5.
    async fn check_orders(&mut self) -> Result<Option<CycleReport>, MonitorError> {
        if !self.should_fetch() {
            return Ok(None);
        }

        self.state.fetch_debounce_remaining_ms = self.fetch_interval_ms;
        self.publish(
            KEY_FETCH_TIMER,
            &fetch_timer_text(self.state.fetch_debounce_remaining_ms),
        );
        self.set_fetch_in_progress(true);

        let result = self.run_cycle().await;

        self.set_fetch_in_progress(false);

        match result {
            Ok(report) => {
                debug!(
                    queried = report.queried.len(),
                    matched = report.matched.len(),
                    unavailable = report.unavailable.len(),
                    "Fetch cycle complete"
                );
                Ok(Some(report))
            }
            Err(e) => {
                warn!(error = %e, "Fetch cycle aborted");
                if let Err(notify_err) = self.notifier.send_message(&notify::error_message(&e)).await {
                    warn!(error = %notify_err, "Error notification not delivered");
                }
                Err(e)
            }
        }
    }

    /// Step 4: query every awake currency, sequentially.
    async fn run_cycle(&mut self) -> Result<CycleReport, MonitorError> {
        let mut report = CycleReport::default();

        for i in 0..self.currencies.len() {
            if !self.currencies[i].is_awake() {
                continue;
            }

            let code = self.currencies[i].code.clone();
            report.queried.push(code.clone());

            let best = match self.quotes.fetch_orders(&self.currencies[i].payload).await {
                Ok(response) => BestOrder::from_response(&response),
                Err(MonitorError::QuoteUnavailable { attempts, message, .. }) => {
                    warn!(currency = %code, attempts, error = %message, "No quotes this cycle");
                    report.unavailable.push(code.clone());
                    None
                }
                Err(e) => return Err(e),
            };

            let key = self.currencies[i].best_order_key();
            match &best {
                Some(order) => self.publish(&key, &order.to_string()),
                None => self.publish(&key, BestOrder::NONE_MARKER),
            }

            let Some(order) = best else { continue };
            if !self.currencies[i].is_satisfied_by(&order) {
                debug!(currency = %code, price = %order.price, "Below desired price");
                continue;
            }

            info!(
                currency = %code,
                price = %order.price,
                desired = %self.currencies[i].desired_price,
                order_id = %order.id,
                "Desired price found"
            );

            if let Err(e) = self.notifier.send_message(&notify::match_message(&order)).await {
                warn!(currency = %code, error = %e, "Match notification not delivered");
                report.undelivered += 1;
            }

            let wc = &mut self.currencies[i];
            wc.sleep_remaining_ms = self.sleep_after_match_ms;
            let (key, text) = (wc.sleep_timer_key(), sleep_timer_text(wc.sleep_remaining_ms));
            self.publish(&key, &text);
            report.matched.push(code);
        }

        Ok(report)
    }

    fn set_fetch_in_progress(&mut self, in_progress: bool) {
        self.state.fetch_in_progress = in_progress;
        let status = self.state.fetch_status().to_string();
        self.publish(KEY_FETCH_STATUS, &status);
    }

    /// Display failures never affect scheduling.
    fn publish(&mut self, key: &str, text: &str) {
        if let Err(e) = self.sink.render(key, text) {
            debug!(key, error = %e, "Render failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
