//! End-to-end scheduler scenarios against in-memory services.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

use p2p_monitor::clock::{SystemClock, Ticker};
use p2p_monitor::config::QuotesConfig;
use p2p_monitor::display::layout::{KEY_FETCH_STATUS, KEY_FETCH_TIMER, KEY_HOURS, KEY_MINUTES, KEY_SECONDS};
use p2p_monitor::display::MemorySink;
use p2p_monitor::monitor::{runner, Monitor};
use p2p_monitor::types::{BestOrder, MonitorError, WatchedCurrency};

use crate::mock_services::{MockNotifier, MockQuotes, Quote};

const COOLDOWN: Duration = Duration::from_secs(60 * 60);
const SECOND: Duration = Duration::from_secs(1);

struct Harness {
    monitor: Monitor,
    quotes: MockQuotes,
    notifier: MockNotifier,
    sink: MemorySink,
}

fn harness(watch: &[(&str, Decimal)]) -> Harness {
    let q = QuotesConfig::default();
    let currencies = watch
        .iter()
        .map(|(code, desired)| WatchedCurrency::new(*code, *desired, q.payload_for(code)))
        .collect();

    let quotes = MockQuotes::new();
    let notifier = MockNotifier::new();
    let sink = MemorySink::new();
    let monitor = Monitor::new(
        currencies,
        Box::new(quotes.clone()),
        Box::new(notifier.clone()),
        Box::new(sink.clone()),
        COOLDOWN,
    );

    Harness {
        monitor,
        quotes,
        notifier,
        sink,
    }
}

// -- Scenarios -------------------------------------------------------------

#[tokio::test]
async fn test_price_below_desired_sends_nothing() {
    let mut h = harness(&[("EUR", dec!(100))]);
    h.quotes.set("EUR", Quote::Price("95"));

    let report = h.monitor.tick(SECOND).await.unwrap();
    let cycle = report.cycle.unwrap();
    assert_eq!(cycle.queried, vec!["EUR"]);
    assert!(cycle.matched.is_empty());
    assert!(h.notifier.sent().is_empty());
    assert_eq!(h.monitor.currencies()[0].sleep_remaining_ms, 0);
    assert_eq!(
        h.sink.get("EUR.bestOrder").as_deref(),
        Some("{ price: 95; minAmount: 500; maxAmount: 20000 }")
    );

    // Eligible again once the debounce has run out
    assert!(h.monitor.tick(Duration::from_secs(29)).await.unwrap().cycle.is_none());
    assert!(h.monitor.tick(SECOND).await.unwrap().cycle.is_some());
    assert_eq!(h.quotes.request_count(), 2);
}

#[tokio::test]
async fn test_match_notifies_once_and_arms_cooldown() {
    let mut h = harness(&[("EUR", dec!(100))]);
    h.quotes.set("EUR", Quote::Price("101"));

    let report = h.monitor.tick(SECOND).await.unwrap();
    assert_eq!(report.cycle.unwrap().matched, vec!["EUR"]);
    assert_eq!(
        h.notifier.sent(),
        vec!["Currency: EUR, Price: 101, Min: 500, Max: 20000, ID: EUR-ad"]
    );
    assert_eq!(h.monitor.currencies()[0].sleep_remaining_ms, 3_600_000);
    assert_eq!(h.sink.get("EUR.sleepTimer").as_deref(), Some("3600"));

    // The only currency sleeps, so no cycle even after the debounce expires
    let report = h.monitor.tick(Duration::from_secs(30)).await.unwrap();
    assert!(report.cycle.is_none());
    assert_eq!(h.quotes.request_count(), 1);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_sleeping_currency_is_skipped() {
    let mut h = harness(&[("EUR", dec!(100)), ("RUB", dec!(95))]);
    h.quotes.set("RUB", Quote::Price("90"));
    h.monitor.set_sleep_remaining("EUR", 5_000);

    let cycle = h.monitor.tick(SECOND).await.unwrap().cycle.unwrap();
    assert_eq!(cycle.queried, vec!["RUB"]);
    assert_eq!(h.quotes.requests(), vec!["RUB"]);
    assert_eq!(h.monitor.currencies()[0].sleep_remaining_ms, 4_000);
    assert!(h.sink.get("EUR.bestOrder").is_none());
}

#[tokio::test]
async fn test_unavailable_quotes_do_not_stop_the_cycle() {
    let mut h = harness(&[("EUR", dec!(100)), ("RUB", dec!(95))]);
    h.quotes.set("EUR", Quote::Unavailable);
    h.quotes.set("RUB", Quote::Price("90"));

    let cycle = h.monitor.tick(SECOND).await.unwrap().cycle.unwrap();
    assert_eq!(cycle.queried, vec!["EUR", "RUB"]);
    assert_eq!(cycle.unavailable, vec!["EUR"]);
    assert_eq!(h.sink.get("EUR.bestOrder").as_deref(), Some(BestOrder::NONE_MARKER));
    assert!(h.sink.get("RUB.bestOrder").unwrap().starts_with("{ price: 90;"));
    assert_eq!(h.notifier.attempts(), 0);
    assert!(!h.monitor.state().fetch_in_progress);
}

#[tokio::test]
async fn test_undelivered_match_still_arms_cooldown() {
    let mut h = harness(&[("EUR", dec!(100))]);
    h.quotes.set("EUR", Quote::Price("150"));
    h.notifier.set_error("telegram unreachable");

    let cycle = h.monitor.tick(SECOND).await.unwrap().cycle.unwrap();
    assert_eq!(cycle.matched, vec!["EUR"]);
    assert_eq!(cycle.undelivered, 1);
    assert_eq!(h.notifier.attempts(), 1);
    assert_eq!(h.monitor.currencies()[0].sleep_remaining_ms, 3_600_000);
}

#[tokio::test]
async fn test_malformed_response_aborts_and_reports() {
    let mut h = harness(&[("EUR", dec!(100)), ("RUB", dec!(95))]);
    h.quotes.set("EUR", Quote::Malformed);

    let err = h.monitor.tick(SECOND).await.unwrap_err();
    assert!(matches!(err, MonitorError::MalformedResponse { ref currency, .. } if currency == "EUR"));
    assert_eq!(h.quotes.requests(), vec!["EUR"]);
    assert_eq!(h.notifier.sent().len(), 1);
    assert!(h.notifier.sent()[0].contains("EUR"));
    assert_eq!(h.sink.get(KEY_FETCH_STATUS).as_deref(), Some("SLEEPING"));

    // The next cycle runs normally once the provider recovers
    h.quotes.set("EUR", Quote::Price("99"));
    h.monitor.tick(Duration::from_secs(30)).await.unwrap();
    assert_eq!(h.quotes.requests(), vec!["EUR", "EUR", "RUB"]);
}

// -- Timer laws ------------------------------------------------------------

#[tokio::test]
async fn test_debounce_counts_down_and_floors_at_zero() {
    let mut h = harness(&[("EUR", dec!(100))]);
    h.monitor.tick(SECOND).await.unwrap();
    assert_eq!(h.monitor.state().fetch_debounce_remaining_ms, 30_000);
    assert_eq!(h.sink.get(KEY_FETCH_TIMER).as_deref(), Some("30"));

    h.monitor.tick(Duration::from_millis(1_250)).await.unwrap();
    assert_eq!(h.monitor.state().fetch_debounce_remaining_ms, 28_750);
    assert_eq!(h.sink.get(KEY_FETCH_TIMER).as_deref(), Some("28"));

    // Overshooting fires the next cycle, which re-arms the full interval
    h.quotes.set("EUR", Quote::Price("101"));
    h.monitor.tick(Duration::from_secs(60)).await.unwrap();
    assert_eq!(h.monitor.state().fetch_debounce_remaining_ms, 30_000);
    assert_eq!(h.quotes.request_count(), 2);
}

#[tokio::test]
async fn test_cooldown_counts_down_every_tick_then_wakes() {
    let mut h = harness(&[("EUR", dec!(100))]);
    h.monitor.set_sleep_remaining("EUR", 2_500);

    h.monitor.tick(SECOND).await.unwrap();
    h.monitor.tick(SECOND).await.unwrap();
    assert_eq!(h.monitor.currencies()[0].sleep_remaining_ms, 500);
    assert_eq!(h.sink.renders_for("EUR.sleepTimer"), vec!["2", "1"]);
    assert_eq!(h.quotes.request_count(), 0);

    let report = h.monitor.tick(SECOND).await.unwrap();
    assert_eq!(h.monitor.currencies()[0].sleep_remaining_ms, 0);
    assert_eq!(h.sink.get("EUR.sleepTimer").as_deref(), Some("0"));
    assert_eq!(report.cycle.unwrap().queried, vec!["EUR"]);
}

#[tokio::test]
async fn test_zero_elapsed_tick_is_idempotent() {
    let mut h = harness(&[("EUR", dec!(100)), ("RUB", dec!(95))]);
    h.monitor.tick(SECOND).await.unwrap();
    h.monitor.set_sleep_remaining("RUB", 9_000);
    let before = (h.monitor.state().clone(), h.monitor.currencies().to_vec(), h.monitor.run_time());

    for _ in 0..3 {
        let report = h.monitor.tick(Duration::ZERO).await.unwrap();
        assert!(report.cycle.is_none());
    }

    assert_eq!(h.monitor.state(), &before.0);
    assert_eq!(h.monitor.currencies(), before.1.as_slice());
    assert_eq!(h.monitor.run_time(), before.2);
    assert_eq!(h.quotes.request_count(), 2);
}

#[tokio::test]
async fn test_run_time_clock_carries() {
    let mut h = harness(&[("EUR", dec!(100))]);
    h.monitor.set_sleep_remaining("EUR", u64::MAX);

    h.monitor.tick(Duration::from_millis(3_661_000)).await.unwrap();
    assert_eq!(h.sink.get(KEY_HOURS).as_deref(), Some("01"));
    assert_eq!(h.sink.get(KEY_MINUTES).as_deref(), Some("01"));
    assert_eq!(h.sink.get(KEY_SECONDS).as_deref(), Some("01"));
    assert_eq!(h.monitor.run_time().to_string(), "01:01:01");
}

// -- Tick loop -------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_loop_fetches_once_per_interval() {
    let mut h = harness(&[("EUR", dec!(100))]);
    h.quotes.set("EUR", Quote::Price("95"));

    let summary = runner::run(
        &mut h.monitor,
        Ticker::new(SystemClock),
        SECOND,
        false,
        tokio::time::sleep(Duration::from_millis(61_500)),
    )
    .await
    .unwrap();

    // Ticks at 1..=61 s; cycles start at 1, 31 and 61 s
    assert_eq!(summary.ticks, 61);
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.errors, 0);
    assert_eq!(h.quotes.request_count(), 3);
    assert_eq!(h.sink.renders_for(KEY_FETCH_STATUS).len(), 6);
}
