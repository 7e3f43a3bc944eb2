//! Static layout of the terminal view.
//!
//! ```text
//! App is running for: 00:00:00
//! Fetch timer: 00
//! EUR sleep timer: 0
//! Last best order for EUR:
//! ...one pair of rows per currency...
//! Fetch status: SLEEPING
//! DeltaTime: 0
//! ```
//!
//! Each dynamic value gets a `Slot`: the render key plus the cursor
//! position right after its label.

use crate::types::{FetchStatus, WatchedCurrency};

pub const KEY_HOURS: &str = "hours";
pub const KEY_MINUTES: &str = "minutes";
pub const KEY_SECONDS: &str = "seconds";
pub const KEY_FETCH_TIMER: &str = "fetchTimer";
pub const KEY_FETCH_STATUS: &str = "fetchStatus";
pub const KEY_DELTA_TIME: &str = "deltaTime";

const RUNNING_FOR: &str = "App is running for: ";
const FETCH_TIMER: &str = "Fetch timer: ";
const FETCH_STATUS: &str = "Fetch status: ";
const DELTA_TIME: &str = "DeltaTime: ";
const HOURS_WIDTH: usize = 3;

/// Two-digit zero padded, as used for the clock and the fetch timer.
pub fn two_digits(value: u64) -> String {
    format!("{value:02}")
}

/// Fetch debounce in whole seconds, rounded down.
pub fn fetch_timer_text(remaining_ms: u64) -> String {
    two_digits(remaining_ms / 1000)
}

/// Currency cooldown in seconds, rounded to nearest.
pub fn sleep_timer_text(remaining_ms: u64) -> String {
    (remaining_ms.saturating_add(500) / 1000).to_string()
}

/// Where a keyed value is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub key: String,
    pub column: u16,
    pub row: u16,
    /// Text drawn with the template.
    pub initial: String,
    /// Right-align values within this many columns.
    pub width: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub lines: Vec<String>,
    pub slots: Vec<Slot>,
}

fn col(label: &str) -> u16 {
    u16::try_from(label.chars().count()).unwrap_or(u16::MAX)
}

impl Layout {
    pub fn new(currencies: &[WatchedCurrency]) -> Self {
        let mut layout = Layout::default();

        // Hours grow leftwards into the label's trailing space past 99.
        let row = layout.push_line(format!("{RUNNING_FOR}00:00:00"));
        layout.bind_right_aligned(KEY_HOURS, col(RUNNING_FOR) - 1, row, HOURS_WIDTH);
        layout.bind(KEY_MINUTES, col(RUNNING_FOR) + 3, row, "00");
        layout.bind(KEY_SECONDS, col(RUNNING_FOR) + 6, row, "00");

        let row = layout.push_line(format!("{FETCH_TIMER}00"));
        layout.bind(KEY_FETCH_TIMER, col(FETCH_TIMER), row, "00");

        for wc in currencies {
            let label = format!("{} sleep timer: ", wc.code);
            let initial = sleep_timer_text(wc.sleep_remaining_ms);
            let row = layout.push_line(format!("{label}{initial}"));
            layout.bind(&wc.sleep_timer_key(), col(&label), row, &initial);

            let label = format!("Last best order for {}: ", wc.code);
            let row = layout.push_line(label.clone());
            layout.bind(&wc.best_order_key(), col(&label), row, "");
        }

        let status = FetchStatus::Sleeping.to_string();
        let row = layout.push_line(format!("{FETCH_STATUS}{status}"));
        layout.bind(KEY_FETCH_STATUS, col(FETCH_STATUS), row, &status);

        let row = layout.push_line(format!("{DELTA_TIME}0"));
        layout.bind(KEY_DELTA_TIME, col(DELTA_TIME), row, "0");

        layout
    }

    fn push_line(&mut self, line: String) -> u16 {
        self.lines.push(line);
        u16::try_from(self.lines.len() - 1).unwrap_or(u16::MAX)
    }

    fn bind(&mut self, key: &str, column: u16, row: u16, initial: &str) {
        self.slots.push(Slot {
            key: key.to_string(),
            column,
            row,
            initial: initial.to_string(),
            width: None,
        });
    }

    fn bind_right_aligned(&mut self, key: &str, column: u16, row: u16, width: usize) {
        self.slots.push(Slot {
            key: key.to_string(),
            column,
            row,
            initial: format!("{:>width$}", "00"),
            width: Some(width),
        });
    }

    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.key == key)
    }

    pub fn height(&self) -> u16 {
        u16::try_from(self.lines.len()).unwrap_or(u16::MAX)
    }
}
