//! Live terminal view.
//!
//! Draws the static template once, then overwrites individual values in
//! place with cursor-positioned writes. Every write is padded to the
//! length of the previous value at that position so a shorter value
//! fully replaces a longer one.

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::collections::HashMap;
use std::io::{Stdout, Write};
use tracing::trace;

use super::layout::Layout;
use super::PresentationSink;

/// Park the cursor on `below_row` and make it visible.
pub fn restore<W: Write>(out: &mut W, below_row: u16) -> Result<()> {
    queue!(out, MoveTo(0, below_row), Show).context("Failed to restore terminal")?;
    out.flush().context("Failed to flush terminal")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    column: u16,
    row: u16,
    last_len: usize,
    /// Right-align within this many columns.
    width: Option<usize>,
}

pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    cursors: HashMap<String, Cursor>,
    height: u16,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cursors: HashMap::new(),
            height: 0,
        }
    }

    /// Clear the screen, draw the template and bind every slot.
    pub fn draw(&mut self, layout: &Layout) -> Result<()> {
        queue!(self.out, Hide, Clear(ClearType::All), MoveTo(0, 0))
            .context("Failed to prepare terminal")?;

        for (row, line) in layout.lines.iter().enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            queue!(self.out, MoveTo(0, row), Print(line)).context("Failed to draw template")?;
        }

        for slot in &layout.slots {
            match slot.width {
                Some(width) => self.bind_right_aligned(&slot.key, slot.column, slot.row, width),
                None => self.bind(&slot.key, slot.column, slot.row, slot.initial.chars().count()),
            }
        }
        self.height = layout.height();

        self.out.flush().context("Failed to flush terminal")
    }

    /// Bind `key` to a position. `last_len` is the width already on screen.
    pub fn bind(&mut self, key: &str, column: u16, row: u16, last_len: usize) {
        self.cursors.insert(
            key.to_string(),
            Cursor {
                column,
                row,
                last_len,
                width: None,
            },
        );
    }

    /// Bind `key` to a fixed-width field whose values are right-aligned.
    pub fn bind_right_aligned(&mut self, key: &str, column: u16, row: u16, width: usize) {
        self.cursors.insert(
            key.to_string(),
            Cursor {
                column,
                row,
                last_len: width,
                width: Some(width),
            },
        );
    }

    /// Move the cursor below the view and show it again.
    pub fn restore(&mut self) -> Result<()> {
        restore(&mut self.out, self.height)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> PresentationSink for TerminalRenderer<W> {
    fn render(&mut self, key: &str, text: &str) -> Result<()> {
        let Some(cursor) = self.cursors.get_mut(key) else {
            trace!(key, "render key not bound, skipping");
            return Ok(());
        };

        let len = text.chars().count();
        let padded = match cursor.width {
            Some(width) => format!("{text:>width$}"),
            None => format!("{text:<width$}", width = cursor.last_len.max(len)),
        };
        cursor.last_len = len;

        queue!(self.out, MoveTo(cursor.column, cursor.row), Print(padded))
            .context("Failed to write to terminal")?;
        self.out.flush().context("Failed to flush terminal")
    }
}
