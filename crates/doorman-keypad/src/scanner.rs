//! Matrix keypad scanner.
//!
//! Translates one rising edge on a row pin into at most one resolved
//! [`Key`]. A 4x4 matrix keypad has no per-key line; a press shorts one
//! row line to one column line, so the scanner has to rewire the matrix
//! to discover which column is involved, then restore the idle wiring.
//!
//! # Resolution sequence
//!
//! 1. Re-read the edge pin; a released key aborts immediately.
//! 2. Disarm all matrix edges (the guard flag additionally drops any
//!    events already queued) so resolution is never re-entered.
//! 3. Rewire: columns become pulled-down inputs, the pressed row becomes
//!    a pulled-up input that drives the shorted line high.
//! 4. Probe the columns for the asserted one and map (row, column)
//!    through the layout table.
//! 5. Restore idle wiring and re-arm edges, whatever happened above.
//!
//! Every pin access is a bounded synchronous read; the scanner cannot
//! block. An ambiguous scan (edge on a column pin, no asserted column,
//! key released mid-resolution) resolves to no symbol and no error.

use crate::layout::{Key, KeypadLayout};
use doorman_hardware::{EdgeEvent, GpioDriver, Level, PinId, PinMode, Pull, Result};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Resolves matrix edge events into keypad symbols.
pub struct KeypadScanner {
    gpio: Arc<dyn GpioDriver>,
    rows: Vec<PinId>,
    cols: Vec<PinId>,
    layout: KeypadLayout,
    /// Guards against re-entrant resolution; stands in for the hardware
    /// interrupt mask.
    busy: bool,
}

impl KeypadScanner {
    /// Create a scanner over the given row and column pins.
    pub fn new(gpio: Arc<dyn GpioDriver>, rows: Vec<PinId>, cols: Vec<PinId>) -> Self {
        KeypadScanner {
            gpio,
            rows,
            cols,
            layout: KeypadLayout::standard(),
            busy: false,
        }
    }

    /// Configure the idle matrix wiring and arm edge delivery.
    ///
    /// Idle wiring drives every column high and leaves rows as pulled-down
    /// inputs, so any key press raises exactly its row line.
    ///
    /// # Errors
    /// Propagates driver errors from pin configuration.
    pub fn configure_idle(&self) -> Result<()> {
        for &col in &self.cols {
            self.gpio.configure_pin(col, PinMode::Output)?;
            self.gpio.write_pin(col, Level::High)?;
        }
        for &row in &self.rows {
            self.gpio.configure_pin(row, PinMode::Input(Pull::Down))?;
        }
        self.arm_edges(true)?;
        Ok(())
    }

    /// Handle one edge event, resolving it to at most one key.
    ///
    /// Returns `Ok(None)` for anything that does not resolve cleanly:
    /// a re-entrant event, a released key, an edge on a column pin, or an
    /// ambiguous column probe. The matrix is always restored to its idle
    /// wiring before returning.
    ///
    /// # Errors
    /// Propagates driver errors; the scanner attempts restoration first
    /// so a transient fault does not leave the matrix torn down.
    pub fn handle_edge(&mut self, event: EdgeEvent) -> Result<Option<Key>> {
        if self.busy {
            trace!(pin = %event.pin, "edge during resolution ignored");
            return Ok(None);
        }
        self.busy = true;

        let resolved = self.resolve(event.pin);

        // Restore the idle matrix no matter how resolution went.
        let restored = self.configure_idle();
        self.busy = false;
        restored?;

        let key = resolved?;
        if let Some(key) = key {
            debug!(%key, "key resolved");
        }
        Ok(key)
    }

    fn resolve(&self, pin: PinId) -> Result<Option<Key>> {
        // Bounce or release between the edge and now.
        if !self.gpio.read_pin(pin)?.is_high() {
            trace!(%pin, "edge pin no longer asserted");
            return Ok(None);
        }

        self.arm_edges(false)?;

        // Rewire for column probing: columns float to their pull-down,
        // the pressed row pulls the shorted column line high.
        for &col in &self.cols {
            self.gpio.configure_pin(col, PinMode::Input(Pull::Down))?;
        }
        self.gpio.configure_pin(pin, PinMode::Input(Pull::Up))?;

        let Some(row) = self.rows.iter().position(|&r| r == pin) else {
            // Edge arrived on a column pin; nothing to resolve.
            warn!(%pin, "edge on non-row pin");
            return Ok(None);
        };

        let mut col = None;
        for (index, &col_pin) in self.cols.iter().enumerate() {
            if self.gpio.read_pin(col_pin)?.is_high() {
                col = Some(index);
            }
        }

        let Some(col) = col else {
            trace!(%pin, "no asserted column");
            return Ok(None);
        };

        Ok(self.layout.key_at(row, col))
    }

    fn arm_edges(&self, armed: bool) -> Result<()> {
        for &pin in self.rows.iter().chain(self.cols.iter()) {
            self.gpio.set_edge_armed(pin, armed)?;
        }
        Ok(())
    }
}
