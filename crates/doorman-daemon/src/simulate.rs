//! Stdin-driven keypad simulation.
//!
//! With no real GPIO backend compiled in, key presses come from stdin:
//! each character of a line is pressed on the simulated matrix in order.
//! `*1234#` followed by enter types a full entry.

use doorman_hardware::{MockGpioHandle, PinId};
use doorman_keypad::{Key, KeypadLayout};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{debug, warn};

/// How long a simulated key is held. Long enough for the main loop to
/// pick up the edge and probe the matrix while the contact is closed.
const HOLD: Duration = Duration::from_millis(30);

/// Spawn the stdin reader task.
pub fn spawn(handle: MockGpioHandle, rows: Vec<PinId>, cols: Vec<PinId>) {
    tokio::spawn(async move {
        let layout = KeypadLayout::standard();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            for c in line.chars() {
                if c.is_whitespace() {
                    continue;
                }
                let Some(key) = Key::from_char(c) else {
                    warn!(key = %c, "not a keypad symbol, skipped");
                    continue;
                };
                let Some((row, col)) = layout.position_of(key) else {
                    continue;
                };

                debug!(%key, "simulated press");
                handle.press(rows[row], cols[col]);
                tokio::time::sleep(HOLD).await;
                handle.release();
                tokio::time::sleep(HOLD).await;
            }
        }
        debug!("stdin closed, simulation input ended");
    });
}
