//! Matrix keypad handling for the doorman access controller.
//!
//! Two layers live here, mirroring the two halves of turning electricity
//! into intent:
//!
//! - [`KeypadScanner`] resolves one rising edge on a row pin into at most
//!   one [`Key`], by rewiring the matrix, probing the columns, and mapping
//!   the (row, column) pair through the [`KeypadLayout`].
//! - [`CodeAccumulator`] is the entry state machine: `*` starts an entry,
//!   digits and letters accumulate (subject to the inter-key timeout), `#`
//!   submits, and the close-helper key bypasses the buffer entirely.
//!
//! Neither layer decides anything about access; completed codes are handed
//! to the access controller.

pub mod accumulator;
pub mod layout;
pub mod scanner;

pub use accumulator::{CodeAccumulator, CodeEvent, EntryState};
pub use layout::{Key, KeypadLayout, Letter};
pub use scanner::KeypadScanner;
