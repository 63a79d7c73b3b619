//! Event Module - append-only record of what a run did
//!
//! Every wave and every component firing leaves events behind, so a finished
//! (or failed) run can be inspected after the fact without tracing enabled.

mod log;

pub use log::{Event, EventKind, EventLog};
