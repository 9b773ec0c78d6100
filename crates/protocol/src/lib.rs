#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Shared value types, wire codec and logging setup for the `plazza` fleet.
//!
//! This crate has no process-model knowledge (no pipes, no threads); it is the
//! vocabulary that the `plazza-ipc`, `plazza-kitchen`, `plazza-fleet` and
//! `plazza` crates all speak.

pub mod codec;
pub mod error;
pub mod logging;
pub mod pizza;

pub use codec::Message;
pub use error::{IpcError, ParseError, SchedulerError, WorkerError};
pub use pizza::{Ingredient, PizzaJob, PizzaSize, PizzaType, WorkerStatus, ALL_INGREDIENTS};
