#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! The worker side of the fleet: a fixed-size cook pool and the
//! single-threaded event loop that sits in front of it inside a forked
//! kitchen process.
//!
//! Everything here runs inside a child process after `plazza-fleet` forks;
//! this crate has no notion of the registry or of forking itself.

mod pool;
mod stock;
mod worker;

pub use pool::ThreadPool;
pub use stock::Stock;
pub use worker::{Kitchen, KitchenConfig};
