#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! The dispatcher side of the fleet: forking kitchens on demand,
//! load-balancing pizzas across them, and retiring the ones that go idle.
//!
//! This is the one crate in the workspace that calls `fork()` directly, so
//! it is also the one crate that cannot be `#![forbid(unsafe_code)]`.

mod manager;

pub use manager::{FleetConfig, KitchenManager};
