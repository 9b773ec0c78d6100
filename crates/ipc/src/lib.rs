#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! The framed message channel: two unidirectional pipes glued into one
//! bidirectional byte transport between a parent and a forked child.
//!
//! This crate only knows about length-prefixed byte frames. It has no
//! opinion on what the bytes mean — `plazza-protocol::codec` owns that.

mod channel;

pub use channel::{create_channel_pair, Channel, ChannelPair};
