//! AIPerf Bus - the in-process message bus every service communicates over.
//!
//! Three patterns, mirroring the reference implementation's ZMQ sockets:
//!
//! - **pub/sub** ([`local::LocalBus::publish`] / [`local::LocalBus::subscribe`]):
//!   commands, heartbeats, and progress reports - every interested party sees
//!   every message.
//! - **push/pull** ([`local::LocalBus::push`] / [`local::LocalBus::pull_queue`]):
//!   credit drops and returns - exactly one consumer handles each message.
//! - **request/reply** ([`local::LocalBus::request`] / [`local::LocalBus::reply`]):
//!   the controller's synchronous command/response round trips.

pub mod error;
pub mod local;
pub mod proxy;
pub mod topic;

pub use error::{BusError, BusResult};
pub use local::{LocalBus, PullQueue, Subscription};
pub use topic::Topic;
