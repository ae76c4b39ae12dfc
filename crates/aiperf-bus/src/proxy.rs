//! A frontend/backend forwarding proxy, for the one case where a service
//! needs to fan a single logical stream out to whichever queue a consumer
//! is currently pulling from under a different name - e.g. re-publishing
//! telemetry snapshots onto a per-subscriber queue. Most services talk to
//! [`crate::local::LocalBus`] directly; this exists for the controller's
//! command-broadcast-then-collect path, grounded on the reference
//! implementation's ROUTER/DEALER proxy in `base_service.py`'s comms setup.

use std::time::Duration;

use aiperf_core::Message;

use crate::error::BusResult;
use crate::local::LocalBus;
use crate::topic::Topic;

/// Forwards every message matching `topic` on `from` onto the `to_queue`
/// push/pull queue, until `from`'s publisher closes.
pub async fn forward_to_queue(from: &LocalBus, topic: Topic, to: &LocalBus, to_queue: &str) -> BusResult<()> {
    let mut sub = from.subscribe(topic);
    loop {
        let message = sub.recv().await?;
        to.push(to_queue, (*message).clone()).await?;
    }
}

/// Forwards one matching message, or returns on timeout - used by the
/// controller to bound how long it waits for a registration before
/// deciding a worker failed to start.
pub async fn forward_one(from: &LocalBus, topic: Topic, timeout: Duration) -> BusResult<Message> {
    let mut sub = from.subscribe(topic);
    let message = tokio::time::timeout(timeout, sub.recv())
        .await
        .map_err(|_| crate::error::BusError::Timeout(timeout))??;
    Ok((*message).clone())
}
