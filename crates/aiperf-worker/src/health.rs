//! Periodic heartbeat publication.
//!
//! Grounded on `ProcessHealthMixin` in the reference implementation: every
//! service publishes a heartbeat on a fixed interval; the controller treats
//! a missed heartbeat past some multiple of the interval as a dead service.
//! This crate only publishes; the miss-detection lives with the controller,
//! which sees every service's heartbeats.

use std::time::Duration;

use aiperf_bus::LocalBus;
use aiperf_core::models::{Message, MessagePayload};
use aiperf_core::{MessageType, ServiceId, ServiceType};

pub fn spawn_heartbeat(bus: LocalBus, service_id: ServiceId, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            bus.publish(Message {
                message_type: MessageType::Heartbeat,
                service_type: ServiceType::Worker,
                service_id: service_id.clone(),
                payload: MessagePayload::Heartbeat,
            });
        }
    })
}
