//! Topic matching for the bus's pub/sub traffic.
//!
//! A subscription names a [`MessageType`] and, optionally, narrows it to one
//! `ServiceType` or one `ServiceId`. A publish matches every subscription
//! whose topic is a prefix of (or equal to) the message's own
//! `(message_type, service_type, service_id)` triple - mirroring the
//! reference implementation's `MessageType.{service_type}.{service_id}`
//! dotted-topic convention for ZMQ pub/sub.

use aiperf_core::{Message, MessageType, ServiceId, ServiceType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Any(MessageType),
    ForServiceType(MessageType, ServiceType),
    ForServiceId(MessageType, ServiceId),
}

impl Topic {
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Topic::Any(mt) => *mt == message.message_type,
            Topic::ForServiceType(mt, st) => *mt == message.message_type && *st == message.service_type,
            Topic::ForServiceId(mt, id) => *mt == message.message_type && *id == message.service_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::models::MessagePayload;

    fn msg(mt: MessageType, st: ServiceType, id: &str) -> Message {
        Message {
            message_type: mt,
            service_type: st,
            service_id: id.to_string(),
            payload: MessagePayload::Heartbeat,
        }
    }

    #[test]
    fn any_matches_regardless_of_service() {
        let topic = Topic::Any(MessageType::Heartbeat);
        assert!(topic.matches(&msg(MessageType::Heartbeat, ServiceType::Worker, "worker_1")));
        assert!(topic.matches(&msg(MessageType::Heartbeat, ServiceType::Controller, "ctrl")));
        assert!(!topic.matches(&msg(MessageType::Command, ServiceType::Worker, "worker_1")));
    }

    #[test]
    fn service_type_topic_narrows() {
        let topic = Topic::ForServiceType(MessageType::CreditReturn, ServiceType::Worker);
        assert!(topic.matches(&msg(MessageType::CreditReturn, ServiceType::Worker, "worker_1")));
        assert!(!topic.matches(&msg(MessageType::CreditReturn, ServiceType::RecordProcessor, "rp_1")));
    }

    #[test]
    fn service_id_topic_is_exact() {
        let topic = Topic::ForServiceId(MessageType::Command, "worker_1".to_string());
        assert!(topic.matches(&msg(MessageType::Command, ServiceType::Worker, "worker_1")));
        assert!(!topic.matches(&msg(MessageType::Command, ServiceType::Worker, "worker_2")));
    }
}
