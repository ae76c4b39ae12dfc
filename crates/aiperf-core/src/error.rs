//! The AIPerf error taxonomy.
//!
//! Mirrors the exception hierarchy of the reference implementation
//! (`ServiceError`, `NotInitializedError`, `InvalidStateError`, ...): per-request
//! errors are carried on the record itself via [`ErrorDetails`] and never become
//! an `AIPerfError`; only scheduler/records-manager/controller/service-level
//! failures do.

use thiserror::Error;

use crate::enums::{ServiceId, ServiceType};
use crate::models::ErrorDetails;

pub type AIPerfResult<T> = Result<T, AIPerfError>;

#[derive(Debug, Error)]
pub enum AIPerfError {
    #[error("communication error: {0}")]
    Comms(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request error: {0}")]
    Request(#[from] Box<ErrorDetails>),

    #[error("request was cancelled: {0}")]
    Cancellation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("service {service_type:?} ({service_id}) is not initialized: {message}")]
    NotInitialized {
        service_type: ServiceType,
        service_id: ServiceId,
        message: String,
    },

    #[error("service {service_type:?} ({service_id}) is in an invalid state: {message}")]
    InvalidState {
        service_type: ServiceType,
        service_id: ServiceId,
        message: String,
    },

    #[error("service error ({service_type:?}/{service_id}): {message}")]
    Service {
        service_type: ServiceType,
        service_id: ServiceId,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AIPerfError {
    pub fn comms(msg: impl Into<String>) -> Self {
        Self::Comms(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn service(service_type: ServiceType, service_id: impl Into<ServiceId>, message: impl Into<String>) -> Self {
        Self::Service {
            service_type,
            service_id: service_id.into(),
            message: message.into(),
        }
    }
}
