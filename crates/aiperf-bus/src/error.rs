use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no subscriber registered for topic {0}")]
    NoSubscriber(String),

    #[error("publish failed: channel closed")]
    ChannelClosed,

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request/reply peer closed before responding")]
    PeerClosed,
}

pub type BusResult<T> = Result<T, BusError>;
