use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    #[error("broker connect failed: {0}")]
    Connect(String),

    #[error("broker is not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),
}
