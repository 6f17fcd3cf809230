use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("receive failed: {0}")]
    Receive(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("queue misconfigured: {0}")]
    Config(String),
}
