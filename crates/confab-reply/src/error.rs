use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply service timed out")]
    Timeout,

    #[error("reply service error: {0}")]
    Service(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed reply response: {0}")]
    MalformedResponse(String),
}
