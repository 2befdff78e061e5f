use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The platform refused the request (bad credentials, revoked refresh
    /// token, and so on). The message is suitable for display to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("auth service error: {0}")]
    Service(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed auth response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
