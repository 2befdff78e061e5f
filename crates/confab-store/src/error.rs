use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the bearer token. Callers holding a session should
    /// refresh it and retry once before surfacing this.
    #[error("unauthorized")]
    Unauthorized,

    /// The store refused the request itself. The message is suitable for
    /// display to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("store service error: {0}")]
    Service(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed store response: {0}")]
    MalformedResponse(String),
}
