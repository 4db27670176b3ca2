use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, timeout or body decoding failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// Whether the server rejected the request body.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ClientError::Api { status: 400, .. })
    }
}
