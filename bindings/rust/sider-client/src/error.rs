//! Error types for the Sider client.

use thiserror::Error;

/// Errors that can occur when using the Sider client.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to connect to the server
    #[error("Connection error: {0}")]
    Connection(String),

    /// gRPC transport error
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The key does not exist
    #[error("Key not found")]
    NotFound,

    /// The server rejected the credentials
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// Any other gRPC status
    #[error("gRPC error: {0}")]
    Grpc(tonic::Status),

    /// JSON serialization error (requires `json` feature)
    #[cfg(feature = "json")]
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization error (requires `json` feature)
    #[cfg(feature = "json")]
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl Error {
    /// Returns `true` if the key did not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Returns `true` if the server rejected the credentials.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Error::Unauthenticated(_))
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::NotFound => Error::NotFound,
            tonic::Code::Unauthenticated => Error::Unauthenticated(status.message().to_string()),
            _ => Error::Grpc(status),
        }
    }
}
