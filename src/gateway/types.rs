//! Gateway error taxonomy.

use std::fmt;

use super::transport::TransportError;

/// Which dependent call of the handshake failed after a token was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    User,
    Profile,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user fetch"),
            Self::Profile => f.write_str("profile fetch"),
        }
    }
}

/// Errors produced by [`AuthGateway`](super::AuthGateway) and the session controller.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential exchange was rejected or never reached the server.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A token was issued but a dependent call failed; the session is unusable.
    #[error("login protocol failed at {step}: {message}")]
    Protocol { step: HandshakeStep, message: String },

    /// Another login on the same session is still in flight.
    #[error("a login is already in progress")]
    LoginInProgress,

    /// The login was cancelled before it completed.
    #[error("login cancelled")]
    Cancelled,

    /// The operation needs an authenticated session.
    #[error("not logged in")]
    NotLoggedIn,

    /// The API answered a non-login request with a non-success status.
    #[error("{operation} rejected: status {status}")]
    Rejected { operation: &'static str, status: u16, body: String },

    /// A non-login request never produced an HTTP status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl AuthError {
    pub(crate) fn protocol(step: HandshakeStep, message: impl Into<String>) -> Self {
        Self::Protocol { step, message: message.into() }
    }
}
