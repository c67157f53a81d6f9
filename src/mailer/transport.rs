//! Transport trait and error types

use super::envelope::MessageEnvelope;
use crate::auth::AuthHandle;
use std::fmt;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Where a session is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpTarget {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for SmtpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Delivers one message per session.
///
/// Implementations open a new session for every call.
#[cfg_attr(test, mockall::automock)]
pub trait MailTransport: Send + Sync {
    /// Open a session to `target`, authenticate with `auth` and deliver the envelope
    fn send(
        &self,
        target: &SmtpTarget,
        auth: &AuthHandle,
        envelope: &MessageEnvelope,
    ) -> Result<(), TransportError>;

    /// Open and authenticate a session without sending anything
    fn test_connection(&self, target: &SmtpTarget, auth: &AuthHandle)
        -> Result<(), TransportError>;

    /// Get the transport name
    fn transport_name(&self) -> &'static str;
}
