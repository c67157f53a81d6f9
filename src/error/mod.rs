//! Unified error handling for the mailer

use crate::mailer::TransportError;
use crate::template::TemplateError;
use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors surfaced by a send attempt
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Missing credential: {0} is empty")]
    CredentialMissing(&'static str),

    #[error("Invalid SMTP port: {0:?}")]
    InvalidPort(String),

    #[error("Credential mismatch: {0}")]
    CredentialMismatch(String),

    #[error("No recipients specified")]
    NoRecipients,

    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Template parse error: {0}")]
    TemplateParse(#[source] TemplateError),

    #[error("Template render error: {0}")]
    TemplateRender(#[source] TemplateError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] TransportError),
}

impl MailError {
    /// Short tag for structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CredentialMissing(_) => "credential_missing",
            Self::InvalidPort(_) => "invalid_port",
            Self::CredentialMismatch(_) => "credential_mismatch",
            Self::NoRecipients => "no_recipients",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::TemplateParse(_) => "template_parse",
            Self::TemplateRender(_) => "template_render",
            Self::Delivery(_) => "delivery",
        }
    }
}
