//! SMTP transport implementation using lettre

use super::envelope::MessageEnvelope;
use super::transport::{MailTransport, SmtpTarget, TransportError};
use crate::auth::AuthHandle;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{SmtpTransport, Transport};

/// Port on which the server expects TLS from the first byte
pub const SMTPS_PORT: u16 = 465;

/// Blocking SMTP transport.
///
/// Every call builds a fresh lettre transport, so each send is its own
/// session. Port 465 uses implicit TLS; any other port upgrades with
/// STARTTLS when the server offers it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailTransport;

impl SmtpMailTransport {
    pub fn new() -> Self {
        Self
    }

    fn build(&self, target: &SmtpTarget, auth: &AuthHandle) -> Result<SmtpTransport, TransportError> {
        let parameters = TlsParameters::new(target.host.clone())
            .map_err(|e| TransportError::InvalidConfiguration(e.to_string()))?;

        let tls = if target.port == SMTPS_PORT {
            Tls::Wrapper(parameters)
        } else {
            Tls::Opportunistic(parameters)
        };

        Ok(SmtpTransport::builder_dangerous(target.host.as_str())
            .port(target.port)
            .tls(tls)
            .credentials(auth.credentials())
            .authentication(vec![auth.mechanism()])
            .build())
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(
        &self,
        target: &SmtpTarget,
        auth: &AuthHandle,
        envelope: &MessageEnvelope,
    ) -> Result<(), TransportError> {
        let transport = self.build(target, auth)?;
        let smtp_envelope = envelope
            .to_lettre()
            .map_err(|e| TransportError::InvalidConfiguration(e.to_string()))?;

        tracing::debug!(
            server = %target,
            recipients = envelope.to().len(),
            bytes = envelope.rendered_body().len(),
            "Opening SMTP session"
        );

        let response = transport
            .send_raw(&smtp_envelope, envelope.rendered_body())
            .map_err(classify_error)?;

        let reply = response.message().next().map(|s| s.to_string());
        tracing::debug!(reply = ?reply, "SMTP server accepted message");
        Ok(())
    }

    fn test_connection(
        &self,
        target: &SmtpTarget,
        auth: &AuthHandle,
    ) -> Result<(), TransportError> {
        let transport = self.build(target, auth)?;

        match transport.test_connection() {
            Ok(true) => Ok(()),
            Ok(false) => Err(TransportError::ConnectionError(format!(
                "{} did not accept the connection",
                target
            ))),
            Err(e) => Err(classify_error(e)),
        }
    }

    fn transport_name(&self) -> &'static str {
        "smtp"
    }
}

fn classify_error(err: lettre::transport::smtp::Error) -> TransportError {
    let error_msg = err.to_string();
    classify_message(error_msg, err.is_timeout(), err.is_permanent() || err.is_transient())
}

fn classify_message(error_msg: String, timed_out: bool, server_reply: bool) -> TransportError {
    if error_msg.contains("authentication") || error_msg.contains("AUTH") || error_msg.contains("535") {
        TransportError::AuthenticationFailed(error_msg)
    } else if timed_out || error_msg.contains("connection") || error_msg.contains("timeout") {
        TransportError::ConnectionError(error_msg)
    } else if server_reply {
        TransportError::Rejected(error_msg)
    } else {
        TransportError::SendFailed(error_msg)
    }
}
