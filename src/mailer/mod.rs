//! Template rendering and delivery
//!
//! [`Mailer`] renders a template against a context and hands the bytes to a
//! [`MailTransport`]. Every failure is logged where it happens and returned
//! to the caller as a [`MailError`].

mod envelope;
mod smtp;
mod transport;

pub use envelope::MessageEnvelope;
pub use smtp::{SmtpMailTransport, SMTPS_PORT};
pub use transport::{MailTransport, SmtpTarget, TransportError};

use crate::auth::{connect_to_smtp_server, AuthHandle};
use crate::config::{sender_info, CredentialSet};
use crate::error::{MailError, Result};
use crate::template::Template;
use serde::Serialize;
use std::sync::Arc;

const TEMPLATE_NAME: &str = "emailTemplate";

/// Render a template and send it using the process-wide sender credentials.
///
/// `auth` should come from [`connect_to_smtp_server`] called with
/// [`sender_info`]; a handle built for another user or host is rejected
/// with [`MailError::CredentialMismatch`].
pub fn send_mail<C: Serialize + ?Sized>(
    auth: &AuthHandle,
    template: &str,
    context: &C,
    recipients: &[String],
) -> Result<()> {
    Mailer::from_env().send_mail(auth, template, context, recipients)
}

/// Sends templated mail for one set of sender credentials
#[derive(Clone)]
pub struct Mailer {
    credentials: CredentialSet,
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    /// Create a mailer that delivers over SMTP
    pub fn new(credentials: CredentialSet) -> Self {
        Self::with_transport(credentials, Arc::new(SmtpMailTransport::new()))
    }

    /// Create a mailer from the cached environment credentials
    pub fn from_env() -> Self {
        Self::new(sender_info().clone())
    }

    pub fn with_transport(credentials: CredentialSet, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    /// Authentication handle for this mailer's credentials
    pub fn authenticate(&self) -> AuthHandle {
        connect_to_smtp_server(&self.credentials)
    }

    /// Render and send, authenticating with this mailer's own credentials
    pub fn send<C: Serialize + ?Sized>(
        &self,
        template: &str,
        context: &C,
        recipients: &[String],
    ) -> Result<()> {
        self.send_mail(&self.authenticate(), template, context, recipients)
    }

    /// Render `template` against `context` and deliver it to every recipient
    /// in a single SMTP session.
    pub fn send_mail<C: Serialize + ?Sized>(
        &self,
        auth: &AuthHandle,
        template: &str,
        context: &C,
        recipients: &[String],
    ) -> Result<()> {
        let result = self.try_send_mail(auth, template, context, recipients);

        match &result {
            Ok(()) => tracing::info!(
                transport = self.transport.transport_name(),
                recipients = recipients.len(),
                "Mail sent"
            ),
            Err(e) => tracing::error!(
                kind = e.kind(),
                error = %e,
                recipients = recipients.len(),
                "Failed to send mail"
            ),
        }

        result
    }

    /// Open and authenticate a session without sending
    pub fn test_connection(&self) -> Result<()> {
        let target = self.target()?;
        let auth = self.authenticate();

        self.transport.test_connection(&target, &auth).map_err(|e| {
            tracing::warn!(server = %target, error = %e, "SMTP connection test failed");
            MailError::Delivery(e)
        })
    }

    fn try_send_mail<C: Serialize + ?Sized>(
        &self,
        auth: &AuthHandle,
        template: &str,
        context: &C,
        recipients: &[String],
    ) -> Result<()> {
        if recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let body = render(template, context)?;
        let target = self.target()?;
        self.check_auth(auth)?;

        let envelope = MessageEnvelope::new(&self.credentials.username, recipients, body.into_bytes())?;
        self.transport.send(&target, auth, &envelope)?;
        Ok(())
    }

    fn target(&self) -> Result<SmtpTarget> {
        self.credentials.validate()?;
        Ok(SmtpTarget {
            host: self.credentials.server_host.trim().to_string(),
            port: self.credentials.port_number()?,
        })
    }

    fn check_auth(&self, auth: &AuthHandle) -> Result<()> {
        auth.check_host(self.credentials.server_host.trim())?;

        if auth.username() != self.credentials.username {
            return Err(MailError::CredentialMismatch(format!(
                "handle authenticates as {:?} but mail is sent from {:?}",
                auth.username(),
                self.credentials.username
            )));
        }
        Ok(())
    }
}

/// Parse and render a template into the message text
pub fn render<C: Serialize + ?Sized>(template: &str, context: &C) -> Result<String> {
    let template = Template::parse(TEMPLATE_NAME, template).map_err(MailError::TemplateParse)?;
    template.render_with(context).map_err(MailError::TemplateRender)
}

#[cfg(test)]
mod tests {
    use super::transport::MockMailTransport;
    use super::*;
    use crate::template::{MessageData, STANDARD_MESSAGE};
    use serde_json::json;
    use std::collections::HashMap;

    fn test_credentials() -> CredentialSet {
        CredentialSet::new("bot@example.com", "secret", "smtp.example.com", "587")
    }

    fn recipients() -> Vec<String> {
        vec!["a@example.com".to_string(), "b@example.com".to_string()]
    }

    fn mailer_with(mock: MockMailTransport) -> Mailer {
        Mailer::with_transport(test_credentials(), Arc::new(mock))
    }

    fn untouched_transport() -> MockMailTransport {
        let mut mock = MockMailTransport::new();
        mock.expect_transport_name().returning(|| "mock");
        mock.expect_send().never();
        mock
    }

    #[test]
    fn test_send_delivers_one_message_to_all_recipients() {
        let mut mock = MockMailTransport::new();
        mock.expect_transport_name().returning(|| "mock");
        mock.expect_send()
            .withf(|target, auth, envelope| {
                let to: Vec<String> = envelope.to().iter().map(ToString::to_string).collect();
                target.to_string() == "smtp.example.com:587"
                    && auth.username() == "bot@example.com"
                    && auth.host() == "smtp.example.com"
                    && envelope.from().to_string() == "bot@example.com"
                    && to == ["a@example.com", "b@example.com"]
                    && envelope.rendered_body() == b"Subject test"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mailer = mailer_with(mock);
        let auth = mailer.authenticate();
        let context: HashMap<String, String> = HashMap::new();

        assert!(mailer.send_mail(&auth, "Subject test", &context, &recipients()).is_ok());
    }

    #[test]
    fn test_send_renders_context() {
        let mut mock = MockMailTransport::new();
        mock.expect_transport_name().returning(|| "mock");
        mock.expect_send()
            .withf(|_, _, envelope| envelope.rendered_body() == b"Hello Ana")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mailer = mailer_with(mock);
        let result = mailer.send("Hello {{.Name}}", &json!({ "Name": "Ana" }), &recipients());
        assert!(result.is_ok());
    }

    #[test]
    fn test_send_standard_message() {
        let mut mock = MockMailTransport::new();
        mock.expect_transport_name().returning(|| "mock");
        mock.expect_send()
            .withf(|_, _, envelope| {
                let body = String::from_utf8_lossy(envelope.rendered_body());
                body.starts_with("From: bot@example.com\r\n") && body.contains("Subject: Hi\r\n")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mailer = mailer_with(mock);
        let data = MessageData::new("bot@example.com", &recipients(), "Hi", "Body");
        assert!(mailer.send(STANDARD_MESSAGE, &data, &recipients()).is_ok());
    }

    #[test]
    fn test_parse_error_skips_delivery() {
        let mailer = mailer_with(untouched_transport());
        let err = mailer
            .send("Hello {{.Name", &json!({ "Name": "Ana" }), &recipients())
            .unwrap_err();
        assert!(matches!(err, MailError::TemplateParse(_)));
    }

    #[test]
    fn test_missing_key_skips_delivery() {
        let mailer = mailer_with(untouched_transport());
        let err = mailer.send("Hello {{.Name}}", &json!({}), &recipients()).unwrap_err();
        assert!(matches!(err, MailError::TemplateRender(_)));
    }

    #[test]
    fn test_empty_recipients_rejected_locally() {
        let mailer = mailer_with(untouched_transport());
        let err = mailer.send("Subject test", &json!({}), &[]).unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));
    }

    #[test]
    fn test_missing_credentials_rejected_locally() {
        let mailer = Mailer::with_transport(
            CredentialSet {
                server_host: String::new(),
                ..test_credentials()
            },
            Arc::new(untouched_transport()),
        );
        let err = mailer.send("Subject test", &json!({}), &recipients()).unwrap_err();
        assert!(matches!(err, MailError::CredentialMissing("EMAIL_SERVER")));
    }

    #[test]
    fn test_invalid_port_rejected_locally() {
        let mailer = Mailer::with_transport(
            CredentialSet {
                port: "smtp".to_string(),
                ..test_credentials()
            },
            Arc::new(untouched_transport()),
        );
        let err = mailer.send("Subject test", &json!({}), &recipients()).unwrap_err();
        assert!(matches!(err, MailError::InvalidPort(_)));
    }

    #[test]
    fn test_handle_for_other_credentials_rejected() {
        let mailer = mailer_with(untouched_transport());

        let other_user = connect_to_smtp_server(&CredentialSet {
            username: "other@example.com".to_string(),
            ..test_credentials()
        });
        let err = mailer
            .send_mail(&other_user, "Subject test", &json!({}), &recipients())
            .unwrap_err();
        assert!(matches!(err, MailError::CredentialMismatch(_)));

        let other_host = connect_to_smtp_server(&CredentialSet {
            server_host: "smtp.other.com".to_string(),
            ..test_credentials()
        });
        let err = mailer
            .send_mail(&other_host, "Subject test", &json!({}), &recipients())
            .unwrap_err();
        assert!(matches!(err, MailError::CredentialMismatch(_)));
    }

    #[test]
    fn test_host_whitespace_does_not_break_own_handle() {
        let mut mock = MockMailTransport::new();
        mock.expect_transport_name().returning(|| "mock");
        mock.expect_send()
            .withf(|target, auth, _| target.host == "smtp.example.com" && auth.host() == "smtp.example.com")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mailer = Mailer::with_transport(
            CredentialSet {
                server_host: " smtp.example.com ".to_string(),
                ..test_credentials()
            },
            Arc::new(mock),
        );
        assert!(mailer.send("Subject test", &json!({}), &recipients()).is_ok());
    }

    #[test]
    fn test_invalid_recipient_rejected_locally() {
        let mailer = mailer_with(untouched_transport());
        let err = mailer
            .send("Subject test", &json!({}), &["not-an-address".to_string()])
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { .. }));
    }

    #[test]
    fn test_transport_error_is_returned() {
        let mut mock = MockMailTransport::new();
        mock.expect_transport_name().returning(|| "mock");
        mock.expect_send()
            .times(1)
            .returning(|_, _, _| Err(TransportError::AuthenticationFailed("535".to_string())));

        let mailer = mailer_with(mock);
        let err = mailer.send("Subject test", &json!({}), &recipients()).unwrap_err();
        assert!(matches!(
            err,
            MailError::Delivery(TransportError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_connection_success() {
        let mut mock = MockMailTransport::new();
        mock.expect_test_connection()
            .withf(|target, auth| target.port == 587 && auth.username() == "bot@example.com")
            .times(1)
            .returning(|_, _| Ok(()));

        assert!(mailer_with(mock).test_connection().is_ok());
    }

    #[test]
    fn test_connection_failure() {
        let mut mock = MockMailTransport::new();
        mock.expect_test_connection()
            .returning(|_, _| Err(TransportError::ConnectionError("refused".to_string())));

        let err = mailer_with(mock).test_connection().unwrap_err();
        assert!(matches!(err, MailError::Delivery(TransportError::ConnectionError(_))));
    }

    #[test]
    fn test_render_helper() {
        assert_eq!(render("Hi {{.x}}", &json!({ "x": 1 })).unwrap(), "Hi 1");
        assert!(matches!(render("{{", &json!({})), Err(MailError::TemplateParse(_))));
    }
}
