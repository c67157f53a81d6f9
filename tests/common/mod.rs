//! Common test utilities

use smtp_mailer::mailer::{MailTransport, MessageEnvelope, SmtpTarget, TransportError};
use smtp_mailer::AuthHandle;
use std::sync::Mutex;

/// One recorded SMTP session
#[derive(Debug, Clone)]
pub struct Session {
    pub target: SmtpTarget,
    pub username: String,
    pub auth_host: String,
    pub envelope: MessageEnvelope,
}

/// Transport that records sessions instead of opening sockets
#[derive(Default)]
pub struct RecordingTransport {
    sessions: Mutex<Vec<Session>>,
    fail_with: Option<TransportError>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().unwrap().clone()
    }
}

impl MailTransport for RecordingTransport {
    fn send(
        &self,
        target: &SmtpTarget,
        auth: &AuthHandle,
        envelope: &MessageEnvelope,
    ) -> Result<(), TransportError> {
        self.sessions.lock().unwrap().push(Session {
            target: target.clone(),
            username: auth.username().to_string(),
            auth_host: auth.host().to_string(),
            envelope: envelope.clone(),
        });

        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn test_connection(&self, _target: &SmtpTarget, _auth: &AuthHandle) -> Result<(), TransportError> {
        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn transport_name(&self) -> &'static str {
        "recording"
    }
}
