//! SMTP authentication handle

use crate::config::CredentialSet;
use crate::error::{MailError, Result};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use std::fmt;

/// PLAIN authentication bound to a username, password and server host.
///
/// The handle is not bound to a port; the port is applied at send time.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHandle {
    identity: String,
    username: String,
    password: String,
    host: String,
}

/// Build a PLAIN authentication handle from a credential set.
///
/// Nothing is validated here; bad credentials only fail once the handle is
/// used against a live server. Surrounding whitespace in the host is
/// dropped, matching how the send target is derived.
pub fn connect_to_smtp_server(creds: &CredentialSet) -> AuthHandle {
    AuthHandle {
        identity: String::new(),
        username: creds.username.clone(),
        password: creds.password.clone(),
        host: creds.server_host.trim().to_string(),
    }
}

impl AuthHandle {
    /// Authorization identity (always empty, the server derives it from the username)
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Server host this handle may authenticate against
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn mechanism(&self) -> Mechanism {
        Mechanism::Plain
    }

    /// Transport credentials
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    /// Refuse to hand credentials to a server other than the one the handle was built for
    pub fn check_host(&self, host: &str) -> Result<()> {
        if !self.host.eq_ignore_ascii_case(host) {
            return Err(MailError::CredentialMismatch(format!(
                "handle was built for host {:?}, refusing to authenticate against {:?}",
                self.host, host
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AuthHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHandle")
            .field("mechanism", &"PLAIN")
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("password", &"***")
            .field("host", &self.host)
            .finish()
    }
}
