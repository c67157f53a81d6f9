//! SMTP Mailer - templated e-mail dispatch
//!
//! Sender credentials come from the environment ([`config::sender_info`]),
//! are turned into a PLAIN authentication handle
//! ([`auth::connect_to_smtp_server`]) and used to render and deliver a
//! message ([`mailer::send_mail`]).

pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod telemetry;
pub mod template;

// Re-export commonly used types
pub use auth::{connect_to_smtp_server, AuthHandle};
pub use config::{sender_info, CredentialSet};
pub use error::{MailError, Result};
pub use mailer::{send_mail, Mailer};
pub use template::{MessageData, Template, TemplateContext, TemplateError, STANDARD_MESSAGE};
