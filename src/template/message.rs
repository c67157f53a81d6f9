//! Built-in message layout

use serde::{Deserialize, Serialize};

/// Minimal RFC 5322 message: headers, blank line, body.
///
/// Rendered with a [`MessageData`] context.
pub const STANDARD_MESSAGE: &str = "From: {{.From}}\r\n\
To: {{.To}}\r\n\
Subject: {{.Subject}}\r\n\
\r\n\
{{.Body}}\r\n";

/// Context for [`STANDARD_MESSAGE`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageData {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MessageData {
    /// Build message data for a list of recipients.
    ///
    /// Line breaks in the subject are folded into spaces so the rendered
    /// header block stays intact.
    pub fn new(
        from: impl Into<String>,
        recipients: &[String],
        subject: &str,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: recipients.join(", "),
            subject: subject.replace(['\r', '\n'], " "),
            body: body.into(),
        }
    }
}
