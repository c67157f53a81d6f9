//! Per-send message envelope

use crate::error::{MailError, Result};
use lettre::address::Envelope;
use lettre::Address;

/// Sender, ordered recipients and the rendered message bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    from: Address,
    to: Vec<Address>,
    rendered_body: Vec<u8>,
}

impl MessageEnvelope {
    /// Build an envelope, parsing every address.
    ///
    /// Recipient order is preserved and an empty list is rejected.
    pub fn new(from: &str, recipients: &[String], rendered_body: Vec<u8>) -> Result<Self> {
        if recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let from = parse_address(from)?;
        let to = recipients
            .iter()
            .map(|recipient| parse_address(recipient))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            from,
            to,
            rendered_body,
        })
    }

    pub fn from(&self) -> &Address {
        &self.from
    }

    pub fn to(&self) -> &[Address] {
        &self.to
    }

    pub fn rendered_body(&self) -> &[u8] {
        &self.rendered_body
    }

    /// SMTP envelope for the transport
    pub fn to_lettre(&self) -> Result<Envelope> {
        Envelope::new(Some(self.from.clone()), self.to.clone()).map_err(|e| {
            MailError::InvalidAddress {
                address: self.from.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
