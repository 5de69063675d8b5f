//! Mail delivery for emailed exports.
//!
//! The exporter builds a [`Message`] and hands it to a [`Mailer`]. Delivery
//! itself is outside this crate; [`OutboxMailer`] drops messages into a
//! directory for an external agent to pick up.

mod outbox;

pub use outbox::OutboxMailer;

use crate::Result;
use serde::Serialize;

/// A named binary attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type of the content.
    pub content_type: String,
    /// Raw content.
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }
}

/// An outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Recipients.
    pub to: Vec<String>,
    /// Sender.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Attachments in delivery order.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Returns the attachment with the given file name.
    #[must_use]
    pub fn attachment(&self, filename: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.filename == filename)
    }
}

/// Delivers messages.
pub trait Mailer {
    /// Sends a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be handed off.
    fn send(&self, message: &Message) -> Result<()>;
}
