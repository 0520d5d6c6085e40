//! Builds [`OutgoingMessage`]s from caller input.
//!
//! Content counts as HTML as soon as it contains a `<`. This is a loose
//! heuristic kept for compatibility with existing callers: plain text with a
//! stray `<` will be sent as HTML.

use validator::ValidateEmail;

use crate::attachment::Attachment;
use crate::config::RoutingConfig;
use crate::error::ComposeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    Sender,
    ReplyTo,
    Recipient,
}

impl AddressRole {
    fn label(self) -> &'static str {
        match self {
            AddressRole::Sender => "sender",
            AddressRole::ReplyTo => "reply-to",
            AddressRole::Recipient => "recipient",
        }
    }

    fn name_label(self) -> &'static str {
        match self {
            AddressRole::Sender => "sender name",
            AddressRole::ReplyTo => "reply-to name",
            AddressRole::Recipient => "recipient name",
        }
    }
}

/// A validated mailbox: address plus optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAddress {
    pub address: String,
    pub display_name: String,
}

impl MailAddress {
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidAddress`] for a malformed address and
    /// [`ComposeError::HeaderInjection`] for a display name with line breaks.
    pub fn parse(role: AddressRole, address: &str, display_name: &str) -> Result<Self, ComposeError> {
        let address = address.trim().to_string();
        if has_line_break(&address) || !ValidateEmail::validate_email(&address) {
            return Err(ComposeError::InvalidAddress {
                field: role.label(),
                value: address,
            });
        }

        if has_line_break(display_name) {
            return Err(ComposeError::HeaderInjection {
                field: role.name_label(),
            });
        }

        Ok(Self {
            address,
            display_name: display_name.trim().to_string(),
        })
    }
}

/// Caller input for one message, before validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageDraft<'a> {
    pub sender_address: &'a str,
    pub sender_name: &'a str,
    pub reply_to_address: &'a str,
    pub reply_to_name: &'a str,
    pub recipient_address: &'a str,
    pub recipient_name: &'a str,
    pub subject: &'a str,
    pub content: &'a str,
    pub style: Option<&'a str>,
}

/// Fully formed message handed to the dispatch policy. UTF-8 throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub sender: MailAddress,
    pub reply_to: MailAddress,
    pub recipient: MailAddress,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    pub attachments: Vec<Attachment>,
}

impl OutgoingMessage {
    /// Body plus attachment bytes, headers excluded.
    pub fn payload_size(&self) -> usize {
        self.attachments
            .iter()
            .fold(self.body.len(), |total, attachment| total.saturating_add(attachment.len()))
    }
}

pub fn is_html(content: &str) -> bool {
    content.contains('<')
}

/// Minimal document shell; the head is only emitted for a non-empty style.
pub fn wrap_html(content: &str, style: Option<&str>) -> String {
    match style.filter(|style| !style.is_empty()) {
        Some(style) => format!("<html><head><style>{style}</style></head><body>{content}</body></html>"),
        None => format!("<html><body>{content}</body></html>"),
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageComposer {
    max_message_bytes: Option<usize>,
}

impl MessageComposer {
    pub fn new(max_message_bytes: Option<usize>) -> Self {
        Self { max_message_bytes }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.max_message_bytes())
    }

    /// # Errors
    ///
    /// Fails on malformed addresses, line breaks in display names or the
    /// subject, and payloads above the configured size limit.
    pub fn compose(
        &self,
        draft: &MessageDraft<'_>,
        attachments: Vec<Attachment>,
    ) -> Result<OutgoingMessage, ComposeError> {
        let sender = MailAddress::parse(AddressRole::Sender, draft.sender_address, draft.sender_name)?;
        let recipient = MailAddress::parse(
            AddressRole::Recipient,
            draft.recipient_address,
            draft.recipient_name,
        )?;
        let reply_to = MailAddress::parse(
            AddressRole::ReplyTo,
            draft.reply_to_address,
            draft.reply_to_name,
        )?;

        if has_line_break(draft.subject) {
            return Err(ComposeError::HeaderInjection { field: "subject" });
        }

        let is_html = is_html(draft.content);
        let body = if is_html {
            wrap_html(draft.content, draft.style)
        } else {
            draft.content.to_string()
        };

        let message = OutgoingMessage {
            sender,
            reply_to,
            recipient,
            subject: draft.subject.to_string(),
            body,
            is_html,
            attachments,
        };

        if let Some(limit) = self.max_message_bytes {
            let size = message.payload_size();
            if size > limit {
                return Err(ComposeError::MessageTooLarge { size, limit });
            }
        }

        Ok(message)
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'].as_slice())
}
