// Email service façade: assemble attachments, compose, dispatch
use std::sync::Arc;

use tracing::{debug, info, trace, Level};

use crate::attachment::{AttachmentAssembler, FileAttachment};
use crate::compose::{MessageComposer, MessageDraft};
use crate::config::RoutingConfig;
use crate::dispatch::{DispatchPolicy, DispatchResult};
use crate::error::EmailResult;
use crate::mime::{ExtensionMimeResolver, MimeResolver};
use crate::smtp::SmtpTransport;
use crate::transport::Transport;

/// Body and attachments shared by all three send variants.
#[derive(Debug, Clone, Copy)]
struct Content<'a> {
    to_address: &'a str,
    to_name: &'a str,
    subject: &'a str,
    content: &'a str,
    style: Option<&'a str>,
}

/// Email service sending through the configured primary and debug endpoints.
///
/// Configuration is fixed for the lifetime of the service. The service is
/// `Send + Sync` and can be shared behind an `Arc`.
pub struct EmailService {
    config: Arc<RoutingConfig>,
    assembler: AttachmentAssembler,
    composer: MessageComposer,
    policy: DispatchPolicy,
}

impl EmailService {
    pub fn new(
        config: RoutingConfig,
        transport: Arc<dyn Transport>,
        mime_resolver: Arc<dyn MimeResolver>,
    ) -> Self {
        if tracing::enabled!(Level::TRACE) {
            match serde_json::to_string_pretty(&config) {
                Ok(snapshot) => trace!("Email config: {snapshot}"),
                Err(e) => debug!(error = %e, "Could not serialise email config"),
            }
        }

        if !config.send_active && !config.debug_active {
            info!("SendActive and DebugActive are both off, messages will be validated only");
        }

        let config = Arc::new(config);
        Self {
            assembler: AttachmentAssembler::new(mime_resolver),
            composer: MessageComposer::from_config(&config),
            policy: DispatchPolicy::new(Arc::clone(&config), transport),
            config,
        }
    }

    /// Service over [`SmtpTransport`] with the default MIME table.
    pub fn smtp(config: RoutingConfig) -> Self {
        Self::new(
            config,
            Arc::new(SmtpTransport::new()),
            Arc::new(ExtensionMimeResolver::new()),
        )
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Shared resolver; mappings added here apply to later sends.
    pub fn mime_resolver(&self) -> &Arc<dyn MimeResolver> {
        self.assembler.mime_resolver()
    }

    /// Replies go to the configured sender address and friendly name.
    ///
    /// # Errors
    ///
    /// Returns an error when an attachment cannot be read or the message
    /// cannot be composed. Delivery problems are reported in the
    /// [`DispatchResult`].
    pub async fn send(
        &self,
        to_address: &str,
        to_name: &str,
        subject: &str,
        content: &str,
        style: Option<&str>,
        files: &mut [Box<dyn FileAttachment>],
    ) -> EmailResult<DispatchResult> {
        let body = Content {
            to_address,
            to_name,
            subject,
            content,
            style,
        };
        self.deliver(&self.config.sender, &self.config.friendly_name, body, files)
            .await
    }

    /// Replies go to the configured sender address under `reply_to_name`.
    ///
    /// # Errors
    ///
    /// Same as [`EmailService::send`].
    pub async fn send_as(
        &self,
        reply_to_name: &str,
        to_address: &str,
        to_name: &str,
        subject: &str,
        content: &str,
        style: Option<&str>,
        files: &mut [Box<dyn FileAttachment>],
    ) -> EmailResult<DispatchResult> {
        let body = Content {
            to_address,
            to_name,
            subject,
            content,
            style,
        };
        self.deliver(&self.config.sender, reply_to_name, body, files)
            .await
    }

    /// # Errors
    ///
    /// Same as [`EmailService::send`].
    pub async fn send_with_reply_to(
        &self,
        reply_to_address: &str,
        reply_to_name: &str,
        to_address: &str,
        to_name: &str,
        subject: &str,
        content: &str,
        style: Option<&str>,
        files: &mut [Box<dyn FileAttachment>],
    ) -> EmailResult<DispatchResult> {
        let body = Content {
            to_address,
            to_name,
            subject,
            content,
            style,
        };
        self.deliver(reply_to_address, reply_to_name, body, files)
            .await
    }

    async fn deliver(
        &self,
        reply_to_address: &str,
        reply_to_name: &str,
        body: Content<'_>,
        files: &mut [Box<dyn FileAttachment>],
    ) -> EmailResult<DispatchResult> {
        let attachments = self.assembler.assemble(files).await?;

        let draft = MessageDraft {
            sender_address: &self.config.sender,
            sender_name: &self.config.friendly_name,
            reply_to_address,
            reply_to_name,
            recipient_address: body.to_address,
            recipient_name: body.to_name,
            subject: body.subject,
            content: body.content,
            style: body.style,
        };
        let message = self.composer.compose(&draft, attachments)?;

        Ok(self.policy.dispatch(message).await)
    }
}
