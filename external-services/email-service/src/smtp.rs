// SMTP transport built on Stalwart's mail-send
use std::time::Duration;

use async_trait::async_trait;
use mail_send::mail_builder::{headers::address::Address, MessageBuilder};
use mail_send::{SmtpClient, SmtpClientBuilder};
use secrecy::ExposeSecret;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::compose::{MailAddress, OutgoingMessage};
use crate::config::Endpoint;
use crate::error::TransportError;
use crate::transport::Transport;

/// Port on which `EnableSsl` means TLS from the first byte instead of STARTTLS.
pub const IMPLICIT_TLS_PORT: u16 = 465;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One SMTP session per [`Transport::transmit`] call.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    timeout: Duration,
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SmtpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn transmit(&self, endpoint: &Endpoint, message: &OutgoingMessage) -> Result<(), TransportError> {
        let implicit_tls = endpoint.enable_ssl && endpoint.port == IMPLICIT_TLS_PORT;
        debug!(
            host = %endpoint.host_name,
            port = endpoint.port,
            tls = endpoint.enable_ssl,
            implicit_tls,
            "Connecting to SMTP server"
        );

        let mut smtp_client = SmtpClientBuilder::new(endpoint.host_name.as_str(), endpoint.port)
            .implicit_tls(implicit_tls)
            .timeout(self.timeout);

        // Add credentials if provided
        if !endpoint.user_name.is_empty() {
            smtp_client = smtp_client.credentials((
                endpoint.user_name.as_str(),
                endpoint.password.expose_secret().as_str(),
            ));
        }

        let payload = build_message(message);

        if endpoint.enable_ssl {
            let client = smtp_client
                .connect()
                .await
                .map_err(|e| connection_error(endpoint, &e))?;
            deliver(client, payload, endpoint).await
        } else {
            let client = smtp_client
                .connect_plain()
                .await
                .map_err(|e| connection_error(endpoint, &e))?;
            deliver(client, payload, endpoint).await
        }
    }
}

async fn deliver<S>(
    mut client: SmtpClient<S>,
    payload: MessageBuilder<'_>,
    endpoint: &Endpoint,
) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    client
        .send(payload)
        .await
        .map_err(|e| TransportError::Delivery {
            host: endpoint.host_name.clone(),
            port: endpoint.port,
            reason: e.to_string(),
        })?;

    info!(host = %endpoint.host_name, port = endpoint.port, "Email sent successfully");

    // The message is accepted at this point; a failed QUIT only loses the goodbye
    if let Err(e) = client.quit().await {
        debug!(host = %endpoint.host_name, error = %e, "SMTP QUIT failed");
    }
    Ok(())
}

fn connection_error(endpoint: &Endpoint, error: &mail_send::Error) -> TransportError {
    TransportError::Connection {
        host: endpoint.host_name.clone(),
        port: endpoint.port,
        reason: error.to_string(),
    }
}

/// Renders an [`OutgoingMessage`] with mail-builder.
pub fn build_message(message: &OutgoingMessage) -> MessageBuilder<'_> {
    let mut builder = MessageBuilder::new()
        .from(mailbox(&message.sender))
        .to(mailbox(&message.recipient))
        .reply_to(mailbox(&message.reply_to))
        .subject(message.subject.as_str());

    builder = if message.is_html {
        builder.html_body(message.body.as_str())
    } else {
        builder.text_body(message.body.as_str())
    };

    for attachment in &message.attachments {
        builder = builder.attachment(
            attachment.mime_type.as_str(),
            attachment.file_name.as_str(),
            &*attachment.content,
        );
    }

    builder
}

fn mailbox(address: &MailAddress) -> Address<'_> {
    if address.display_name.is_empty() {
        Address::from(address.address.as_str())
    } else {
        Address::from((address.display_name.as_str(), address.address.as_str()))
    }
}
