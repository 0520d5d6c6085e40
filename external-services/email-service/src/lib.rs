//! Outbound email with primary and debug routing.
//!
//! Messages go through three stages:
//!
//! - [`AttachmentAssembler`] reads caller streams and resolves MIME types
//! - [`MessageComposer`] validates addresses and wraps HTML content
//! - [`DispatchPolicy`] picks the endpoint(s) from [`RoutingConfig`] and
//!   records every decision in a [`DispatchResult`]
//!
//! [`EmailService`] wires the three together over a [`Transport`], by default
//! [`SmtpTransport`].
//!
//! # Example
//!
//! ```no_run
//! use email_service::{EmailService, RoutingConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = RoutingConfig::from_file("config/smtp.example.yaml")?;
//! let service = EmailService::smtp(config);
//!
//! let result = service
//!     .send("jane@example.com", "Jane", "Build finished", "<p>All green</p>", None, &mut [])
//!     .await?;
//! println!("{}", result.log_text);
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mime;
pub mod service;
pub mod smtp;
pub mod transport;

pub use attachment::{Attachment, AttachmentAssembler, FileAttachment, FileSystemAttachment, MemoryAttachment};
pub use compose::{MailAddress, MessageComposer, MessageDraft, OutgoingMessage};
pub use config::{Endpoint, EndpointRole, RoutingConfig};
pub use dispatch::{DispatchEvent, DispatchPolicy, DispatchResult};
pub use error::{AssemblyError, ComposeError, ConfigError, EmailError, EmailResult, TransportError};
pub use mime::{ExtensionMimeResolver, MimeResolver};
pub use service::EmailService;
pub use smtp::SmtpTransport;
pub use transport::Transport;
