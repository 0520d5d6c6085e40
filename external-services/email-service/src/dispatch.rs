//! Routing decision for composed messages.
//!
//! Order of evaluation for every dispatch:
//!
//! 1. Record the message header and both endpoint descriptions.
//! 2. If a debug tag is configured and the subject contains it (ignoring
//!    case), send to the debug endpoint only. The primary endpoint is never
//!    contacted in this case, whatever `SendActive` says.
//! 3. Otherwise send to the primary endpoint when `SendActive`, then a copy
//!    with a `[tag]` / `[DEBUG]` subject prefix to the debug endpoint when
//!    `DebugActive`.
//! 4. Nothing sent is a successful dry run.
//!
//! Any failure stops the remaining steps and is reported through the result,
//! never as an error to the caller.

use std::fmt;
use std::sync::Arc;

use logger_redacted::{reveal_prefix, PiiRedactor};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::compose::{MailAddress, OutgoingMessage};
use crate::config::{Endpoint, EndpointRole, RoutingConfig};
use crate::error::DispatchError;
use crate::transport::Transport;

/// Subject marker for debug copies when no tag is configured.
pub const DEBUG_MARKER: &str = "[DEBUG]";

/// Characters of the debug user name shown when a tag matches.
pub const USER_HINT_CHARS: usize = 3;

pub const REMEDIATION_HINT: &str = "Check if the SMTP settings in the configuration are correct.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSummary {
    pub host_name: String,
    pub port: u16,
    pub enable_ssl: bool,
}

impl From<&Endpoint> for EndpointSummary {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            host_name: endpoint.host_name.clone(),
            port: endpoint.port,
            enable_ssl: endpoint.enable_ssl,
        }
    }
}

/// One routing decision, in the order it was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    Started {
        subject: String,
        reply_to: String,
        recipient: String,
    },
    EndpointConfigured {
        role: EndpointRole,
        endpoint: Option<EndpointSummary>,
    },
    DebugTagMatched {
        tag: String,
        user_hint: Option<String>,
    },
    Sending {
        role: EndpointRole,
        subject: String,
    },
    NoActiveEndpoint,
    Failed {
        error: String,
    },
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchEvent::Started {
                subject,
                reply_to,
                recipient,
            } => write!(f, "Send email subject:'{subject}', replyTo:[{reply_to}], to:[{recipient}]"),
            DispatchEvent::EndpointConfigured { role, endpoint } => {
                let label = match role {
                    EndpointRole::Primary => "Smtp host",
                    EndpointRole::Debug => "Debug host",
                };
                match endpoint {
                    Some(e) => write!(
                        f,
                        "{label} : {}, port {}, ssl {}",
                        e.host_name, e.port, e.enable_ssl
                    ),
                    None => write!(f, "{label} not found"),
                }
            }
            DispatchEvent::DebugTagMatched { tag, user_hint } => {
                write!(
                    f,
                    "Found debug tag :{tag} in subject, sending email message to debug server only"
                )?;
                if let Some(hint) = user_hint {
                    write!(f, "\nUsing username {hint}")?;
                }
                Ok(())
            }
            DispatchEvent::Sending { role, .. } => match role {
                EndpointRole::Primary => f.write_str("Sending email message"),
                EndpointRole::Debug => f.write_str("Sending email message to debug server"),
            },
            DispatchEvent::NoActiveEndpoint => f.write_str(
                "Email validation succeeded\n\
                 SendActive and DebugActive are both set to false in config.\n\
                 The service is not transmitting messages",
            ),
            DispatchEvent::Failed { error } => write!(f, "{error}\n{REMEDIATION_HINT}"),
        }
    }
}

/// Outcome of one dispatch: the decision records, their rendered text, and
/// whether every attempted transmission succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub events: Vec<DispatchEvent>,
    pub log_text: String,
    pub success: bool,
}

impl DispatchResult {
    fn new(events: Vec<DispatchEvent>, success: bool) -> Self {
        let log_text = events.iter().fold(String::new(), |mut text, event| {
            text.push_str(&event.to_string());
            text.push('\n');
            text
        });
        Self {
            events,
            log_text,
            success,
        }
    }

    /// Endpoints a transmission was attempted on, in attempt order.
    pub fn attempted(&self) -> Vec<EndpointRole> {
        self.events
            .iter()
            .filter_map(|event| match event {
                DispatchEvent::Sending { role, .. } => Some(*role),
                _ => None,
            })
            .collect()
    }

    pub fn is_dry_run(&self) -> bool {
        self.events.contains(&DispatchEvent::NoActiveEndpoint)
    }
}

#[derive(Clone)]
pub struct DispatchPolicy {
    config: Arc<RoutingConfig>,
    transport: Arc<dyn Transport>,
    redactor: PiiRedactor,
}

impl DispatchPolicy {
    pub fn new(config: Arc<RoutingConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            redactor: PiiRedactor::default(),
        }
    }

    pub async fn dispatch(&self, mut message: OutgoingMessage) -> DispatchResult {
        let dispatch_id = Uuid::new_v4();
        let mut events = vec![DispatchEvent::Started {
            subject: message.subject.clone(),
            reply_to: mailbox_label(&message.reply_to),
            recipient: mailbox_label(&message.recipient),
        }];

        for role in [EndpointRole::Primary, EndpointRole::Debug] {
            events.push(DispatchEvent::EndpointConfigured {
                role,
                endpoint: self.config.endpoint(role).map(EndpointSummary::from),
            });
        }

        match self.route(dispatch_id, &mut message, &mut events).await {
            Ok(()) => DispatchResult::new(events, true),
            Err(e) => {
                error!(dispatch_id = %dispatch_id, error = %e, "Email dispatch failed");
                events.push(DispatchEvent::Failed { error: e.to_string() });
                DispatchResult::new(events, false)
            }
        }
    }

    async fn route(
        &self,
        dispatch_id: Uuid,
        message: &mut OutgoingMessage,
        events: &mut Vec<DispatchEvent>,
    ) -> Result<(), DispatchError> {
        let tag = self.config.active_debug_tag();

        if let Some(tag) = tag {
            if contains_ignore_case(&message.subject, tag) {
                events.push(DispatchEvent::DebugTagMatched {
                    tag: tag.to_string(),
                    user_hint: self
                        .config
                        .endpoint(EndpointRole::Debug)
                        .map(|endpoint| reveal_prefix(&endpoint.user_name, USER_HINT_CHARS)),
                });
                return self.send(dispatch_id, EndpointRole::Debug, message, events).await;
            }
        }

        let mut sent = false;

        if self.config.send_active {
            self.send(dispatch_id, EndpointRole::Primary, message, events).await?;
            sent = true;
        }

        if self.config.debug_active {
            let marker = tag.map_or_else(|| DEBUG_MARKER.to_string(), |tag| format!("[{tag}]"));
            message.subject = format!("{marker}{}", message.subject);
            self.send(dispatch_id, EndpointRole::Debug, message, events).await?;
            sent = true;
        }

        if !sent {
            info!(dispatch_id = %dispatch_id, "No active endpoint, message validated but not sent");
            events.push(DispatchEvent::NoActiveEndpoint);
        }

        Ok(())
    }

    async fn send(
        &self,
        dispatch_id: Uuid,
        role: EndpointRole,
        message: &OutgoingMessage,
        events: &mut Vec<DispatchEvent>,
    ) -> Result<(), DispatchError> {
        events.push(DispatchEvent::Sending {
            role,
            subject: message.subject.clone(),
        });

        let endpoint = self
            .config
            .endpoint(role)
            .ok_or(DispatchError::EndpointNotConfigured(role))?;

        info!(
            dispatch_id = %dispatch_id,
            role = %role,
            host = %endpoint.host_name,
            port = endpoint.port,
            recipient = %self.redactor.redact(&message.recipient.address),
            "Transmitting email"
        );

        self.transport.transmit(endpoint, message).await?;
        Ok(())
    }
}

fn mailbox_label(address: &MailAddress) -> String {
    format!("{} {}", address.address, address.display_name)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_uppercase().contains(&needle.to_uppercase())
}
