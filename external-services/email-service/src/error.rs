use std::path::PathBuf;

use thiserror::Error;

use crate::config::EndpointRole;

/// Raised while turning caller input into an outgoing message.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Line break in {field} is not allowed")]
    HeaderInjection { field: &'static str },

    #[error("Message is {size} bytes, limit is {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },
}

/// Raised while reading caller-supplied attachment streams.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Failed to read attachment '{file_name}': {source}")]
    Read {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Raised by a [`Transport`](crate::transport::Transport) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("SMTP connection to {host}:{port} failed: {reason}")]
    Connection { host: String, port: u16, reason: String },

    #[error("Failed to send email via {host}:{port}: {reason}")]
    Delivery { host: String, port: u16, reason: String },
}

/// Failure inside the routing decision; always converted into a log entry.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No {0} host configured")]
    EndpointNotConfigured(EndpointRole),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported config format for {0}, expected .json, .yaml or .yml")]
    UnsupportedFormat(PathBuf),

    #[error("Malformed config document: {0}")]
    Parse(String),

    #[error("Config section '{0}' not found")]
    MissingSection(&'static str),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Errors surfaced by the [`EmailService`](crate::service::EmailService)
/// façade. Transport failures never appear here; they are reported through
/// [`DispatchResult`](crate::dispatch::DispatchResult).
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Attachment error: {0}")]
    Assembly(#[from] AssemblyError),
}

pub type EmailResult<T> = Result<T, EmailError>;
