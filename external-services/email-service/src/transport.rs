use async_trait::async_trait;

use crate::compose::OutgoingMessage;
use crate::config::Endpoint;
use crate::error::TransportError;

/// Delivers one message to one endpoint.
///
/// Implementations open a fresh connection per call, authenticate with the
/// endpoint credentials, honour its TLS flag, and release the connection on
/// every exit path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Any connection or delivery failure as a [`TransportError`].
    async fn transmit(&self, endpoint: &Endpoint, message: &OutgoingMessage) -> Result<(), TransportError>;
}
