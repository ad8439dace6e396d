use async_trait::async_trait;

use crate::{
    error::ChannelError,
    types::{ChannelStatus, InboundMessage, OutboundMessage},
};

/// Common interface implemented by every messaging gateway (Instagram DMs, ManyChat, ...).
///
/// Implementations must be `Send + Sync` so they can be shared between the
/// polling task and HTTP handlers.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Stable lowercase identifier for this channel (e.g. `"instagram"`).
    fn name(&self) -> &str;

    /// Authenticate against the platform and resolve the account identity.
    ///
    /// Implementations should transition their internal state to
    /// [`ChannelStatus::Connected`] on success.
    async fn connect(&mut self) -> Result<(), ChannelError>;

    /// Fetch unread inbound messages across conversations, oldest first within
    /// each conversation.
    ///
    /// Push-only channels (webhook driven) keep the default, which returns nothing.
    async fn list_unread(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        Ok(Vec::new())
    }

    /// Mark a message as seen on the platform. Best effort; callers log failures.
    async fn mark_seen(&self, _msg: &InboundMessage) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Deliver a single outbound text message.
    ///
    /// `&self` so a connected adapter can send while a poll is in flight.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    /// Return the current runtime status without blocking.
    fn status(&self) -> ChannelStatus;
}
