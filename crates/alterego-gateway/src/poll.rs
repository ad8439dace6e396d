//! Instagram polling driver.
//!
//! Messages are handled strictly one at a time: each one is marked in the
//! seen set, routed and answered before the next is looked at.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use alterego_channels::{
    connect_with_backoff, BackoffPolicy, ChannelError, ChannelGateway, InboundMessage,
    OutboundMessage, SeenSet,
};
use alterego_router::MessageRouter;

pub struct PollLoop {
    channel: Box<dyn ChannelGateway>,
    router: Arc<MessageRouter>,
    seen: SeenSet,
    interval: Duration,
    backoff: BackoffPolicy,
}

impl PollLoop {
    pub fn new(channel: Box<dyn ChannelGateway>, router: Arc<MessageRouter>, interval: Duration) -> Self {
        Self {
            channel,
            router,
            seen: SeenSet::default(),
            interval,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Connect, then poll until `cancel` fires or the channel cannot be reconnected.
    pub async fn run(mut self, cancel: CancellationToken) {
        if !self.reconnect(&cancel).await {
            return;
        }
        info!(
            channel = %self.channel.name(),
            interval_secs = self.interval.as_secs(),
            "polling started"
        );

        while !cancel.is_cancelled() {
            let mut wait = self.interval;
            match self.poll_once(&cancel).await {
                Ok(replies) => debug!(replies, "poll cycle complete"),
                Err(ChannelError::RateLimited { retry_after_secs }) => {
                    warn!(retry_after_secs, "rate limited, backing off");
                    wait = wait.max(Duration::from_secs(retry_after_secs));
                }
                Err(e) if e.needs_reconnect() => {
                    warn!(error = %e, "channel session lost, reconnecting");
                    if !self.reconnect(&cancel).await {
                        return;
                    }
                    continue;
                }
                Err(e) => error!(error = %e, code = e.code(), "poll cycle failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        info!("polling stopped");
    }

    /// Fetch unread messages once and answer them. Returns the number of replies sent.
    pub async fn poll_once(&mut self, cancel: &CancellationToken) -> Result<usize, ChannelError> {
        let messages = self.channel.list_unread().await?;
        let mut replies = 0;
        for msg in messages {
            if cancel.is_cancelled() {
                break;
            }
            if self.handle(&msg).await {
                replies += 1;
            }
        }
        Ok(replies)
    }

    async fn handle(&mut self, msg: &InboundMessage) -> bool {
        if !self.seen.insert(msg.dedup_key()) {
            return false;
        }
        if msg.is_from_self {
            return false;
        }
        let Some(text) = msg.text_content() else {
            debug!(conversation = %msg.conversation_id, "skipping non-text message");
            return false;
        };

        if let Err(e) = self.channel.mark_seen(msg).await {
            warn!(conversation = %msg.conversation_id, error = %e, "failed to mark message seen");
        }

        let outcome = self.router.route(&msg.conversation_id, text).await;
        let Some(reply) = outcome.reply else {
            return false;
        };

        match self
            .channel
            .send(&OutboundMessage::text(&msg.conversation_id, reply))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(conversation = %msg.conversation_id, error = %e, "failed to send reply");
                false
            }
        }
    }

    async fn reconnect(&mut self, cancel: &CancellationToken) -> bool {
        let result = tokio::select! {
            _ = cancel.cancelled() => return false,
            r = connect_with_backoff(self.channel.as_mut(), self.backoff) => r,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(channel = %self.channel.name(), error = %e, "giving up on channel");
                false
            }
        }
    }
}
