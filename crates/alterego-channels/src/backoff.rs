use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::{channel::ChannelGateway, error::ChannelError};

/// Reconnect schedule: exponential growth from `base_secs` up to `max_secs`,
/// with up to `jitter_fraction` of each delay added on top.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base_secs: u64,
    pub max_secs: u64,
    pub max_attempts: u32,
    pub jitter_fraction: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_secs: 5,
            max_secs: 300,
            max_attempts: 10,
            jitter_fraction: 0.10,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let shift = attempt.saturating_sub(1).min(32);
        self.base_secs
            .saturating_mul(1u64 << shift)
            .min(self.max_secs)
    }

    fn jitter_secs(&self, delay_secs: u64) -> u64 {
        let max_jitter = ((delay_secs as f64) * self.jitter_fraction) as u64;
        if max_jitter == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..max_jitter)
    }
}

/// Attempt to connect a channel with exponential backoff and jitter.
///
/// Schedule with the default policy: 5 s, 10 s, 20 s ... 300 s (cap), up to 10 tries.
/// Configuration errors are returned immediately; retrying cannot fix them.
pub async fn connect_with_backoff(
    channel: &mut dyn ChannelGateway,
    policy: BackoffPolicy,
) -> Result<(), ChannelError> {
    let name = channel.name().to_string();
    let mut attempt = 1;

    loop {
        match channel.connect().await {
            Ok(()) => {
                info!(channel = %name, attempt, "channel connected successfully");
                return Ok(());
            }
            Err(e @ ChannelError::ConfigError(_)) => return Err(e),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(e) => {
                let delay = match &e {
                    ChannelError::RateLimited { retry_after_secs } => {
                        (*retry_after_secs).max(policy.delay_for(attempt))
                    }
                    _ => policy.delay_for(attempt),
                };
                let total = delay + policy.jitter_secs(delay);
                warn!(
                    channel = %name,
                    attempt,
                    max = policy.max_attempts,
                    error = %e,
                    retry_after_secs = total,
                    "channel connect failed, retrying with backoff"
                );
                sleep(Duration::from_secs(total)).await;
                attempt += 1;
            }
        }
    }
}
