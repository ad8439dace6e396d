pub mod backoff;
pub mod channel;
pub mod dedup;
pub mod error;
pub mod types;

pub use backoff::{connect_with_backoff, BackoffPolicy};
pub use channel::ChannelGateway;
pub use dedup::SeenSet;
pub use error::ChannelError;
pub use types::{ChannelStatus, InboundMessage, OutboundMessage};
