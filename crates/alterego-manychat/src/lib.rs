pub mod adapter;
pub mod webhook;

pub use adapter::ManyChatAdapter;
pub use webhook::WebhookPayload;
