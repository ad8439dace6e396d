pub mod adapter;
pub mod api;
pub mod error;

pub use adapter::InstagramAdapter;
