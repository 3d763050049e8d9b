pub mod config;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use state::{ChatMessage, ChatRole, MessageThread, PendingReply, ThreadToken, CANNED_REPLY};
pub use store::{
    ConversationEntry, ConversationId, ConversationStore, StoreEvent, DEFAULT_TITLE, DEMO_TITLES,
};
