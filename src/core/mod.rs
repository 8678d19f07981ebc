//! Conversation protocol, streaming, and post-query work.

pub mod conversation;
pub mod harvest;
pub mod http;
pub mod logging;
pub mod stream;

pub use conversation::{ConversationRecord, ConversationState, SelectOutcome};
pub use stream::{CompletionBuffer, StreamEvent};
