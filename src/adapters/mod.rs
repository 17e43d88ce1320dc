//! Presentation adapters driving a [`crate::engine::ConversationEngine`].

pub mod cli;
