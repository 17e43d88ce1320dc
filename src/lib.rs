//! Kindred — a mood-aware, persona-styled conversational companion.
//!
//! Classifies each message's mood and topics, answers simple requests with
//! local tools, and otherwise streams a reply from a remote model while
//! remembering a small profile of the user across sessions.
//!
//! See `DESIGN.md` for the architecture.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod store;
pub mod types;

pub mod classify;
pub mod knowledge;
pub mod persona;
pub mod profile;
pub mod prompt;
pub mod tools;

pub mod engine;
pub mod providers;

pub mod adapters;
