//! # Bot Module
//!
//! The conversational layer: per-user dialogue sessions, input validation,
//! the turn-handling state machine, and the outbound messaging contract.

pub mod controller;
pub mod messenger;
pub mod session;
pub mod validate;

pub use controller::DialogueController;
pub use messenger::{Keyboard, Messenger, WebhookMessenger};
