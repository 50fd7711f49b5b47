#![deny(unsafe_code)]

//! Conversation and message state for the agent chat client, independent of any UI.

pub mod controller;
pub mod directory;
pub mod events;
pub mod shell;

pub use controller::{ControllerPhase, ControllerSnapshot, ConversationController, SendOutcome};
pub use directory::{
    ConversationDirectory, MutationOutcome, RefreshOutcome, RenameEdit, ShareLink,
};
pub use events::{ControllerEvent, Selection};
pub use shell::ChatShell;
