#![deny(unsafe_code)]

//! Backend gateway for the agent chat service: typed ids and records, the
//! `AgentGateway` contract, and its HTTP implementation.

pub mod error;
pub mod gateway;
pub mod http;
pub mod ids;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod settings;
pub mod types;

pub use error::{GatewayError, GatewayResult};
pub use gateway::AgentGateway;
pub use http::HttpGateway;
pub use ids::{ConversationId, MessageId, PLACEHOLDER_PREFIX};
pub use settings::{ClientSettings, SettingsError};
pub use types::{
    AgentReply, ConversationRecord, MessageRecord, RenameRequest, SendRequest, Sender, SharedChat,
};
