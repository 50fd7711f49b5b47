use futures::future::BoxFuture;

use super::error::GatewayResult;
use super::ids::ConversationId;
use super::types::{AgentReply, ConversationRecord, MessageRecord, SendRequest, SharedChat};

/// The backend operations the chat state depends on.
///
/// Implementations surface every failure as an error value; callers decide how to roll back.
pub trait AgentGateway: Send + Sync {
    fn list_conversations(&self) -> BoxFuture<'_, GatewayResult<Vec<ConversationRecord>>>;

    fn fetch_messages<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<Vec<MessageRecord>>>;

    /// Sends one user turn. A request without a conversation id creates a conversation.
    fn send_message(&self, request: SendRequest) -> BoxFuture<'_, GatewayResult<AgentReply>>;

    fn rename_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        name: &'a str,
    ) -> BoxFuture<'a, GatewayResult<()>>;

    fn delete_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<()>>;

    fn fetch_shared_chat<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<SharedChat>>;

    /// Derives the public link for a conversation. Pure, no network.
    fn share_url(&self, conversation_id: &ConversationId) -> String;
}
