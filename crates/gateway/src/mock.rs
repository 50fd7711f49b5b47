//! In-memory backend that behaves like the agent server, with hooks to script races and
//! failures. Available under the `mock` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use super::error::{GatewayError, GatewayResult};
use super::gateway::AgentGateway;
use super::ids::{ConversationId, MessageId};
use super::types::{
    AgentReply, ConversationRecord, MessageRecord, SendRequest, Sender, SharedChat,
};

const CONVERSATION_NAME_LIMIT: usize = 50;
const MOCK_SHARE_ORIGIN: &str = "http://mock.local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    List,
    FetchMessages,
    Send,
    Rename,
    Delete,
    SharedChat,
}

/// Releases one operation parked by [`MockGateway::hold`]. Dropping it releases too.
#[derive(Debug)]
pub struct MockRelease(oneshot::Sender<()>);

impl MockRelease {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Debug, Default)]
struct MockState {
    conversations: Vec<ConversationRecord>,
    messages: HashMap<ConversationId, Vec<MessageRecord>>,
    pending_failures: HashMap<MockOperation, usize>,
    gates: HashMap<String, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<String>,
    clock: u64,
    next_conversation: u64,
    next_message: u64,
}

impl MockState {
    fn tick(&mut self) -> String {
        self.clock += 1;
        format!("2026-01-01T00:00:00.{:06}", self.clock)
    }

    fn take_failure(&mut self, operation: MockOperation) -> bool {
        match self.pending_failures.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn push_message(&mut self, conversation_id: &ConversationId, sender: Sender, content: String) {
        self.next_message += 1;
        let message = MessageRecord {
            id: MessageId::new(format!("msg-{}", self.next_message)),
            content,
            sender,
            timestamp: self.tick(),
        };
        self.messages
            .entry(conversation_id.clone())
            .or_default()
            .push(message);
    }

    fn touch(&mut self, conversation_id: &ConversationId) -> bool {
        let now = self.tick();
        match self
            .conversations
            .iter_mut()
            .find(|conversation| &conversation.id == conversation_id)
        {
            Some(conversation) => {
                conversation.updated_at = now;
                true
            }
            None => false,
        }
    }

    fn sorted_conversations(&self) -> Vec<ConversationRecord> {
        let mut conversations = self.conversations.clone();
        conversations.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
        conversations
    }
}

/// Scriptable stand-in for the agent backend.
#[derive(Debug, Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a conversation with the given history, as if created earlier.
    pub fn seed_conversation(
        &self,
        id: &str,
        name: &str,
        history: &[(Sender, &str)],
    ) -> ConversationId {
        let mut state = self.lock();
        let conversation_id = ConversationId::new(id);
        let now = state.tick();
        state.conversations.push(ConversationRecord {
            id: conversation_id.clone(),
            name: name.to_string(),
            created_at: now.clone(),
            updated_at: now,
        });
        for (sender, content) in history {
            state.push_message(&conversation_id, *sender, content.to_string());
        }
        conversation_id
    }

    /// Makes the next `times` calls of `operation` fail.
    pub fn fail_next(&self, operation: MockOperation, times: usize) {
        *self.lock().pending_failures.entry(operation).or_default() += times;
    }

    /// Parks the next operation matching `key` until the returned handle is released.
    ///
    /// Keys: `list`, `fetch:<id>`, `send:<message>`, `rename:<id>`, `delete:<id>`, `shared:<id>`.
    pub fn hold(&self, key: impl Into<String>) -> MockRelease {
        let (release_tx, release_rx) = oneshot::channel();
        self.lock()
            .gates
            .entry(key.into())
            .or_default()
            .push_back(release_rx);
        MockRelease(release_tx)
    }

    /// Every call received so far, in arrival order, as gate keys.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn messages_of(&self, conversation_id: &ConversationId) -> Vec<MessageRecord> {
        self.lock()
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn conversation_ids(&self) -> Vec<ConversationId> {
        self.lock()
            .sorted_conversations()
            .into_iter()
            .map(|conversation| conversation.id)
            .collect()
    }

    /// Records the call and decides its failure up front, then waits on any gate.
    async fn enter(&self, key: String, operation: MockOperation) -> GatewayResult<()> {
        let (gate, fail) = {
            let mut state = self.lock();
            state.calls.push(key.clone());
            let gate = state
                .gates
                .get_mut(&key)
                .and_then(|queue| queue.pop_front());
            (gate, state.take_failure(operation))
        };

        if let Some(gate) = gate {
            // A dropped release handle lets the call through as well.
            let _ = gate.await;
        }

        if fail {
            return Err(GatewayError::Rejected {
                stage: "mock-scripted-failure",
                details: key,
            });
        }
        Ok(())
    }
}

impl AgentGateway for MockGateway {
    fn list_conversations(&self) -> BoxFuture<'_, GatewayResult<Vec<ConversationRecord>>> {
        Box::pin(async move {
            self.enter("list".to_string(), MockOperation::List).await?;
            Ok(self.lock().sorted_conversations())
        })
    }

    fn fetch_messages<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<Vec<MessageRecord>>> {
        Box::pin(async move {
            self.enter(
                format!("fetch:{conversation_id}"),
                MockOperation::FetchMessages,
            )
            .await?;
            Ok(self.messages_of(conversation_id))
        })
    }

    fn send_message(&self, request: SendRequest) -> BoxFuture<'_, GatewayResult<AgentReply>> {
        Box::pin(async move {
            self.enter(format!("send:{}", request.message), MockOperation::Send)
                .await?;

            let mut state = self.lock();
            let conversation_id = match request.conversation_id {
                Some(conversation_id) => {
                    if !state.touch(&conversation_id) {
                        return Err(GatewayError::NotFound {
                            stage: "mock-send-message",
                            url: format!("/conversations/{conversation_id}"),
                        });
                    }
                    conversation_id
                }
                None => {
                    state.next_conversation += 1;
                    let conversation_id =
                        ConversationId::new(format!("conv-{}", state.next_conversation));
                    let now = state.tick();
                    state.conversations.push(ConversationRecord {
                        id: conversation_id.clone(),
                        name: conversation_name(&request.message),
                        created_at: now.clone(),
                        updated_at: now,
                    });
                    conversation_id
                }
            };

            let response = format!("echo: {}", request.message);
            state.push_message(&conversation_id, Sender::User, request.message);
            state.push_message(&conversation_id, Sender::Agent, response.clone());

            Ok(AgentReply {
                conversation_id,
                response: Some(response),
            })
        })
    }

    fn rename_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        name: &'a str,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            self.enter(format!("rename:{conversation_id}"), MockOperation::Rename)
                .await?;

            let mut state = self.lock();
            let now = state.tick();
            let Some(conversation) = state
                .conversations
                .iter_mut()
                .find(|conversation| &conversation.id == conversation_id)
            else {
                return Err(GatewayError::NotFound {
                    stage: "mock-rename-conversation",
                    url: format!("/conversations/{conversation_id}"),
                });
            };
            conversation.name = name.to_string();
            conversation.updated_at = now;
            Ok(())
        })
    }

    fn delete_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move {
            self.enter(format!("delete:{conversation_id}"), MockOperation::Delete)
                .await?;

            let mut state = self.lock();
            state
                .conversations
                .retain(|conversation| &conversation.id != conversation_id);
            state.messages.remove(conversation_id);
            Ok(())
        })
    }

    fn fetch_shared_chat<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, GatewayResult<SharedChat>> {
        Box::pin(async move {
            self.enter(format!("shared:{conversation_id}"), MockOperation::SharedChat)
                .await?;

            let state = self.lock();
            let conversation = state
                .conversations
                .iter()
                .find(|conversation| &conversation.id == conversation_id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound {
                    stage: "mock-fetch-shared-chat",
                    url: format!("/chat/{conversation_id}"),
                })?;
            let messages = state
                .messages
                .get(conversation_id)
                .cloned()
                .unwrap_or_default();
            Ok(SharedChat {
                conversation,
                messages,
            })
        })
    }

    fn share_url(&self, conversation_id: &ConversationId) -> String {
        format!("{MOCK_SHARE_ORIGIN}/chat/{conversation_id}")
    }
}

/// Names a new conversation after its first message, like the real backend.
fn conversation_name(message: &str) -> String {
    if message.chars().count() > CONVERSATION_NAME_LIMIT {
        let head = message
            .chars()
            .take(CONVERSATION_NAME_LIMIT)
            .collect::<String>();
        format!("{head}...")
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_send_creates_a_named_conversation() {
        let gateway = MockGateway::new();
        let long_message = "x".repeat(60);

        let reply = gateway
            .send_message(SendRequest::new(long_message.clone(), None))
            .await
            .unwrap();

        let conversations = gateway.list_conversations().await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].id, reply.conversation_id);
        assert_eq!(conversations[0].name, format!("{}...", "x".repeat(50)));

        let messages = gateway.fetch_messages(&reply.conversation_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].sender, Sender::Agent);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let gateway = MockGateway::new();
        gateway.fail_next(MockOperation::List, 1);

        assert!(gateway.list_conversations().await.is_err());
        assert!(gateway.list_conversations().await.is_ok());
        assert_eq!(gateway.calls(), vec!["list", "list"]);
    }

    #[tokio::test]
    async fn held_operation_waits_for_release() {
        let gateway = MockGateway::new();
        let conversation_id = gateway.seed_conversation("a", "A", &[(Sender::User, "hi")]);
        let release = gateway.hold("fetch:a");

        let (messages, _) = tokio::join!(gateway.fetch_messages(&conversation_id), async {
            tokio::task::yield_now().await;
            release.release();
        });

        assert_eq!(messages.unwrap().len(), 1);
    }
}
