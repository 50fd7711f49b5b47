use std::sync::Arc;

use tokio::sync::RwLock;
use zano_gateway::{AgentGateway, ConversationId, ConversationRecord, SharedChat};

/// How a rename or delete ended. The list is re-fetched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    Failed,
    /// No call was made, e.g. a blank rename.
    Skipped,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer listing landed first; this one was dropped.
    Stale,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub conversation_id: ConversationId,
    pub url: String,
}

/// An in-progress rename in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEdit {
    pub conversation_id: ConversationId,
    pub name: String,
}

#[derive(Debug, Default)]
struct DirectoryState {
    conversations: Vec<ConversationRecord>,
    editing: Option<RenameEdit>,
    issued_lists: u64,
    applied_list: u64,
}

impl DirectoryState {
    fn clear_editing(&mut self, conversation_id: &ConversationId) {
        if self
            .editing
            .as_ref()
            .is_some_and(|edit| &edit.conversation_id == conversation_id)
        {
            self.editing = None;
        }
    }
}

/// The sidebar's conversation list, always re-read from the backend after a change.
pub struct ConversationDirectory {
    gateway: Arc<dyn AgentGateway>,
    state: RwLock<DirectoryState>,
}

impl ConversationDirectory {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            gateway,
            state: RwLock::new(DirectoryState::default()),
        }
    }

    pub async fn conversations(&self) -> Vec<ConversationRecord> {
        self.state.read().await.conversations.clone()
    }

    pub async fn find(&self, conversation_id: &ConversationId) -> Option<ConversationRecord> {
        self.state
            .read()
            .await
            .conversations
            .iter()
            .find(|conversation| &conversation.id == conversation_id)
            .cloned()
    }

    pub async fn editing(&self) -> Option<RenameEdit> {
        self.state.read().await.editing.clone()
    }

    /// Replaces the known conversations with the backend's current listing.
    pub async fn list(&self) -> RefreshOutcome {
        let generation = {
            let mut state = self.state.write().await;
            state.issued_lists += 1;
            state.issued_lists
        };

        let result = self.gateway.list_conversations().await;

        let mut state = self.state.write().await;
        if generation <= state.applied_list {
            tracing::debug!(
                generation,
                applied = state.applied_list,
                "discarding stale conversation listing"
            );
            return RefreshOutcome::Stale;
        }

        match result {
            Ok(conversations) => {
                tracing::debug!(count = conversations.len(), "conversation list refreshed");
                state.applied_list = generation;
                state.conversations = conversations;
                RefreshOutcome::Applied
            }
            Err(error) => {
                tracing::warn!(
                    stage = error.stage(),
                    error = %error,
                    "failed to list conversations"
                );
                RefreshOutcome::Failed
            }
        }
    }

    /// Starts editing the name of a listed conversation.
    pub async fn begin_rename(&self, conversation_id: &ConversationId) -> Option<RenameEdit> {
        let mut state = self.state.write().await;
        let Some(conversation) = state
            .conversations
            .iter()
            .find(|conversation| &conversation.id == conversation_id)
        else {
            tracing::warn!(conversation_id = %conversation_id, "cannot rename an unlisted conversation");
            return None;
        };

        let edit = RenameEdit {
            conversation_id: conversation.id.clone(),
            name: conversation.name.clone(),
        };
        state.editing = Some(edit.clone());
        Some(edit)
    }

    pub async fn cancel_rename(&self) {
        self.state.write().await.editing = None;
    }

    pub async fn rename(&self, conversation_id: &ConversationId, name: &str) -> MutationOutcome {
        let name = name.trim();
        if name.is_empty() {
            tracing::debug!(conversation_id = %conversation_id, "blank name; rename cancelled");
            self.state.write().await.clear_editing(conversation_id);
            return MutationOutcome::Skipped;
        }

        let outcome = match self.gateway.rename_conversation(conversation_id, name).await {
            Ok(()) => {
                tracing::info!(conversation_id = %conversation_id, name, "conversation renamed");
                MutationOutcome::Applied
            }
            Err(error) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    stage = error.stage(),
                    error = %error,
                    "rename failed; list will show the backend's name"
                );
                MutationOutcome::Failed
            }
        };

        self.state.write().await.clear_editing(conversation_id);
        self.list().await;
        outcome
    }

    pub async fn delete(&self, conversation_id: &ConversationId) -> MutationOutcome {
        let outcome = match self.gateway.delete_conversation(conversation_id).await {
            Ok(()) => {
                tracing::info!(conversation_id = %conversation_id, "conversation deleted");
                MutationOutcome::Applied
            }
            Err(error) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    stage = error.stage(),
                    error = %error,
                    "delete failed"
                );
                MutationOutcome::Failed
            }
        };

        self.state.write().await.clear_editing(conversation_id);
        self.list().await;
        outcome
    }

    /// Public link for a conversation. Placeholder ids have no link yet.
    pub fn share(&self, conversation_id: &ConversationId) -> Option<ShareLink> {
        if conversation_id.is_placeholder() {
            tracing::debug!(conversation_id = %conversation_id, "placeholder conversation cannot be shared");
            return None;
        }

        Some(ShareLink {
            conversation_id: conversation_id.clone(),
            url: self.gateway.share_url(conversation_id),
        })
    }

    /// Loads the read-only view behind a share link.
    pub async fn open_shared(&self, conversation_id: &ConversationId) -> Option<SharedChat> {
        match self.gateway.fetch_shared_chat(conversation_id).await {
            Ok(shared) => Some(shared),
            Err(error) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    stage = error.stage(),
                    error = %error,
                    "failed to open shared chat"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use zano_gateway::Sender;
    use zano_gateway::mock::{MockGateway, MockOperation};

    use super::*;

    fn directory_with(gateway: &Arc<MockGateway>) -> ConversationDirectory {
        ConversationDirectory::new(gateway.clone())
    }

    #[tokio::test]
    async fn list_follows_backend_order() {
        let gateway = Arc::new(MockGateway::new());
        gateway.seed_conversation("old", "Old", &[]);
        gateway.seed_conversation("new", "New", &[]);
        let directory = directory_with(&gateway);

        assert_eq!(directory.list().await, RefreshOutcome::Applied);
        let names = directory
            .conversations()
            .await
            .into_iter()
            .map(|conversation| conversation.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[tokio::test]
    async fn older_listing_cannot_overwrite_newer_one() {
        let gateway = Arc::new(MockGateway::new());
        gateway.seed_conversation("a", "A", &[]);
        let directory = directory_with(&gateway);
        let release = gateway.hold("list");

        let (first, second) = tokio::join!(directory.list(), async {
            tokio::task::yield_now().await;
            gateway.seed_conversation("b", "B", &[]);
            let outcome = directory.list().await;
            release.release();
            outcome
        });

        assert_eq!(second, RefreshOutcome::Applied);
        assert_eq!(first, RefreshOutcome::Stale);
        assert_eq!(directory.conversations().await.len(), 2);
    }

    #[tokio::test]
    async fn rename_applies_and_clears_editing() {
        let gateway = Arc::new(MockGateway::new());
        let id = gateway.seed_conversation("a", "Before", &[(Sender::User, "hi")]);
        let directory = directory_with(&gateway);
        directory.list().await;

        let edit = directory.begin_rename(&id).await.unwrap();
        assert_eq!(edit.name, "Before");

        let outcome = directory.rename(&id, "  After  ").await;
        assert_eq!(outcome, MutationOutcome::Applied);
        assert_eq!(directory.editing().await, None);
        assert_eq!(directory.find(&id).await.unwrap().name, "After");
    }

    #[tokio::test]
    async fn failed_rename_keeps_backend_name() {
        let gateway = Arc::new(MockGateway::new());
        let id = gateway.seed_conversation("a", "Before", &[]);
        let directory = directory_with(&gateway);
        directory.list().await;
        directory.begin_rename(&id).await;
        gateway.fail_next(MockOperation::Rename, 1);

        let outcome = directory.rename(&id, "After").await;

        assert_eq!(outcome, MutationOutcome::Failed);
        assert_eq!(directory.editing().await, None);
        assert_eq!(directory.find(&id).await.unwrap().name, "Before");
        assert_eq!(gateway.calls(), vec!["list", "rename:a", "list"]);
    }

    #[tokio::test]
    async fn blank_rename_makes_no_call() {
        let gateway = Arc::new(MockGateway::new());
        let id = gateway.seed_conversation("a", "Before", &[]);
        let directory = directory_with(&gateway);
        directory.list().await;
        directory.begin_rename(&id).await;

        assert_eq!(directory.rename(&id, "   ").await, MutationOutcome::Skipped);
        assert_eq!(directory.editing().await, None);
        assert_eq!(gateway.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn delete_relists() {
        let gateway = Arc::new(MockGateway::new());
        let id = gateway.seed_conversation("a", "A", &[]);
        gateway.seed_conversation("b", "B", &[]);
        let directory = directory_with(&gateway);
        directory.list().await;

        assert_eq!(directory.delete(&id).await, MutationOutcome::Applied);
        assert!(directory.find(&id).await.is_none());
        assert_eq!(directory.conversations().await.len(), 1);
    }

    #[tokio::test]
    async fn share_is_local_and_skips_placeholders() {
        let gateway = Arc::new(MockGateway::new());
        let directory = directory_with(&gateway);

        let link = directory.share(&ConversationId::new("c1")).unwrap();
        assert_eq!(link.url, "http://mock.local/chat/c1");
        assert!(directory.share(&ConversationId::placeholder()).is_none());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn open_shared_returns_read_only_view() {
        let gateway = Arc::new(MockGateway::new());
        let id = gateway.seed_conversation("a", "A", &[(Sender::User, "hi"), (Sender::Agent, "yo")]);
        let directory = directory_with(&gateway);

        let shared = directory.open_shared(&id).await.unwrap();
        assert_eq!(shared.conversation.name, "A");
        assert_eq!(shared.messages.len(), 2);
        assert!(directory.open_shared(&ConversationId::new("missing")).await.is_none());
    }
}
