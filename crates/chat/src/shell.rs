use std::sync::Arc;

use tokio::sync::mpsc;
use zano_gateway::{AgentGateway, ConversationId};

use crate::controller::{ConversationController, SendOutcome};
use crate::directory::{ConversationDirectory, MutationOutcome, ShareLink};
use crate::events::{ControllerEvent, Selection};

/// Wires the controller and the directory together and relays ids between them.
///
/// Holds only view-level state of its own: the drawer flag and the last selection
/// the controller reported.
pub struct ChatShell {
    controller: ConversationController,
    directory: ConversationDirectory,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    selection: Selection,
    drawer_open: bool,
}

impl ChatShell {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        let (controller, events) = ConversationController::new(gateway.clone());
        Self {
            controller,
            directory: ConversationDirectory::new(gateway),
            events,
            selection: Selection::Welcome,
            drawer_open: false,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn directory(&self) -> &ConversationDirectory {
        &self.directory
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn drawer_open(&self) -> bool {
        self.drawer_open
    }

    pub async fn mount(&mut self) -> Vec<ControllerEvent> {
        self.directory.list().await;
        self.pump_events().await
    }

    pub async fn new_chat(&mut self) -> Vec<ControllerEvent> {
        self.controller.select_conversation(None).await;
        self.directory.list().await;
        self.pump_events().await
    }

    pub async fn select(&mut self, conversation_id: ConversationId) -> Vec<ControllerEvent> {
        self.drawer_open = false;
        self.controller
            .select_conversation(Some(conversation_id))
            .await;
        self.pump_events().await
    }

    /// Sends `text` as the draft, creating a conversation when none is active.
    ///
    /// Events are drained once the send settles, so `selection()` never shows the
    /// placeholder. The returned events still carry `SelectionChanged(Starting(..))`
    /// first, and `controller().snapshot()` shows it while the send is in flight.
    pub async fn submit(&mut self, text: &str) -> (SendOutcome, Vec<ControllerEvent>) {
        self.controller.set_draft(text).await;
        let outcome = self.controller.submit_draft().await;
        (outcome, self.pump_events().await)
    }

    pub async fn rename(&mut self, conversation_id: &ConversationId, name: &str) -> MutationOutcome {
        self.directory.rename(conversation_id, name).await
    }

    /// Deletes a conversation and leaves it if it was on screen.
    pub async fn delete(&mut self, conversation_id: &ConversationId) -> MutationOutcome {
        let outcome = self.directory.delete(conversation_id).await;
        if outcome.is_applied() && self.controller.active_id().await.as_ref() == Some(conversation_id)
        {
            tracing::debug!(conversation_id = %conversation_id, "active conversation deleted; back to welcome");
            self.controller.select_conversation(None).await;
            self.pump_events().await;
        }
        outcome
    }

    pub fn share(&self, conversation_id: &ConversationId) -> Option<ShareLink> {
        self.directory.share(conversation_id)
    }

    pub fn toggle_drawer(&mut self) -> bool {
        self.drawer_open = !self.drawer_open;
        self.drawer_open
    }

    /// Drains controller events, following selection changes and listing newly created
    /// conversations. Returns the drained events for display.
    pub async fn pump_events(&mut self) -> Vec<ControllerEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match &event {
                ControllerEvent::SelectionChanged(selection) => {
                    self.selection = selection.clone();
                }
                ControllerEvent::ConversationCreated(conversation_id) => {
                    tracing::debug!(conversation_id = %conversation_id, "listing new conversation");
                    self.directory.list().await;
                }
                ControllerEvent::SendFailed { .. } | ControllerEvent::LoadFailed { .. } => {}
            }
            drained.push(event);
        }
        drained
    }
}
