use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use zano_gateway::{AgentGateway, ConversationId, MessageId, MessageRecord, SendRequest};

use crate::events::{ControllerEvent, Selection};

/// Lifecycle of the main panel.
///
/// ```text
/// WELCOME  --send_first_message-->  CREATING
/// CREATING --success-->             ACTIVE
/// CREATING --failure-->             WELCOME
/// ACTIVE   --select_conversation--> LOADING
/// LOADING  --fetch settles-->       ACTIVE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerPhase {
    #[default]
    Welcome,
    Creating,
    Active,
    Loading,
}

/// Result of one send request from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was sent: blank text, or no conversation that can take it.
    Skipped,
    Delivered,
    /// The backend call failed and the optimistic state was undone.
    RolledBack,
}

/// Point-in-time copy of everything the main panel renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerSnapshot {
    pub selection: Selection,
    pub phase: ControllerPhase,
    pub messages: Vec<MessageRecord>,
    pub pending: bool,
    pub draft: String,
}

impl ControllerSnapshot {
    pub fn active_id(&self) -> Option<&ConversationId> {
        self.selection.active_id()
    }
}

#[derive(Debug)]
struct InFlightSend {
    /// Issue order across the whole controller.
    sequence: u64,
    message: MessageRecord,
    /// Conversation the send targets; the placeholder for a first message.
    conversation_id: ConversationId,
}

#[derive(Debug, Clone, Copy)]
struct FetchTicket {
    epoch: u64,
    sequence: u64,
}

/// Input text. Failed sends come back in issue order, ahead of anything typed since.
#[derive(Debug, Default)]
struct Draft {
    returned: Vec<(u64, String)>,
    typed: String,
}

impl Draft {
    fn set(&mut self, text: String) {
        self.returned.clear();
        self.typed = text;
    }

    fn clear(&mut self) {
        self.returned.clear();
        self.typed.clear();
    }

    fn give_back(&mut self, sequence: u64, text: &str) {
        let at = self
            .returned
            .partition_point(|(issued, _)| *issued < sequence);
        self.returned.insert(at, (sequence, text.to_string()));
    }

    fn text(&self) -> String {
        if self.returned.is_empty() {
            return self.typed.clone();
        }
        self.returned
            .iter()
            .map(|(_, text)| text.as_str())
            .chain((!self.typed.trim().is_empty()).then_some(self.typed.as_str()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Wakes the next queued send of the same conversation when dropped.
struct TurnGuard(Option<oneshot::Sender<()>>);

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if let Some(done_tx) = self.0.take() {
            let _ = done_tx.send(());
        }
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    selection: Selection,
    phase: ControllerPhase,
    messages: Vec<MessageRecord>,
    draft: Draft,
    /// Bumped by every selection change; responses tagged with an older epoch are stale.
    epoch: u64,
    issued_fetches: u64,
    applied_fetch: u64,
    issued_sends: u64,
    in_flight: Vec<InFlightSend>,
    /// Completion signal of the most recently queued send per conversation.
    turns: HashMap<ConversationId, oneshot::Receiver<()>>,
}

impl ControllerState {
    fn pending(&self) -> bool {
        let Some(current) = self.selection.conversation_id() else {
            return false;
        };
        self.in_flight
            .iter()
            .any(|send| &send.conversation_id == current)
    }

    fn issue_fetch(&mut self) -> FetchTicket {
        self.issued_fetches += 1;
        FetchTicket {
            epoch: self.epoch,
            sequence: self.issued_fetches,
        }
    }

    /// A fetch lands only for the current selection and only if nothing newer landed first.
    fn accepts(&self, ticket: FetchTicket) -> bool {
        ticket.epoch == self.epoch && ticket.sequence > self.applied_fetch
    }

    /// Registers a send turn synchronously so queue order equals issue order.
    fn enqueue_turn(
        &mut self,
        conversation_id: &ConversationId,
    ) -> (Option<oneshot::Receiver<()>>, TurnGuard) {
        let (done_tx, done_rx) = oneshot::channel();
        let previous = self.turns.insert(conversation_id.clone(), done_rx);
        (previous, TurnGuard(Some(done_tx)))
    }

    fn track_send(&mut self, message: MessageRecord, conversation_id: ConversationId) -> u64 {
        self.issued_sends += 1;
        self.in_flight.push(InFlightSend {
            sequence: self.issued_sends,
            message,
            conversation_id,
        });
        self.issued_sends
    }

    /// Drops the send from the in-flight set, and its conversation's turn once idle.
    fn finish_send(&mut self, message_id: &MessageId) {
        let Some(position) = self
            .in_flight
            .iter()
            .position(|send| &send.message.id == message_id)
        else {
            return;
        };
        let finished = self.in_flight.remove(position);
        if !self
            .in_flight
            .iter()
            .any(|send| send.conversation_id == finished.conversation_id)
        {
            self.turns.remove(&finished.conversation_id);
        }
    }

    /// Optimistic entries for sends to `conversation_id` that are still in flight.
    fn unconfirmed_for(&self, conversation_id: &ConversationId) -> Vec<MessageRecord> {
        self.in_flight
            .iter()
            .filter(|send| &send.conversation_id == conversation_id)
            .map(|send| send.message.clone())
            .collect()
    }

    fn settle_loading(&mut self) {
        if self.phase == ControllerPhase::Loading {
            self.phase = ControllerPhase::Active;
        }
    }

    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            selection: self.selection.clone(),
            phase: self.phase,
            messages: self.messages.clone(),
            pending: self.pending(),
            draft: self.draft.text(),
        }
    }
}

/// Owns the displayed conversation, its messages, and the draft.
///
/// Every backend call runs without holding the state lock. Results are applied only if
/// the selection they were issued under is still current.
pub struct ConversationController {
    gateway: Arc<dyn AgentGateway>,
    state: Mutex<ControllerState>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl ConversationController {
    pub fn new(
        gateway: Arc<dyn AgentGateway>,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                gateway,
                state: Mutex::new(ControllerState::default()),
                events,
            },
            events_rx,
        )
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn selection(&self) -> Selection {
        self.state.lock().await.selection.clone()
    }

    pub async fn active_id(&self) -> Option<ConversationId> {
        self.state.lock().await.selection.active_id().cloned()
    }

    pub async fn phase(&self) -> ControllerPhase {
        self.state.lock().await.phase
    }

    pub async fn messages(&self) -> Vec<MessageRecord> {
        self.state.lock().await.messages.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.state.lock().await.pending()
    }

    pub async fn draft(&self) -> String {
        self.state.lock().await.draft.text()
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().await.draft.set(text.into());
    }

    /// Shows `conversation_id`, or the welcome screen for `None`.
    ///
    /// The message fetch replaces local state wholesale when it lands, unless the user
    /// has selected something else in the meantime.
    pub async fn select_conversation(&self, conversation_id: Option<ConversationId>) {
        if conversation_id
            .as_ref()
            .is_some_and(ConversationId::is_placeholder)
        {
            tracing::warn!(
                conversation_id = ?conversation_id,
                "refusing to select a placeholder conversation id"
            );
            return;
        }

        let mut state = self.state.lock().await;
        state.epoch += 1;

        let Some(conversation_id) = conversation_id else {
            state.selection = Selection::Welcome;
            state.phase = ControllerPhase::Welcome;
            state.messages.clear();
            self.emit(ControllerEvent::SelectionChanged(Selection::Welcome));
            return;
        };

        if state.selection.active_id() != Some(&conversation_id) {
            state.messages.clear();
        }
        state.selection = Selection::Active(conversation_id.clone());
        state.phase = ControllerPhase::Loading;
        self.emit(ControllerEvent::SelectionChanged(state.selection.clone()));
        let ticket = state.issue_fetch();
        drop(state);

        self.fetch_and_apply(&conversation_id, ticket).await;
    }

    /// Sends `text` to the active conversation with an optimistic user entry.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Skipped;
        }

        let mut state = self.state.lock().await;
        let conversation_id = match state.selection.clone() {
            Selection::Active(conversation_id) => conversation_id,
            Selection::Starting(placeholder) => {
                tracing::warn!(
                    placeholder = %placeholder,
                    "conversation is still being created; keeping message as draft"
                );
                state.draft.set(text.to_string());
                return SendOutcome::Skipped;
            }
            Selection::Welcome => {
                tracing::debug!("no active conversation; first message must create one");
                return SendOutcome::Skipped;
            }
        };

        let message = MessageRecord::optimistic_user(text);
        let message_id = message.id.clone();
        state.messages.push(message.clone());
        let sequence = state.track_send(message, conversation_id.clone());
        state.draft.clear();
        let (previous_turn, turn) = state.enqueue_turn(&conversation_id);
        drop(state);

        if let Some(previous_turn) = previous_turn {
            // A dropped sender also means the previous turn is over.
            let _ = previous_turn.await;
        }

        let result = self
            .gateway
            .send_message(SendRequest::new(text, Some(conversation_id.clone())))
            .await;
        drop(turn);

        match result {
            Ok(reply) => {
                tracing::debug!(
                    conversation_id = %conversation_id,
                    reply_chars = reply.response.as_deref().map_or(0, str::len),
                    "agent turn completed"
                );

                let mut state = self.state.lock().await;
                state.finish_send(&message_id);
                if state.selection.active_id() != Some(&conversation_id) {
                    tracing::debug!(
                        conversation_id = %conversation_id,
                        "conversation no longer displayed; skipping reconciliation"
                    );
                    return SendOutcome::Delivered;
                }
                let ticket = state.issue_fetch();
                drop(state);

                self.fetch_and_apply(&conversation_id, ticket).await;
                SendOutcome::Delivered
            }
            Err(error) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    stage = error.stage(),
                    error = %error,
                    "send failed; rolling back optimistic message"
                );

                let mut state = self.state.lock().await;
                state.finish_send(&message_id);
                state.messages.retain(|message| message.id != message_id);
                state.draft.give_back(sequence, text);
                self.emit(ControllerEvent::SendFailed {
                    text: text.to_string(),
                    error: error.to_string(),
                });
                SendOutcome::RolledBack
            }
        }
    }

    /// Sends the message that creates a conversation from the welcome screen.
    ///
    /// A placeholder id is exposed right away and replaced by the backend id on success.
    pub async fn send_first_message(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Skipped;
        }

        let mut state = self.state.lock().await;
        if !state.selection.is_welcome() {
            tracing::debug!(
                selection = ?state.selection,
                "first message requested outside welcome mode; ignoring"
            );
            return SendOutcome::Skipped;
        }

        state.epoch += 1;
        let epoch = state.epoch;
        let placeholder = ConversationId::placeholder();
        let message = MessageRecord::optimistic_user(text);
        let message_id = message.id.clone();
        state.messages = vec![message.clone()];
        let sequence = state.track_send(message, placeholder.clone());
        state.draft.clear();
        state.selection = Selection::Starting(placeholder.clone());
        state.phase = ControllerPhase::Creating;
        self.emit(ControllerEvent::SelectionChanged(state.selection.clone()));
        drop(state);

        let result = self.gateway.send_message(SendRequest::new(text, None)).await;

        match result {
            Ok(reply) => {
                let conversation_id = reply.conversation_id;
                tracing::info!(
                    conversation_id = %conversation_id,
                    placeholder = %placeholder,
                    "backend created conversation"
                );

                let mut state = self.state.lock().await;
                state.finish_send(&message_id);
                self.emit(ControllerEvent::ConversationCreated(conversation_id.clone()));
                if state.epoch != epoch {
                    tracing::debug!(
                        conversation_id = %conversation_id,
                        "selection changed while creating; not promoting"
                    );
                    return SendOutcome::Delivered;
                }

                state.selection = Selection::Active(conversation_id.clone());
                state.phase = ControllerPhase::Active;
                self.emit(ControllerEvent::SelectionChanged(state.selection.clone()));
                let ticket = state.issue_fetch();
                drop(state);

                self.fetch_and_apply(&conversation_id, ticket).await;
                SendOutcome::Delivered
            }
            Err(error) => {
                tracing::warn!(
                    placeholder = %placeholder,
                    stage = error.stage(),
                    error = %error,
                    "conversation creation failed; returning to welcome"
                );

                let mut state = self.state.lock().await;
                state.finish_send(&message_id);
                state.draft.give_back(sequence, text);
                self.emit(ControllerEvent::SendFailed {
                    text: text.to_string(),
                    error: error.to_string(),
                });
                if state.epoch == epoch {
                    state.messages.clear();
                    state.selection = Selection::Welcome;
                    state.phase = ControllerPhase::Welcome;
                    self.emit(ControllerEvent::SelectionChanged(Selection::Welcome));
                }
                SendOutcome::RolledBack
            }
        }
    }

    /// Sends the current draft through whichever operation fits the current phase.
    pub async fn submit_draft(&self) -> SendOutcome {
        let (draft, phase) = {
            let state = self.state.lock().await;
            (state.draft.text(), state.phase)
        };

        match phase {
            ControllerPhase::Welcome => self.send_first_message(&draft).await,
            ControllerPhase::Active | ControllerPhase::Loading => self.send_message(&draft).await,
            ControllerPhase::Creating => {
                tracing::debug!("submit ignored while the conversation is being created");
                SendOutcome::Skipped
            }
        }
    }

    async fn fetch_and_apply(&self, conversation_id: &ConversationId, ticket: FetchTicket) {
        let result = self.gateway.fetch_messages(conversation_id).await;

        let mut state = self.state.lock().await;
        if !state.accepts(ticket) {
            tracing::debug!(
                conversation_id = %conversation_id,
                epoch = ticket.epoch,
                current_epoch = state.epoch,
                "discarding stale message fetch"
            );
            return;
        }

        match result {
            Ok(mut messages) => {
                state.applied_fetch = ticket.sequence;
                messages.extend(state.unconfirmed_for(conversation_id));
                state.messages = messages;
                state.settle_loading();
            }
            Err(error) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    stage = error.stage(),
                    error = %error,
                    "failed to fetch messages"
                );
                state.settle_loading();
                self.emit(ControllerEvent::LoadFailed {
                    conversation_id: conversation_id.clone(),
                    error: error.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // Nobody listening is fine: the shell may have been torn down.
        let _ = self.events.send(event);
    }
}
