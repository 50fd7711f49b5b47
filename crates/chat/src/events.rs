use zano_gateway::ConversationId;

/// What the main panel is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// No conversation yet; the next send creates one.
    #[default]
    Welcome,
    /// First message is in flight under a transient placeholder id.
    Starting(ConversationId),
    /// A backend-confirmed conversation.
    Active(ConversationId),
}

impl Selection {
    /// The confirmed conversation id, never a placeholder.
    pub fn active_id(&self) -> Option<&ConversationId> {
        match self {
            Self::Active(conversation_id) => Some(conversation_id),
            Self::Welcome | Self::Starting(_) => None,
        }
    }

    /// Whatever id is displayed, placeholder included.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Self::Active(conversation_id) | Self::Starting(conversation_id) => {
                Some(conversation_id)
            }
            Self::Welcome => None,
        }
    }

    pub fn is_welcome(&self) -> bool {
        matches!(self, Self::Welcome)
    }
}

/// Emitted by the controller so the shell can follow selection changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    SelectionChanged(Selection),
    /// The backend assigned an id to a new conversation.
    ///
    /// Sent even when the user has already moved elsewhere, so the directory can re-list.
    ConversationCreated(ConversationId),
    /// A send was rolled back; `text` is back in the draft.
    SendFailed { text: String, error: String },
    LoadFailed {
        conversation_id: ConversationId,
        error: String,
    },
}
