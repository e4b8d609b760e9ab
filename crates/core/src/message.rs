//! Turn and Conversation domain types.
//!
//! A conversation is the append-only log of everything said or done in one
//! session: passenger utterance → turn → dialogue loop → action turns →
//! assistant answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::{ActionRequest, ActionResult};

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Fixed instructions, created once per session
    System,
    /// The passenger
    User,
    /// A user-facing answer from the model
    Assistant,
    /// The model asking for an action to be run
    ActionRequest,
    /// The outcome of that action
    ActionResult,
}

/// What a turn carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TurnContent {
    Text(String),
    ActionRequest(ActionRequest),
    ActionResult(ActionResult),
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: TurnRole,

    /// The payload
    pub content: TurnContent,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn build(role: TurnRole, content: TurnContent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create the system-instructions turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::build(TurnRole::System, TurnContent::Text(content.into()))
    }

    /// Create a passenger turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::build(TurnRole::User, TurnContent::Text(content.into()))
    }

    /// Create an assistant answer turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::build(TurnRole::Assistant, TurnContent::Text(content.into()))
    }

    /// Record the model's request to run an action.
    pub fn action_request(request: ActionRequest) -> Self {
        Self::build(TurnRole::ActionRequest, TurnContent::ActionRequest(request))
    }

    /// Record the outcome of an action.
    pub fn action_result(result: ActionResult) -> Self {
        Self::build(TurnRole::ActionResult, TurnContent::ActionResult(result))
    }

    /// The text of a system/user/assistant turn.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Text that would be shown to the model for this turn.
    pub fn rendered(&self) -> String {
        match &self.content {
            TurnContent::Text(t) => t.clone(),
            TurnContent::ActionRequest(r) => r.raw_arguments.clone(),
            TurnContent::ActionResult(r) => r.content(),
        }
    }
}

/// The append-only turn log of one session.
///
/// The system turn is fixed at construction. Turns can only be appended;
/// there is no API to mutate or remove one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawConversation")]
pub struct Conversation {
    id: ConversationId,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Unchecked wire form of [`Conversation`].
#[derive(Deserialize)]
struct RawConversation {
    id: ConversationId,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RawConversation> for Conversation {
    type Error = String;

    /// Exactly one system turn, and it comes first.
    fn try_from(raw: RawConversation) -> Result<Self, Self::Error> {
        match raw.turns.first() {
            Some(turn) if turn.role == TurnRole::System => {}
            Some(_) => return Err("conversation must open with the system turn".into()),
            None => return Err("conversation has no system turn".into()),
        }
        if raw.turns[1..].iter().any(|t| t.role == TurnRole::System) {
            return Err("conversation has more than one system turn".into());
        }
        Ok(Self {
            id: raw.id,
            turns: raw.turns,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

impl Conversation {
    /// Start a conversation with the given system instructions.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            turns: vec![Turn::system(system_prompt)],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Append a turn. A second system turn is ignored.
    pub fn push(&mut self, turn: Turn) {
        if turn.role == TurnRole::System {
            tracing::warn!(conversation_id = %self.id, "Ignoring attempt to append a second system turn");
            return;
        }
        self.updated_at = Utc::now();
        self.turns.push(turn);
    }

    /// All turns in order, system turn first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The fixed system turn.
    pub fn system(&self) -> &Turn {
        &self.turns[0]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true: the system turn is always present.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The prompt window: the system turn plus the most recent `max_turns`
    /// non-system turns, oldest dropped first.
    ///
    /// An action result whose request fell outside the window is dropped as
    /// well, so the window never opens on an unanswered result.
    pub fn window(&self, max_turns: usize) -> Vec<Turn> {
        let rest = &self.turns[1..];
        let mut start = rest.len().saturating_sub(max_turns);
        while start < rest.len() && rest[start].role == TurnRole::ActionResult {
            start += 1;
        }

        let mut window = Vec::with_capacity(rest.len() - start + 1);
        window.push(self.turns[0].clone());
        window.extend_from_slice(&rest[start..]);
        window
    }

    /// Rough token estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(|t| t.rendered().len() / 4).sum()
    }
}
