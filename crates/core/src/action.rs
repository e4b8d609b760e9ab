//! Action trait: the side-effecting capabilities the model may request.
//!
//! Actions are how the agent acts on the passenger's behalf: resolving an
//! address to coordinates, creating a reservation. The model never runs
//! them directly; it asks, and the executor decides.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ActionError;

/// Declares one callable action to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Unique action name
    pub name: String,

    /// What the action does (sent to the model to aid selection)
    pub description: String,

    /// JSON Schema describing the action's parameters
    pub parameters: serde_json::Value,
}

/// The model's request to invoke an action mid-turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Provider correlation id (matches the model's tool call id)
    pub call_id: String,

    /// Name of the action to execute
    pub action_name: String,

    /// The unparsed argument payload exactly as the model produced it
    pub raw_arguments: String,
}

impl ActionRequest {
    pub fn new(
        call_id: impl Into<String>,
        action_name: impl Into<String>,
        raw_arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            action_name: action_name.into(),
            raw_arguments: raw_arguments.into(),
        }
    }
}

/// Outcome of executing an [`ActionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// The call id this result answers
    pub call_id: String,

    /// The action that ran (or was refused)
    pub action_name: String,

    /// Result text on success, typed failure otherwise
    pub outcome: Result<String, ActionError>,
}

impl ActionResult {
    pub fn success(request: &ActionRequest, text: impl Into<String>) -> Self {
        Self {
            call_id: request.call_id.clone(),
            action_name: request.action_name.clone(),
            outcome: Ok(text.into()),
        }
    }

    pub fn failure(request: &ActionRequest, error: ActionError) -> Self {
        Self {
            call_id: request.call_id.clone(),
            action_name: request.action_name.clone(),
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The content fed back to the model.
    pub fn content(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(e) => e.conversational(),
        }
    }
}

/// The core Action trait.
///
/// Each action parses its own arguments strictly (see [`parse_arguments`])
/// and returns the text the model should see.
#[async_trait]
pub trait Action: Send + Sync {
    /// The unique name of this action (e.g., "geocode").
    fn name(&self) -> &str;

    /// A description of what this action does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this action's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the action with already-decoded JSON arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError>;

    /// Convert this action into a descriptor for sending to the model.
    fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Decode action arguments into a typed struct, rejecting anything that
/// does not conform.
pub fn parse_arguments<T: DeserializeOwned>(
    action_name: &str,
    arguments: serde_json::Value,
) -> Result<T, ActionError> {
    serde_json::from_value(arguments).map_err(|e| ActionError::malformed(action_name, e.to_string()))
}

/// The fixed set of actions available to a session.
///
/// The dialogue loop uses this to:
/// 1. Get descriptors to send to the model
/// 2. Look up the handler when the model requests an action
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
    order: Vec<String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register an action. Replaces any existing action with the same name.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        if self.actions.insert(name.clone(), action).is_none() {
            self.order.push(name);
        }
    }

    /// Get an action by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// All descriptors, in registration order.
    pub fn descriptors(&self) -> Vec<ActionDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.actions.get(name))
            .map(|a| a.descriptor())
            .collect()
    }

    /// Registered action names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
