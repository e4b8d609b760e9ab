//! Action executor: turns an [`ActionRequest`] into an [`ActionResult`].
//!
//! Nothing escapes this boundary. Bad JSON, unknown names, argument
//! validation failures, handler errors and timeouts all come back as a
//! failed result the model can read and recover from.

use chrono::Utc;
use ridedesk_core::action::{ActionRegistry, ActionRequest, ActionResult};
use ridedesk_core::error::ActionError;
use ridedesk_core::event::{DomainEvent, EventBus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct ActionExecutor {
    registry: Arc<ActionRegistry>,
    timeout: Duration,
    event_bus: Arc<EventBus>,
}

impl ActionExecutor {
    pub fn new(registry: Arc<ActionRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(30),
            event_bus,
        }
    }

    /// Per-action execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub async fn execute(&self, request: &ActionRequest) -> ActionResult {
        let start = Instant::now();
        let outcome = self.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => debug!(action = %request.action_name, duration_ms, "Action succeeded"),
            Err(ActionError::ExecutionFailed { cause, .. }) => {
                warn!(action = %request.action_name, cause = %cause, "Action failed")
            }
            Err(e) => warn!(action = %request.action_name, error = %e, "Action refused"),
        }

        self.event_bus.publish(DomainEvent::ActionExecuted {
            action_name: request.action_name.clone(),
            success: outcome.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        match outcome {
            Ok(text) => ActionResult::success(request, text),
            Err(e) => ActionResult::failure(request, e),
        }
    }

    async fn run(&self, request: &ActionRequest) -> Result<String, ActionError> {
        let name = request.action_name.as_str();

        let action = self
            .registry
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction {
                action_name: name.to_string(),
            })?;

        let arguments: serde_json::Value = serde_json::from_str(&request.raw_arguments)
            .map_err(|e| ActionError::malformed(name, format!("arguments are not valid JSON: {e}")))?;
        if !arguments.is_object() {
            return Err(ActionError::malformed(name, "arguments must be a JSON object"));
        }

        match tokio::time::timeout(self.timeout, action.execute(arguments)).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::failed(
                name,
                format!("timed out after {}s", self.timeout.as_secs_f32()),
            )),
        }
    }
}
