//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing `/v1/chat/completions` with
//! tool calling (OpenRouter, vLLM, Ollama, ...).
//!
//! Turn mapping:
//! - system / user / assistant turns → messages with the same role
//! - action-request turn → assistant message carrying one `tool_calls` entry
//! - action-result turn → `tool` message answering that call id

use async_trait::async_trait;
use ridedesk_core::action::{ActionDescriptor, ActionRequest};
use ridedesk_core::error::ProviderError;
use ridedesk_core::message::{Turn, TurnContent, TurnRole};
use ridedesk_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible chat-completions provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Convert turns to OpenAI API messages.
    fn to_api_messages(turns: &[Turn]) -> Vec<ApiMessage> {
        turns
            .iter()
            .map(|turn| match &turn.content {
                TurnContent::Text(text) => ApiMessage {
                    role: match turn.role {
                        TurnRole::System => "system",
                        TurnRole::User => "user",
                        _ => "assistant",
                    }
                    .into(),
                    content: Some(text.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                TurnContent::ActionRequest(request) => ApiMessage {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(vec![ApiToolCall {
                        id: request.call_id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: request.action_name.clone(),
                            arguments: request.raw_arguments.clone(),
                        },
                    }]),
                    tool_call_id: None,
                },
                TurnContent::ActionResult(result) => ApiMessage {
                    role: "tool".into(),
                    content: Some(result.content()),
                    tool_calls: None,
                    tool_call_id: Some(result.call_id.clone()),
                },
            })
            .collect()
    }

    /// Convert action descriptors to OpenAI tool definitions.
    fn to_api_tools(actions: &[ActionDescriptor]) -> Vec<ApiToolDefinition> {
        actions
            .iter()
            .map(|a| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: a.name.clone(),
                    description: a.description.clone(),
                    parameters: a.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the request body for a completion call.
    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let params = &request.params;
        let mut body = serde_json::json!({
            "model": params.model,
            "messages": Self::to_api_messages(&request.turns),
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "top_p": params.top_p,
            "frequency_penalty": params.frequency_penalty,
            "presence_penalty": params.presence_penalty,
        });

        if !request.actions.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.actions));
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    /// Classify the first choice of a response.
    fn classify(api_response: ApiResponse) -> Result<CompletionOutcome, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        if let Some(reason) = choice.finish_reason.as_deref() {
            if reason == "length" {
                warn!(model = %api_response.model, "Completion truncated at max_tokens");
            }
        }

        let requests: Vec<ActionRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let call_id = if tc.id.is_empty() {
                    format!("call_{}", uuid::Uuid::new_v4().simple())
                } else {
                    tc.id
                };
                ActionRequest::new(call_id, tc.function.name, tc.function.arguments)
            })
            .collect();

        Ok(CompletionOutcome::classify(choice.message.content, requests))
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionOutcome, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.params.model,
            turns = request.turns.len(),
            actions = request.actions.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        if let Some(usage) = &api_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        Self::classify(api_response)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "default_tool_type")]
    r#type: String,
    function: ApiFunction,
}

fn default_tool_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
