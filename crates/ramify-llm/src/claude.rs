//! Claude backend for the Anthropic API.
//!
//! Requires the `api` feature and an Anthropic API key. Every call retries
//! once on the configured backup model when the primary model fails.

use crate::backend::{LlmBackend, LlmConfig, LlmError, LlmResult};
use crate::types::{Message, Role, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude API request.
#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ClaudeTool>>,
}

#[derive(Debug, Clone, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: Value,
}

impl From<&ToolSpec> for ClaudeTool {
    fn from(tool: &ToolSpec) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
        }
    }
}

/// Claude API response.
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

/// One content block in a response. The provider may interleave text and
/// tool-use blocks; the adapter picks out whichever shape the caller asked
/// for, so business logic never sees this type.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ClaudeApiError {
    error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
    message: String,
}

/// Claude backend for the Anthropic API.
///
/// # Example
///
/// ```rust,ignore
/// use ramify_llm::{ClaudeBackend, LlmBackend};
///
/// let backend = ClaudeBackend::from_env()?;
/// let text = backend.generate_text("Explain osmosis briefly", None).await?;
/// ```
pub struct ClaudeBackend {
    api_key: String,
    config: LlmConfig,
    client: reqwest::Client,
}

impl ClaudeBackend {
    /// Create a new Claude backend.
    pub fn new(api_key: &str) -> LlmResult<Self> {
        Self::with_config(api_key, LlmConfig::claude())
    }

    /// Create with custom config.
    pub fn with_config(api_key: &str, config: LlmConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            config,
            client,
        })
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> LlmResult<Self> {
        let api_key =
            std::env::var("ANTHROPIC_API_KEY").map_err(|_| LlmError::AuthenticationFailed)?;
        Self::new(&api_key)
    }

    /// Set the model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    /// Make one request against a specific model.
    async fn request(
        &self,
        model: &str,
        messages: &[ClaudeMessage],
        system: Option<&str>,
        tools: Option<&[ClaudeTool]>,
    ) -> LlmResult<Vec<ContentBlock>> {
        let request = ClaudeRequest {
            model: model.to_string(),
            max_tokens: self.config.max_tokens,
            system: system.map(|s| s.to_string()),
            messages: messages.to_vec(),
            temperature: self.config.temperature,
            tools: tools.map(|t| t.to_vec()),
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::ConnectionFailed("Cannot connect to Anthropic API".to_string())
                } else if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_secs)
                } else {
                    LlmError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 {
                return Err(LlmError::AuthenticationFailed);
            }
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(60));
            }

            let detail = serde_json::from_str::<ClaudeApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::ApiError(format!(
                "Claude API error {}: {}",
                status, detail
            )));
        }

        let resp: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(resp.content)
    }

    /// Request with a single backup-model retry on primary failure.
    async fn request_with_fallback(
        &self,
        messages: Vec<ClaudeMessage>,
        system: Option<&str>,
        tools: Option<Vec<ClaudeTool>>,
    ) -> LlmResult<Vec<ContentBlock>> {
        match self
            .request(&self.config.model, &messages, system, tools.as_deref())
            .await
        {
            Ok(blocks) => Ok(blocks),
            Err(primary_err) => {
                let Some(backup) = self.config.backup_model.as_deref() else {
                    return Err(primary_err);
                };
                warn!(
                    model = %self.config.model,
                    backup = %backup,
                    error = %primary_err,
                    "primary model failed, retrying with backup"
                );
                self.request(backup, &messages, system, tools.as_deref())
                    .await
            }
        }
    }
}

fn to_claude_messages(messages: &[Message]) -> Vec<ClaudeMessage> {
    messages
        .iter()
        .map(|m| ClaudeMessage {
            role: match m.role {
                Role::User => "user".to_string(),
                Role::Assistant => "assistant".to_string(),
            },
            content: m.content.clone(),
        })
        .collect()
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    fn name(&self) -> &str {
        "claude"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn generate_text(&self, prompt: &str, system: Option<&str>) -> LlmResult<String> {
        let messages = vec![ClaudeMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];
        let blocks = self.request_with_fallback(messages, system, None).await?;

        blocks
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .ok_or_else(|| LlmError::InvalidResponse("No text content in response".to_string()))
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        tool: &ToolSpec,
        system: Option<&str>,
    ) -> LlmResult<Option<Value>> {
        let messages = vec![ClaudeMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];
        let tools = vec![ClaudeTool::from(tool)];
        let blocks = self
            .request_with_fallback(messages, system, Some(tools))
            .await?;

        // No tool-use block is a valid outcome: the caller decides whether
        // to fall back or retry.
        Ok(blocks.into_iter().find_map(|block| match block {
            ContentBlock::ToolUse { input } => Some(input),
            _ => None,
        }))
    }

    async fn converse(&self, messages: &[Message], system: Option<&str>) -> LlmResult<String> {
        let blocks = self
            .request_with_fallback(to_claude_messages(messages), system, None)
            .await?;

        blocks
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .ok_or_else(|| LlmError::InvalidResponse("No text content in response".to_string()))
    }
}
