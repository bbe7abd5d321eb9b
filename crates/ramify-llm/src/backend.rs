//! Core LLM backend trait.

use crate::types::{Message, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// LLM-related errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Parsing failed: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Timeout after {0} seconds")]
    Timeout(u32),
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Configuration for LLM requests.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/identifier.
    pub model: String,
    /// Secondary model to retry with when the primary fails.
    pub backup_model: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            backup_model: None,
            max_tokens: 2000,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Create config for Claude.
    pub fn claude() -> Self {
        Self {
            model: "claude-3-7-sonnet-20250219".to_string(),
            backup_model: Some("claude-3-5-sonnet-20241022".to_string()),
            max_tokens: 2000,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the backup model.
    pub fn with_backup_model(mut self, model: impl Into<String>) -> Self {
        self.backup_model = Some(model.into());
        self
    }

    /// Set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Core trait for LLM backends.
///
/// Two call shapes: free-text generation (questions, evaluations, chat) and
/// structured tool generation (node creation). Structured calls resolve to
/// `Ok(None)` when the provider returned no usable structured payload, so
/// the caller's fallback logic never has to inspect provider shapes.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Get the current configuration.
    fn config(&self) -> &LlmConfig;

    /// Generate free text for a prompt.
    async fn generate_text(&self, prompt: &str, system: Option<&str>) -> LlmResult<String>;

    /// Generate a structured payload constrained by a tool schema.
    async fn generate_structured(
        &self,
        prompt: &str,
        tool: &ToolSpec,
        system: Option<&str>,
    ) -> LlmResult<Option<Value>>;

    /// Generate the next assistant turn in a multi-turn conversation.
    async fn converse(&self, messages: &[Message], system: Option<&str>) -> LlmResult<String>;
}

/// A scriptable backend for testing.
///
/// Outcomes are queues drained front-to-back: push a `None` structured
/// outcome to simulate a provider that answered without a tool payload, or
/// construct with [`MockBackend::failing`] to error on every call. An
/// exhausted queue yields empty output, which exercises the same fallback
/// paths as a malformed response.
pub struct MockBackend {
    config: LlmConfig,
    fail: bool,
    text: Mutex<VecDeque<String>>,
    structured: Mutex<VecDeque<Option<Value>>>,
}

impl MockBackend {
    /// Create a mock that yields empty output for every call.
    pub fn new() -> Self {
        Self {
            config: LlmConfig::default().with_model("mock"),
            fail: false,
            text: Mutex::new(VecDeque::new()),
            structured: Mutex::new(VecDeque::new()),
        }
    }

    /// Create a mock where every call errors.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Queue a free-text response (also consumed by `converse`).
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.text.lock().expect("mock poisoned").push_back(text.into());
        self
    }

    /// Queue a structured outcome; `None` simulates "no structured output".
    pub fn with_structured(self, value: Option<Value>) -> Self {
        self.structured
            .lock()
            .expect("mock poisoned")
            .push_back(value);
        self
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn generate_text(&self, _prompt: &str, _system: Option<&str>) -> LlmResult<String> {
        if self.fail {
            return Err(LlmError::ApiError("mock failure".to_string()));
        }
        Ok(self
            .text
            .lock()
            .expect("mock poisoned")
            .pop_front()
            .unwrap_or_default())
    }

    async fn generate_structured(
        &self,
        _prompt: &str,
        _tool: &ToolSpec,
        _system: Option<&str>,
    ) -> LlmResult<Option<Value>> {
        if self.fail {
            return Err(LlmError::ApiError("mock failure".to_string()));
        }
        Ok(self
            .structured
            .lock()
            .expect("mock poisoned")
            .pop_front()
            .flatten())
    }

    async fn converse(&self, _messages: &[Message], _system: Option<&str>) -> LlmResult<String> {
        if self.fail {
            return Err(LlmError::ApiError("mock failure".to_string()));
        }
        Ok(self
            .text
            .lock()
            .expect("mock poisoned")
            .pop_front()
            .unwrap_or_default())
    }
}
