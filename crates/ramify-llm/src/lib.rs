//! # Ramify LLM
//!
//! The generative-text collaborator behind Ramify's mind-map generation,
//! question authoring, answer grading, and tutor chat.
//!
//! Two call shapes are exposed on [`LlmBackend`]: free-text generation
//! (questions, evaluations, chat) and structured tool generation (root and
//! child node creation). Structured calls return `Ok(None)` when the
//! provider produced no usable structured payload — callers treat that as
//! the signal to fall back to deterministic content, never as an error to
//! propagate.
//!
//! ## Features
//!
//! - `api`: Anthropic Claude backend over HTTPS
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ramify_llm::{ClaudeBackend, LlmBackend};
//!
//! let backend = ClaudeBackend::from_env()?;
//! let text = backend.generate_text("Say hello", None).await?;
//! ```

mod backend;
mod prompt;
mod types;

pub use backend::{LlmBackend, LlmConfig, LlmError, LlmResult, MockBackend};
pub use prompt::{
    child_nodes_tool, mindmap_tool, parse_evaluation_json, parse_questions_json,
    ChildNodesPrompt, EvaluationPrompt, PromptTemplate, QuestionPrompt, RawEvaluation,
    RootNodePrompt, TutorChatPrompt,
};
pub use types::{ContextNode, Message, Role, ToolSpec};

#[cfg(feature = "api")]
mod claude;
#[cfg(feature = "api")]
pub use claude::ClaudeBackend;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{LlmBackend, LlmConfig, LlmError, LlmResult, MockBackend};
    pub use crate::{ContextNode, Message, Role, ToolSpec};

    #[cfg(feature = "api")]
    pub use crate::ClaudeBackend;
}
