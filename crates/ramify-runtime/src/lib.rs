//! # Ramify Runtime
//!
//! Orchestration for Ramify mind-map sessions:
//!
//! - [`generator`] — turn a topic into a tree of concept nodes, breadth
//!   first, with bounded retries and deterministic fallbacks
//! - [`layout`] — depth-layered initial layout and semicircular placement
//!   for on-demand child expansion
//! - [`assess`] — question generation and rubric grading with fallbacks
//! - [`chat`] — the per-node tutor chat
//! - [`store`] — the session store abstraction and its in-memory backend
//! - [`service`] — the operation facade the transport layer calls
//!
//! Upstream LLM failures are absorbed at the generator/assessment boundary
//! and converted into deterministic fallback content; the service layer only
//! surfaces not-found and invalid-input conditions.

pub mod assess;
pub mod chat;
pub mod generator;
pub mod layout;
pub mod service;
pub mod store;

pub use assess::{AssessmentEngine, Evaluation, PASS_THRESHOLD};
pub use chat::TutorChat;
pub use generator::{GeneratorConfig, MindmapGenerator};
pub use layout::{layered_layout, semicircle_positions, GraphSnapshot, PlacedNode};
pub use service::{
    AnswerOutcome, GraphNodeInput, QuestionSet, SessionData, SessionService, UnlockReport,
};
pub use store::{MemoryStore, SessionStore};
