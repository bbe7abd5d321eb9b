//! Prelude for convenient imports.

pub use crate::aggregate::{NodeView, SessionAggregate};
pub use crate::error::{RamifyError, Result};
pub use crate::relationships::{check_unlockable, RelationshipIndex, UnlockCheck, UnlockRule};
pub use crate::status::{NodeProgress, NodeState, Question, QuestionState};
pub use crate::types::{
    ChatHistory, ChatMessage, ChatRole, EdgeInfo, GeneratedNode, NodeInfo, Position,
};
