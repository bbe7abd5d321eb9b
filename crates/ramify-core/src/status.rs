//! The per-node progress state machine.
//!
//! A node moves `locked → not_started → in_progress → completed`, driven by
//! answer submissions. Completion is monotonic: once `completed`, no answer
//! submission demotes the node — only an explicit regenerate (which archives
//! the old question set) or a manual override can.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{RamifyError, Result};

/// Lifecycle status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Locked,
    NotStarted,
    InProgress,
    Completed,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Locked => "locked",
            NodeState::NotStarted => "not_started",
            NodeState::InProgress => "in_progress",
            NodeState::Completed => "completed",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeState {
    type Err = RamifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "locked" => Ok(NodeState::Locked),
            "not_started" => Ok(NodeState::NotStarted),
            "in_progress" => Ok(NodeState::InProgress),
            "completed" => Ok(NodeState::Completed),
            other => Err(RamifyError::invalid_status(other)),
        }
    }
}

/// Outcome of the latest attempt at a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    NotAttempted,
    Passed,
    Failed,
}

/// An assessment item bound to one node. Mutated in place on each answer
/// submission; never deleted, only archived by a regenerate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "status")]
    pub state: QuestionState,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<u8>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn new(text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            state: QuestionState::NotAttempted,
            attempts: 0,
            last_answer: None,
            feedback: None,
            grade: None,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.state == QuestionState::Passed
    }
}

/// Progress record attached 1:1 to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeProgress {
    pub node_id: String,
    #[serde(rename = "status")]
    pub state: NodeState,
    pub questions: Vec<Question>,
    /// Cached result of the last unlock check. Not authoritative — the
    /// unlock predicate evaluated against current statuses is.
    pub unlockable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Question set archived by the last regenerate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<NodeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NodeProgress {
    pub fn new(node_id: impl Into<String>, state: NodeState) -> Self {
        Self {
            node_id: node_id.into(),
            state,
            questions: Vec::new(),
            unlockable: false,
            started_at: None,
            completed_at: None,
            previous_questions: Vec::new(),
            previous_status: None,
            updated_at: None,
        }
    }

    /// Attach a freshly generated question set.
    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = questions;
        self
    }

    /// Mark the node in progress on the first answer submission. Stamps
    /// `started_at` exactly once; a completed node is left untouched.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        if self.state == NodeState::Completed {
            return;
        }
        self.state = NodeState::InProgress;
        self.started_at.get_or_insert(now);
        self.updated_at = Some(now);
    }

    /// Record an evaluated answer against the matching question and run the
    /// all-passed completion check. Returns whether every question on the
    /// node is now passed.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        answer: &str,
        feedback: &str,
        grade: u8,
        passed: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let question = self
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| RamifyError::question_not_found(question_id))?;

        question.attempts += 1;
        question.last_answer = Some(answer.to_string());
        question.feedback = Some(feedback.to_string());
        question.grade = Some(grade);
        question.state = if passed {
            QuestionState::Passed
        } else {
            QuestionState::Failed
        };
        question.updated_at = Some(now);
        self.updated_at = Some(now);

        let all_passed = !self.questions.is_empty() && self.questions.iter().all(Question::passed);
        if all_passed {
            self.state = NodeState::Completed;
            self.completed_at.get_or_insert(now);
        }
        Ok(all_passed)
    }

    /// Manual status override. Timestamps still follow the first-write-only
    /// rule.
    pub fn set_state(&mut self, state: NodeState, now: DateTime<Utc>) {
        self.state = state;
        match state {
            NodeState::InProgress => {
                self.started_at.get_or_insert(now);
            }
            NodeState::Completed => {
                self.completed_at.get_or_insert(now);
            }
            _ => {}
        }
        self.updated_at = Some(now);
    }

    /// Reset for a regenerate: the current question set and status are
    /// archived, not deleted, and the node drops back to `not_started`.
    pub fn archive_and_reset(&mut self, now: DateTime<Utc>) {
        self.previous_questions = std::mem::take(&mut self.questions);
        self.previous_status = Some(self.state);
        self.state = NodeState::NotStarted;
        self.started_at = None;
        self.completed_at = None;
        self.unlockable = false;
        self.updated_at = Some(now);
    }

    pub fn all_passed(&self) -> bool {
        !self.questions.is_empty() && self.questions.iter().all(Question::passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_with_questions(n: usize) -> (NodeProgress, Vec<String>) {
        let now = Utc::now();
        let questions: Vec<Question> = (0..n)
            .map(|i| Question::new(format!("Question {}?", i), now))
            .collect();
        let ids = questions.iter().map(|q| q.id.clone()).collect();
        let progress = NodeProgress::new("1", NodeState::NotStarted).with_questions(questions);
        (progress, ids)
    }

    #[test]
    fn state_round_trips_through_strings() {
        for s in ["locked", "not_started", "in_progress", "completed"] {
            assert_eq!(NodeState::from_str(s).unwrap().as_str(), s);
        }
        assert!(NodeState::from_str("paused").is_err());
    }

    #[test]
    fn begin_attempt_stamps_started_at_once() {
        let (mut progress, _) = progress_with_questions(1);
        let t0 = Utc::now();
        progress.begin_attempt(t0);
        assert_eq!(progress.state, NodeState::InProgress);
        assert_eq!(progress.started_at, Some(t0));

        let t1 = t0 + chrono::Duration::seconds(10);
        progress.begin_attempt(t1);
        assert_eq!(progress.started_at, Some(t0));
    }

    #[test]
    fn last_passed_question_completes_the_node() {
        let (mut progress, ids) = progress_with_questions(2);
        let now = Utc::now();
        progress.begin_attempt(now);

        let all = progress
            .record_answer(&ids[0], "a", "good", 90, true, now)
            .unwrap();
        assert!(!all);
        assert_eq!(progress.state, NodeState::InProgress);
        assert!(progress.completed_at.is_none());

        let all = progress
            .record_answer(&ids[1], "b", "good", 85, true, now)
            .unwrap();
        assert!(all);
        assert_eq!(progress.state, NodeState::Completed);
        assert!(progress.completed_at.is_some());
    }

    #[test]
    fn completed_at_is_stamped_exactly_once() {
        let (mut progress, ids) = progress_with_questions(1);
        let t0 = Utc::now();
        progress.begin_attempt(t0);
        progress.record_answer(&ids[0], "a", "ok", 95, true, t0).unwrap();
        let first = progress.completed_at;
        assert!(first.is_some());

        let t1 = t0 + chrono::Duration::seconds(30);
        progress.record_answer(&ids[0], "b", "ok", 99, true, t1).unwrap();
        assert_eq!(progress.completed_at, first);
    }

    #[test]
    fn completion_is_monotonic_under_answers() {
        let (mut progress, ids) = progress_with_questions(1);
        let now = Utc::now();
        progress.begin_attempt(now);
        progress.record_answer(&ids[0], "a", "ok", 90, true, now).unwrap();
        assert_eq!(progress.state, NodeState::Completed);

        // A later failing answer updates the question, not the node status.
        progress.begin_attempt(now);
        progress.record_answer(&ids[0], "c", "weak", 20, false, now).unwrap();
        assert_eq!(progress.state, NodeState::Completed);
        assert_eq!(progress.questions[0].attempts, 2);
    }

    #[test]
    fn failing_answer_keeps_node_in_progress() {
        let (mut progress, ids) = progress_with_questions(1);
        let now = Utc::now();
        progress.begin_attempt(now);
        let all = progress
            .record_answer(&ids[0], "a", "missing the point", 40, false, now)
            .unwrap();
        assert!(!all);
        assert_eq!(progress.state, NodeState::InProgress);
        assert_eq!(progress.questions[0].state, QuestionState::Failed);
        assert_eq!(progress.questions[0].grade, Some(40));
    }

    #[test]
    fn unknown_question_is_rejected() {
        let (mut progress, _) = progress_with_questions(1);
        let err = progress
            .record_answer("missing", "a", "", 0, false, Utc::now())
            .unwrap_err();
        assert!(matches!(err, RamifyError::QuestionNotFound(_)));
    }

    #[test]
    fn archive_and_reset_keeps_history() {
        let (mut progress, ids) = progress_with_questions(2);
        let now = Utc::now();
        progress.begin_attempt(now);
        progress.record_answer(&ids[0], "a", "ok", 90, true, now).unwrap();
        progress.archive_and_reset(now);

        assert_eq!(progress.state, NodeState::NotStarted);
        assert!(progress.questions.is_empty());
        assert_eq!(progress.previous_questions.len(), 2);
        assert_eq!(progress.previous_status, Some(NodeState::InProgress));
        assert!(progress.started_at.is_none());
    }

    #[test]
    fn manual_override_follows_first_write_rule() {
        let (mut progress, _) = progress_with_questions(1);
        let t0 = Utc::now();
        progress.set_state(NodeState::Completed, t0);
        assert_eq!(progress.completed_at, Some(t0));

        let t1 = t0 + chrono::Duration::seconds(5);
        progress.set_state(NodeState::Locked, t1);
        progress.set_state(NodeState::Completed, t1);
        assert_eq!(progress.completed_at, Some(t0));
    }

    #[test]
    fn zero_questions_cannot_complete_through_answers() {
        let mut progress = NodeProgress::new("1", NodeState::NotStarted);
        assert!(!progress.all_passed());
        let err = progress.record_answer("any", "a", "", 0, false, Utc::now());
        assert!(err.is_err());
        assert_ne!(progress.state, NodeState::Completed);
    }
}
