//! The session operation facade.
//!
//! One method per externally visible operation. Mutating operations
//! serialize per session: each acquires the session's mutex around its whole
//! load-mutate-save cycle, so concurrent requests against the same session
//! cannot lose updates. Sessions never block each other, and reads go
//! straight to the store (aggregates are saved whole, so a reader sees
//! either the previous or the new state, never a torn one).

use chrono::Utc;
use ramify_core::aggregate::{NodeView, SessionAggregate};
use ramify_core::relationships::{check_unlockable, UnlockRule};
use ramify_core::status::{NodeProgress, NodeState, Question};
use ramify_core::types::{
    ChatHistory, ChatMessage, ChatRole, EdgeInfo, GeneratedNode, NodeInfo, Position,
};
use ramify_core::{RamifyError, Result};
use ramify_llm::{ContextNode, LlmBackend};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::assess::AssessmentEngine;
use crate::chat::TutorChat;
use crate::generator::{GeneratorConfig, MindmapGenerator};
use crate::layout::{layered_layout, semicircle_positions, GraphSnapshot, PlacedNode};
use crate::store::SessionStore;

/// One node of an externally supplied graph, as accepted by session init.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNodeInput {
    pub id: String,
    pub label: String,
    pub content: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default = "locked", rename = "status")]
    pub state: NodeState,
}

fn locked() -> NodeState {
    NodeState::Locked
}

/// A node's question list with its current status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub node_id: String,
    pub questions: Vec<Question>,
    #[serde(rename = "status")]
    pub state: NodeState,
}

/// Result of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: String,
    pub feedback: String,
    pub grade: u8,
    pub passed: bool,
    #[serde(rename = "node_status")]
    pub node_state: NodeState,
    pub all_passed: bool,
}

/// Result of an unlock check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockReport {
    pub unlockable: bool,
    pub reason: String,
    pub pending: Vec<String>,
}

/// Full session view: graph plus progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub nodes: HashMap<String, NodeInfo>,
    pub edges: Vec<EdgeInfo>,
    pub progress: HashMap<String, NodeProgress>,
}

/// The operation surface behind the HTTP transport.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    generator: MindmapGenerator,
    assessor: AssessmentEngine,
    tutor: TutorChat,
    unlock_rule: UnlockRule,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn LlmBackend>,
        unlock_rule: UnlockRule,
        generator_config: GeneratorConfig,
    ) -> Self {
        Self {
            store,
            generator: MindmapGenerator::new(backend.clone(), generator_config),
            assessor: AssessmentEngine::new(backend.clone()),
            tutor: TutorChat::new(backend),
            unlock_rule,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn unlock_rule(&self) -> UnlockRule {
        self.unlock_rule
    }

    /// The mutex guarding mutations of one session.
    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Install a graph into a session and build its relationship index.
    pub async fn init_session(
        &self,
        session_id: &str,
        nodes: Vec<GraphNodeInput>,
        edges: Vec<EdgeInfo>,
    ) -> Result<()> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        let nodes = nodes
            .into_iter()
            .map(|n| {
                let mut info = NodeInfo::new(n.id, n.label, n.content);
                info.position = n.position;
                (info, n.state)
            })
            .collect();
        aggregate.install_graph(nodes, edges);
        self.store.save(session_id, aggregate).await;

        info!(session = session_id, "session initialized");
        Ok(())
    }

    /// Generate a mind map for a topic, commit it to the session, and
    /// return the laid-out graph. Never fails: generation degrades to a
    /// fallback root at worst.
    pub async fn create_mindmap(
        &self,
        session_id: &str,
        topic: &str,
        max_depth: Option<usize>,
    ) -> GraphSnapshot {
        let max_depth = max_depth.unwrap_or(self.generator.config().max_depth);
        let generated = self.generator.generate_tree(topic, max_depth).await;
        let snapshot = layered_layout(&generated);

        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        let nodes = snapshot
            .nodes
            .iter()
            .map(|placed| {
                let info = NodeInfo::new(&placed.id, &placed.label, &placed.content)
                    .with_position(placed.position);
                (info, placed.state)
            })
            .collect();
        aggregate.install_graph(nodes, snapshot.edges.clone());
        self.store.save(session_id, aggregate).await;

        info!(
            session = session_id,
            topic,
            nodes = snapshot.nodes.len(),
            "mind map created"
        );
        snapshot
    }

    /// Expand one existing node by a single generated level, placing the
    /// new children in a semicircle below it.
    pub async fn expand_node(
        &self,
        session_id: &str,
        node_id: &str,
        max_children: Option<usize>,
    ) -> Result<GraphSnapshot> {
        let max_children = max_children.unwrap_or(self.generator.config().max_children);

        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        let parent_info = aggregate.node_info(node_id)?.clone();
        let parent = GeneratedNode {
            id: parent_info.id.clone(),
            label: parent_info.label.clone(),
            content: parent_info.content.clone(),
            parent_id: None,
        };
        let used_ids: HashSet<String> = aggregate.nodes.keys().cloned().collect();

        let children = self
            .generator
            .expand_with_retry(&parent, max_children, &used_ids)
            .await;
        let positions =
            semicircle_positions(parent_info.position.unwrap_or_default(), children.len());

        let mut snapshot = GraphSnapshot::default();
        for (child, position) in children.into_iter().zip(positions) {
            let info = NodeInfo::new(&child.id, &child.label, &child.content)
                .with_position(position);
            aggregate.add_node(info, NodeState::Locked);

            let edge = EdgeInfo::between(node_id, &child.id);
            aggregate.add_edge(edge.clone())?;

            snapshot.nodes.push(PlacedNode::new(
                &child.id,
                &child.label,
                &child.content,
                position,
                NodeState::Locked,
            ));
            snapshot.edges.push(edge);
        }
        self.store.save(session_id, aggregate).await;

        info!(
            session = session_id,
            node = node_id,
            children = snapshot.nodes.len(),
            "node expanded"
        );
        Ok(snapshot)
    }

    /// Generate questions for a node. Idempotent: an existing non-empty
    /// question set is returned unchanged. Node info supplied by the caller
    /// is staged for ids the session has not seen yet.
    pub async fn generate_questions(
        &self,
        session_id: &str,
        node_id: &str,
        label: &str,
        content: &str,
        parents: Vec<ContextNode>,
        children: Vec<ContextNode>,
    ) -> Result<QuestionSet> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        if !aggregate.nodes.contains_key(node_id) {
            aggregate.add_node(
                NodeInfo::new(node_id, label, content),
                NodeState::NotStarted,
            );
        }

        if let Some(progress) = aggregate.progress.get(node_id) {
            if !progress.questions.is_empty() {
                return Ok(QuestionSet {
                    node_id: node_id.to_string(),
                    questions: progress.questions.clone(),
                    state: progress.state,
                });
            }
        }

        let questions = self
            .assessor
            .generate_questions(label, content, &parents, &children)
            .await;
        let progress = aggregate
            .progress
            .entry(node_id.to_string())
            .or_insert_with(|| NodeProgress::new(node_id, NodeState::NotStarted));
        progress.questions = questions.clone();
        let state = progress.state;
        self.store.save(session_id, aggregate).await;

        Ok(QuestionSet {
            node_id: node_id.to_string(),
            questions,
            state,
        })
    }

    /// Evaluate an answer and apply its lifecycle effects: the node enters
    /// `in_progress` on the first attempt and completes once every question
    /// has passed.
    pub async fn answer_question(
        &self,
        session_id: &str,
        node_id: &str,
        question_id: &str,
        answer: &str,
    ) -> Result<AnswerOutcome> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        let progress = aggregate
            .progress
            .get(node_id)
            .ok_or_else(|| RamifyError::node_not_found(node_id))?;
        let question_text = progress
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.text.clone())
            .ok_or_else(|| RamifyError::question_not_found(question_id))?;
        // Progress without node info means a corrupted session, not bad
        // caller input.
        let content = aggregate
            .nodes
            .get(node_id)
            .map(|n| n.content.clone())
            .ok_or_else(|| {
                RamifyError::inconsistency(format!("progress recorded for unknown node {}", node_id))
            })?;

        let evaluation = self.assessor.evaluate(&question_text, answer, &content).await;

        let now = Utc::now();
        let progress = aggregate.progress_mut(node_id)?;
        progress.begin_attempt(now);
        let all_passed = progress.record_answer(
            question_id,
            answer,
            &evaluation.feedback,
            evaluation.grade,
            evaluation.passed,
            now,
        )?;
        let node_state = progress.state;
        self.store.save(session_id, aggregate).await;

        info!(
            session = session_id,
            node = node_id,
            grade = evaluation.grade,
            passed = evaluation.passed,
            "answer evaluated"
        );
        Ok(AnswerOutcome {
            question_id: question_id.to_string(),
            feedback: evaluation.feedback,
            grade: evaluation.grade,
            passed: evaluation.passed,
            node_state,
            all_passed,
        })
    }

    /// Archive the node's question set and status and reset it for a fresh
    /// generation round.
    pub async fn regenerate_questions(&self, session_id: &str, node_id: &str) -> Result<()> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        aggregate.progress_mut(node_id)?.archive_and_reset(Utc::now());
        self.store.save(session_id, aggregate).await;

        info!(session = session_id, node = node_id, "questions reset");
        Ok(())
    }

    /// Evaluate the configured unlock rule for a node and refresh its
    /// cached `unlockable` flag.
    pub async fn check_unlockable(&self, session_id: &str, node_id: &str) -> UnlockReport {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        let check = check_unlockable(node_id, self.unlock_rule, &aggregate.relationships, |id| {
            aggregate.state_of(id)
        });

        if let Some(progress) = aggregate.progress.get_mut(node_id) {
            progress.unlockable = check.unlockable;
            self.store.save(session_id, aggregate).await;
        }

        UnlockReport {
            unlockable: check.unlockable,
            reason: if check.unlockable {
                "Node is unlockable".to_string()
            } else {
                "Prerequisites not completed".to_string()
            },
            pending: check.pending,
        }
    }

    /// Manual status override.
    pub async fn update_node_status(
        &self,
        session_id: &str,
        node_id: &str,
        state: NodeState,
    ) -> Result<NodeState> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        aggregate.progress_mut(node_id)?.set_state(state, Utc::now());
        self.store.save(session_id, aggregate).await;

        info!(session = session_id, node = node_id, status = %state, "node status updated");
        Ok(state)
    }

    /// Full graph + progress view of a session.
    pub async fn session_data(&self, session_id: &str) -> SessionData {
        let aggregate = self.store.load(session_id).await;
        SessionData {
            nodes: aggregate.nodes,
            edges: aggregate.edges,
            progress: aggregate.progress,
        }
    }

    /// One node's info joined with its progress and related nodes.
    pub async fn node_data(&self, session_id: &str, node_id: &str) -> Result<NodeView> {
        self.store.load(session_id).await.node_view(node_id)
    }

    /// A node's chat transcript, seeding the welcome message on first read.
    pub async fn node_chat(&self, session_id: &str, node_id: &str) -> Result<ChatHistory> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        let info = aggregate.node_info(node_id)?.clone();
        let now = Utc::now();
        let history = aggregate
            .chats
            .entry(node_id.to_string())
            .or_insert_with(|| ChatHistory::new(node_id, now));
        if history.messages.is_empty() {
            history.push(self.tutor.welcome(&info, now));
        }
        let history = history.clone();
        self.store.save(session_id, aggregate).await;
        Ok(history)
    }

    /// Append a learner message to a node's chat and produce the tutor's
    /// reply, situated with the node's parent/child context.
    pub async fn send_chat_message(
        &self,
        session_id: &str,
        node_id: &str,
        message: &str,
    ) -> Result<ChatHistory> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut aggregate = self.store.load(session_id).await;
        let info = aggregate.node_info(node_id)?.clone();
        let parents = related_context(&aggregate, aggregate.relationships.parents_of(node_id));
        let children = related_context(&aggregate, aggregate.relationships.children_of(node_id));

        let now = Utc::now();
        let history = aggregate
            .chats
            .entry(node_id.to_string())
            .or_insert_with(|| ChatHistory::new(node_id, now));
        history.push(ChatMessage::new(ChatRole::User, message, now));
        let transcript = history.messages.clone();

        let reply = self.tutor.respond(&info, &transcript, &parents, &children).await;

        let history = aggregate
            .chats
            .get_mut(node_id)
            .ok_or_else(|| RamifyError::inconsistency("chat history vanished mid-request"))?;
        history.push(ChatMessage::new(ChatRole::Assistant, reply, Utc::now()));
        let history = history.clone();
        self.store.save(session_id, aggregate).await;
        Ok(history)
    }
}

fn related_context<'a>(
    aggregate: &SessionAggregate,
    ids: impl Iterator<Item = &'a String>,
) -> Vec<ContextNode> {
    ids.filter_map(|id| aggregate.nodes.get(id))
        .map(|n| ContextNode::new(&n.label, &n.content))
        .collect()
}
