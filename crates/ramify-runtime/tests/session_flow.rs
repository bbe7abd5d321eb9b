//! End-to-end session flows through the service facade, with the LLM
//! replaced by a scripted backend.

use ramify_core::prelude::*;
use ramify_llm::MockBackend;
use ramify_runtime::{GeneratorConfig, GraphNodeInput, MemoryStore, SessionService};
use serde_json::json;
use std::sync::Arc;

fn service_with(backend: MockBackend, rule: UnlockRule) -> SessionService {
    SessionService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(backend),
        rule,
        GeneratorConfig::default(),
    )
}

fn input(id: &str, state: NodeState) -> GraphNodeInput {
    GraphNodeInput {
        id: id.to_string(),
        label: format!("Node {}", id),
        content: format!("Content for {}", id),
        position: None,
        state,
    }
}

fn abc_graph() -> (Vec<GraphNodeInput>, Vec<EdgeInfo>) {
    (
        vec![
            input("A", NodeState::NotStarted),
            input("B", NodeState::Locked),
            input("C", NodeState::Locked),
        ],
        vec![EdgeInfo::between("A", "B"), EdgeInfo::between("A", "C")],
    )
}

#[tokio::test]
async fn abc_scenario_under_the_children_rule() {
    let service = service_with(MockBackend::new(), UnlockRule::ChildrenComplete);
    let (nodes, edges) = abc_graph();
    service.init_session("s1", nodes, edges).await.unwrap();

    let view = service.node_data("s1", "A").await.unwrap();
    let child_ids: Vec<&str> = view.children.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(child_ids, vec!["B", "C"]);
    let view = service.node_data("s1", "B").await.unwrap();
    assert_eq!(view.parents[0].id, "A");

    service
        .update_node_status("s1", "B", NodeState::Completed)
        .await
        .unwrap();
    let report = service.check_unlockable("s1", "A").await;
    assert!(!report.unlockable);
    assert_eq!(report.pending, vec!["C".to_string()]);

    service
        .update_node_status("s1", "C", NodeState::Completed)
        .await
        .unwrap();
    let report = service.check_unlockable("s1", "A").await;
    assert!(report.unlockable);
    assert!(report.pending.is_empty());
}

#[tokio::test]
async fn parents_rule_boundaries() {
    let service = service_with(MockBackend::new(), UnlockRule::ParentsComplete);
    let (nodes, edges) = abc_graph();
    service.init_session("s1", nodes, edges).await.unwrap();

    // A root has no parents and is trivially unlockable.
    let report = service.check_unlockable("s1", "A").await;
    assert!(report.unlockable);

    // B is blocked on its incomplete parent.
    let report = service.check_unlockable("s1", "B").await;
    assert!(!report.unlockable);
    assert_eq!(report.pending, vec!["A".to_string()]);

    service
        .update_node_status("s1", "A", NodeState::Completed)
        .await
        .unwrap();
    let report = service.check_unlockable("s1", "B").await;
    assert!(report.unlockable);

    // The cached flag on the progress record was refreshed.
    let data = service.session_data("s1").await;
    assert!(data.progress["B"].unlockable);
}

#[tokio::test]
async fn single_question_pass_completes_in_one_call() {
    let backend = MockBackend::new()
        .with_text(r#"[{"text": "What is X?"}]"#)
        .with_text(r#"{"feedback": "Great answer.", "grade": 85, "passed": true}"#);
    let service = service_with(backend, UnlockRule::ParentsComplete);
    service
        .init_session("s1", vec![input("X", NodeState::NotStarted)], vec![])
        .await
        .unwrap();

    let set = service
        .generate_questions("s1", "X", "Node X", "Content for X", vec![], vec![])
        .await
        .unwrap();
    assert_eq!(set.questions.len(), 1);
    assert_eq!(set.state, NodeState::NotStarted);

    let question_id = set.questions[0].id.clone();
    let outcome = service
        .answer_question("s1", "X", &question_id, "my answer")
        .await
        .unwrap();
    assert!(outcome.passed);
    assert_eq!(outcome.grade, 85);
    assert!(outcome.all_passed);
    assert_eq!(outcome.node_state, NodeState::Completed);

    let progress = &service.session_data("s1").await.progress["X"];
    assert!(progress.started_at.is_some());
    assert!(progress.completed_at.is_some());
    assert_eq!(progress.questions[0].attempts, 1);
}

#[tokio::test]
async fn failing_grade_leaves_the_node_in_progress() {
    let backend = MockBackend::new()
        .with_text(r#"[{"text": "What is X?"}]"#)
        .with_text(r#"{"feedback": "Not quite.", "grade": 55, "passed": false}"#);
    let service = service_with(backend, UnlockRule::ParentsComplete);
    service
        .init_session("s1", vec![input("X", NodeState::NotStarted)], vec![])
        .await
        .unwrap();

    let set = service
        .generate_questions("s1", "X", "Node X", "Content for X", vec![], vec![])
        .await
        .unwrap();
    let outcome = service
        .answer_question("s1", "X", &set.questions[0].id, "a guess")
        .await
        .unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.node_state, NodeState::InProgress);
    assert!(!outcome.all_passed);
}

#[tokio::test]
async fn question_generation_is_idempotent() {
    let backend = MockBackend::new().with_text(r#"[{"text": "Only once?"}]"#);
    let service = service_with(backend, UnlockRule::ParentsComplete);
    service
        .init_session("s1", vec![input("X", NodeState::NotStarted)], vec![])
        .await
        .unwrap();

    let first = service
        .generate_questions("s1", "X", "Node X", "Content", vec![], vec![])
        .await
        .unwrap();
    // The text queue is now empty: a second generation pass would produce
    // the default fallback question, with a different id.
    let second = service
        .generate_questions("s1", "X", "Node X", "Content", vec![], vec![])
        .await
        .unwrap();
    assert_eq!(first.questions[0].id, second.questions[0].id);
    assert_eq!(second.questions[0].text, "Only once?");
}

#[tokio::test]
async fn unknown_ids_surface_as_not_found() {
    let service = service_with(MockBackend::new(), UnlockRule::ParentsComplete);
    service
        .init_session("s1", vec![input("X", NodeState::NotStarted)], vec![])
        .await
        .unwrap();

    let err = service
        .answer_question("s1", "missing", "q", "a")
        .await
        .unwrap_err();
    assert!(matches!(err, RamifyError::NodeNotFound(_)));

    let set = service
        .generate_questions("s1", "X", "Node X", "Content", vec![], vec![])
        .await
        .unwrap();
    assert!(!set.questions.is_empty());
    let err = service
        .answer_question("s1", "X", "not-a-question", "a")
        .await
        .unwrap_err();
    assert!(matches!(err, RamifyError::QuestionNotFound(_)));

    let err = service.node_data("s1", "missing").await.unwrap_err();
    assert!(matches!(err, RamifyError::NodeNotFound(_)));
}

#[tokio::test]
async fn regenerate_archives_and_resets() {
    let backend = MockBackend::new()
        .with_text(r#"[{"text": "Round one?"}]"#)
        .with_text(r#"{"feedback": "Great.", "grade": 90, "passed": true}"#)
        .with_text(r#"[{"text": "Round two?"}]"#);
    let service = service_with(backend, UnlockRule::ParentsComplete);
    service
        .init_session("s1", vec![input("X", NodeState::NotStarted)], vec![])
        .await
        .unwrap();

    let set = service
        .generate_questions("s1", "X", "Node X", "Content", vec![], vec![])
        .await
        .unwrap();
    service
        .answer_question("s1", "X", &set.questions[0].id, "an answer")
        .await
        .unwrap();

    service.regenerate_questions("s1", "X").await.unwrap();
    let progress = service.session_data("s1").await.progress["X"].clone();
    assert_eq!(progress.state, NodeState::NotStarted);
    assert!(progress.questions.is_empty());
    assert_eq!(progress.previous_questions.len(), 1);
    assert_eq!(progress.previous_status, Some(NodeState::Completed));

    let fresh = service
        .generate_questions("s1", "X", "Node X", "Content", vec![], vec![])
        .await
        .unwrap();
    assert_eq!(fresh.questions[0].text, "Round two?");
    assert_ne!(fresh.questions[0].id, set.questions[0].id);
}

#[tokio::test]
async fn create_mindmap_commits_even_when_generation_fails() {
    let service = service_with(MockBackend::failing(), UnlockRule::ParentsComplete);
    let snapshot = service.create_mindmap("s1", "Topology", Some(2)).await;

    assert_eq!(snapshot.nodes.len(), 1);
    assert_eq!(snapshot.nodes[0].state, NodeState::NotStarted);
    assert_eq!(snapshot.nodes[0].label, "Topology");

    let data = service.session_data("s1").await;
    assert!(data.nodes.contains_key("1"));
    assert_eq!(data.progress["1"].state, NodeState::NotStarted);
}

#[tokio::test]
async fn expand_node_places_children_below_the_parent() {
    let backend = MockBackend::new().with_structured(Some(json!({"nodes": [
        {"id": "1.1", "label": "A", "content": "A content.", "parent_id": "1"},
        {"id": "1.2", "label": "B", "content": "B content.", "parent_id": "1"}
    ]})));
    let service = service_with(backend, UnlockRule::ParentsComplete);

    let mut root = input("1", NodeState::NotStarted);
    root.position = Some(Position::new(100.0, 40.0));
    service.init_session("s1", vec![root], vec![]).await.unwrap();

    let snapshot = service.expand_node("s1", "1", Some(2)).await.unwrap();
    assert_eq!(snapshot.nodes.len(), 2);
    assert_eq!(snapshot.edges.len(), 2);
    for placed in &snapshot.nodes {
        assert_eq!(placed.state, NodeState::Locked);
        assert!(placed.position.y > 40.0);
    }
    assert!(snapshot.edges.iter().any(|e| e.id == "e-1-1.1"));

    let view = service.node_data("s1", "1").await.unwrap();
    assert_eq!(view.children.len(), 2);
    let data = service.session_data("s1").await;
    assert_eq!(data.progress["1.1"].state, NodeState::Locked);
}

#[tokio::test]
async fn expand_unknown_node_is_rejected() {
    let service = service_with(MockBackend::new(), UnlockRule::ParentsComplete);
    let err = service.expand_node("s1", "missing", None).await.unwrap_err();
    assert!(matches!(err, RamifyError::NodeNotFound(_)));
}

#[tokio::test]
async fn chat_seeds_a_welcome_and_round_trips() {
    let backend = MockBackend::new().with_text("Let's dig into that.");
    let service = service_with(backend, UnlockRule::ParentsComplete);
    service
        .init_session("s1", vec![input("1", NodeState::NotStarted)], vec![])
        .await
        .unwrap();

    let history = service.node_chat("s1", "1").await.unwrap();
    assert_eq!(history.messages.len(), 1);
    assert_eq!(history.messages[0].role, ChatRole::Assistant);
    assert!(history.messages[0].content.contains("Node 1"));

    let history = service
        .send_chat_message("s1", "1", "Tell me more")
        .await
        .unwrap();
    assert_eq!(history.messages.len(), 3);
    assert_eq!(history.messages[1].role, ChatRole::User);
    assert_eq!(history.messages[2].content, "Let's dig into that.");

    let err = service.node_chat("s1", "missing").await.unwrap_err();
    assert!(matches!(err, RamifyError::NodeNotFound(_)));
}
