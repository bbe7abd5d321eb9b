//! Question generation and answer grading.
//!
//! Both operations always yield a usable result: malformed or missing model
//! output degrades to a default question or a zero-grade evaluation, never
//! to an error the caller has to handle.

use chrono::Utc;
use ramify_core::status::Question;
use ramify_llm::{
    parse_evaluation_json, parse_questions_json, ContextNode, EvaluationPrompt, LlmBackend,
    PromptTemplate, QuestionPrompt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Grade at or above which an answer passes.
pub const PASS_THRESHOLD: u8 = 80;

const EVALUATION_FALLBACK_FEEDBACK: &str =
    "We encountered an error evaluating your answer. Please try again.";

/// A graded answer. `passed` is always derived from `grade` locally, so the
/// invariant `passed == (grade >= 80)` holds even when the model reports an
/// inconsistent boolean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub feedback: String,
    pub grade: u8,
    pub passed: bool,
}

impl Evaluation {
    fn from_grade(feedback: String, grade: u8) -> Self {
        Self {
            feedback,
            grade,
            passed: grade >= PASS_THRESHOLD,
        }
    }

    fn fallback() -> Self {
        Self {
            feedback: EVALUATION_FALLBACK_FEEDBACK.to_string(),
            grade: 0,
            passed: false,
        }
    }
}

/// Generates questions for nodes and grades free-text answers.
pub struct AssessmentEngine {
    backend: Arc<dyn LlmBackend>,
}

impl AssessmentEngine {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// Generate 1-3 open-ended questions for a node, situated with
    /// parent/child context. Always returns at least one question.
    pub async fn generate_questions(
        &self,
        label: &str,
        content: &str,
        parents: &[ContextNode],
        children: &[ContextNode],
    ) -> Vec<Question> {
        let prompt = QuestionPrompt::new(label, content)
            .with_parents(parents.to_vec())
            .with_children(children.to_vec());

        let now = Utc::now();
        let text = match self
            .backend
            .generate_text(&prompt.generate(), prompt.system_prompt().as_deref())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(label, error = %e, "question generation failed, using default question");
                return vec![default_question(label)];
            }
        };

        match parse_questions_json(&text) {
            Ok(texts) if !texts.is_empty() => texts
                .into_iter()
                .map(|text| Question::new(text, now))
                .collect(),
            _ => {
                warn!(label, "question output not parseable, using default question");
                vec![default_question(label)]
            }
        }
    }

    /// Grade an answer on the 0-100 rubric. Always returns an evaluation.
    pub async fn evaluate(&self, question: &str, answer: &str, content: &str) -> Evaluation {
        let prompt = EvaluationPrompt::new(question, answer, content);

        let text = match self
            .backend
            .generate_text(&prompt.generate(), prompt.system_prompt().as_deref())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "answer evaluation failed, using fallback evaluation");
                return Evaluation::fallback();
            }
        };

        match parse_evaluation_json(&text) {
            Ok(raw) => {
                let grade = raw.grade.round().clamp(0.0, 100.0) as u8;
                let feedback = if raw.feedback.trim().is_empty() {
                    "No feedback provided".to_string()
                } else {
                    raw.feedback
                };
                Evaluation::from_grade(feedback, grade)
            }
            Err(e) => {
                warn!(error = %e, "evaluation output not parseable, using fallback evaluation");
                Evaluation::fallback()
            }
        }
    }
}

fn default_question(label: &str) -> Question {
    Question::new(
        format!("Explain the key concepts of {} in your own words.", label),
        Utc::now(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramify_llm::MockBackend;

    #[tokio::test]
    async fn questions_parse_from_model_output() {
        let backend = Arc::new(
            MockBackend::new()
                .with_text(r#"[{"text": "First?"}, {"text": "Second?"}]"#),
        );
        let engine = AssessmentEngine::new(backend);
        let questions = engine.generate_questions("Osmosis", "Water moves...", &[], &[]).await;
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "First?");
    }

    #[tokio::test]
    async fn garbage_output_falls_back_to_one_question() {
        let backend = Arc::new(MockBackend::new().with_text("not json at all"));
        let engine = AssessmentEngine::new(backend);
        let questions = engine.generate_questions("Osmosis", "Water moves...", &[], &[]).await;
        assert_eq!(questions.len(), 1);
        assert!(questions[0].text.contains("Osmosis"));
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_one_question() {
        let engine = AssessmentEngine::new(Arc::new(MockBackend::failing()));
        let questions = engine.generate_questions("Osmosis", "Water moves...", &[], &[]).await;
        assert_eq!(questions.len(), 1);
    }

    #[tokio::test]
    async fn passed_is_recomputed_from_grade() {
        // The model claims passed=false at grade 85 and passed=true at 79;
        // the local threshold wins both times.
        let backend = Arc::new(
            MockBackend::new()
                .with_text(r#"{"feedback": "ok", "grade": 85, "passed": false}"#)
                .with_text(r#"{"feedback": "ok", "grade": 79, "passed": true}"#),
        );
        let engine = AssessmentEngine::new(backend);

        let eval = engine.evaluate("Q?", "A", "content").await;
        assert_eq!(eval.grade, 85);
        assert!(eval.passed);

        let eval = engine.evaluate("Q?", "A", "content").await;
        assert_eq!(eval.grade, 79);
        assert!(!eval.passed);
    }

    #[tokio::test]
    async fn out_of_range_grades_are_clamped() {
        let backend = Arc::new(
            MockBackend::new().with_text(r#"{"feedback": "ok", "grade": 150, "passed": true}"#),
        );
        let engine = AssessmentEngine::new(backend);
        let eval = engine.evaluate("Q?", "A", "content").await;
        assert_eq!(eval.grade, 100);
        assert!(eval.passed);
    }

    #[tokio::test]
    async fn unparseable_evaluation_fails_closed() {
        let backend = Arc::new(MockBackend::new().with_text("the model rambled"));
        let engine = AssessmentEngine::new(backend);
        let eval = engine.evaluate("Q?", "A", "content").await;
        assert_eq!(eval.grade, 0);
        assert!(!eval.passed);
        assert!(!eval.feedback.is_empty());
    }
}
