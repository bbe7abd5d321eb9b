//! Prompt templates and tool schemas for mind-map generation, question
//! authoring, answer grading, and tutor chat.

use crate::types::{ContextNode, ToolSpec};
use serde_json::json;

/// A prompt template for LLM requests.
pub trait PromptTemplate {
    /// Generate the prompt text.
    fn generate(&self) -> String;

    /// Get the system prompt (if any).
    fn system_prompt(&self) -> Option<String> {
        None
    }
}

/// Tool schema for creating mind-map nodes (used for the root).
pub fn mindmap_tool() -> ToolSpec {
    ToolSpec::new(
        "create_mindmap",
        "Create a hierarchical mindmap structure about a topic",
        json!({
            "type": "object",
            "properties": {
                "nodes": {
                    "type": "array",
                    "description": "List of nodes in the mindmap hierarchy",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string", "description": "Unique identifier for the node"},
                            "label": {"type": "string", "description": "Short title for the node (max 50 chars)"},
                            "content": {"type": "string", "description": "Detailed explanation of the concept (100-300 chars)"},
                            "parent_id": {"type": "string", "description": "ID of the parent node, null for root node"}
                        },
                        "required": ["id", "label", "content"]
                    }
                }
            },
            "required": ["nodes"]
        }),
    )
}

/// Tool schema for creating child nodes under an existing parent.
pub fn child_nodes_tool() -> ToolSpec {
    ToolSpec::new(
        "create_child_nodes",
        "Create child nodes for a specified parent node in a mindmap",
        json!({
            "type": "object",
            "properties": {
                "nodes": {
                    "type": "array",
                    "description": "List of child nodes to add to the parent",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string", "description": "Unique identifier for the node"},
                            "label": {"type": "string", "description": "Short title for the node (max 50 chars)"},
                            "content": {"type": "string", "description": "Detailed explanation of the concept (100-300 chars)"},
                            "parent_id": {"type": "string", "description": "ID of the parent node"}
                        },
                        "required": ["id", "label", "content", "parent_id"]
                    }
                }
            },
            "required": ["nodes"]
        }),
    )
}

/// Prompt for generating the single root node of a new mind map.
#[derive(Debug, Clone)]
pub struct RootNodePrompt {
    pub topic: String,
}

impl RootNodePrompt {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into() }
    }
}

impl PromptTemplate for RootNodePrompt {
    fn system_prompt(&self) -> Option<String> {
        Some(
            "You are an expert at organizing knowledge into structured, \
             hierarchical mindmaps."
                .to_string(),
        )
    }

    fn generate(&self) -> String {
        format!(
            r#"Create a root node for an educational mindmap about "{}".

The root node should:
- Have a clear, concise label (title) representing the main topic
- Include a comprehensive but concise content description (100-300 characters)
- Use the ID "1" for the root node
- Have no parent_id (it's the root)

Use the create_mindmap tool to return just this single root node."#,
            self.topic
        )
    }
}

/// Prompt for expanding one node into child nodes.
#[derive(Debug, Clone)]
pub struct ChildNodesPrompt {
    pub parent_id: String,
    pub parent_label: String,
    pub parent_content: String,
    pub max_children: usize,
}

impl ChildNodesPrompt {
    pub fn new(
        parent_id: impl Into<String>,
        parent_label: impl Into<String>,
        parent_content: impl Into<String>,
        max_children: usize,
    ) -> Self {
        Self {
            parent_id: parent_id.into(),
            parent_label: parent_label.into(),
            parent_content: parent_content.into(),
            max_children,
        }
    }
}

impl PromptTemplate for ChildNodesPrompt {
    fn system_prompt(&self) -> Option<String> {
        Some(
            "You are an expert at expanding educational topics into \
             well-structured, comprehensive subtopics."
                .to_string(),
        )
    }

    fn generate(&self) -> String {
        format!(
            r#"I have a concept or topic in a mindmap that needs to be expanded with child nodes.
The parent node details are:

ID: {id}
Label: "{label}"
Content: "{content}"

Please create {count} child nodes that expand on this topic in a logical and educational way.
Each child node should explore a specific aspect, component, or sub-topic of the parent concept.

Use the create_child_nodes tool to structure this information.
Each child node needs:
1. A unique id (use the parent id as a prefix, e.g. if parent is "1.2", use "1.2.1", "1.2.2", etc.)
2. A short label/title that's clear and descriptive (max 50 characters)
3. Content that explains the concept in more detail (100-300 characters)
4. The parent_id reference which should be: "{id}"

Make sure the child nodes:
- Are distinct from each other (cover different aspects)
- Are directly related to the parent topic
- Together provide comprehensive coverage of the parent topic
- Have educational value and accurate content
- Have an appropriate level of detail (not too broad, not too specific)"#,
            id = self.parent_id,
            label = self.parent_label,
            content = self.parent_content,
            count = self.max_children,
        )
    }
}

/// Prompt for generating 1-3 open-ended questions about a node.
#[derive(Debug, Clone)]
pub struct QuestionPrompt {
    pub label: String,
    pub content: String,
    pub parents: Vec<ContextNode>,
    pub children: Vec<ContextNode>,
}

impl QuestionPrompt {
    pub fn new(label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content: content.into(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Situate the questions with parent-topic context.
    pub fn with_parents(mut self, parents: Vec<ContextNode>) -> Self {
        self.parents = parents;
        self
    }

    /// Situate the questions with subtopic context.
    pub fn with_children(mut self, children: Vec<ContextNode>) -> Self {
        self.children = children;
        self
    }
}

impl PromptTemplate for QuestionPrompt {
    fn generate(&self) -> String {
        let mut context = format!(
            "You are an educational assessment expert creating questions to test \
             knowledge about: \"{}\".\n\nHere is the content about this topic:\n\"{}\"\n",
            self.label, self.content
        );

        if !self.parents.is_empty() {
            context.push_str("\nThis topic is related to the following parent topics:\n");
            for node in &self.parents {
                context.push_str(&format!("- {}: {}\n", node.label, node.content));
            }
        }
        if !self.children.is_empty() {
            context.push_str("\nThis topic has the following subtopics:\n");
            for node in &self.children {
                context.push_str(&format!("- {}: {}\n", node.label, node.content));
            }
        }

        format!(
            r#"{context}
Based on this content, create 1-3 open-ended questions that test understanding of "{label}".

Guidelines:
- Questions should test deep understanding, not just recall
- Questions should be answerable from the provided content
- Questions should encourage critical thinking
- Include a variety of difficulty levels

Format your response as a JSON array of questions with this structure:
[
  {{"text": "Your first question here?"}},
  {{"text": "Your second question here?"}}
]

Only return the valid JSON array, nothing else."#,
            context = context,
            label = self.label,
        )
    }
}

/// Prompt for grading a learner's answer on the 0-100 rubric.
#[derive(Debug, Clone)]
pub struct EvaluationPrompt {
    pub question: String,
    pub answer: String,
    pub content: String,
}

impl EvaluationPrompt {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            content: content.into(),
        }
    }
}

impl PromptTemplate for EvaluationPrompt {
    fn generate(&self) -> String {
        format!(
            r#"You are an expert educational evaluator. Your task is to evaluate a student's answer to a question about a specific topic.

Topic content: "{content}"

Question: "{question}"

Student's answer: "{answer}"

First, evaluate the student's answer. Consider:
- Is the answer factually correct?
- Does it demonstrate understanding of the topic?
- Is it complete?
- Does it show critical thinking?

Then, assign a grade from 0 to 100 where:
- 0-60: Poor understanding
- 61-79: Partial understanding
- 80-89: Good understanding
- 90-100: Excellent understanding

Provide your feedback as a JSON object with this structure:
{{
  "feedback": "Your detailed feedback here, explaining strengths and weaknesses of the answer, and how it could be improved.",
  "grade": 85,
  "passed": true
}}

The "passed" field should be true if the grade is 80 or above, false otherwise.
Only return the valid JSON object, nothing else."#,
            content = self.content,
            question = self.question,
            answer = self.answer,
        )
    }
}

/// System prompt situating the tutor chat on one node.
#[derive(Debug, Clone)]
pub struct TutorChatPrompt {
    pub label: String,
    pub content: String,
    pub parents: Vec<ContextNode>,
    pub children: Vec<ContextNode>,
}

impl TutorChatPrompt {
    pub fn new(label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            content: content.into(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_parents(mut self, parents: Vec<ContextNode>) -> Self {
        self.parents = parents;
        self
    }

    pub fn with_children(mut self, children: Vec<ContextNode>) -> Self {
        self.children = children;
        self
    }
}

impl PromptTemplate for TutorChatPrompt {
    fn generate(&self) -> String {
        let mut prompt = format!(
            "You are an AI tutor specialized in teaching about '{label}'.\n\
             Your goal is to help the user understand this topic in depth.\n\n\
             Here is the content about '{label}' that you should use as your \
             primary source of information:\n---\n{content}\n---\n",
            label = self.label,
            content = self.content,
        );

        if !self.parents.is_empty() {
            prompt.push_str("\nThis topic is related to these parent topics:\n");
            for (i, node) in self.parents.iter().enumerate() {
                prompt.push_str(&format!("{}. {}: {}\n", i + 1, node.label, node.content));
            }
        }
        if !self.children.is_empty() {
            prompt.push_str("\nThis topic has these subtopics:\n");
            for (i, node) in self.children.iter().enumerate() {
                prompt.push_str(&format!("{}. {}: {}\n", i + 1, node.label, node.content));
            }
        }

        prompt.push_str(
            "\nYour responses should be educational, accurate, and helpful. \
             Encourage the user to ask questions and engage with the material.",
        );
        prompt
    }
}

/// Parse generated questions from a JSON response. Returns the question
/// texts in order.
pub fn parse_questions_json(json: &str) -> Result<Vec<String>, serde_json::Error> {
    #[derive(serde::Deserialize)]
    struct RawQuestion {
        text: String,
    }

    let json_str = extract_json_span(json, '[', ']');
    let raw: Vec<RawQuestion> = serde_json::from_str(json_str)?;
    Ok(raw.into_iter().map(|q| q.text).collect())
}

/// An evaluation as reported by the model, before local normalization.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawEvaluation {
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub grade: f64,
    #[serde(default)]
    pub passed: bool,
}

/// Parse an answer evaluation from a JSON response.
pub fn parse_evaluation_json(json: &str) -> Result<RawEvaluation, serde_json::Error> {
    let json_str = extract_json_span(json, '{', '}');
    serde_json::from_str(json_str)
}

/// Extract a JSON value between delimiters (handles markdown code blocks).
fn extract_json_span(text: &str, open: char, close: char) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    let text = text.trim();

    if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
        if start <= end {
            return &text[start..=end];
        }
    }
    text
}
