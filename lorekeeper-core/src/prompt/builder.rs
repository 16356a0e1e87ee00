//! Structured prompt assembly

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationLog;

use super::persona::Persona;

/// Labeled blocks of a prompt, in render order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    System,
    AssistantRole,
    Context,
    ConversationHistory,
    Question,
}

impl Section {
    /// Text placed between the `###` markers
    pub fn label(&self) -> &'static str {
        match self {
            Section::System => "System",
            Section::AssistantRole => "Assistant Role",
            Section::Context => "Context",
            Section::ConversationHistory => "Conversation History",
            Section::Question => "Question",
        }
    }

    /// `### <Label> ###`
    pub fn header(&self) -> String {
        format!("### {} ###", self.label())
    }
}

/// Immutable snapshot of every prompt section for one turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDraft {
    pub system_message: Option<String>,
    pub assistant_role: Option<String>,
    pub context_documents: Vec<String>,
    pub conversation_history: String,
    pub question: Option<String>,
}

impl PromptDraft {
    /// Render the draft.
    ///
    /// Sections appear in [`Section`] order; a section with empty content is
    /// left out entirely, header included.
    pub fn render(&self) -> String {
        let mut prompt = String::new();

        if let Some(system) = non_empty(&self.system_message) {
            push_block(&mut prompt, Section::System, system);
        }

        if let Some(role) = non_empty(&self.assistant_role) {
            push_block(&mut prompt, Section::AssistantRole, role);
        }

        if !self.context_documents.is_empty() {
            prompt.push_str(&Section::Context.header());
            prompt.push('\n');
            for document in &self.context_documents {
                prompt.push_str(document);
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        if !self.conversation_history.is_empty() {
            prompt.push_str(&Section::ConversationHistory.header());
            prompt.push('\n');
            prompt.push_str(&self.conversation_history);
            if !self.conversation_history.ends_with('\n') {
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        if let Some(question) = non_empty(&self.question) {
            prompt.push_str(&Section::Question.header());
            prompt.push('\n');
            prompt.push_str(question);
            prompt.push('\n');
        }

        prompt
    }

    /// Whether the rendered prompt would contain the given section
    pub fn has_section(&self, section: Section) -> bool {
        match section {
            Section::System => non_empty(&self.system_message).is_some(),
            Section::AssistantRole => non_empty(&self.assistant_role).is_some(),
            Section::Context => !self.context_documents.is_empty(),
            Section::ConversationHistory => !self.conversation_history.is_empty(),
            Section::Question => non_empty(&self.question).is_some(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn push_block(prompt: &mut String, section: Section, content: &str) {
    prompt.push_str(&section.header());
    prompt.push('\n');
    prompt.push_str(content);
    prompt.push_str("\n\n");
}

/// Collects prompt sections and renders them against a conversation log.
///
/// The conversation history is read from the log each time the prompt is
/// built, never cached.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    system_message: Option<String>,
    assistant_role: Option<String>,
    context_documents: Vec<String>,
    question: Option<String>,
}

impl PromptBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded with a persona's system message and role
    pub fn from_persona(persona: &Persona) -> Self {
        let mut builder = Self::new();
        builder.set_system_message(persona.system_message());
        builder.set_assistant_role(persona.assistant_role());
        builder
    }

    /// Replace the system instruction; empty text removes the section
    pub fn set_system_message(&mut self, text: impl Into<String>) -> &mut Self {
        self.system_message = Some(text.into());
        self
    }

    /// Replace the persona/role text; empty text removes the section
    pub fn set_assistant_role(&mut self, text: impl Into<String>) -> &mut Self {
        self.assistant_role = Some(text.into());
        self
    }

    /// Append a retrieved context document
    pub fn add_context_document(&mut self, text: impl Into<String>) -> &mut Self {
        self.context_documents.push(text.into());
        self
    }

    /// Remove all context documents
    pub fn clear_context_documents(&mut self) -> &mut Self {
        self.context_documents.clear();
        self
    }

    /// Store the pending question as `"{role}: {text}"`, replacing any
    /// previous one
    pub fn set_question(&mut self, role: &str, text: &str) -> &mut Self {
        self.question = Some(format!("{}: {}", role, text));
        self
    }

    /// Context documents collected so far
    pub fn context_documents(&self) -> &[String] {
        &self.context_documents
    }

    /// Snapshot the current sections together with the log's history
    pub fn draft(&self, history: &ConversationLog) -> PromptDraft {
        PromptDraft {
            system_message: self.system_message.clone(),
            assistant_role: self.assistant_role.clone(),
            context_documents: self.context_documents.clone(),
            conversation_history: history.formatted_history(),
            question: self.question.clone(),
        }
    }

    /// Render the prompt
    pub fn build(&self, history: &ConversationLog) -> String {
        self.draft(history).render()
    }
}
