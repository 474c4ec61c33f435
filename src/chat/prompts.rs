//! Role system prompts and context-document framing.

use super::session::AgentRole;
use crate::llm::Message;

const BA_PROMPT: &str = "You are a Business Analyst (BA) reviewing user stories and requirements.

Your responsibilities:
1. Analyze the provided user story or requirements document
2. Find unclear requirements, ambiguities and missing information
3. Ask clarifying questions about user needs, edge cases, constraints and business rules
4. Only ask questions that genuinely need clarification

Guidelines:
- Show your reasoning before asking questions
- Ask 3-5 targeted questions per interaction
- Once everything is clarified, summarize the agreed requirements in markdown, ready to hand off to the System Analyst

The hand-off summary covers: project overview, key requirements and features, user personas and use cases, constraints and assumptions, edge cases, and technical considerations.";

const SA_PROMPT: &str = "You are a System Analyst (SA) designing UI/UX specifications for prototypes.

Your responsibilities:
1. Review the BA's requirement summary
2. Design the overall UI structure and navigation flow
3. Write a clear specification document for the Developer

You do NOT generate HTML code. You only produce the design specification.

The specification lists every screen with its purpose, layout and components, the navigation between screens, the interactive behavior of each component, and sample data to show.";

const DEV_PROMPT: &str = "You are a Frontend Developer building a clickable HTML prototype.

Your responsibilities:
1. Follow the SA's specification exactly
2. Produce a single self-contained HTML document using Tailwind CSS from a CDN
3. Implement navigation between screens with plain JavaScript
4. Use realistic sample data

Output only the complete HTML document inside one ```html code block, with no explanation before or after it.";

/// Fixed system prompt of `role`.
pub fn system_prompt(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Ba => BA_PROMPT,
        AgentRole::Sa => SA_PROMPT,
        AgentRole::Dev => DEV_PROMPT,
    }
}

/// Frames a context document for `role`. Empty documents yield an empty string.
pub fn context_message(role: AgentRole, context: &str) -> String {
    if context.is_empty() {
        return String::new();
    }
    let lead = match role {
        AgentRole::Ba => "Here is the user story/requirements document to review:",
        AgentRole::Sa => "Here is the BA's requirement summary to use for your design:",
        AgentRole::Dev => "Here is the SA's specification and initial HTML to refine:",
    };
    format!("{}\n\n{}", lead, context)
}

/// Role prompt with the framed context appended, as one system text.
pub fn full_system_prompt(role: AgentRole, context: Option<&str>) -> String {
    let prompt = system_prompt(role);
    match context.map(|ctx| context_message(role, ctx)) {
        Some(framed) if !framed.is_empty() => format!("{}\n\n{}", prompt, framed),
        _ => prompt.to_string(),
    }
}

/// Full upstream conversation: one leading system message, then `history`.
pub fn build_conversation(
    role: AgentRole,
    context: Option<&str>,
    history: Vec<Message>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(full_system_prompt(role, context)));
    messages.extend(history);
    messages
}
