//! Prompt templates and placeholder rendering.

use medrag_core::{ChatMessage, Role};

/// Placeholders every answer template must contain.
pub const REQUIRED_PLACEHOLDERS: [&str; 3] = ["{context}", "{chat_history}", "{question}"];

pub const CONVERSATIONAL_PROMPT_TEMPLATE: &str = "\
You are a knowledgeable medical assistant. Answer the question using the \
medical reference passages below and the earlier conversation.

Context from the medical reference:
{context}

Conversation so far:
{chat_history}

Question: {question}

Instructions:
1. Base your answer on the reference passages above.
2. Use the conversation so far to resolve follow-up questions such as \"what about its symptoms?\".
3. If the passages do not contain the answer, say that you do not know instead of guessing.
4. Be accurate and concise, and avoid speculation.
5. Recommend consulting a healthcare professional for personal medical decisions.

Answer:";

const CONDENSE_QUESTION_TEMPLATE: &str = "\
Given the conversation below and a follow-up question, rewrite the follow-up \
question as a standalone question in its original language.

Conversation:
{chat_history}

Follow-up question: {question}

Standalone question:";

const SUMMARY_TEMPLATE: &str = "\
# Task
Progressively summarize the conversation lines below, extending the current \
summary. Keep medical facts, conditions, medications and the topics the user \
asked about. Output only the new summary.

# Current summary
{summary}

# New conversation lines
{new_lines}

# New summary";

/// Check that a template carries all answer placeholders.
pub fn missing_placeholders(template: &str) -> Vec<&'static str> {
    REQUIRED_PLACEHOLDERS
        .into_iter()
        .filter(|placeholder| !template.contains(placeholder))
        .collect()
}

/// Substitute `{name}` placeholders in a single pass.
///
/// Values are inserted verbatim and never re-scanned, so a passage that
/// happens to contain `{question}` is left untouched. Unknown braces are
/// copied through.
#[must_use]
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let matched = vars.iter().find_map(|(name, value)| {
            after
                .strip_prefix(name)
                .and_then(|tail| tail.strip_prefix('}'))
                .map(|tail| (*value, tail))
        });
        if let Some((value, tail)) = matched {
            out.push_str(value);
            rest = tail;
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Render a message list as `Human:` / `AI:` lines.
#[must_use]
pub fn format_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "Human",
                Role::Assistant => "AI",
                Role::System => "System",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn answer_prompt(template: &str, context: &str, chat_history: &str, question: &str) -> String {
    render(
        template,
        &[
            ("context", context),
            ("chat_history", chat_history),
            ("question", question),
        ],
    )
}

#[must_use]
pub fn condense_prompt(chat_history: &str, question: &str) -> String {
    render(
        CONDENSE_QUESTION_TEMPLATE,
        &[("chat_history", chat_history), ("question", question)],
    )
}

#[must_use]
pub fn summary_prompt(current_summary: &str, new_lines: &[ChatMessage]) -> String {
    let summary = if current_summary.is_empty() {
        "(none yet)"
    } else {
        current_summary
    };
    render(
        SUMMARY_TEMPLATE,
        &[("summary", summary), ("new_lines", &format_history(new_lines))],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_is_complete() {
        assert!(missing_placeholders(CONVERSATIONAL_PROMPT_TEMPLATE).is_empty());
    }

    #[test]
    fn missing_placeholders_are_reported() {
        let missing = missing_placeholders("Answer {question} from {context}");
        assert_eq!(missing, vec!["{chat_history}"]);
    }

    #[test]
    fn render_does_not_rescan_inserted_values() {
        let out = render(
            "[{context}] [{question}]",
            &[("context", "see {question}"), ("question", "why?")],
        );
        assert_eq!(out, "[see {question}] [why?]");
    }

    #[test]
    fn render_keeps_unknown_braces() {
        let out = render("{a} {b", &[("b", "x")]);
        assert_eq!(out, "{a} {b");
    }

    #[test]
    fn history_uses_speaker_prefixes() {
        let text = format_history(&[
            ChatMessage::system("Earlier: diabetes basics."),
            ChatMessage::user("What is diabetes?"),
            ChatMessage::assistant("A chronic condition."),
        ]);
        assert_eq!(
            text,
            "System: Earlier: diabetes basics.\nHuman: What is diabetes?\nAI: A chronic condition."
        );
    }

    #[test]
    fn answer_prompt_fills_every_slot() {
        let prompt = answer_prompt(
            CONVERSATIONAL_PROMPT_TEMPLATE,
            "Insulin lowers blood glucose.",
            "",
            "What does insulin do?",
        );
        assert!(prompt.contains("Insulin lowers blood glucose."));
        assert!(prompt.contains("Question: What does insulin do?"));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn summary_prompt_marks_empty_summary() {
        let prompt = summary_prompt("", &[ChatMessage::user("hi")]);
        assert!(prompt.contains("(none yet)"));
        assert!(prompt.contains("Human: hi"));
    }
}
