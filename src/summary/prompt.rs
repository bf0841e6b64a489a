//! Prompt assembly for the periodic conversation analysis.

use super::AnalysisResult;
use crate::providers::ChatMessage;

/// System prompt for the analysis request. The conversation window is
/// substituted into the `{{CONVERSATION_HISTORY}}` slot.
const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are a live-meeting co-pilot. You follow an ongoing conversation and \
maintain a running digest of it: the current main topic and the key points \
agreed or discussed so far. Work only from the conversation transcript \
below; do not invent content that was not said.

Conversation so far:
{{CONVERSATION_HISTORY}}";

const FORMAT_INSTRUCTIONS: &str = "\
Analyze the conversation and provide a concise summary of the main points. \
Format your response as follows:

**Topic:** [A short, descriptive topic for the conversation]

- First summary point.
- Second summary point.
- Third summary point.

If the conversation contains concrete tasks someone agreed to do, list each \
as a checkbox line: - [ ] task. Keep the topic and summary points concise.";

/// Build the message list for one analysis pass.
pub fn build_analysis_messages(
    recent_conversation: &str,
    previous: Option<&AnalysisResult>,
) -> Vec<ChatMessage> {
    let system = ANALYSIS_SYSTEM_PROMPT.replace("{{CONVERSATION_HISTORY}}", recent_conversation);

    let mut user = String::new();
    if let Some(prev) = previous {
        user.push_str(&format!(
            "Previous Analysis Context:\n- Main Topic: {}\n- Key Points: {}\n\nPlease build upon this context while analyzing the new conversation segments.\n\n",
            prev.topic_header,
            prev.summary_bullets.join(", ")
        ));
    }
    user.push_str(FORMAT_INSTRUCTIONS);

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Join the most recent `max_turns` conversation lines for the prompt.
pub fn format_conversation_window(turns: &[String], max_turns: usize) -> String {
    let start = turns.len().saturating_sub(max_turns);
    turns[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_window_keeps_most_recent_turns() {
        let turns: Vec<String> = (0..5).map(|i| format!("me: line {i}")).collect();
        let window = format_conversation_window(&turns, 3);
        assert_eq!(window, "me: line 2\nme: line 3\nme: line 4");
    }

    #[test]
    fn test_messages_carry_history_and_context() {
        let previous = AnalysisResult {
            topic_header: "Roadmap".to_string(),
            summary_bullets: vec!["Q3 scoped".to_string()],
            action_items: vec![],
            generated_at: Utc::now(),
        };
        let messages = build_analysis_messages("me: hi\nthem: hello", Some(&previous));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("me: hi\nthem: hello"));
        assert!(!messages[0].content.contains("{{CONVERSATION_HISTORY}}"));
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains("Main Topic: Roadmap"));
        assert!(messages[1].content.contains("Q3 scoped"));
    }
}
