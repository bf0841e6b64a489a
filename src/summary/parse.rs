//! Parsing of the provider's analysis response.
//!
//! The response format is line-oriented: a `**Topic:**` marker line sets the
//! topic header, `- [ ]` lines are action items, remaining `- ` lines are
//! summary bullets. Anything else is ignored. Missing fields fall back to
//! the previous analysis so a weak response never erases existing data.

use super::AnalysisResult;
use chrono::Utc;

pub const TOPIC_MARKER: &str = "**Topic:**";
const ACTION_MARKER: &str = "- [ ]";

/// Parse a response into a structured analysis.
///
/// Returns `None` when nothing could be parsed and there is no previous
/// result to inherit from; callers treat that as "no new analysis".
pub fn parse_analysis(response: &str, previous: Option<&AnalysisResult>) -> Option<AnalysisResult> {
    let mut topic_header = String::new();
    let mut summary_bullets = Vec::new();
    let mut action_items = Vec::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix(TOPIC_MARKER) {
            topic_header = rest.trim().to_string();
        } else if let Some(rest) = trimmed.strip_prefix(ACTION_MARKER) {
            let action = rest.trim();
            if !action.is_empty() {
                action_items.push(action.to_string());
            }
        } else if let Some(rest) = trimmed.strip_prefix('-') {
            let bullet = rest.trim();
            if !bullet.is_empty() {
                summary_bullets.push(bullet.to_string());
            }
        }
    }

    let parsed_anything = !topic_header.is_empty() || !summary_bullets.is_empty();
    if !parsed_anything {
        // Nothing recognizable; leave the previous analysis untouched.
        return None;
    }

    if summary_bullets.is_empty() {
        if let Some(prev) = previous {
            summary_bullets = prev.summary_bullets.clone();
        }
    }
    if topic_header.is_empty() {
        if let Some(prev) = previous {
            topic_header = prev.topic_header.clone();
        }
    }

    Some(AnalysisResult {
        topic_header,
        summary_bullets,
        action_items,
        generated_at: Utc::now(),
    })
}
