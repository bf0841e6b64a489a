//! Markdown operations on the notes document.
//!
//! The document has three recognized sections, ordered when present:
//! `# Live Notes`, `## Summary`, `## Transcript`. Every function here is a
//! pure string transformation; locking and persistence live in the
//! synchronizer.

use crate::summary::AnalysisResult;

pub const TITLE_HEADING: &str = "# Live Notes";
pub const SUMMARY_HEADING: &str = "## Summary";
pub const TRANSCRIPT_HEADING: &str = "## Transcript";

/// Ensure the document has its title and transcript scaffolding.
pub fn ensure_scaffold(notes: &str) -> String {
    if notes.trim().is_empty() {
        return format!("{TITLE_HEADING}\n\n{TRANSCRIPT_HEADING}\n\n");
    }

    let mut doc = notes.to_string();
    if heading_position(&doc, TRANSCRIPT_HEADING).is_none() {
        if !doc.ends_with('\n') {
            doc.push('\n');
        }
        doc.push_str(&format!("\n{TRANSCRIPT_HEADING}\n\n"));
    }
    doc
}

/// Append one transcript line at the document tail.
///
/// The transcript section is always the last section, so a tail append
/// lands inside it and can never disturb earlier content.
pub fn append_turn_line(notes: &str, speaker_label: &str, text: &str) -> String {
    let mut doc = ensure_scaffold(notes);
    doc.push_str(&format!("**{speaker_label}:** {text}\n\n"));
    doc
}

/// Render the summary section body for an analysis result.
pub fn render_summary_section(result: &AnalysisResult) -> String {
    let mut section = format!("{SUMMARY_HEADING}\n\n");

    if !result.topic_header.is_empty() {
        section.push_str(&format!("> {}\n\n", result.topic_header));
    }

    if !result.summary_bullets.is_empty() {
        section.push_str("### Key Points\n\n");
        for bullet in &result.summary_bullets {
            section.push_str(&format!("- {bullet}\n"));
        }
    }

    if !result.action_items.is_empty() {
        if !result.summary_bullets.is_empty() {
            section.push('\n');
        }
        section.push_str("### Action Items\n\n");
        for action in &result.action_items {
            section.push_str(&format!("- [ ] {action}\n"));
        }
    }

    section
}

/// Replace the `## Summary` section in place, or insert it at its canonical
/// position: before `## Transcript` when present, else after the leading
/// title, else prepended with a fresh title.
pub fn upsert_summary(notes: &str, result: &AnalysisResult) -> String {
    let section = render_summary_section(result);

    if let Some(start) = heading_position(notes, SUMMARY_HEADING) {
        let end = section_end(notes, start + SUMMARY_HEADING.len());
        let mut doc = String::with_capacity(notes.len() + section.len());
        doc.push_str(&notes[..start]);
        doc.push_str(&section);
        doc.push_str(&notes[end..]);
        return doc;
    }

    if let Some(start) = heading_position(notes, TRANSCRIPT_HEADING) {
        let mut doc = String::with_capacity(notes.len() + section.len());
        doc.push_str(&notes[..start]);
        doc.push_str(&section);
        doc.push('\n');
        doc.push_str(&notes[start..]);
        return doc;
    }

    if let Some(start) = heading_position(notes, TITLE_HEADING) {
        let insert_at = section_start_after_title(notes, start);
        let mut doc = String::with_capacity(notes.len() + section.len());
        doc.push_str(&notes[..insert_at]);
        doc.push_str(&section);
        doc.push('\n');
        doc.push_str(&notes[insert_at..]);
        return doc;
    }

    format!("{TITLE_HEADING}\n\n{section}\n{notes}")
}

/// Byte offset of `heading` at the start of a line, followed by a line
/// break or end of document.
fn heading_position(notes: &str, heading: &str) -> Option<usize> {
    let bytes = notes.as_bytes();
    let mut search = 0;
    while let Some(rel) = notes[search..].find(heading) {
        let idx = search + rel;
        let after = idx + heading.len();
        let at_line_start = idx == 0 || bytes[idx - 1] == b'\n';
        let at_line_end = after == notes.len() || bytes[after] == b'\n';
        if at_line_start && at_line_end {
            return Some(idx);
        }
        search = after;
    }
    None
}

/// End of the section that begins just before `from`: the byte offset of the
/// newline preceding the next top-level heading (`## ` or `# `), or end of
/// document. The delimiting newline stays with the following section.
fn section_end(notes: &str, from: usize) -> usize {
    let tail = &notes[from..];
    let next_h2 = tail.find("\n## ");
    let next_h1 = tail.find("\n# ");
    match (next_h2, next_h1) {
        (Some(a), Some(b)) => from + a.min(b),
        (Some(a), None) => from + a,
        (None, Some(b)) => from + b,
        (None, None) => notes.len(),
    }
}

/// First offset after the title line and its trailing blank line(s).
fn section_start_after_title(notes: &str, title_start: usize) -> usize {
    let after_line = match notes[title_start..].find('\n') {
        Some(p) => title_start + p + 1,
        None => return notes.len(),
    };
    let bytes = notes.as_bytes();
    let mut idx = after_line;
    while idx < bytes.len() && bytes[idx] == b'\n' {
        idx += 1;
    }
    idx
}
