//! Summarization prompt and transcript rendering

use crate::types::Message;

/// First line of every generated summary message
pub const SUMMARY_HEADER: &str = "[Summary of earlier conversation]";

pub const SUMMARY_INSTRUCTIONS: &str = "\
Summarize the conversation excerpt below so it can replace the original messages. Focus on:
- What was accomplished and what remains to be done
- Decisions made and constraints agreed with the user
- Failed approaches and why they failed
- File paths, function names and error messages, verbatim

Annotate task state with one marker per line:
[CHECKPOINT] <description> - <PENDING|IN_PROGRESS|COMPLETED|FAILED|BLOCKED>
[DECISION] <description> (append \" - LOCKED\" when it must not be revisited)
[ARTIFACT] <created|modified|deleted> <path>

Rules:
- Only include facts stated in the excerpt. Do not infer.
- If the excerpt starts with an earlier summary, merge it into the new one and keep its markers.
- Stay within {max_tokens} tokens.";

pub(crate) fn instructions(max_tokens: usize) -> String {
    SUMMARY_INSTRUCTIONS.replace("{max_tokens}", &max_tokens.to_string())
}

/// `[role]: content` blocks separated by blank lines
pub fn render_transcript<'a>(messages: impl IntoIterator<Item = &'a Message>) -> String {
    let mut out = String::new();
    for message in messages {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!("[{}]: {}", message.role, message.content));
    }
    out
}

pub(crate) fn summary_message(text: &str) -> Message {
    Message::system(format!("{}\n{}", SUMMARY_HEADER, text))
}
