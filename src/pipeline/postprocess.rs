//! Post-processing: clean the raw reply, then split it into questions and answers.
//!
//! The prompt asks for a `DOMANDE:` section followed by a `RISPOSTE:` section.
//! Models mostly comply, but they still occasionally wrap the whole reply in
//! a code fence, answer with `\r\n` line endings, or sprinkle zero-width
//! characters that break the marker match. [`normalise_reply`] fixes those
//! quirks without touching content; [`split_reply`] then cuts on the first
//! `RISPOSTE:`.
//!
//! ## Rule Order
//!
//! Invisible characters go first so a BOM in front of the opening fence does
//! not hide it. The fence regex tolerates `\r\n` itself, so line endings are
//! normalised last.

use crate::prompts::{ANSWERS_HEADER, QUESTIONS_HEADER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A reply cut at the answers marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitReply {
    pub questions: String,
    /// `None` when the reply carried no `RISPOSTE:` marker.
    pub answers: Option<String>,
}

/// Apply the deterministic clean-up rules to a raw reply.
///
/// 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 2. Strip a fence wrapping the whole reply
/// 3. Normalise line endings (CRLF / CR → LF)
pub fn normalise_reply(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = strip_outer_fence(&s);
    normalise_line_endings(&s)
}

/// Split a (normalised) reply on the first `RISPOSTE:`.
///
/// Questions are the text before the marker, trimmed, with a leading
/// `DOMANDE:` removed and trimmed again. Answers are everything after the
/// marker, trimmed. Without a marker the whole reply, trimmed, becomes the
/// questions and there are no answers.
pub fn split_reply(reply: &str) -> SplitReply {
    match reply.split_once(ANSWERS_HEADER) {
        Some((before, after)) => {
            let before = before.trim();
            let questions = before
                .strip_prefix(QUESTIONS_HEADER)
                .unwrap_or(before)
                .trim()
                .to_string();
            SplitReply {
                questions,
                answers: Some(after.trim().to_string()),
            }
        }
        None => SplitReply {
            questions: reply.trim().to_string(),
            answers: None,
        },
    }
}

// ── Rule 1: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' // zero-width space
                    | '\u{200C}' // zero-width non-joiner
                    | '\u{200D}' // zero-width joiner
                    | '\u{2060}' // word joiner
                    | '\u{FEFF}' // BOM
                    | '\u{00AD}' // soft hyphen
            )
        })
        .collect()
}

// ── Rule 2: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```\s*$").unwrap()
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 3: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}
