//! Prompt template and response sanitization
//!
//! Prompts use a `<|role|> ... <|end|>` delimiter protocol. Delimiters that
//! appear inside user-authored content are not escaped, so a reply quoting
//! them loses those tags during sanitization.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::session::Turn;

/// Closes every segment of the prompt
pub const END_TAG: &str = "<|end|>";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|.*?\|>").expect("tag pattern is a valid regex"));

/// Assemble the model prompt: system segment, one segment per turn, then an
/// open assistant segment awaiting completion.
pub fn build_prompt(persona: &str, turns: &[Turn]) -> String {
    let body: usize = turns.iter().map(|t| t.content().len() + 24).sum();
    let mut prompt = String::with_capacity(persona.len() + body + 48);

    prompt.push_str("<|system|>\n");
    prompt.push_str(persona);
    prompt.push('\n');
    prompt.push_str(END_TAG);
    prompt.push('\n');

    for turn in turns {
        prompt.push_str(&format!("<|{}|>\n", turn.role()));
        prompt.push_str(turn.content());
        prompt.push('\n');
        prompt.push_str(END_TAG);
        prompt.push('\n');
    }

    prompt.push_str("<|assistant|>\n");
    prompt
}

/// Strip every template tag from raw model output, then trim whitespace.
///
/// Stripping repeats until no tag is left, so the result never contains a
/// tag and sanitizing twice is the same as sanitizing once.
pub fn sanitize_response(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let next = match TAG_PATTERN.replace_all(&text, "") {
            Cow::Borrowed(_) => break,
            Cow::Owned(stripped) => stripped,
        };
        text = next;
    }
    text.trim().to_string()
}
