//! Text processing for notification speech.
//!
//! Two concerns live here: request sanitisation (what the HTTP layer does
//! before a message is accepted at all) and speech preparation (what runs
//! on the queue right before text reaches a synthesis engine).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum accepted length of `title` and `message` after sanitisation.
pub const MAX_FIELD_LEN: usize = 500;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6} ").expect("valid regex"));
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<script").expect("valid regex"));
static BRACKET_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").expect("valid regex"));
static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("valid regex"));

/// Characters stripped as shell metacharacters.
const SHELL_META: &[char] = &[';', '&', '|', '>', '<', '`', '$', '\\'];

/// Sanitise a request field.
///
/// Applied in order: `<script` and `../` are removed to a fixpoint (a
/// single-pass removal can splice a new occurrence together), shell
/// metacharacters are dropped, markdown emphasis pairs and backticks are
/// unwrapped, leading heading markers are removed, and the result is
/// trimmed. Sanitising an already-sanitised string is a no-op.
#[must_use]
pub fn sanitize(input: &str) -> String {
    let mut text = strip_to_fixpoint(input, &SCRIPT_RE);
    while text.contains("../") {
        text = text.replace("../", "");
    }
    text.retain(|c| !SHELL_META.contains(&c));
    let text = text.replace("**", "").replace(['*', '`'], "");
    let text = HEADING_RE.replace_all(&text, "");
    text.trim().to_string()
}

fn strip_to_fixpoint(input: &str, re: &Regex) -> String {
    let mut text = input.to_string();
    while re.is_match(&text) {
        text = re.replace_all(&text, "").into_owned();
    }
    text
}

/// Remove bracketed runs `[…]` from a message.
///
/// Legacy cleanup applied to the spoken message in addition to
/// sanitisation; markers like `[DONE]` should never be read aloud.
#[must_use]
pub fn strip_bracket_runs(text: &str) -> String {
    BRACKET_RUN_RE.replace_all(text, "").into_owned()
}

/// Flatten markdown links `[text](url)` to their link text.
#[must_use]
pub fn flatten_markdown_links(text: &str) -> String {
    MARKDOWN_LINK_RE.replace_all(text, "$1").into_owned()
}

/// Remove URL schemes so a spoken address doesn't start with "aitch tee tee pee".
#[must_use]
pub fn strip_url_schemes(text: &str) -> String {
    text.replace("https://", "").replace("http://", "")
}

/// Split text into sentences at `.` `!` `?` boundaries.
///
/// A sentence is a run of non-terminator characters followed by one or
/// more terminators; a trailing unterminated fragment forms the last
/// sentence. Empty sentences are dropped.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut consumed = 0;

    for m in SENTENCE_RE.find_iter(text) {
        let sentence = m.as_str().trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        consumed = m.end();
    }

    let tail = text[consumed..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Case-insensitive whole-word pronunciation replacements.
///
/// Compiled once at start-up from the pronunciations file; applied to
/// every message right before synthesis.
#[derive(Debug, Default)]
pub struct Pronunciations {
    rules: Vec<(Regex, String)>,
}

impl Pronunciations {
    /// Build the rule set from a term → replacement map.
    ///
    /// Terms that fail to compile into a word-boundary pattern are logged
    /// and skipped rather than failing start-up.
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let mut rules = Vec::with_capacity(map.len());
        for (term, replacement) in map {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
            match Regex::new(&pattern) {
                Ok(re) => rules.push((re, replacement.clone())),
                Err(e) => {
                    tracing::warn!(term = %term, error = %e, "Skipping unusable pronunciation");
                }
            }
        }
        Self { rules }
    }

    /// Number of loaded replacement rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Replace each known term, as a whole word, case-insensitively.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (re, replacement) in &self.rules {
            result = re
                .replace_all(&result, regex::NoExpand(replacement.as_str()))
                .into_owned();
        }
        result
    }
}

/// Prepare a sanitised message for the synthesis engine.
///
/// Markdown links are flattened before bracket runs are removed so that
/// `[text](url)` keeps its text; URL schemes and pronunciations follow,
/// and the gaps left by removed runs collapse to single spaces.
#[must_use]
pub fn prepare_speech_text(message: &str, pronunciations: &Pronunciations) -> String {
    let text = flatten_markdown_links(message);
    let text = strip_bracket_runs(&text);
    let text = strip_url_schemes(&text);
    let text = pronunciations.apply(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
