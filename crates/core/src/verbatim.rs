//! Verbatim region tracking and placeholder neutralization.
//!
//! Placeholders are only live outside literal regions (`code`, `pre`, `kbd`,
//! `samp`, `script`, `style`). The preprocessor feeds element open and close
//! events from its rewriter into [`VerbatimTracker`] and neutralizes any text
//! seen while a region is open.

use std::borrow::Cow;

/// Elements whose content is displayed (or executed) literally.
pub const VERBATIM_TAGS: &[&str] = &["code", "pre", "kbd", "samp", "script", "style"];

/// Selector matching every element in [`VERBATIM_TAGS`].
pub const VERBATIM_SELECTOR: &str = "code, pre, kbd, samp, script, style";

/// Non-rendering character inserted to break placeholder matching (U+2060 WORD JOINER).
pub const NEUTRALIZER: char = '\u{2060}';

/// Nesting of open verbatim elements while streaming through markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerbatimTracker {
    depth: usize,
    outermost: Option<(String, usize)>,
}

impl VerbatimTracker {
    /// Record an opening verbatim element at byte `offset`.
    pub fn enter(&mut self, tag: &str, offset: usize) {
        if self.depth == 0 {
            self.outermost = Some((tag.to_string(), offset));
        }
        self.depth += 1;
    }

    /// Record the close of the innermost verbatim element.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.outermost = None;
        }
    }

    /// Whether text at the current position is verbatim.
    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    /// `(tag, offset)` of the outermost region still open.
    pub fn unclosed(&self) -> Option<(&str, usize)> {
        self.outermost
            .as_ref()
            .map(|(tag, offset)| (tag.as_str(), *offset))
    }
}

/// Insert [`NEUTRALIZER`] after every `[` that directly precedes the `component` keyword.
///
/// The visible text is unchanged; only pattern matching is defeated.
pub fn neutralize(text: &str) -> Cow<'_, str> {
    let lower = text.to_ascii_lowercase();
    if !lower.contains("[component") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for (i, _) in lower.match_indices("[component") {
        out.push_str(&text[last..=i]);
        out.push(NEUTRALIZER);
        last = i + 1;
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

/// Remove neutralization characters, recovering the text as authored.
pub fn strip_neutralizers(text: &str) -> String {
    text.chars().filter(|c| *c != NEUTRALIZER).collect()
}
