//! Descriptive metadata derived from rendered markup, for SEO consumers.

use std::cell::RefCell;
use std::rc::Rc;

use lol_html::html_content::TextType;
use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str, text};
use serde::{Deserialize, Serialize};

use crate::error::InlayError;
use crate::verbatim::NEUTRALIZER;

/// Default number of words kept in the description.
pub const DEFAULT_DESCRIPTION_WORDS: usize = 30;

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// Elements that separate words when their text is flattened.
const BREAK_SELECTOR: &str = "p, div, br, hr, li, dt, dd, tr, td, th, blockquote, pre, \
    section, article, aside, figure, figcaption, h1, h2, h3, h4, h5, h6, ul, ol, table";

/// A heading found in the markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level (1-6).
    pub level: u8,
    /// Visible heading text.
    pub text: String,
}

/// Summary handed to the SEO collaborator after a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentSummary {
    /// First `h1`, else first `h2`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Leading words of the visible text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Every heading, in document order.
    pub headings: Vec<Heading>,
}

/// Options for [`analyze_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeOptions {
    /// Word budget for the description.
    pub description_words: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            description_words: DEFAULT_DESCRIPTION_WORDS,
        }
    }
}

/// Analyze markup with default options.
pub fn analyze(markup: &str) -> Result<ContentSummary, InlayError> {
    analyze_with_options(markup, &AnalyzeOptions::default())
}

/// Collect title, description and headings from markup.
pub fn analyze_with_options(
    markup: &str,
    options: &AnalyzeOptions,
) -> Result<ContentSummary, InlayError> {
    let headings: Rc<RefCell<Vec<Heading>>> = Rc::new(RefCell::new(Vec::new()));
    let body = Rc::new(RefCell::new(String::new()));

    rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(HEADING_SELECTOR, {
                    let headings = Rc::clone(&headings);
                    move |el| {
                        let level = el
                            .tag_name()
                            .strip_prefix('h')
                            .and_then(|value| value.parse::<u8>().ok())
                            .unwrap_or(1);
                        headings.borrow_mut().push(Heading {
                            level,
                            text: String::new(),
                        });
                        Ok(())
                    }
                }),
                element!(BREAK_SELECTOR, {
                    let body = Rc::clone(&body);
                    move |_| {
                        body.borrow_mut().push(' ');
                        Ok(())
                    }
                }),
                text!(HEADING_SELECTOR, {
                    let headings = Rc::clone(&headings);
                    move |chunk| {
                        if let Some(last) = headings.borrow_mut().last_mut() {
                            last.text.push_str(chunk.as_str());
                        }
                        Ok(())
                    }
                }),
            ],
            document_content_handlers: vec![doc_text!({
                let body = Rc::clone(&body);
                move |chunk| {
                    if matches!(chunk.text_type(), TextType::Data | TextType::RCData) {
                        body.borrow_mut().push_str(chunk.as_str());
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    let headings: Vec<Heading> = headings
        .take()
        .into_iter()
        .map(|h| Heading {
            level: h.level,
            text: visible_text(&h.text),
        })
        .collect();

    let title = headings
        .iter()
        .find(|h| h.level == 1 && !h.text.is_empty())
        .or_else(|| headings.iter().find(|h| h.level == 2 && !h.text.is_empty()))
        .map(|h| h.text.clone());

    let description = excerpt(&visible_text(&body.borrow()), options.description_words);

    Ok(ContentSummary {
        title,
        description,
        headings,
    })
}

/// Decode entities, drop neutralizers, collapse whitespace.
fn visible_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded
        .split_whitespace()
        .map(|word| word.replace(NEUTRALIZER, ""))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn excerpt(text: &str, max_words: usize) -> Option<String> {
    if text.is_empty() || max_words == 0 {
        return None;
    }
    let words: Vec<&str> = text.split(' ').collect();
    if words.len() <= max_words {
        return Some(text.to_string());
    }
    Some(format!("{}...", words[..max_words].join(" ")))
}
