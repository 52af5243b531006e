//! The document a render pass mounts into.

use std::collections::{HashMap, VecDeque};

use inlay_core::{ANCHOR_ATTRIBUTE, InlayError};
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, element, rewrite_str};

use super::PassToken;
use crate::config::EngineConfig;

/// Default class for inline widget errors.
pub const DEFAULT_ERROR_CLASS: &str = "inlay-widget-error";

/// Operations the mount engine needs from a document host.
///
/// A browser host maps these onto DOM calls; [`MarkupHost`] keeps everything
/// in memory for server rendering and tests.
pub trait Host {
    /// Replace the host's content with `markup`.
    fn commit(&mut self, markup: &str);
    /// Whether the anchor with `id` can be located in the committed content.
    fn has_anchor(&self, id: &str) -> bool;
    /// Place a widget root inside the anchor.
    fn fill_anchor(&mut self, id: &str, root_html: &str);
    /// Show a short inline error inside the anchor.
    fn show_error(&mut self, id: &str, message: &str);
    /// Ask for [`MountEngine::resume`](super::MountEngine::resume) to be called with
    /// `token` after the next paint.
    fn request_frame(&mut self, token: PassToken);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AnchorFill {
    Widget(String),
    Error(String),
}

/// In-memory host.
///
/// Frames requested by the engine queue up until the caller's loop pulls them
/// with [`next_frame`](Self::next_frame). `ready_after` makes anchors
/// invisible for that many frames after each commit, the way a DOM that has
/// not caught up with the latest content behaves.
#[derive(Debug, Clone)]
pub struct MarkupHost {
    markup: String,
    fills: HashMap<String, AnchorFill>,
    frames: VecDeque<PassToken>,
    frames_since_commit: usize,
    ready_after: usize,
    error_class: String,
    commits: usize,
}

impl Default for MarkupHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupHost {
    /// Creates an empty host whose anchors are visible immediately.
    pub fn new() -> Self {
        Self {
            markup: String::new(),
            fills: HashMap::new(),
            frames: VecDeque::new(),
            frames_since_commit: 0,
            ready_after: 0,
            error_class: DEFAULT_ERROR_CLASS.to_string(),
            commits: 0,
        }
    }

    /// Creates a host using the engine's error class.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_error_class(config.error_class.clone())
    }

    /// Anchors only become visible after `frames` paints following a commit.
    pub fn with_ready_after(mut self, frames: usize) -> Self {
        self.ready_after = frames;
        self
    }

    /// Class used on inline error elements.
    pub fn with_error_class(mut self, class: impl Into<String>) -> Self {
        self.error_class = class.into();
        self
    }

    /// Pops the next requested frame, advancing the paint clock.
    pub fn next_frame(&mut self) -> Option<PassToken> {
        let token = self.frames.pop_front()?;
        self.frames_since_commit += 1;
        Some(token)
    }

    /// Frames requested but not yet delivered.
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// The markup as last committed, without widget content.
    pub fn committed_markup(&self) -> &str {
        &self.markup
    }

    /// How many times content was committed.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Root markup mounted at an anchor, if any.
    pub fn widget_at(&self, id: &str) -> Option<&str> {
        match self.fills.get(id) {
            Some(AnchorFill::Widget(html)) => Some(html),
            _ => None,
        }
    }

    /// Inline error shown at an anchor, if any.
    pub fn error_at(&self, id: &str) -> Option<&str> {
        match self.fills.get(id) {
            Some(AnchorFill::Error(message)) => Some(message),
            _ => None,
        }
    }

    /// Serialize the live document: committed markup with widget roots and
    /// inline errors placed inside their anchors.
    pub fn to_html(&self) -> Result<String, InlayError> {
        if self.fills.is_empty() {
            return Ok(self.markup.clone());
        }

        let selector = format!("[{}]", ANCHOR_ATTRIBUTE);
        let fills = &self.fills;
        let error_class = self.error_class.as_str();

        let html = rewrite_str(
            &self.markup,
            RewriteStrSettings {
                element_content_handlers: vec![element!(selector, move |el| {
                    let Some(id) = el.get_attribute(ANCHOR_ATTRIBUTE) else {
                        return Ok(());
                    };
                    match fills.get(&id) {
                        Some(AnchorFill::Widget(root)) => {
                            el.set_inner_content(root, ContentType::Html);
                        }
                        Some(AnchorFill::Error(message)) => {
                            let inline = format!(
                                "<span class=\"{}\" role=\"alert\">{}</span>",
                                html_escape::encode_double_quoted_attribute(error_class),
                                html_escape::encode_text(message)
                            );
                            el.set_inner_content(&inline, ContentType::Html);
                        }
                        None => {}
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )?;
        Ok(html)
    }
}

impl Host for MarkupHost {
    fn commit(&mut self, markup: &str) {
        self.markup = markup.to_string();
        self.fills.clear();
        self.frames_since_commit = 0;
        self.commits += 1;
    }

    fn has_anchor(&self, id: &str) -> bool {
        if self.frames_since_commit < self.ready_after {
            return false;
        }
        let needle = format!("{}=\"{}\"", ANCHOR_ATTRIBUTE, id);
        self.markup.contains(&needle)
    }

    fn fill_anchor(&mut self, id: &str, root_html: &str) {
        self.fills
            .insert(id.to_string(), AnchorFill::Widget(root_html.to_string()));
    }

    fn show_error(&mut self, id: &str, message: &str) {
        self.fills
            .insert(id.to_string(), AnchorFill::Error(message.to_string()));
    }

    fn request_frame(&mut self, token: PassToken) {
        self.frames.push_back(token);
    }
}
