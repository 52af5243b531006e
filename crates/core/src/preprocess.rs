//! Content preprocessing: placeholder discovery and anchor substitution.
//!
//! `process` turns raw author content into markup where every live
//! placeholder has been replaced by (or tagged as) an anchor element, plus the
//! ordered list of markers describing what to mount at each anchor. Nothing
//! is mounted here.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use lol_html::html_content::{ContentType, EndTag, TextType};
use lol_html::{
    DocumentContentHandlers, ElementContentHandlers, EndTagHandler, HandlerResult, RewriteStrSettings, Selector,
    doc_text, element, rewrite_str,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Diagnostics, InlayError, SourceLocation, Warning};
use crate::sanitize::sanitize_markup;
use crate::shortcode::{
    BracketMatch, DEFAULT_DECODE_PASSES, decode_params, find_bracket_placeholders,
    is_valid_widget_name,
};
use crate::verbatim::{VERBATIM_SELECTOR, VerbatimTracker, neutralize};

/// Attribute that identifies an anchor element in processed markup.
pub const ANCHOR_ATTRIBUTE: &str = "data-inlay-anchor";

/// Default prefix for generated marker ids.
pub const DEFAULT_ANCHOR_PREFIX: &str = "inlay-widget";

/// Which placeholder syntax produced a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    /// `[component name params="..."]`
    Bracket,
    /// `<el data-component="name" data-params="...">`
    Attribute,
}

/// One live placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Anchor id, unique within one `process` call.
    pub id: String,
    /// Registry key of the widget to mount.
    pub widget_name: String,
    /// Decoded parameters; `None` when absent or undecodable.
    pub raw_params: Option<Map<String, Value>>,
    /// Placeholder syntax the marker came from.
    pub dialect: Dialect,
}

/// Options for [`process_with_options`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Clean the processed markup with the content allow-list.
    pub sanitize: bool,
    /// Maximum entity/JSON decode passes for parameter payloads.
    pub max_decode_passes: usize,
    /// Prefix for generated anchor ids.
    pub anchor_prefix: String,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            sanitize: true,
            max_decode_passes: DEFAULT_DECODE_PASSES,
            anchor_prefix: DEFAULT_ANCHOR_PREFIX.to_string(),
        }
    }
}

/// Output of one preprocessing call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Processed {
    /// Markup with anchors substituted for live placeholders.
    pub markup: String,
    /// Markers in document order.
    pub markers: Vec<Marker>,
    /// Recoverable findings.
    pub diagnostics: Diagnostics,
}

/// Process content with default options.
pub fn process(raw: &str) -> Result<Processed, InlayError> {
    process_with_options(raw, &ProcessOptions::default())
}

/// Process content: neutralize verbatim regions, expand placeholders, sanitize.
pub fn process_with_options(raw: &str, options: &ProcessOptions) -> Result<Processed, InlayError> {
    let sink = Rc::new(RefCell::new(MarkerSink::new(raw, options)));
    let verbatim = Rc::new(RefCell::new(VerbatimTracker::default()));

    let rewritten = rewrite_str(
        raw,
        RewriteStrSettings {
            element_content_handlers: vec![
                author_anchor_handler(),
                verbatim_handler(&verbatim),
                attribute_placeholder_handler(&sink, &verbatim),
            ],
            document_content_handlers: vec![text_handler(&sink, &verbatim)],
            ..RewriteStrSettings::default()
        },
    )?;

    let mut sink = sink.take();
    if let Some((tag, offset)) = verbatim.borrow().unclosed() {
        sink.diagnostics.add_warning(Warning::UnclosedVerbatim {
            location: SourceLocation::from_offset(raw, offset),
            tag: tag.to_string(),
        });
    }

    let markup = if options.sanitize {
        let cleaned = sanitize_markup(&rewritten);
        sink.retain_anchored(&anchor_ids(&cleaned)?);
        cleaned
    } else {
        rewritten
    };

    log::trace!(
        "processed content: {} markers, {} warnings",
        sink.markers.len(),
        sink.diagnostics.count()
    );

    Ok(Processed {
        markup,
        markers: sink.markers,
        diagnostics: sink.diagnostics,
    })
}

/// Collects markers in document order and buffers split text nodes.
#[derive(Default)]
struct MarkerSink<'a> {
    source: &'a str,
    options: ProcessOptions,
    markers: Vec<Marker>,
    offsets: Vec<usize>,
    diagnostics: Diagnostics,
    text: String,
    text_start: Option<usize>,
}

impl<'a> MarkerSink<'a> {
    fn new(source: &'a str, options: &ProcessOptions) -> Self {
        Self {
            source,
            options: options.clone(),
            ..Self::default()
        }
    }

    fn next_id(&self) -> String {
        format!("{}-{}", self.options.anchor_prefix, self.markers.len())
    }

    fn push(
        &mut self,
        widget_name: &str,
        params: Option<&str>,
        offset: usize,
        dialect: Dialect,
    ) -> String {
        let id = self.next_id();
        let raw_params = params.and_then(|payload| {
            match decode_params(payload, self.options.max_decode_passes) {
                Ok(map) => Some(map),
                Err(err) => {
                    log::warn!("ignoring params for {} ({}): {}", id, widget_name, err);
                    self.diagnostics.add_warning(Warning::MalformedParams {
                        location: SourceLocation::from_offset(self.source, offset),
                        marker_id: id.clone(),
                        message: err.to_string(),
                    });
                    None
                }
            }
        });

        self.markers.push(Marker {
            id: id.clone(),
            widget_name: widget_name.to_string(),
            raw_params,
            dialect,
        });
        self.offsets.push(offset);
        id
    }

    /// Drop markers whose anchor is not among `anchored`.
    fn retain_anchored(&mut self, anchored: &HashSet<String>) {
        let markers = std::mem::take(&mut self.markers);
        let offsets = std::mem::take(&mut self.offsets);
        for (marker, offset) in markers.into_iter().zip(offsets) {
            if anchored.contains(&marker.id) {
                self.markers.push(marker);
                self.offsets.push(offset);
                continue;
            }
            log::warn!(
                "sanitizing removed the anchor of {} ({}), dropping it",
                marker.id,
                marker.widget_name
            );
            self.diagnostics.add_warning(Warning::AnchorRemoved {
                location: SourceLocation::from_offset(self.source, offset),
                marker_id: marker.id,
                widget_name: marker.widget_name,
            });
        }
    }

    fn expand_brackets(&mut self, text: &str, offset: usize) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in find_bracket_placeholders(text) {
            match found {
                BracketMatch::Escaped { range, literal } => {
                    out.push_str(&text[last..range.start]);
                    out.push_str(&literal);
                    last = range.end;
                }
                BracketMatch::Live {
                    range,
                    name,
                    params,
                } => {
                    out.push_str(&text[last..range.start]);
                    let id = self.push(name, params, offset + range.start, Dialect::Bracket);
                    out.push_str(&bracket_anchor(&id, name));
                    last = range.end;
                }
            }
        }
        out.push_str(&text[last..]);
        out
    }
}

fn bracket_anchor(id: &str, name: &str) -> String {
    format!(
        "<div class=\"inlay-widget\" {}=\"{}\" data-widget=\"{}\"></div>",
        ANCHOR_ATTRIBUTE, id, name
    )
}

/// Author markup never supplies its own anchors.
fn author_anchor_handler<'h>() -> (Cow<'static, Selector>, ElementContentHandlers<'h>) {
    element!("[data-inlay-anchor]", |el| {
        el.remove_attribute(ANCHOR_ATTRIBUTE);
        Ok(())
    })
}

fn verbatim_handler<'h>(
    verbatim: &Rc<RefCell<VerbatimTracker>>,
) -> (Cow<'static, Selector>, ElementContentHandlers<'h>) {
    let verbatim = Rc::clone(verbatim);
    element!(VERBATIM_SELECTOR, move |el| {
        let tag = el.tag_name();
        let offset = el.source_location().bytes().start;
        let Some(handlers) = el.end_tag_handlers() else {
            return Ok(());
        };
        verbatim.borrow_mut().enter(&tag, offset);
        let verbatim = Rc::clone(&verbatim);
        let handler: EndTagHandler<'static> = Box::new(move |_: &mut EndTag<'_>| -> HandlerResult {
            verbatim.borrow_mut().leave();
            Ok(())
        });
        handlers.push(handler);
        Ok(())
    })
}

fn attribute_placeholder_handler<'h>(
    sink: &Rc<RefCell<MarkerSink<'h>>>,
    verbatim: &Rc<RefCell<VerbatimTracker>>,
) -> (Cow<'static, Selector>, ElementContentHandlers<'h>) {
    let sink = Rc::clone(sink);
    let verbatim = Rc::clone(verbatim);
    element!("[data-component]", move |el| {
        if verbatim.borrow().is_open() {
            return Ok(());
        }
        let Some(component) = el.get_attribute("data-component") else {
            return Ok(());
        };

        let offset = el.source_location().bytes().start;
        let name = component.trim().to_ascii_lowercase();
        let mut sink = sink.borrow_mut();
        if !is_valid_widget_name(&name) {
            let location = SourceLocation::from_offset(sink.source, offset);
            sink.diagnostics.add_warning(Warning::InvalidWidgetName { location, name });
            return Ok(());
        }

        let params = el.get_attribute("data-params");
        let id = sink.push(&name, params.as_deref(), offset, Dialect::Attribute);
        el.set_attribute(ANCHOR_ATTRIBUTE, &id)?;
        Ok(())
    })
}

/// Neutralizes verbatim text and expands bracket placeholders in body text.
///
/// A text node may arrive in several chunks; they are buffered so a
/// placeholder split across chunks is still seen whole.
fn text_handler<'h>(
    sink: &Rc<RefCell<MarkerSink<'h>>>,
    verbatim: &Rc<RefCell<VerbatimTracker>>,
) -> DocumentContentHandlers<'h> {
    let sink = Rc::clone(sink);
    let verbatim = Rc::clone(verbatim);
    doc_text!(move |chunk| {
        let in_verbatim = verbatim.borrow().is_open();
        if !in_verbatim && !matches!(chunk.text_type(), TextType::Data) {
            return Ok(());
        }

        let mut sink = sink.borrow_mut();
        sink.text_start.get_or_insert(chunk.source_location().bytes().start);
        sink.text.push_str(chunk.as_str());
        if !chunk.last_in_text_node() {
            chunk.remove();
            return Ok(());
        }

        let text = std::mem::take(&mut sink.text);
        let offset = sink.text_start.take().unwrap_or_default();
        let replaced = if in_verbatim {
            neutralize(&text).into_owned()
        } else {
            sink.expand_brackets(&text, offset)
        };
        chunk.replace(&replaced, ContentType::Html);
        Ok(())
    })
}

/// Ids of every anchor present in `markup`.
fn anchor_ids(markup: &str) -> Result<HashSet<String>, InlayError> {
    let ids = Rc::new(RefCell::new(HashSet::new()));
    rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: vec![element!("[data-inlay-anchor]", {
                let ids = Rc::clone(&ids);
                move |el| {
                    if let Some(id) = el.get_attribute(ANCHOR_ATTRIBUTE) {
                        ids.borrow_mut().insert(id);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(ids.take())
}
