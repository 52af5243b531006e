//! Post-neutralization HTML cleaning.
//!
//! Author markup is not trusted: scripts, styles, event handlers and
//! `javascript:` URLs are removed before the markup reaches a document. The
//! allow-list keeps every verbatim element and the `data-*` attributes that
//! carry widget anchors.

use ammonia::Builder as AmmoniaBuilder;
use once_cell::sync::Lazy;

static CONTENT_SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(build_content_sanitizer);

fn build_content_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.add_tags(&["figure", "figcaption", "picture", "source", "video", "audio", "section"]);
    builder.add_generic_attributes(&["class", "id", "role", "aria-label", "aria-hidden"]);
    builder.add_generic_attribute_prefixes(&["data-"]);
    builder.add_tag_attributes("img", &["loading", "decoding", "srcset", "sizes"]);
    builder.add_tag_attributes("source", &["src", "srcset", "type", "media"]);
    builder.add_tag_attributes("video", &["src", "controls", "poster", "preload"]);
    builder.add_tag_attributes("audio", &["src", "controls", "preload"]);

    builder
}

/// Clean markup with the content allow-list.
pub fn sanitize_markup(markup: &str) -> String {
    CONTENT_SANITIZER.clean(markup).to_string()
}
