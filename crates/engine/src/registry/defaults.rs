//! Stock widget descriptors for the blog.
//!
//! These are the widgets editors can drop into posts and pages out of the box.
//! Each widget fetches its own data; only the schemas live here.

use super::WidgetRegistry;
use super::types::{ParamSpec, ParamType, WidgetCategory, WidgetDescriptor};

/// Names of the stock widgets, in palette order.
pub const DEFAULT_WIDGET_NAMES: &[&str] = &[
    "latest-posts",
    "tag-cloud",
    "category-list",
    "post-list-by-tag",
    "newsletter-signup",
    "image-gallery",
];

/// Creates a registry holding the stock blog widgets.
///
/// # Example
///
/// ```
/// use inlay_engine::registry::defaults::default_blog_registry;
///
/// let registry = default_blog_registry();
/// assert!(registry.contains("latest-posts"));
/// assert_eq!(registry.lookup("tag-cloud").unwrap().title, "Tag cloud");
/// ```
pub fn default_blog_registry() -> WidgetRegistry {
    let mut registry = WidgetRegistry::new();
    register_defaults(&mut registry);
    registry
}

/// Registers the stock blog widgets into `registry`.
pub fn register_defaults(registry: &mut WidgetRegistry) {
    for descriptor in default_descriptors() {
        registry.register(descriptor.name.clone(), descriptor);
    }
}

/// The stock descriptors, in palette order.
pub fn default_descriptors() -> Vec<WidgetDescriptor> {
    vec![
        WidgetDescriptor::new("latest-posts", "Latest posts", WidgetCategory::Content)
            .describe("The most recently published posts")
            .with_icon("newspaper")
            .param(
                ParamSpec::new("count", ParamType::Number)
                    .required()
                    .with_default(5)
                    .describe("How many posts to show"),
            )
            .param(
                ParamSpec::new("category", ParamType::String)
                    .with_pattern(r"^[a-z0-9-]*$")
                    .describe("Only posts in this category slug"),
            )
            .param(
                ParamSpec::new("layout", ParamType::Select)
                    .with_options(&["list", "grid", "compact"])
                    .with_default("list")
                    .describe("Presentation"),
            )
            .param(
                ParamSpec::new("showExcerpt", ParamType::Boolean)
                    .with_default(true)
                    .describe("Show the post excerpt under each title"),
            ),
        WidgetDescriptor::new("tag-cloud", "Tag cloud", WidgetCategory::Widget)
            .describe("Tags sized by how often they are used")
            .with_icon("tags")
            .param(
                ParamSpec::new("limit", ParamType::Number)
                    .with_default(30)
                    .describe("Maximum number of tags"),
            )
            .param(
                ParamSpec::new("sort", ParamType::Select)
                    .with_options(&["name", "count"])
                    .with_default("count"),
            ),
        WidgetDescriptor::new("category-list", "Categories", WidgetCategory::Widget)
            .describe("All categories with post counts")
            .with_icon("folder")
            .param(ParamSpec::new("showCounts", ParamType::Boolean).with_default(true))
            .param(ParamSpec::new("hideEmpty", ParamType::Boolean).with_default(false)),
        WidgetDescriptor::new("post-list-by-tag", "Posts by tag", WidgetCategory::Content)
            .describe("Posts carrying any of the selected tags")
            .with_icon("list")
            .param(
                ParamSpec::new("tags", ParamType::Multiselect)
                    .required()
                    .describe("Tag slugs, comma separated"),
            )
            .param(ParamSpec::new("count", ParamType::Number).with_default(10)),
        WidgetDescriptor::new("newsletter-signup", "Newsletter signup", WidgetCategory::Form)
            .describe("Email subscription form")
            .with_icon("mail")
            .param(ParamSpec::new("heading", ParamType::String).with_default("Subscribe"))
            .param(
                ParamSpec::new("buttonLabel", ParamType::String)
                    .with_default("Sign up")
                    .with_pattern(r"^.{1,40}$"),
            ),
        WidgetDescriptor::new("image-gallery", "Image gallery", WidgetCategory::Media)
            .describe("Grid of images from an album")
            .with_icon("image")
            .param(
                ParamSpec::new("album", ParamType::String)
                    .required()
                    .with_pattern(r"^[a-z0-9-]+$"),
            )
            .param(
                ParamSpec::new("columns", ParamType::Select)
                    .with_options(&["2", "3", "4"])
                    .with_default("3"),
            ),
    ]
}
