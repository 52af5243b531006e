use std::cell::{Cell, RefCell};
use std::rc::Rc;

use inlay_core::{Warning, process};
use inlay_engine::registry::defaults::default_blog_registry;
use inlay_engine::{
    EngineConfig, FactoryTable, Host, MarkerStatus, MarkupHost, MountEngine, MountError,
    MountedWidget, RenderOutcome, ValidatedParams,
};

/// Factory for the stock blog widgets, recording constructions and disposals.
struct Blog {
    built: Rc<RefCell<Vec<String>>>,
    disposed: Rc<Cell<usize>>,
}

impl Blog {
    fn new() -> Self {
        Self {
            built: Rc::new(RefCell::new(Vec::new())),
            disposed: Rc::new(Cell::new(0)),
        }
    }

    fn widget(
        &self,
        name: &'static str,
        root: impl Fn(&ValidatedParams) -> String + 'static,
    ) -> impl Fn(&ValidatedParams) -> Result<MountedWidget, MountError> + 'static {
        let built = Rc::clone(&self.built);
        let disposed = Rc::clone(&self.disposed);
        move |params: &ValidatedParams| {
            built.borrow_mut().push(name.to_string());
            let disposed = Rc::clone(&disposed);
            Ok(MountedWidget::new(root(params), move || {
                disposed.set(disposed.get() + 1)
            }))
        }
    }

    fn factory(&self) -> FactoryTable {
        FactoryTable::new()
            .with(
                "latest-posts",
                self.widget("latest-posts", |params| {
                    let count = params.get("count").and_then(|v| v.as_f64()).unwrap_or_default();
                    let layout = params.get("layout").and_then(|v| v.as_str()).unwrap_or_default();
                    format!("<ol class=\"posts {layout}\" data-count=\"{count}\"></ol>")
                }),
            )
            .with(
                "tag-cloud",
                self.widget("tag-cloud", |_| "<nav class=\"tags\"></nav>".to_string()),
            )
            .with(
                "post-list-by-tag",
                self.widget("post-list-by-tag", |params| {
                    let tags = params.get("tags").and_then(|v| v.as_list()).unwrap_or_default();
                    format!("<ul data-tags=\"{}\"></ul>", tags.join(" "))
                }),
            )
            .with("newsletter-signup", |_| {
                Err(MountError::Construction("newsletter backend offline".to_string()))
            })
    }
}

#[test]
fn renders_a_post_with_mixed_placeholders() {
    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = MarkupHost::new();

    let content = concat!(
        "<h1>Release notes</h1>",
        "<p>Recent posts below.</p>",
        r#"[component latest-posts params="{&quot;count&quot;:3,&quot;layout&quot;:&quot;grid&quot;}"]"#,
        r#"<aside data-component="tag-cloud"></aside>"#,
        "<p>Write <code>[component tag-cloud]</code> to embed tags.</p>",
        "[[component latest-posts]]",
    );

    let (processed, outcome) = engine.render_content(&mut host, content).unwrap();
    assert_eq!(processed.markers.len(), 2);
    assert!(!processed.diagnostics.has_warnings());

    let report = outcome.report().expect("pass completes immediately");
    assert_eq!(report.mounted_count(), 2);
    assert_eq!(*blog.built.borrow(), vec!["latest-posts", "tag-cloud"]);

    let html = host.to_html().unwrap();
    assert!(html.contains(r#"<ol class="posts grid" data-count="3"></ol>"#));
    assert!(html.contains(r#"<nav class="tags"></nav></aside>"#));
    assert!(html.contains("[component latest-posts]"));

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.title.as_deref(), Some("Release notes"));
    assert!(summary.description.as_deref().unwrap().contains("[component tag-cloud]"));
}

#[test]
fn failures_stay_inside_their_anchor() {
    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = MarkupHost::new();

    let content = concat!(
        "[component post-list-by-tag]",
        "[component newsletter-signup]",
        "[component image-gallery params='{\"album\":\"trips\"}']",
        "[component unknown-widget]",
        "[component post-list-by-tag params='{\"tags\":\"rust, web\"}']",
    );
    let (_, outcome) = engine.render_content(&mut host, content).unwrap();
    let report = outcome.report().unwrap();

    let statuses: Vec<_> = report.statuses.iter().map(|(_, s)| s.clone()).collect();
    assert!(matches!(statuses[0], MarkerStatus::Invalid(ref m) if m.contains("tags")));
    assert!(matches!(statuses[1], MarkerStatus::Failed(ref m) if m.contains("offline")));
    assert!(matches!(statuses[2], MarkerStatus::Failed(ref m) if m.contains("no constructor")));
    assert_eq!(statuses[3], MarkerStatus::Inert);
    assert_eq!(statuses[4], MarkerStatus::Mounted);

    assert_eq!(host.widget_at("inlay-widget-4"), Some(r#"<ul data-tags="rust web"></ul>"#));
    let html = host.to_html().unwrap();
    assert_eq!(html.matches("class=\"inlay-widget-error\"").count(), 3);
}

#[test]
fn malformed_params_fall_back_to_defaults() {
    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = MarkupHost::new();

    let (processed, outcome) = engine
        .render_content(&mut host, "[component latest-posts params=\"{not json\"]")
        .unwrap();
    assert!(matches!(
        processed.diagnostics.warnings.as_slice(),
        [Warning::MalformedParams { .. }]
    ));
    assert!(processed.markers[0].raw_params.is_none());

    assert_eq!(outcome.report().unwrap().mounted_count(), 1);
    assert_eq!(
        host.widget_at("inlay-widget-0"),
        Some(r#"<ol class="posts list" data-count="5"></ol>"#)
    );
}

#[test]
fn rerendering_disposes_previous_instances_exactly_once() {
    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = MarkupHost::new();

    let content = "[component tag-cloud][component tag-cloud][component latest-posts]";
    engine.render_content(&mut host, content).unwrap();
    assert_eq!(engine.mounted().len(), 3);

    engine.render_content(&mut host, "[component tag-cloud]").unwrap();
    assert_eq!(blog.disposed.get(), 3);

    engine.render_content(&mut host, "<p>No widgets anymore.</p>").unwrap();
    assert_eq!(blog.disposed.get(), 4);
    assert!(engine.mounted().is_empty());
}

#[test]
fn rapid_edits_only_mount_the_latest_content() {
    let blog = Blog::new();
    let config = EngineConfig {
        anchor_retry_budget: 3,
        ..EngineConfig::default()
    };
    let mut engine = MountEngine::with_config(default_blog_registry(), blog.factory(), config);
    let mut host = MarkupHost::from_config(engine.config()).with_ready_after(1);

    let (_, first) = engine.render_content(&mut host, "[component latest-posts]").unwrap();
    let (_, second) = engine.render_content(&mut host, "[component tag-cloud]").unwrap();
    let (RenderOutcome::Pending(old), RenderOutcome::Pending(new)) = (first, second) else {
        panic!("both passes should wait for the lagging host");
    };
    assert!(old < new);

    let outcome = engine.run_until_idle(&mut host);
    let report = outcome.report().unwrap();
    assert_eq!(report.token, new);
    assert_eq!(*blog.built.borrow(), vec!["tag-cloud"]);
    assert_eq!(host.commit_count(), 2);
}

#[test]
fn abandoned_pass_mounts_nothing() {
    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = MarkupHost::new();

    let processed = process("[component tag-cloud]").unwrap();
    // Commit different markup than the markers describe, so anchors never show up.
    let outcome = engine.render(&mut host, "<p>stale</p>", processed.markers);
    assert!(outcome.is_pending());

    let outcome = engine.run_until_idle(&mut host);
    assert!(matches!(outcome, RenderOutcome::Abandoned { attempts: 5, .. }));
    assert!(blog.built.borrow().is_empty());
    assert_eq!(host.to_html().unwrap(), "<p>stale</p>");
}

#[test]
fn widgets_on_sanitized_elements_are_dropped_not_abandoned() {
    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = MarkupHost::new();

    let content = r#"[component tag-cloud]<form data-component="newsletter-signup"></form>"#;
    let (processed, outcome) = engine.render_content(&mut host, content).unwrap();
    assert_eq!(processed.markers.len(), 1);
    assert!(matches!(
        processed.diagnostics.warnings.as_slice(),
        [Warning::AnchorRemoved { marker_id, .. }] if marker_id == "inlay-widget-1"
    ));

    let report = outcome.report().expect("pass completes without waiting");
    assert_eq!(report.mounted_count(), 1);
    assert_eq!(host.widget_at("inlay-widget-0"), Some(r#"<nav class="tags"></nav>"#));
}

#[test]
fn author_anchor_attributes_never_capture_widgets() {
    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = MarkupHost::new();

    let content = concat!(
        r#"<p data-inlay-anchor="inlay-widget-0">author text</p>"#,
        r#"<div data-inlay-anchor="x" data-component="tag-cloud"></div>"#,
        "[component tag-cloud]",
    );
    let (_, outcome) = engine.render_content(&mut host, content).unwrap();
    assert_eq!(outcome.report().unwrap().mounted_count(), 2);
    assert_eq!(*blog.built.borrow(), vec!["tag-cloud", "tag-cloud"]);

    let html = host.to_html().unwrap();
    assert!(html.starts_with("<p>author text</p>"));
    assert_eq!(html.matches(r#"<nav class="tags"></nav>"#).count(), 2);
}

#[test]
fn custom_hosts_drive_the_same_lifecycle() {
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Host for Recorder {
        fn commit(&mut self, _markup: &str) {
            self.calls.push("commit".to_string());
        }
        fn has_anchor(&self, _id: &str) -> bool {
            true
        }
        fn fill_anchor(&mut self, id: &str, _root_html: &str) {
            self.calls.push(format!("fill {id}"));
        }
        fn show_error(&mut self, id: &str, _message: &str) {
            self.calls.push(format!("error {id}"));
        }
        fn request_frame(&mut self, _token: inlay_engine::PassToken) {
            self.calls.push("frame".to_string());
        }
    }

    let blog = Blog::new();
    let mut engine = MountEngine::new(default_blog_registry(), blog.factory());
    let mut host = Recorder::default();
    engine
        .render_content(&mut host, "[component tag-cloud][component post-list-by-tag]")
        .unwrap();

    assert_eq!(
        host.calls,
        vec!["commit", "fill inlay-widget-0", "error inlay-widget-1"]
    );
}
