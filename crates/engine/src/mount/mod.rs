//! Mount engine: binds markers to live widgets inside one render pass.
//!
//! A pass tears down the previous pass's widgets, commits the new markup,
//! waits (a bounded number of frames) until the host can see every anchor and
//! then resolves markers in document order. Each marker is its own bulkhead:
//! an unknown widget, bad params or a failing constructor only affect that
//! anchor.

pub mod factory;
pub mod host;

pub use factory::{FactoryTable, MountError, MountedWidget, WidgetFactory};
pub use host::{DEFAULT_ERROR_CLASS, Host, MarkupHost};

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use inlay_core::{
    ContentSummary, InlayError, Marker, Processed, analyze_with_options, process_with_options,
};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::registry::WidgetRegistry;
use crate::validate::validate;

/// Identity of one render pass.
///
/// Tokens are handed to [`Host::request_frame`] and come back through
/// [`MountEngine::resume`]; a token from an older pass is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PassToken(u64);

impl PassToken {
    /// Wraps a raw generation number.
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// The pass generation, starting at 1 for the first pass.
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PassToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass#{}", self.0)
    }
}

/// What happened to one marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum MarkerStatus {
    /// A widget is live at the anchor.
    Mounted,
    /// The widget name is not registered; the anchor was left untouched.
    Inert,
    /// Params failed validation; an inline error is shown.
    Invalid(String),
    /// The constructor failed or panicked; an inline error is shown.
    Failed(String),
}

impl MarkerStatus {
    /// Whether a widget ended up live at the anchor.
    pub fn is_mounted(&self) -> bool {
        matches!(self, MarkerStatus::Mounted)
    }
}

/// Result of a pass that reached marker resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    /// The pass this report belongs to.
    pub token: PassToken,
    /// Anchor resolution attempts it took, including the first.
    pub attempts: usize,
    /// Per-marker outcome, in document order, keyed by marker id.
    pub statuses: Vec<(String, MarkerStatus)>,
    /// Analyzer output for the committed markup, if analysis succeeded.
    pub summary: Option<ContentSummary>,
}

impl RenderReport {
    /// Status of the marker with `id`.
    pub fn status(&self, id: &str) -> Option<&MarkerStatus> {
        self.statuses
            .iter()
            .find(|(marker_id, _)| marker_id == id)
            .map(|(_, status)| status)
    }

    /// Number of widgets mounted by this pass.
    pub fn mounted_count(&self) -> usize {
        self.statuses.iter().filter(|(_, s)| s.is_mounted()).count()
    }
}

/// Outcome of [`MountEngine::render`] or [`MountEngine::resume`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Some anchors are not visible yet; a frame was requested with this token.
    Pending(PassToken),
    /// Every marker was resolved.
    Completed(RenderReport),
    /// Anchors never appeared within the retry budget; nothing was mounted.
    Abandoned {
        /// The abandoned pass.
        token: PassToken,
        /// Attempts made.
        attempts: usize,
        /// Marker ids whose anchors were still missing.
        missing: Vec<String>,
    },
    /// The token belongs to a pass that is no longer current.
    Cancelled,
}

impl RenderOutcome {
    /// The report, for completed passes.
    pub fn report(&self) -> Option<&RenderReport> {
        match self {
            RenderOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }

    /// Whether the pass is waiting on a frame.
    pub fn is_pending(&self) -> bool {
        matches!(self, RenderOutcome::Pending(_))
    }
}

/// A live widget owned by the engine until the next pass.
pub struct MountedInstance {
    anchor_id: String,
    dispose: Box<dyn FnOnce()>,
}

impl MountedInstance {
    /// Id of the anchor the widget is mounted at.
    pub fn anchor_id(&self) -> &str {
        &self.anchor_id
    }

    fn dispose(self) {
        let anchor_id = self.anchor_id;
        let dispose = self.dispose;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(dispose)) {
            log::warn!(
                "disposer for anchor '{}' panicked: {}",
                anchor_id,
                panic_message(payload.as_ref())
            );
        }
    }
}

impl fmt::Debug for MountedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedInstance")
            .field("anchor_id", &self.anchor_id)
            .finish_non_exhaustive()
    }
}

struct PendingPass {
    token: PassToken,
    markup: String,
    markers: Vec<Marker>,
    attempts: usize,
}

type SummaryCallback = Box<dyn FnMut(&ContentSummary)>;

/// Drives render passes against a [`Host`].
pub struct MountEngine<F: WidgetFactory> {
    registry: WidgetRegistry,
    factory: F,
    config: EngineConfig,
    generation: u64,
    pending: Option<PendingPass>,
    mounted: Vec<MountedInstance>,
    last_outcome: RenderOutcome,
    on_summary: Option<SummaryCallback>,
}

impl<F: WidgetFactory> MountEngine<F> {
    /// Creates an engine with default configuration.
    pub fn new(registry: WidgetRegistry, factory: F) -> Self {
        Self::with_config(registry, factory, EngineConfig::default())
    }

    /// Creates an engine with explicit configuration.
    pub fn with_config(registry: WidgetRegistry, factory: F, config: EngineConfig) -> Self {
        Self {
            registry,
            factory,
            config,
            generation: 0,
            pending: None,
            mounted: Vec::new(),
            last_outcome: RenderOutcome::Cancelled,
            on_summary: None,
        }
    }

    /// Receives the content summary after every completed pass.
    pub fn on_summary(&mut self, callback: impl FnMut(&ContentSummary) + 'static) -> &mut Self {
        self.on_summary = Some(Box::new(callback));
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The registry markers are resolved against.
    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// Token of the most recent pass, if any pass has started.
    pub fn current_token(&self) -> Option<PassToken> {
        (self.generation > 0).then_some(PassToken(self.generation))
    }

    /// Whether a pass is waiting for anchors.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Widgets currently live.
    pub fn mounted(&self) -> &[MountedInstance] {
        &self.mounted
    }

    /// Outcome of the latest attempt of the current pass.
    ///
    /// [`RenderOutcome::Cancelled`] before the first pass and after a teardown.
    pub fn last_outcome(&self) -> &RenderOutcome {
        &self.last_outcome
    }

    /// Preprocess raw content with the configured options, then render it.
    ///
    /// Returns the processing result alongside the outcome so callers can
    /// surface its diagnostics. Content the rewriter rejects starts no pass.
    pub fn render_content<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        raw: &str,
    ) -> Result<(Processed, RenderOutcome), InlayError> {
        let processed = process_with_options(raw, &self.config.process)?;
        let outcome = self.render(host, &processed.markup, processed.markers.clone());
        Ok((processed, outcome))
    }

    /// Start a new pass for already-processed markup.
    ///
    /// Any previous pass is torn down first, including one still waiting for
    /// anchors.
    pub fn render<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        markup: &str,
        markers: Vec<Marker>,
    ) -> RenderOutcome {
        self.teardown();

        let token = PassToken(self.generation);
        log::trace!("{}: commit with {} markers", token, markers.len());
        host.commit(markup);

        self.pending = Some(PendingPass {
            token,
            markup: markup.to_string(),
            markers,
            attempts: 0,
        });
        self.attempt(host)
    }

    /// Continue a pending pass after a frame.
    ///
    /// Stale tokens return [`RenderOutcome::Cancelled`] without touching the host.
    pub fn resume<H: Host + ?Sized>(&mut self, host: &mut H, token: PassToken) -> RenderOutcome {
        match &self.pending {
            Some(pass) if pass.token == token => self.attempt(host),
            _ => {
                log::trace!("{}: stale frame ignored", token);
                RenderOutcome::Cancelled
            }
        }
    }

    /// Dispose every live widget and cancel any pending pass.
    pub fn teardown(&mut self) {
        self.generation += 1;
        if let Some(pass) = self.pending.take() {
            log::trace!("{}: cancelled by teardown", pass.token);
        }
        self.last_outcome = RenderOutcome::Cancelled;
        for instance in self.mounted.drain(..) {
            instance.dispose();
        }
    }

    fn attempt<H: Host + ?Sized>(&mut self, host: &mut H) -> RenderOutcome {
        let outcome = self.resolve_anchors(host);
        self.last_outcome = outcome.clone();
        outcome
    }

    fn resolve_anchors<H: Host + ?Sized>(&mut self, host: &mut H) -> RenderOutcome {
        let budget = self.config.anchor_retry_budget.max(1);
        let Some(pass) = self.pending.as_mut() else {
            return RenderOutcome::Cancelled;
        };
        pass.attempts += 1;

        let missing: Vec<String> = pass
            .markers
            .iter()
            .filter(|marker| !host.has_anchor(&marker.id))
            .map(|marker| marker.id.clone())
            .collect();

        if missing.is_empty() {
            let Some(pass) = self.pending.take() else {
                return RenderOutcome::Cancelled;
            };
            return RenderOutcome::Completed(self.mount_all(host, pass));
        }

        if pass.attempts >= budget {
            let token = pass.token;
            let attempts = pass.attempts;
            self.pending = None;
            log::warn!(
                "{}: abandoned after {} attempts, anchors not found: {}",
                token,
                attempts,
                missing.join(", ")
            );
            return RenderOutcome::Abandoned {
                token,
                attempts,
                missing,
            };
        }

        log::trace!(
            "{}: {} anchors missing on attempt {}, waiting a frame",
            pass.token,
            missing.len(),
            pass.attempts
        );
        host.request_frame(pass.token);
        RenderOutcome::Pending(pass.token)
    }

    fn mount_all<H: Host + ?Sized>(&mut self, host: &mut H, pass: PendingPass) -> RenderReport {
        let mut statuses = Vec::with_capacity(pass.markers.len());

        for marker in &pass.markers {
            let Some(descriptor) = self.registry.lookup(&marker.widget_name) else {
                log::debug!(
                    "no widget registered as '{}', leaving anchor '{}' inert",
                    marker.widget_name,
                    marker.id
                );
                statuses.push((marker.id.clone(), MarkerStatus::Inert));
                continue;
            };

            let params = match validate(descriptor, marker.raw_params.as_ref()) {
                Ok(params) => params,
                Err(err) => {
                    let message = format!("{}: {}", marker.widget_name, err);
                    host.show_error(&marker.id, &message);
                    statuses.push((marker.id.clone(), MarkerStatus::Invalid(message)));
                    continue;
                }
            };

            let factory = &self.factory;
            let built = panic::catch_unwind(AssertUnwindSafe(|| {
                factory.instantiate(descriptor, &params)
            }))
            .unwrap_or_else(|payload| {
                Err(MountError::Panicked {
                    name: descriptor.name.clone(),
                    message: panic_message(payload.as_ref()),
                })
            });

            match built {
                Ok(widget) => {
                    let (root_html, dispose) = widget.into_parts();
                    host.fill_anchor(&marker.id, &root_html);
                    self.mounted.push(MountedInstance {
                        anchor_id: marker.id.clone(),
                        dispose,
                    });
                    statuses.push((marker.id.clone(), MarkerStatus::Mounted));
                }
                Err(err) => {
                    log::warn!(
                        "failed to mount '{}' at '{}': {}",
                        marker.widget_name,
                        marker.id,
                        err
                    );
                    let message = format!("{}: {}", marker.widget_name, err);
                    host.show_error(&marker.id, &message);
                    statuses.push((marker.id.clone(), MarkerStatus::Failed(message)));
                }
            }
        }

        let summary = match analyze_with_options(&pass.markup, &self.config.analyze) {
            Ok(summary) => Some(summary),
            Err(err) => {
                log::warn!("{}: content analysis failed: {}", pass.token, err);
                None
            }
        };
        if let (Some(callback), Some(summary)) = (self.on_summary.as_mut(), summary.as_ref()) {
            callback(summary);
        }

        log::trace!(
            "{}: completed, {} of {} mounted",
            pass.token,
            self.mounted.len(),
            pass.markers.len()
        );
        RenderReport {
            token: pass.token,
            attempts: pass.attempts,
            statuses,
            summary,
        }
    }

    /// Drive frames on an in-memory host until the current pass settles.
    ///
    /// Returns the settled outcome, including for a pass that completed inside
    /// [`render`](Self::render) without queueing a frame.
    pub fn run_until_idle(&mut self, host: &mut MarkupHost) -> RenderOutcome {
        while let Some(token) = host.next_frame() {
            self.resume(host, token);
            if !self.is_pending() && host.pending_frames() == 0 {
                break;
            }
        }
        self.last_outcome.clone()
    }
}

impl<F: WidgetFactory> Drop for MountEngine<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<F: WidgetFactory + fmt::Debug> fmt::Debug for MountEngine<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountEngine")
            .field("factory", &self.factory)
            .field("config", &self.config)
            .field("generation", &self.generation)
            .field("pending", &self.pending.as_ref().map(|p| p.token))
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ParamSpec, ParamType, WidgetCategory, WidgetDescriptor};
    use crate::validate::ValidatedParams;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn process(raw: &str) -> Processed {
        inlay_core::process(raw).unwrap()
    }

    fn registry() -> WidgetRegistry {
        let mut registry = WidgetRegistry::new();
        registry.register(
            "counter",
            WidgetDescriptor::new("counter", "Counter", WidgetCategory::Widget)
                .param(ParamSpec::new("start", ParamType::Number).with_default(0)),
        );
        registry.register(
            "needs-title",
            WidgetDescriptor::new("needs-title", "Needs title", WidgetCategory::Content)
                .param(ParamSpec::new("title", ParamType::String).required()),
        );
        registry.register(
            "boom",
            WidgetDescriptor::new("boom", "Boom", WidgetCategory::Widget),
        );
        registry
    }

    fn factory(disposed: &Rc<Cell<usize>>, built: &Rc<Cell<usize>>) -> FactoryTable {
        let counter = {
            let disposed = Rc::clone(disposed);
            let built = Rc::clone(built);
            move |params: &ValidatedParams| -> Result<MountedWidget, MountError> {
                built.set(built.get() + 1);
                let start = params.get("start").and_then(|v| v.as_f64()).unwrap_or_default();
                let disposed = Rc::clone(&disposed);
                Ok(MountedWidget::new(format!("<output>{start}</output>"), move || {
                    disposed.set(disposed.get() + 1)
                }))
            }
        };
        let titled = {
            let disposed = Rc::clone(disposed);
            let built = Rc::clone(built);
            move |params: &ValidatedParams| -> Result<MountedWidget, MountError> {
                built.set(built.get() + 1);
                let title = params.get("title").and_then(|v| v.as_str()).unwrap_or_default();
                let disposed = Rc::clone(&disposed);
                Ok(MountedWidget::new(format!("<h3>{title}</h3>"), move || {
                    disposed.set(disposed.get() + 1)
                }))
            }
        };
        FactoryTable::new()
            .with("counter", counter)
            .with("needs-title", titled)
            .with("boom", |_| panic!("constructor exploded"))
    }

    fn engine() -> (MountEngine<FactoryTable>, Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let disposed = Rc::new(Cell::new(0));
        let built = Rc::new(Cell::new(0));
        let engine = MountEngine::new(registry(), factory(&disposed, &built));
        (engine, disposed, built)
    }

    #[test]
    fn mounts_every_marker_in_document_order() {
        let (mut engine, _, _) = engine();
        let mut host = MarkupHost::new();
        let processed = process(
            r#"[component counter params='{"start":3}'] and <div data-component="counter"></div>"#,
        );

        let outcome = engine.render(&mut host, &processed.markup, processed.markers);
        let report = outcome.report().unwrap();
        assert_eq!(report.attempts, 1);
        let ids: Vec<_> = report.statuses.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["inlay-widget-0", "inlay-widget-1"]);
        assert_eq!(host.widget_at("inlay-widget-0"), Some("<output>3</output>"));
        assert_eq!(host.widget_at("inlay-widget-1"), Some("<output>0</output>"));
        assert_eq!(engine.mounted().len(), 2);
    }

    #[test]
    fn invalid_marker_does_not_block_its_neighbours() {
        let (mut engine, _, _) = engine();
        let mut host = MarkupHost::new();
        let processed = process(
            r#"[component counter] [component needs-title] [component needs-title params='{"title":"Hi"}']"#,
        );

        let outcome = engine.render(&mut host, &processed.markup, processed.markers);
        let report = outcome.report().unwrap();
        assert_eq!(report.status("inlay-widget-0"), Some(&MarkerStatus::Mounted));
        assert!(matches!(
            report.status("inlay-widget-1"),
            Some(MarkerStatus::Invalid(message)) if message.contains("title")
        ));
        assert_eq!(report.status("inlay-widget-2"), Some(&MarkerStatus::Mounted));
        assert!(host.error_at("inlay-widget-1").is_some());
        assert_eq!(host.widget_at("inlay-widget-2"), Some("<h3>Hi</h3>"));
    }

    #[test]
    fn unknown_widget_leaves_anchor_inert() {
        let (mut engine, _, built) = engine();
        let mut host = MarkupHost::new();
        let processed = process("[component not-registered]");

        let outcome = engine.render(&mut host, &processed.markup, processed.markers);
        assert_eq!(
            outcome.report().unwrap().status("inlay-widget-0"),
            Some(&MarkerStatus::Inert)
        );
        assert!(host.widget_at("inlay-widget-0").is_none());
        assert!(host.error_at("inlay-widget-0").is_none());
        assert_eq!(built.get(), 0);
    }

    #[test]
    fn panicking_constructor_is_contained() {
        let (mut engine, _, _) = engine();
        let mut host = MarkupHost::new();
        let processed = process("[component boom] [component counter]");

        let outcome = engine.render(&mut host, &processed.markup, processed.markers);
        let report = outcome.report().unwrap();
        assert!(matches!(
            report.status("inlay-widget-0"),
            Some(MarkerStatus::Failed(message)) if message.contains("constructor exploded")
        ));
        assert_eq!(report.status("inlay-widget-1"), Some(&MarkerStatus::Mounted));
    }

    #[test]
    fn second_pass_disposes_exactly_the_first_pass_instances() {
        let (mut engine, disposed, _) = engine();
        let mut host = MarkupHost::new();

        let first = process("[component counter] [component counter] [component nope]");
        engine.render(&mut host, &first.markup, first.markers);
        assert_eq!(disposed.get(), 0);

        let second = process("[component counter]");
        engine.render(&mut host, &second.markup, second.markers);
        assert_eq!(disposed.get(), 2);

        engine.teardown();
        assert_eq!(disposed.get(), 3);
        engine.teardown();
        assert_eq!(disposed.get(), 3);
    }

    #[test]
    fn dropping_the_engine_disposes_live_widgets() {
        let (mut engine, disposed, _) = engine();
        let mut host = MarkupHost::new();
        let processed = process("[component counter]");
        engine.render(&mut host, &processed.markup, processed.markers);
        drop(engine);
        assert_eq!(disposed.get(), 1);
    }

    #[test]
    fn waits_for_a_lagging_host() {
        let (mut engine, _, _) = engine();
        let mut host = MarkupHost::new().with_ready_after(2);
        let processed = process("[component counter]");

        let outcome = engine.render(&mut host, &processed.markup, processed.markers);
        assert!(outcome.is_pending());

        let outcome = engine.run_until_idle(&mut host);
        let report = outcome.report().unwrap();
        assert_eq!(report.attempts, 3);
        assert_eq!(report.mounted_count(), 1);
    }

    #[test]
    fn idle_run_returns_a_pass_that_completed_immediately() {
        let (mut engine, _, _) = engine();
        let mut host = MarkupHost::new();
        let processed = process("[component counter]");

        let rendered = engine.render(&mut host, &processed.markup, processed.markers);
        assert_eq!(host.pending_frames(), 0);
        let idle = engine.run_until_idle(&mut host);
        assert_eq!(idle, rendered);
        assert_eq!(idle.report().map(RenderReport::mounted_count), Some(1));

        engine.teardown();
        assert_eq!(engine.run_until_idle(&mut host), RenderOutcome::Cancelled);
    }

    #[test]
    fn gives_up_after_the_retry_budget() {
        let (mut engine, _, built) = engine();
        let mut host = MarkupHost::new().with_ready_after(100);
        let processed = process("[component counter]");

        engine.render(&mut host, &processed.markup, processed.markers);
        let outcome = engine.run_until_idle(&mut host);
        assert_eq!(
            outcome,
            RenderOutcome::Abandoned {
                token: PassToken::new(1),
                attempts: 5,
                missing: vec!["inlay-widget-0".to_string()],
            }
        );
        assert_eq!(built.get(), 0);
        assert!(!engine.is_pending());
    }

    #[test]
    fn stale_frames_never_mount() {
        let (mut engine, _, built) = engine();
        let mut host = MarkupHost::new().with_ready_after(1);

        let first = process("[component counter]");
        let stale = match engine.render(&mut host, &first.markup, first.markers) {
            RenderOutcome::Pending(token) => token,
            other => panic!("expected pending, got {other:?}"),
        };

        let second = process("no widgets here");
        engine.render(&mut host, &second.markup, second.markers);

        host.next_frame();
        assert_eq!(engine.resume(&mut host, stale), RenderOutcome::Cancelled);
        assert_eq!(built.get(), 0);
        assert!(host.widget_at("inlay-widget-0").is_none());
    }

    #[test]
    fn completed_pass_reports_summary() {
        let (mut engine, _, _) = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        engine.on_summary({
            let seen = Rc::clone(&seen);
            move |summary| seen.borrow_mut().push(summary.title.clone())
        });
        let mut host = MarkupHost::new();

        let (_, outcome) = engine
            .render_content(&mut host, "<h1>Weekly notes</h1>[component counter]")
            .unwrap();
        let summary = outcome.report().and_then(|r| r.summary.as_ref()).unwrap();
        assert_eq!(summary.title.as_deref(), Some("Weekly notes"));
        assert_eq!(*seen.borrow(), vec![Some("Weekly notes".to_string())]);
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let payload = panic::catch_unwind(|| panic!("plain")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "plain");
        let payload = panic::catch_unwind(|| panic!("formatted {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 7");
    }
}
