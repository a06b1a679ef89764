use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use viewport_units_buggyfill::core::dom::IE9_APP_VERSION;
use viewport_units_buggyfill::core::events::RESIZE;
use viewport_units_buggyfill::{
    BuggyfillConfig, BuggyfillError, Event, EventSystem, Host, HostError, InitOutcome, MemoryDocument, NodeId,
    ResizeEvent, StyleSheet, ViewportSize, ViewportUnitsBuggyfill, STYLE_NODE_ID,
};

const MODERN_APP_VERSION: &str = "5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

fn setup(app_version: &str, css: &str) -> (Arc<MemoryDocument>, Arc<EventSystem>, ViewportUnitsBuggyfill<MemoryDocument>) {
    let document = Arc::new(MemoryDocument::new(app_version, ViewportSize::new(1000.0, 800.0)));
    if !css.is_empty() {
        document.append_style(css);
    }
    let events = Arc::new(EventSystem::new());
    let buggyfill = ViewportUnitsBuggyfill::new(Arc::clone(&document), Arc::clone(&events));
    (document, events, buggyfill)
}

fn output(document: &MemoryDocument) -> String {
    document
        .find_by_id(STYLE_NODE_ID)
        .map(|element| element.text)
        .unwrap_or_default()
}

#[test]
fn test_not_applicable_environment_is_left_alone() {
    let (document, events, buggyfill) = setup(MODERN_APP_VERSION, ".a { height: 50vh }");

    let outcome = buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    assert_eq!(outcome, InitOutcome::NotApplicable);
    assert!(!buggyfill.is_initialized());
    assert!(document.find_by_id(STYLE_NODE_ID).is_none());
    assert_eq!(events.listener_count(RESIZE), 0);

    assert!(!buggyfill.refresh().unwrap());
    assert_eq!(document.style_writes(), 0);
}

#[test]
fn test_force_activates_anywhere() {
    let (document, _events, buggyfill) = setup(MODERN_APP_VERSION, ".a { height: 50vh }");

    let outcome = buggyfill.initialize(&BuggyfillConfig::forced()).unwrap();

    assert_eq!(outcome, InitOutcome::Activated);
    assert_eq!(output(&document), ".a {\nheight: 400px;\n}");
}

#[test]
fn test_initialize_only_once() {
    let (document, events, buggyfill) = setup(IE9_APP_VERSION, ".a { height: 50vh }");

    assert_eq!(buggyfill.initialize(&BuggyfillConfig::default()).unwrap(), InitOutcome::Activated);
    assert_eq!(
        buggyfill.initialize(&BuggyfillConfig::forced()).unwrap(),
        InitOutcome::AlreadyInitialized
    );

    let outputs = document
        .style_elements()
        .into_iter()
        .filter(|element| element.id.as_deref() == Some(STYLE_NODE_ID))
        .count();
    assert_eq!(outputs, 1);
    assert_eq!(events.listener_count(RESIZE), 1);
    assert_eq!(document.style_writes(), 1);
}

#[test]
fn test_output_never_feeds_back_into_next_pass() {
    let (document, _events, buggyfill) = setup(IE9_APP_VERSION, ".a { height: 50vh }");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    for _ in 0..3 {
        assert!(buggyfill.refresh().unwrap());
    }

    assert_eq!(output(&document), ".a {\nheight: 400px;\n}");
    assert_eq!(document.style_writes(), 4);
}

#[test]
fn test_output_moves_after_late_styles() {
    let (document, _events, buggyfill) = setup(IE9_APP_VERSION, ".a { height: 50vh }");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    document.append_style(".b { width: 10vw }");
    buggyfill.refresh().unwrap();

    let elements = document.style_elements();
    assert_eq!(elements.last().and_then(|e| e.id.as_deref()), Some(STYLE_NODE_ID));
    assert_eq!(output(&document), ".a {\nheight: 400px;\n}\n\n.b {\nwidth: 100px;\n}");
}

#[test]
fn test_declaration_in_style_rule() {
    let (document, _events, buggyfill) = setup(IE9_APP_VERSION, ".box { height: 50vh; color: red }");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    assert_eq!(output(&document), ".box {\nheight: 400px;\n}");
}

#[test]
fn test_shared_media_condition_is_one_block() {
    let (document, _events, buggyfill) = setup(
        IE9_APP_VERSION,
        "@media (min-width: 500px) { .a { top: 10vh } .a { left: 10vw } }",
    );
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    assert_eq!(
        output(&document),
        "@media (min-width: 500px) {\n.a {\ntop: 80px;\nleft: 100px;\n}\n}"
    );
}

#[test]
fn test_keyframes_are_emitted_unwrapped() {
    let (document, _events, buggyfill) = setup(IE9_APP_VERSION, "@keyframes grow { to { width: 100vw } }");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    assert_eq!(output(&document), "@keyframes grow { to { width: 1000px } }");
}

#[test]
fn test_important_survives_rewrite() {
    let (document, _events, buggyfill) = setup(IE9_APP_VERSION, "a { top: 10vh !important }");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    assert_eq!(output(&document), "a {\ntop: 80px !important;\n}");
}

#[test]
fn test_sheet_media_and_access_are_respected() {
    let (document, _events, buggyfill) = setup(IE9_APP_VERSION, ".a { top: 1vh }");
    document.append_style_with(None, Some("print"), ".b { top: 2vh }");
    document.append_inaccessible_style(".c { top: 3vh }");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    assert_eq!(output(&document), ".a {\ntop: 8px;\n}");

    document.set_media_evaluation(false);
    buggyfill.refresh().unwrap();

    assert_eq!(output(&document), ".a {\ntop: 8px;\n}\n\n.b {\ntop: 16px;\n}");
}

#[test]
fn test_resize_without_runtime_refreshes_immediately() {
    let (document, events, buggyfill) = setup(IE9_APP_VERSION, ".a { height: 50vh }");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();

    document.set_viewport(1000.0, 300.0);
    events.dispatch_event(&Event::Resize(ResizeEvent {
        width: 1000.0,
        height: 300.0,
    }));

    assert_eq!(output(&document), ".a {\nheight: 150px;\n}");
}

#[test]
fn test_missing_head_fails_initialization() {
    let document = Arc::new(MemoryDocument::headless(IE9_APP_VERSION, ViewportSize::new(1.0, 1.0)));
    let events = Arc::new(EventSystem::new());
    let buggyfill = ViewportUnitsBuggyfill::new(document, Arc::clone(&events));

    let result = buggyfill.initialize(&BuggyfillConfig::default());

    assert!(matches!(result, Err(BuggyfillError::Host(HostError::MissingHead))));
    assert!(!buggyfill.is_initialized());
    assert_eq!(events.listener_count(RESIZE), 0);
}

#[test]
fn test_dropping_buggyfill_unsubscribes() {
    let (_document, events, buggyfill) = setup(IE9_APP_VERSION, "");
    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();
    assert_eq!(events.listener_count(RESIZE), 1);

    drop(buggyfill);

    assert_eq!(events.listener_count(RESIZE), 0);
}

/// Reports a taller viewport on every read.
struct GrowingViewportHost {
    document: MemoryDocument,
    viewport_reads: AtomicUsize,
}

impl Host for GrowingViewportHost {
    fn app_version(&self) -> String {
        self.document.app_version()
    }

    fn style_sheets(&self) -> Vec<StyleSheet> {
        self.document.style_sheets()
    }

    fn viewport_size(&self) -> ViewportSize {
        let reads = self.viewport_reads.fetch_add(1, Ordering::SeqCst) + 1;
        ViewportSize::new(1000.0, 100.0 * reads as f64)
    }

    fn insert_style_node(&self, id: &str) -> viewport_units_buggyfill::core::dom::Result<NodeId> {
        self.document.insert_style_node(id)
    }

    fn update_style_node(&self, node: NodeId, css_text: &str) -> viewport_units_buggyfill::core::dom::Result<()> {
        self.document.update_style_node(node, css_text)
    }
}

#[test]
fn test_viewport_is_read_once_per_pass() {
    let host = Arc::new(GrowingViewportHost {
        document: MemoryDocument::new(IE9_APP_VERSION, ViewportSize::new(1.0, 1.0)),
        viewport_reads: AtomicUsize::new(0),
    });
    host.document.append_style("a { top: 100vh } b { top: 100vh }");
    let buggyfill = ViewportUnitsBuggyfill::new(Arc::clone(&host), Arc::new(EventSystem::new()));

    buggyfill.initialize(&BuggyfillConfig::default()).unwrap();
    assert_eq!(output(&host.document), "a {\ntop: 100px;\n}\n\nb {\ntop: 100px;\n}");
    assert_eq!(host.viewport_reads.load(Ordering::SeqCst), 1);

    buggyfill.refresh().unwrap();
    assert_eq!(output(&host.document), "a {\ntop: 200px;\n}\n\nb {\ntop: 200px;\n}");
    assert_eq!(host.viewport_reads.load(Ordering::SeqCst), 2);

    assert_eq!(buggyfill.generate_css(), "a {\ntop: 300px;\n}\n\nb {\ntop: 300px;\n}");
    assert_eq!(host.viewport_reads.load(Ordering::SeqCst), 3);
}

/// Queries the buggyfill it is attached to from inside its own callbacks.
struct ObservingHost {
    document: MemoryDocument,
    buggyfill: OnceCell<Weak<ViewportUnitsBuggyfill<ObservingHost>>>,
    observed: Mutex<Vec<(&'static str, bool)>>,
}

impl ObservingHost {
    fn observe(&self, call: &'static str) {
        if let Some(buggyfill) = self.buggyfill.get().and_then(Weak::upgrade) {
            let initialized = buggyfill.is_initialized();
            assert_eq!(buggyfill.style_node().is_some(), initialized);
            self.observed.lock().push((call, initialized));
        }
    }
}

impl Host for ObservingHost {
    fn app_version(&self) -> String {
        self.observe("app_version");
        self.document.app_version()
    }

    fn style_sheets(&self) -> Vec<StyleSheet> {
        self.document.style_sheets()
    }

    fn viewport_size(&self) -> ViewportSize {
        self.document.viewport_size()
    }

    fn insert_style_node(&self, id: &str) -> viewport_units_buggyfill::core::dom::Result<NodeId> {
        self.observe("insert_style_node");
        self.document.insert_style_node(id)
    }

    fn update_style_node(&self, node: NodeId, css_text: &str) -> viewport_units_buggyfill::core::dom::Result<()> {
        self.observe("update_style_node");
        self.document.update_style_node(node, css_text)
    }
}

#[test]
fn test_host_callbacks_may_query_the_buggyfill() {
    let host = Arc::new(ObservingHost {
        document: MemoryDocument::new(IE9_APP_VERSION, ViewportSize::new(1000.0, 800.0)),
        buggyfill: OnceCell::new(),
        observed: Mutex::new(Vec::new()),
    });
    host.document.append_style(".a { height: 50vh }");

    let buggyfill = Arc::new(ViewportUnitsBuggyfill::new(Arc::clone(&host), Arc::new(EventSystem::new())));
    assert!(host.buggyfill.set(Arc::downgrade(&buggyfill)).is_ok());

    assert_eq!(buggyfill.initialize(&BuggyfillConfig::default()).unwrap(), InitOutcome::Activated);

    assert_eq!(
        *host.observed.lock(),
        vec![
            ("app_version", false),
            ("insert_style_node", false),
            ("update_style_node", true),
        ]
    );
    assert_eq!(output(&host.document), ".a {\nheight: 400px;\n}");
}
