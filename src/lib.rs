//! Viewport units buggyfill
//!
//! Some engines resolve `vh`, `vw`, `vmin` and `vmax` once and never again,
//! so layouts break as soon as the window is resized. This crate finds every
//! declaration that uses those units, recomputes them as pixels for the
//! current viewport, and writes the result into one override `<style>`
//! element kept at the end of the document head.
//!
//! Notes for the embedding crate:
//!  - The host environment is reached through [`Host`]; viewport-change
//!    notifications come in through an [`EventSystem`].
//!  - Debounced refreshes are scheduled on the ambient tokio runtime. A
//!    single-thread runtime is enough:
//!    `#[tokio::main(flavor = "current_thread")] async fn main() { /* ... */ }`

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod config;
pub mod core;

pub use crate::config::{BuggyfillConfig, ConfigError};
pub use crate::core::build_override_css;
pub use crate::core::css::{CssRule, StyleSheet, ViewportUnit};
pub use crate::core::dom::{Host, HostError, MemoryDocument, NodeId};
pub use crate::core::events::{Event, EventSystem, ResizeEvent};
pub use crate::core::viewport::{ViewportSample, ViewportSize};

use crate::core::debounce::Debouncer;
use crate::core::events::{ListenerId, ORIENTATION_CHANGE, RESIZE};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `id` of the override `<style>` element. Sheets owned by it are never
/// scanned.
pub const STYLE_NODE_ID: &str = "patched-viewport";

#[derive(Error, Debug)]
pub enum BuggyfillError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, BuggyfillError>;

/// Whether the environment is the one whose viewport units need patching
/// (Internet Explorer 9).
pub fn is_target_environment(app_version: &str) -> bool {
    app_version.contains("MSIE 9.")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Activated,
    AlreadyInitialized,
    /// Not the target environment and activation was not forced.
    NotApplicable,
}

enum Lifecycle {
    Uninitialized,
    /// Host calls of `initialize` are in flight; the lock is not held
    /// across them.
    Initializing,
    Initialized(ActiveState),
}

struct ActiveState {
    style_node: NodeId,
    debouncer: Arc<Debouncer>,
    listeners: Vec<ListenerId>,
}

struct Inner<H: Host> {
    host: Arc<H>,
    events: Arc<EventSystem>,
    lifecycle: Mutex<Lifecycle>,
}

/// Entry point: initialize once, then every viewport change (debounced)
/// or explicit [`refresh`](Self::refresh) regenerates the override sheet.
///
/// The lifecycle and the override element belong to the instance, not the
/// process. Keep one instance per host: a second one initialized against
/// the same host inserts a second `patched-viewport` element, and each
/// excludes both from its scans only because they share the id.
pub struct ViewportUnitsBuggyfill<H: Host> {
    inner: Arc<Inner<H>>,
}

impl<H: Host> ViewportUnitsBuggyfill<H> {
    pub fn new(host: Arc<H>, events: Arc<EventSystem>) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                events,
                lifecycle: Mutex::new(Lifecycle::Uninitialized),
            }),
        }
    }

    pub fn version(&self) -> &'static str {
        VERSION
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.inner.lifecycle.lock(), Lifecycle::Initialized(_))
    }

    /// The override element, once initialized.
    pub fn style_node(&self) -> Option<NodeId> {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Initialized(active) => Some(active.style_node),
            Lifecycle::Uninitialized | Lifecycle::Initializing => None,
        }
    }

    /// Whether a debounced refresh is waiting for its quiet period.
    pub fn has_pending_refresh(&self) -> bool {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Initialized(active) => active.debouncer.is_pending(),
            Lifecycle::Uninitialized | Lifecycle::Initializing => false,
        }
    }

    /// Activates the buggyfill: inserts the override element, subscribes to
    /// viewport changes and runs the first pass. Later calls do nothing.
    ///
    /// The lifecycle lock is only taken between host calls, so a host may
    /// query this instance from inside its callbacks.
    pub fn initialize(&self, config: &BuggyfillConfig) -> Result<InitOutcome> {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Uninitialized) {
                return Ok(InitOutcome::AlreadyInitialized);
            }
            *lifecycle = Lifecycle::Initializing;
        }

        let app_version = self.inner.host.app_version();
        if !config.force && !is_target_environment(&app_version) {
            debug!("Viewport units buggyfill not needed for {:?}", app_version);
            *self.inner.lifecycle.lock() = Lifecycle::Uninitialized;
            return Ok(InitOutcome::NotApplicable);
        }

        let style_node = match self.inner.host.insert_style_node(STYLE_NODE_ID) {
            Ok(node) => node,
            Err(e) => {
                *self.inner.lifecycle.lock() = Lifecycle::Uninitialized;
                return Err(e.into());
            }
        };

        let weak = Arc::downgrade(&self.inner);
        let debouncer = Arc::new(Debouncer::new(config.debounce_wait(), move || {
            refresh_from_timer(&weak);
        }));

        let listeners = [RESIZE, ORIENTATION_CHANGE]
            .into_iter()
            .map(|event_type| {
                let debouncer = Arc::clone(&debouncer);
                self.inner
                    .events
                    .add_global_listener(event_type, move |_| debouncer.trigger())
            })
            .collect();

        *self.inner.lifecycle.lock() = Lifecycle::Initialized(ActiveState {
            style_node,
            debouncer,
            listeners,
        });

        info!(
            "Viewport units buggyfill {} active (debounce {:?}, forced: {})",
            VERSION,
            config.debounce_wait(),
            config.force
        );

        if let Err(e) = self.inner.run_pass() {
            warn!("Initial viewport units pass failed: {}", e);
        }

        Ok(InitOutcome::Activated)
    }

    /// Runs a pass right away. Returns `false` when not initialized.
    pub fn refresh(&self) -> Result<bool> {
        self.inner.run_pass()
    }

    /// The override CSS for the current state of the document, without
    /// writing it anywhere.
    pub fn generate_css(&self) -> String {
        self.inner.generate_css()
    }
}

fn refresh_from_timer<H: Host>(inner: &Weak<Inner<H>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    if let Err(e) = inner.run_pass() {
        warn!("Debounced viewport units pass failed: {}", e);
    }
}

impl<H: Host> Inner<H> {
    fn run_pass(&self) -> Result<bool> {
        let style_node = match &*self.lifecycle.lock() {
            Lifecycle::Initialized(active) => active.style_node,
            Lifecycle::Uninitialized | Lifecycle::Initializing => {
                debug!("Ignoring refresh before initialization");
                return Ok(false);
            }
        };

        let css = self.generate_css();
        self.host.update_style_node(style_node, &css)?;

        Ok(true)
    }

    fn generate_css(&self) -> String {
        let sheets = self.host.style_sheets();
        let sample = ViewportSample::from_size(self.host.viewport_size());

        build_override_css(&sheets, STYLE_NODE_ID, &sample, |media| {
            self.host.matches_media(media)
        })
    }
}

impl<H: Host> Drop for Inner<H> {
    fn drop(&mut self) {
        if let Lifecycle::Initialized(active) = &*self.lifecycle.get_mut() {
            active.debouncer.cancel();
            for listener in &active.listeners {
                self.events.remove_listener(*listener);
            }
        }
    }
}
