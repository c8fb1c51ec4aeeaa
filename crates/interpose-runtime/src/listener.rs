//! Listener fan-out and the bundled listeners

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use interpose_core::{
    panic_message, ConfigurationError, Event, IgnoreReason, InstallationError, Listener,
    ListenerError, ListenerResult, LoaderId, Transformation,
};
use interpose_matcher::Matcher;

/// Ordered set of listeners with failure containment
///
/// Every delivery is guarded: a callback that returns an error or panics is
/// logged as a listener failure and the remaining listeners still run.
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Vec<Arc<dyn Listener>>,
    failures: Arc<AtomicU64>,
}

impl ListenerSet {
    pub fn new() -> Self {
        ListenerSet::default()
    }

    pub fn push(&mut self, listener: impl Listener + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    pub fn push_arc(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listener failures swallowed so far
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Deliver `event` to every listener
    pub fn emit(&self, event: &Event) {
        for listener in &self.listeners {
            self.guarded(event.name(), event.type_name(), || event.deliver(listener.as_ref()));
        }
    }

    /// Report a rejected startup option or selector
    pub fn emit_configuration_error(&self, error: &ConfigurationError) {
        for listener in &self.listeners {
            self.guarded("configuration", "-", || listener.on_configuration_error(error));
        }
    }

    fn guarded(&self, callback: &str, type_name: &str, deliver: impl FnOnce() -> ListenerResult) {
        let error = match panic::catch_unwind(AssertUnwindSafe(deliver)) {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => ListenerError::Panicked(panic_message(payload.as_ref())),
        };
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "[Listener] {} callback for {} discarded: {}",
            callback,
            type_name,
            error
        );
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.listeners.len())
            .field("failures", &self.failures())
            .finish()
    }
}

/// Logs pipeline events through `tracing`
///
/// Transformations and errors are always logged. Discovery, ignored and
/// complete events only in verbose mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamListener {
    verbose: bool,
    transformations_only: bool,
}

impl StreamListener {
    pub fn new(verbose: bool) -> Self {
        StreamListener {
            verbose,
            transformations_only: false,
        }
    }

    /// Log transformations and errors only, whatever the verbosity
    pub fn transformations_only() -> Self {
        StreamListener {
            verbose: false,
            transformations_only: true,
        }
    }

    fn chatty(&self) -> bool {
        self.verbose && !self.transformations_only
    }
}

impl Listener for StreamListener {
    fn on_discovery(&self, type_name: &str, loader: LoaderId) -> ListenerResult {
        if self.chatty() {
            tracing::info!("[Listener] discovered {} (loader {})", type_name, loader);
        }
        Ok(())
    }

    fn on_transformation(
        &self,
        type_name: &str,
        loader: LoaderId,
        transformation: &Transformation,
    ) -> ListenerResult {
        tracing::info!(
            "[Listener] transformed {} (loader {}): {} binding(s), {} installation(s)",
            type_name,
            loader,
            transformation.bindings.len(),
            transformation.installation_count()
        );
        if self.chatty() {
            for applied in &transformation.bindings {
                tracing::info!(
                    "[Listener]   {} {}({}) on {} method(s)",
                    applied.binding,
                    applied.kind,
                    applied.interceptor,
                    applied.methods.len()
                );
            }
        }
        Ok(())
    }

    fn on_ignored(&self, type_name: &str, _loader: LoaderId, reason: IgnoreReason) -> ListenerResult {
        if self.chatty() {
            tracing::info!("[Listener] ignored {}: {}", type_name, reason);
        }
        Ok(())
    }

    fn on_error(&self, type_name: &str, loader: LoaderId, cause: &InstallationError) -> ListenerResult {
        tracing::error!("[Listener] error on {} (loader {}): {}", type_name, loader, cause);
        Ok(())
    }

    fn on_complete(&self, type_name: &str, _loader: LoaderId) -> ListenerResult {
        if self.chatty() {
            tracing::debug!("[Listener] completed {}", type_name);
        }
        Ok(())
    }

    fn on_configuration_error(&self, error: &ConfigurationError) -> ListenerResult {
        tracing::warn!("[Listener] configuration: {}", error);
        Ok(())
    }
}

/// Forwards type events only when the type name satisfies a matcher
///
/// The matcher is evaluated against the name alone, so only name-based
/// predicates are meaningful here. Configuration errors always pass.
pub struct FilteringListener<L> {
    filter: Matcher,
    inner: L,
}

impl<L: Listener> FilteringListener<L> {
    pub fn new(filter: Matcher, inner: L) -> Self {
        FilteringListener { filter, inner }
    }

    fn accepts(&self, type_name: &str) -> bool {
        self.filter.matches(&interpose_core::TypeDescriptor::new(type_name))
    }
}

impl<L: Listener> Listener for FilteringListener<L> {
    fn on_discovery(&self, type_name: &str, loader: LoaderId) -> ListenerResult {
        if self.accepts(type_name) {
            self.inner.on_discovery(type_name, loader)?;
        }
        Ok(())
    }

    fn on_transformation(
        &self,
        type_name: &str,
        loader: LoaderId,
        transformation: &Transformation,
    ) -> ListenerResult {
        if self.accepts(type_name) {
            self.inner.on_transformation(type_name, loader, transformation)?;
        }
        Ok(())
    }

    fn on_ignored(&self, type_name: &str, loader: LoaderId, reason: IgnoreReason) -> ListenerResult {
        if self.accepts(type_name) {
            self.inner.on_ignored(type_name, loader, reason)?;
        }
        Ok(())
    }

    fn on_error(&self, type_name: &str, loader: LoaderId, cause: &InstallationError) -> ListenerResult {
        if self.accepts(type_name) {
            self.inner.on_error(type_name, loader, cause)?;
        }
        Ok(())
    }

    fn on_complete(&self, type_name: &str, loader: LoaderId) -> ListenerResult {
        if self.accepts(type_name) {
            self.inner.on_complete(type_name, loader)?;
        }
        Ok(())
    }

    fn on_configuration_error(&self, error: &ConfigurationError) -> ListenerResult {
        self.inner.on_configuration_error(error)
    }
}
