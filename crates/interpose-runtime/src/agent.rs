//! Discovery pipeline
//!
//! For each discovered type the agent fires `Discovery`, decides whether the
//! type is in scope, resolves the applicable bindings, installs them through
//! the substrate, fires exactly one of `Transformation` / `Ignored` /
//! `Error`, and finally `Complete`.
//!
//! Installation is isolated per type. A rejected target or a substrate
//! failure releases the installs made while processing that type and is
//! reported through the listeners. Layers placed by earlier discoveries of
//! the same type stay in place, and the next type is processed as if nothing
//! happened.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use interpose_core::{
    panic_message, AppliedBinding, BindingId, ConfigurationError, Event, IgnoreReason,
    InstallationError, Listener, LoaderId, MethodKey, MethodTarget, Transformation, TypeDescriptor,
};
use interpose_dispatch::{Substrate, WrapperTable};
use interpose_matcher::{exclude_system_namespaces, Matcher};
use interpose_registry::{Registry, Resolution};

use crate::ListenerSet;

/// What happened to one discovered type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    Transformed(Transformation),
    Ignored(IgnoreReason),
    Failed(InstallationError),
}

impl DiscoveryOutcome {
    pub fn is_transformed(&self) -> bool {
        matches!(self, DiscoveryOutcome::Transformed(_))
    }

    fn into_event(self, type_name: String, loader: LoaderId) -> Event {
        match self {
            DiscoveryOutcome::Transformed(transformation) => Event::Transformation {
                type_name,
                loader,
                transformation,
            },
            DiscoveryOutcome::Ignored(reason) => Event::Ignored {
                type_name,
                loader,
                reason,
            },
            DiscoveryOutcome::Failed(cause) => Event::Error {
                type_name,
                loader,
                cause,
            },
        }
    }
}

/// Running totals, readable at any time
#[derive(Debug, Default)]
pub struct AgentReport {
    discovered: AtomicU64,
    transformed: AtomicU64,
    ignored: AtomicU64,
    failed: AtomicU64,
}

impl AgentReport {
    pub fn discovered(&self) -> u64 {
        self.discovered.load(Ordering::Relaxed)
    }

    pub fn transformed(&self) -> u64 {
        self.transformed.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn record(&self, outcome: &DiscoveryOutcome) {
        let counter = match outcome {
            DiscoveryOutcome::Transformed(_) => &self.transformed,
            DiscoveryOutcome::Ignored(_) => &self.ignored,
            DiscoveryOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for AgentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discovered={} transformed={} ignored={} failed={}",
            self.discovered(),
            self.transformed(),
            self.ignored(),
            self.failed()
        )
    }
}

/// Agent configuration
pub struct AgentBuilder {
    registry: Registry,
    substrate: Option<Arc<dyn Substrate>>,
    listeners: ListenerSet,
    type_filter: Matcher,
}

impl AgentBuilder {
    pub fn new() -> Self {
        AgentBuilder {
            registry: Registry::empty(),
            substrate: None,
            listeners: ListenerSet::new(),
            type_filter: exclude_system_namespaces(),
        }
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Where interceptions get installed; a fresh [`WrapperTable`] if unset
    pub fn substrate(mut self, substrate: impl Substrate + 'static) -> Self {
        self.substrate = Some(Arc::new(substrate));
        self
    }

    pub fn listener(mut self, listener: impl Listener + 'static) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn listener_arc(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listeners.push_arc(listener);
        self
    }

    /// Replace the scope filter; only matching types are considered
    pub fn accept(mut self, filter: Matcher) -> Self {
        self.type_filter = filter;
        self
    }

    /// Additionally skip types matching `matcher`
    pub fn ignore(mut self, matcher: Matcher) -> Self {
        self.type_filter = self.type_filter.and(matcher.negate());
        self
    }

    pub fn build(self) -> Agent {
        let substrate: Arc<dyn Substrate> = match self.substrate {
            Some(substrate) => substrate,
            None => Arc::new(WrapperTable::new()),
        };
        tracing::info!(
            "[Agent] ready: {} binding(s), {} listener(s)",
            self.registry.len(),
            self.listeners.len()
        );
        Agent {
            registry: self.registry,
            substrate,
            listeners: self.listeners,
            type_filter: self.type_filter,
            report: AgentReport::default(),
        }
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        AgentBuilder::new()
    }
}

/// The interception pipeline
///
/// `Send + Sync`; `discover` may be called from any number of threads.
pub struct Agent {
    registry: Registry,
    substrate: Arc<dyn Substrate>,
    listeners: ListenerSet,
    type_filter: Matcher,
    report: AgentReport,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn report(&self) -> &AgentReport {
        &self.report
    }

    /// Listener failures swallowed so far
    pub fn listener_failures(&self) -> u64 {
        self.listeners.failures()
    }

    /// Hand startup configuration errors to the listeners
    pub fn report_configuration_errors(&self, errors: &[ConfigurationError]) {
        for error in errors {
            tracing::warn!("[Agent] configuration error: {}", error);
            self.listeners.emit_configuration_error(error);
        }
    }

    /// Process one discovered type
    pub fn discover(&self, ty: &TypeDescriptor, loader: LoaderId) -> DiscoveryOutcome {
        self.report.discovered.fetch_add(1, Ordering::Relaxed);
        self.listeners.emit(&Event::Discovery {
            type_name: ty.name.clone(),
            loader,
        });

        let outcome = self.process(ty);
        self.report.record(&outcome);
        self.listeners
            .emit(&outcome.clone().into_event(ty.name.clone(), loader));
        self.listeners.emit(&Event::Complete {
            type_name: ty.name.clone(),
            loader,
        });
        outcome
    }

    /// Process a batch; each type is isolated from the others
    pub fn discover_all<'a, I>(&self, types: I, loader: LoaderId) -> Vec<DiscoveryOutcome>
    where
        I: IntoIterator<Item = &'a TypeDescriptor>,
    {
        types
            .into_iter()
            .map(|ty| self.discover(ty, loader))
            .collect()
    }

    fn process(&self, ty: &TypeDescriptor) -> DiscoveryOutcome {
        if !self.type_filter.matches(ty) {
            return DiscoveryOutcome::Ignored(IgnoreReason::Excluded);
        }
        let resolution = self.registry.resolve(ty);
        if resolution.is_empty() {
            return DiscoveryOutcome::Ignored(IgnoreReason::NoApplicableBinding);
        }

        let mut placed = Vec::new();
        let installed =
            panic::catch_unwind(AssertUnwindSafe(|| self.install(&resolution, &mut placed)));
        let error = match installed {
            Ok(Ok(transformation)) => {
                tracing::debug!(
                    "[Agent] {} transformed by {} binding(s)",
                    ty.name,
                    transformation.bindings.len()
                );
                return DiscoveryOutcome::Transformed(transformation);
            }
            Ok(Err(error)) => error,
            Err(payload) => InstallationError::Panicked {
                type_name: ty.name.clone(),
                message: panic_message(payload.as_ref()),
            },
        };

        tracing::warn!("[Agent] skipping {}: {}", ty.name, error);
        for (binding, key) in placed.iter().rev() {
            self.substrate.remove_layer(*binding, key);
        }
        DiscoveryOutcome::Failed(error)
    }

    /// Validate every target, then install
    ///
    /// Every successful install is recorded in `placed` as it happens.
    fn install(
        &self,
        resolution: &Resolution<'_>,
        placed: &mut Vec<(BindingId, MethodKey)>,
    ) -> Result<Transformation, InstallationError> {
        let mut planned = Vec::with_capacity(resolution.len());
        for resolved in &resolution.applicable {
            let targets: Vec<MethodTarget> = resolved
                .methods
                .iter()
                .map(|method| MethodTarget::new(resolution.ty, method))
                .collect();
            for target in &targets {
                resolved.binding.strategy().prepare(target)?;
            }
            planned.push((resolved, targets));
        }

        let mut bindings = Vec::with_capacity(planned.len());
        for (resolved, targets) in planned {
            let strategy = resolved.binding.strategy();
            for target in &targets {
                self.substrate
                    .install_interception(resolved.id, target, strategy)?;
                placed.push((resolved.id, target.key()));
            }
            bindings.push(AppliedBinding {
                binding: resolved.id,
                kind: strategy.kind(),
                interceptor: strategy.interceptor_id(),
                methods: targets.iter().map(MethodTarget::key).collect(),
            });
        }
        Ok(Transformation { bindings })
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("bindings", &self.registry.len())
            .field("listeners", &self.listeners)
            .field("type_filter", &self.type_filter.to_string())
            .field("report", &self.report.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_core::{
        CallResult, DelegationInterceptor, ExecutionContext, InterceptionStrategy,
        InterceptorId, MethodDescriptor, SuperCall,
    };
    use interpose_registry::Binding;

    struct Wrap;

    impl DelegationInterceptor for Wrap {
        fn id(&self) -> InterceptorId {
            "wrap".into()
        }

        fn intercept(&self, _ctx: &mut ExecutionContext<'_>, call: &mut SuperCall<'_>) -> CallResult {
            call.call()
        }
    }

    /// Refuses every method whose name starts with `secret`
    struct Picky;

    impl DelegationInterceptor for Picky {
        fn id(&self) -> InterceptorId {
            "picky".into()
        }

        fn prepare(&self, target: &MethodTarget) -> Result<(), String> {
            if target.method_name().starts_with("secret") {
                Err("secret methods are off limits".to_string())
            } else {
                Ok(())
            }
        }

        fn intercept(&self, _ctx: &mut ExecutionContext<'_>, call: &mut SuperCall<'_>) -> CallResult {
            call.call()
        }
    }

    struct Failing;

    impl Substrate for Failing {
        fn install_interception(
            &self,
            _binding: BindingId,
            target: &MethodTarget,
            _strategy: &InterceptionStrategy,
        ) -> Result<(), InstallationError> {
            Err(InstallationError::Substrate {
                type_name: target.type_name.clone(),
                method: target.method.name.clone(),
                reason: "sealed".to_string(),
            })
        }
    }

    fn service(name: &str) -> TypeDescriptor {
        TypeDescriptor::new(name)
            .with_method(MethodDescriptor::new("run"))
            .with_method(MethodDescriptor::new("stop"))
    }

    #[test]
    fn test_excluded_and_unmatched_types_are_ignored() {
        let registry = Registry::builder()
            .with(Binding::for_types(
                Matcher::name_starts_with("org.example"),
                InterceptionStrategy::delegation(Wrap),
            ))
            .build();
        let agent = Agent::builder().registry(registry).build();

        assert_eq!(
            agent.discover(&service("java.util.ArrayList"), LoaderId::BOOTSTRAP),
            DiscoveryOutcome::Ignored(IgnoreReason::Excluded)
        );
        assert_eq!(
            agent.discover(&service("com.other.Thing"), LoaderId::BOOTSTRAP),
            DiscoveryOutcome::Ignored(IgnoreReason::NoApplicableBinding)
        );
        assert!(agent
            .discover(&service("org.example.Service"), LoaderId::BOOTSTRAP)
            .is_transformed());
        assert_eq!(agent.report().to_string(), "discovered=3 transformed=1 ignored=2 failed=0");
    }

    #[test]
    fn test_ignore_extends_filter() {
        let registry = Registry::builder()
            .with(Binding::for_types(Matcher::Any, InterceptionStrategy::delegation(Wrap)))
            .build();
        let agent = Agent::builder()
            .registry(registry)
            .ignore(Matcher::name_contains(".internal."))
            .build();

        assert_eq!(
            agent.discover(&service("org.example.internal.Cache"), LoaderId::BOOTSTRAP),
            DiscoveryOutcome::Ignored(IgnoreReason::Excluded)
        );
        assert!(agent
            .discover(&service("org.example.Cache"), LoaderId::BOOTSTRAP)
            .is_transformed());
    }

    #[test]
    fn test_rejected_target_rolls_back_the_type() {
        let table = Arc::new(WrapperTable::new());
        let registry = Registry::builder()
            .with(Binding::for_types(Matcher::Any, InterceptionStrategy::delegation(Wrap)))
            .with(Binding::for_types(Matcher::Any, InterceptionStrategy::delegation(Picky)))
            .build();
        let agent = Agent::builder()
            .registry(registry)
            .substrate(table.clone())
            .build();

        let broken = TypeDescriptor::new("org.example.Vault")
            .with_method(MethodDescriptor::new("open"))
            .with_method(MethodDescriptor::new("secretCode"));
        let outcome = agent.discover(&broken, LoaderId::BOOTSTRAP);

        assert!(matches!(outcome, DiscoveryOutcome::Failed(InstallationError::Rejected { .. })));
        assert!(table.is_empty());
        assert!(agent
            .discover(&service("org.example.Door"), LoaderId::BOOTSTRAP)
            .is_transformed());
        assert_eq!(table.installed_count(), 4);
    }

    #[test]
    fn test_substrate_failure_is_reported() {
        let registry = Registry::builder()
            .with(Binding::for_types(Matcher::Any, InterceptionStrategy::delegation(Wrap)))
            .build();
        let agent = Agent::builder().registry(registry).substrate(Failing).build();

        let outcome = agent.discover(&service("org.example.Service"), LoaderId::BOOTSTRAP);
        assert!(matches!(outcome, DiscoveryOutcome::Failed(InstallationError::Substrate { .. })));
        assert_eq!(agent.report().failed(), 1);
    }

    #[test]
    fn test_transformation_lists_methods_per_binding() {
        let registry = Registry::builder()
            .with(Binding::for_types(Matcher::Any, InterceptionStrategy::delegation(Wrap)))
            .build();
        let agent = Agent::builder().registry(registry).build();

        match agent.discover(&service("org.example.Service"), LoaderId::new(9)) {
            DiscoveryOutcome::Transformed(t) => {
                assert_eq!(t.bindings.len(), 1);
                assert_eq!(t.bindings[0].binding, BindingId::new(0));
                assert_eq!(t.installation_count(), 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
