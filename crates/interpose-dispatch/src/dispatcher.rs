//! Chain execution
//!
//! Fault handling at call time:
//! - A delegation interceptor that panics, or fails without having invoked
//!   its `SuperCall`, is bypassed: the rest of the chain runs anyway, so the
//!   original body executes exactly once.
//! - A panic raised by the original body is shown to every layer as a
//!   `Failure` of kind `panic`, then resumed unchanged once the outermost
//!   layer is done.
//! - Advice hooks that panic are logged and skipped. They never change what
//!   the caller observes.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use interpose_core::{
    panic_message, AdviceInterceptor, BindingId, CallResult, DelegationInterceptor,
    ExecutionContext, Failure, InterceptionStrategy, MethodTarget, SuperCall, Value,
};

/// Original method body as seen by the dispatcher
pub type Body<'b> = &'b (dyn Fn(&[Value]) -> CallResult + 'b);

/// One installed interception
#[derive(Clone, Debug)]
pub struct Layer {
    pub binding: BindingId,
    pub strategy: InterceptionStrategy,
}

/// Interception layers installed on one method, outermost first
///
/// Chains are immutable. Installing a layer produces a new chain, which the
/// substrate publishes in place of the old one.
#[derive(Clone, Debug)]
pub struct InterceptionChain {
    target: MethodTarget,
    layers: Vec<Layer>,
}

impl InterceptionChain {
    pub fn new(target: MethodTarget) -> Self {
        InterceptionChain {
            target,
            layers: Vec::new(),
        }
    }

    pub fn target(&self) -> &MethodTarget {
        &self.target
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn contains(&self, binding: BindingId) -> bool {
        self.layers.iter().any(|l| l.binding == binding)
    }

    /// Copy of this chain with `layer` inserted at its binding position
    ///
    /// Returns `None` if the binding is already installed.
    pub fn with_layer(&self, layer: Layer) -> Option<Self> {
        if self.contains(layer.binding) {
            return None;
        }
        let mut layers = self.layers.clone();
        let at = layers.partition_point(|l| l.binding < layer.binding);
        layers.insert(at, layer);
        Some(InterceptionChain {
            target: self.target.clone(),
            layers,
        })
    }

    /// Copy of this chain without the layer of `binding`
    pub fn without_layer(&self, binding: BindingId) -> Self {
        InterceptionChain {
            target: self.target.clone(),
            layers: self
                .layers
                .iter()
                .filter(|l| l.binding != binding)
                .cloned()
                .collect(),
        }
    }

    /// Run one invocation through every layer and the original body
    pub fn invoke(&self, arguments: Arc<[Value]>, body: Body<'_>) -> CallResult {
        tracing::trace!(
            "[Dispatcher] {} through {} layer(s)",
            self.target,
            self.layers.len()
        );
        run(&self.layers, &self.target, &arguments, body)
    }
}

impl fmt::Display for InterceptionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.target)?;
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{}:{:?}", layer.binding, layer.strategy)?;
        }
        f.write_str("]")
    }
}

fn run(layers: &[Layer], target: &MethodTarget, arguments: &Arc<[Value]>, body: Body<'_>) -> CallResult {
    match layers.split_first() {
        None => body(&arguments[..]),
        Some((layer, rest)) => match &layer.strategy {
            InterceptionStrategy::Delegation(interceptor) => {
                delegate(interceptor.as_ref(), rest, target, arguments, body)
            }
            InterceptionStrategy::Advice(interceptor) => {
                advise(interceptor.as_ref(), rest, target, arguments, body)
            }
        },
    }
}

/// Run the inner chain, converting a panic into a `panic` failure
///
/// The payload is parked in `parked` so the caller can resume it.
fn run_guarded(
    rest: &[Layer],
    target: &MethodTarget,
    arguments: &Arc<[Value]>,
    body: Body<'_>,
    parked: &Cell<Option<Box<dyn Any + Send>>>,
) -> CallResult {
    match panic::catch_unwind(AssertUnwindSafe(|| run(rest, target, arguments, body))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let failure = Failure::panic(panic_message(payload.as_ref()));
            parked.set(Some(payload));
            Err(failure)
        }
    }
}

fn delegate(
    interceptor: &dyn DelegationInterceptor,
    rest: &[Layer],
    target: &MethodTarget,
    arguments: &Arc<[Value]>,
    body: Body<'_>,
) -> CallResult {
    let parked: Cell<Option<Box<dyn Any + Send>>> = Cell::new(None);
    let mut ctx = ExecutionContext::new(target, Arc::clone(arguments));
    let mut call = SuperCall::new(|| run_guarded(rest, target, arguments, body, &parked));

    let verdict = panic::catch_unwind(AssertUnwindSafe(|| interceptor.intercept(&mut ctx, &mut call)));

    let outcome = match verdict {
        Ok(outcome) if call.invoked() => outcome,
        // not invoked on purpose: substitution
        Ok(Ok(substitute)) => Ok(substitute),
        Ok(Err(failure)) => {
            tracing::warn!(
                "[Dispatcher] {} failed on {} before invoking the original: {}; passing through",
                interceptor.id(),
                target,
                failure
            );
            call.call()
        }
        Err(payload) => {
            tracing::warn!(
                "[Dispatcher] {} panicked on {}: {}",
                interceptor.id(),
                target,
                panic_message(payload.as_ref())
            );
            let recorded = call.outcome().cloned();
            match recorded {
                Some(outcome) => outcome,
                None => call.call(),
            }
        }
    };
    drop(call);

    if let Some(payload) = parked.take() {
        panic::resume_unwind(payload);
    }
    outcome
}

fn advise(
    interceptor: &dyn AdviceInterceptor,
    rest: &[Layer],
    target: &MethodTarget,
    arguments: &Arc<[Value]>,
    body: Body<'_>,
) -> CallResult {
    let correlation = match panic::catch_unwind(AssertUnwindSafe(|| interceptor.on_enter(target, arguments))) {
        Ok(correlation) => Some(correlation),
        Err(payload) => {
            tracing::warn!(
                "[Dispatcher] {} enter hook panicked on {}: {}",
                interceptor.id(),
                target,
                panic_message(payload.as_ref())
            );
            None
        }
    };

    let parked: Cell<Option<Box<dyn Any + Send>>> = Cell::new(None);
    let outcome = run_guarded(rest, target, arguments, body, &parked);

    if let Some(correlation) = &correlation {
        let observed = outcome.as_ref();
        if let Err(payload) =
            panic::catch_unwind(AssertUnwindSafe(|| interceptor.on_exit(target, correlation, observed)))
        {
            tracing::warn!(
                "[Dispatcher] {} exit hook panicked on {}: {}",
                interceptor.id(),
                target,
                panic_message(payload.as_ref())
            );
        }
    }

    if let Some(payload) = parked.take() {
        panic::resume_unwind(payload);
    }
    outcome
}
