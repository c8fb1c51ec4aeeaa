//! Interception strategies
//!
//! Two first-class strategies are available per binding:
//! - Delegation: the interceptor wraps the whole call and receives a
//!   `SuperCall` to run the original body. Full visibility of arguments,
//!   return value and failure; may substitute either.
//! - Advice: split enter/exit hooks with an opaque correlation value threaded
//!   from enter to exit. No wrapper allocation on the common path, but the
//!   hooks cannot change what the caller observes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{
    CallResult, ExecutionContext, Failure, InstallationError, InterceptorId, MethodTarget, Value,
};

/// Callable that runs the original method body at most once
pub struct SuperCall<'a> {
    body: Option<Box<dyn FnOnce() -> CallResult + 'a>>,
    outcome: Option<CallResult>,
}

impl<'a> SuperCall<'a> {
    pub fn new(body: impl FnOnce() -> CallResult + 'a) -> Self {
        SuperCall {
            body: Some(Box::new(body)),
            outcome: None,
        }
    }

    /// Run the original body
    ///
    /// A second call does not re-run the body; it returns an
    /// `IllegalState` failure instead.
    pub fn call(&mut self) -> CallResult {
        match self.body.take() {
            Some(body) => {
                let outcome = body();
                self.outcome = Some(outcome.clone());
                outcome
            }
            None => Err(Failure::new(
                "IllegalState",
                "original method already invoked",
            )),
        }
    }

    /// Whether the original body has been run
    pub fn invoked(&self) -> bool {
        self.body.is_none()
    }

    /// Outcome of the original body, if it ran
    pub fn outcome(&self) -> Option<&CallResult> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<CallResult> {
        self.outcome
    }
}

impl fmt::Debug for SuperCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperCall")
            .field("invoked", &self.invoked())
            .finish()
    }
}

/// Full call-wrapping interceptor
pub trait DelegationInterceptor: Send + Sync {
    fn id(&self) -> InterceptorId;

    /// Validate a target at installation time
    fn prepare(&self, _target: &MethodTarget) -> Result<(), String> {
        Ok(())
    }

    /// Wrap one invocation
    ///
    /// Implementations call `call.call()` exactly once to run the original
    /// body and, unless they mean to substitute, return its outcome as is.
    fn intercept(&self, ctx: &mut ExecutionContext<'_>, call: &mut SuperCall<'_>) -> CallResult;
}

/// Split enter/exit interceptor
pub trait AdviceInterceptor: Send + Sync {
    fn id(&self) -> InterceptorId;

    /// Validate a target at installation time
    fn prepare(&self, _target: &MethodTarget) -> Result<(), String> {
        Ok(())
    }

    /// Called before the original body; the returned value is handed to
    /// the paired `on_exit`
    fn on_enter(&self, target: &MethodTarget, arguments: &[Value]) -> Value;

    /// Called after the original body, on success and on failure
    fn on_exit(&self, target: &MethodTarget, correlation: &Value, outcome: Result<&Value, &Failure>);
}

/// Strategy kind tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Delegation,
    Advice,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Delegation => f.write_str("delegation"),
            StrategyKind::Advice => f.write_str("advice"),
        }
    }
}

/// How a binding intercepts its methods
///
/// Equality is structural: same kind and same interceptor id.
#[derive(Clone)]
pub enum InterceptionStrategy {
    Delegation(Arc<dyn DelegationInterceptor>),
    Advice(Arc<dyn AdviceInterceptor>),
}

impl InterceptionStrategy {
    pub fn delegation(interceptor: impl DelegationInterceptor + 'static) -> Self {
        InterceptionStrategy::Delegation(Arc::new(interceptor))
    }

    pub fn advice(interceptor: impl AdviceInterceptor + 'static) -> Self {
        InterceptionStrategy::Advice(Arc::new(interceptor))
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            InterceptionStrategy::Delegation(_) => StrategyKind::Delegation,
            InterceptionStrategy::Advice(_) => StrategyKind::Advice,
        }
    }

    pub fn interceptor_id(&self) -> InterceptorId {
        match self {
            InterceptionStrategy::Delegation(i) => i.id(),
            InterceptionStrategy::Advice(i) => i.id(),
        }
    }

    /// Ask the interceptor whether it can be installed on `target`
    pub fn prepare(&self, target: &MethodTarget) -> Result<(), InstallationError> {
        let verdict = match self {
            InterceptionStrategy::Delegation(i) => i.prepare(target),
            InterceptionStrategy::Advice(i) => i.prepare(target),
        };
        verdict.map_err(|reason| InstallationError::Rejected {
            interceptor: self.interceptor_id(),
            type_name: target.type_name.clone(),
            method: target.method.name.clone(),
            reason,
        })
    }
}

impl PartialEq for InterceptionStrategy {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.interceptor_id() == other.interceptor_id()
    }
}

impl Eq for InterceptionStrategy {}

impl Hash for InterceptionStrategy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.interceptor_id().hash(state);
    }
}

impl fmt::Debug for InterceptionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptionStrategy::Delegation(i) => write!(f, "Delegation({})", i.id()),
            InterceptionStrategy::Advice(i) => write!(f, "Advice({})", i.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl DelegationInterceptor for Named {
        fn id(&self) -> InterceptorId {
            InterceptorId::from(self.0)
        }

        fn intercept(&self, _ctx: &mut ExecutionContext<'_>, call: &mut SuperCall<'_>) -> CallResult {
            call.call()
        }
    }

    impl AdviceInterceptor for Named {
        fn id(&self) -> InterceptorId {
            InterceptorId::from(self.0)
        }

        fn prepare(&self, target: &MethodTarget) -> Result<(), String> {
            if target.method.is_void() {
                Err("void methods are not supported".into())
            } else {
                Ok(())
            }
        }

        fn on_enter(&self, _target: &MethodTarget, _arguments: &[Value]) -> Value {
            Value::Unit
        }

        fn on_exit(&self, _target: &MethodTarget, _correlation: &Value, _outcome: Result<&Value, &Failure>) {}
    }

    #[test]
    fn test_super_call_runs_body_once() {
        let mut runs = 0;
        {
            let mut call = SuperCall::new(|| {
                runs += 1;
                Ok(Value::from("hello"))
            });
            assert!(!call.invoked());
            assert_eq!(call.call(), Ok(Value::from("hello")));
            assert!(call.invoked());

            let second = call.call().unwrap_err();
            assert_eq!(second.kind, "IllegalState");
            assert_eq!(call.into_outcome(), Some(Ok(Value::from("hello"))));
        }
        assert_eq!(runs, 1);
    }

    #[test]
    fn test_strategy_structural_equality() {
        let a = InterceptionStrategy::delegation(Named("package"));
        let b = InterceptionStrategy::delegation(Named("package"));
        let c = InterceptionStrategy::advice(Named("package"));
        let d = InterceptionStrategy::delegation(Named("advanced"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(format!("{:?}", c), "Advice(package)");
    }

    #[test]
    fn test_prepare_maps_rejection() {
        let ty = crate::TypeDescriptor::new("a.B").with_method(crate::MethodDescriptor::new("run"));
        let target = MethodTarget::new(&ty, &ty.methods[0]);

        let err = InterceptionStrategy::advice(Named("timing"))
            .prepare(&target)
            .unwrap_err();
        assert!(matches!(err, InstallationError::Rejected { ref method, .. } if method == "run"));
        assert!(InterceptionStrategy::delegation(Named("timing"))
            .prepare(&target)
            .is_ok());
    }
}
