//! Bindings - (type matcher, method matcher, strategy) tuples

use std::fmt;

use interpose_core::{InterceptionStrategy, InterceptorId, MethodDescriptor, StrategyKind, TypeDescriptor};
use interpose_matcher::{interceptable_method, Matcher};

/// Association of a matcher pair with an interception strategy
///
/// Immutable once built. Equality is structural over the whole tuple, with
/// the interceptor compared by id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    type_matcher: Matcher,
    method_matcher: Matcher,
    strategy: InterceptionStrategy,
}

impl Binding {
    pub fn new(type_matcher: Matcher, method_matcher: Matcher, strategy: InterceptionStrategy) -> Self {
        Binding {
            type_matcher,
            method_matcher,
            strategy,
        }
    }

    /// Bind `strategy` to the public instance methods of matching types
    pub fn for_types(type_matcher: Matcher, strategy: InterceptionStrategy) -> Self {
        Binding::new(type_matcher, interceptable_method(), strategy)
    }

    pub fn type_matcher(&self) -> &Matcher {
        &self.type_matcher
    }

    pub fn method_matcher(&self) -> &Matcher {
        &self.method_matcher
    }

    pub fn strategy(&self) -> &InterceptionStrategy {
        &self.strategy
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn interceptor_id(&self) -> InterceptorId {
        self.strategy.interceptor_id()
    }

    /// Does the type matcher accept `ty`?
    pub fn applies_to(&self, ty: &TypeDescriptor) -> bool {
        self.type_matcher.matches(ty)
    }

    /// Methods of `ty` accepted by the method matcher, in declaration order
    pub fn select_methods<'a>(&self, ty: &'a TypeDescriptor) -> Vec<&'a MethodDescriptor> {
        ty.methods
            .iter()
            .filter(|m| self.method_matcher.matches(*m))
            .collect()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) types={} methods={}",
            self.kind(),
            self.interceptor_id(),
            self.type_matcher,
            self.method_matcher
        )
    }
}
