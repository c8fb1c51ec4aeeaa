//! Installation substrate
//!
//! The pipeline never rewrites code itself. It hands each selected method
//! to a [`Substrate`], which is whatever can place around-hooks on a named
//! method: a proxy factory, generated code, or a table of hand-registered
//! wrappers such as [`WrapperTable`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use interpose_core::{
    BindingId, CallResult, InstallationError, InterceptionStrategy, InterceptorId, MethodKey,
    MethodTarget, StrategyKind, Value,
};

use crate::{InterceptionChain, Layer};

/// Anything that can install interception on a named method
pub trait Substrate: Send + Sync {
    /// Install `strategy` for `binding` on `target`
    ///
    /// Installing a binding that is already present on the target must not
    /// add a second layer. Each successful call still counts as one install
    /// that [`Substrate::remove_layer`] can later release.
    fn install_interception(
        &self,
        binding: BindingId,
        target: &MethodTarget,
        strategy: &InterceptionStrategy,
    ) -> Result<(), InstallationError>;

    /// Release one install of `binding` on `key`
    ///
    /// The layer is dropped once every install of it has been released, so
    /// rolling back one discovery leaves layers another discovery relies on.
    fn remove_layer(&self, _binding: BindingId, _key: &MethodKey) {}
}

impl<S: Substrate + ?Sized> Substrate for Arc<S> {
    fn install_interception(
        &self,
        binding: BindingId,
        target: &MethodTarget,
        strategy: &InterceptionStrategy,
    ) -> Result<(), InstallationError> {
        (**self).install_interception(binding, target, strategy)
    }

    fn remove_layer(&self, binding: BindingId, key: &MethodKey) {
        (**self).remove_layer(binding, key)
    }
}

/// Summary of one installed layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstalledLayer {
    pub binding: BindingId,
    pub kind: StrategyKind,
    pub interceptor: InterceptorId,
}

/// Manual wrapper registration
///
/// Host code routes calls through [`WrapperTable::invoke`]; methods without
/// installed layers run their body directly. Readers take a snapshot of the
/// chain (`Arc` clone) and never hold the lock while a call runs.
#[derive(Default)]
pub struct WrapperTable {
    state: RwLock<TableState>,
}

#[derive(Default)]
struct TableState {
    chains: HashMap<MethodKey, Arc<InterceptionChain>>,
    installs: HashMap<(MethodKey, BindingId), usize>,
}

impl WrapperTable {
    pub fn new() -> Self {
        WrapperTable::default()
    }

    /// Current chain for `key`, if any layer is installed
    pub fn chain(&self, key: &MethodKey) -> Option<Arc<InterceptionChain>> {
        self.state.read().chains.get(key).cloned()
    }

    pub fn is_instrumented(&self, key: &MethodKey) -> bool {
        self.state.read().chains.contains_key(key)
    }

    /// Number of instrumented methods
    pub fn len(&self) -> usize {
        self.state.read().chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().chains.is_empty()
    }

    /// Layers installed on `key`, outermost first
    pub fn layers(&self, key: &MethodKey) -> Vec<InstalledLayer> {
        self.chain(key)
            .map(|chain| {
                chain
                    .layers()
                    .iter()
                    .map(|l| InstalledLayer {
                        binding: l.binding,
                        kind: l.strategy.kind(),
                        interceptor: l.strategy.interceptor_id(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total layers across all methods
    pub fn installed_count(&self) -> usize {
        self.state.read().chains.values().map(|c| c.len()).sum()
    }

    /// Call a method through whatever is installed on it
    pub fn invoke<F>(&self, key: &MethodKey, arguments: Vec<Value>, body: F) -> CallResult
    where
        F: Fn(&[Value]) -> CallResult,
    {
        match self.chain(key) {
            Some(chain) => chain.invoke(arguments.into(), &body),
            None => body(&arguments),
        }
    }
}

impl Substrate for WrapperTable {
    fn install_interception(
        &self,
        binding: BindingId,
        target: &MethodTarget,
        strategy: &InterceptionStrategy,
    ) -> Result<(), InstallationError> {
        let key = target.key();
        let layer = Layer {
            binding,
            strategy: strategy.clone(),
        };

        let mut state = self.state.write();
        let next = match state.chains.get(&key) {
            Some(current) => current.with_layer(layer),
            None => InterceptionChain::new(target.clone()).with_layer(layer),
        };
        match next {
            Some(chain) => {
                tracing::debug!("[Dispatcher] installed {} on {}", binding, key);
                state.chains.insert(key.clone(), Arc::new(chain));
            }
            None => tracing::debug!("[Dispatcher] {} already installed on {}", binding, key),
        }
        *state.installs.entry((key, binding)).or_insert(0) += 1;
        Ok(())
    }

    fn remove_layer(&self, binding: BindingId, key: &MethodKey) {
        let mut state = self.state.write();
        let slot = (key.clone(), binding);
        let left = match state.installs.get_mut(&slot) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => return,
        };
        if left > 0 {
            return;
        }
        state.installs.remove(&slot);

        let remaining = state.chains.get(key).map(|chain| chain.without_layer(binding));
        match remaining {
            Some(chain) if chain.is_empty() => {
                state.chains.remove(key);
            }
            Some(chain) => {
                state.chains.insert(key.clone(), Arc::new(chain));
            }
            None => {}
        }
        tracing::debug!("[Dispatcher] removed {} from {}", binding, key);
    }
}

impl std::fmt::Debug for WrapperTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperTable")
            .field("methods", &self.len())
            .field("layers", &self.installed_count())
            .finish()
    }
}
