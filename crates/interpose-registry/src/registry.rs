//! Registry construction and resolution

use std::sync::Arc;

use interpose_core::{BindingId, MethodDescriptor, TypeDescriptor};

use crate::Binding;

/// Mutable registration phase
///
/// Populate completely, then call [`RegistryBuilder::build`] before any
/// discovery happens.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    bindings: Vec<Binding>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    /// Append a binding
    ///
    /// Returns false, leaving the list unchanged, if a structurally equal
    /// binding is already registered.
    pub fn register(&mut self, binding: Binding) -> bool {
        if self.bindings.contains(&binding) {
            tracing::debug!("[Registry] duplicate binding ignored: {}", binding);
            return false;
        }
        tracing::debug!(
            "[Registry] binding {} registered: {}",
            BindingId::new(self.bindings.len() as u32),
            binding
        );
        self.bindings.push(binding);
        true
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, binding: Binding) -> Self {
        self.register(binding);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Freeze the binding list
    pub fn build(self) -> Registry {
        tracing::info!("[Registry] frozen with {} binding(s)", self.bindings.len());
        Registry {
            bindings: self.bindings.into(),
        }
    }
}

/// Frozen, shareable binding list
///
/// Cloning shares the list. There is no mutating API, so concurrent
/// resolution from any number of threads needs no locking.
#[derive(Clone, Debug)]
pub struct Registry {
    bindings: Arc<[Binding]>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.index())
    }

    /// Bindings with their ids, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (BindingId::new(i as u32), b))
    }

    /// Every binding that applies to `ty`, in registration order
    ///
    /// A binding applies when its type matcher accepts `ty` and its method
    /// matcher selects at least one method.
    pub fn resolve<'a>(&'a self, ty: &'a TypeDescriptor) -> Resolution<'a> {
        let applicable = self
            .iter()
            .filter(|(_, binding)| binding.applies_to(ty))
            .filter_map(|(id, binding)| {
                let methods = binding.select_methods(ty);
                if methods.is_empty() {
                    tracing::trace!(
                        "[Registry] {} matched {} but selected no methods",
                        id,
                        ty.name
                    );
                    None
                } else {
                    Some(ResolvedBinding {
                        id,
                        binding,
                        methods,
                    })
                }
            })
            .collect();

        Resolution { ty, applicable }
    }
}

impl From<RegistryBuilder> for Registry {
    fn from(builder: RegistryBuilder) -> Self {
        builder.build()
    }
}

/// One applicable binding and the methods it selected
#[derive(Clone, Debug)]
pub struct ResolvedBinding<'a> {
    pub id: BindingId,
    pub binding: &'a Binding,
    pub methods: Vec<&'a MethodDescriptor>,
}

/// Result of resolving one type
#[derive(Clone, Debug)]
pub struct Resolution<'a> {
    pub ty: &'a TypeDescriptor,
    pub applicable: Vec<ResolvedBinding<'a>>,
}

impl<'a> Resolution<'a> {
    pub fn is_empty(&self) -> bool {
        self.applicable.is_empty()
    }

    pub fn len(&self) -> usize {
        self.applicable.len()
    }

    pub fn binding_ids(&self) -> Vec<BindingId> {
        self.applicable.iter().map(|r| r.id).collect()
    }
}
