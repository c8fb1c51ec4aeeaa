//! Identity types for the interception pipeline

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Loader identity - which host loader presented a type for discovery
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoaderId(pub u64);

impl LoaderId {
    /// The host itself (no dedicated loader)
    pub const BOOTSTRAP: LoaderId = LoaderId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        LoaderId(id)
    }

    #[inline]
    pub fn is_bootstrap(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Loader({:016x})", self.0)
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bootstrap() {
            f.write_str("bootstrap")
        } else {
            write!(f, "{:016x}", self.0)
        }
    }
}

/// Binding identity - position of a binding in a frozen registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl BindingId {
    #[inline]
    pub fn new(index: u32) -> Self {
        BindingId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Interceptor identity - stable name used for structural equality
///
/// Two interceptors with the same id are considered the same interceptor,
/// regardless of which allocation backs them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(Arc<str>);

impl InterceptorId {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        InterceptorId(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InterceptorId {
    fn from(name: &str) -> Self {
        InterceptorId::new(name)
    }
}

impl fmt::Debug for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interceptor({})", self.0)
    }
}

impl fmt::Display for InterceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calling thread identity, captured at call entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadIdentity {
    pub id: ThreadId,
    pub name: Option<String>,
}

impl ThreadIdentity {
    /// Identity of the current thread
    pub fn current() -> Self {
        let current = thread::current();
        ThreadIdentity {
            id: current.id(),
            name: current.name().map(str::to_owned),
        }
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({:?})", name, self.id),
            None => write!(f, "<unnamed> ({:?})", self.id),
        }
    }
}
