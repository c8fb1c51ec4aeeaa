//! interpose registry - Transformation registry
//!
//! Bindings are registered in order on a `RegistryBuilder`, then frozen into
//! an immutable `Registry` before discovery starts. Resolution walks the
//! frozen list in registration order and returns *every* applicable binding,
//! not just the first.

pub mod binding;
pub mod registry;

pub use binding::*;
pub use registry::*;
