//! Infrastructure namespace exclusion
//!
//! Keeps discovery volume tractable by rejecting standard-library and
//! instrumentation-substrate types before any binding is evaluated. The
//! matcher tree is built once per process and shared by clone.

use once_cell::sync::Lazy;

use crate::Matcher;

/// Name prefixes never offered to bindings
pub const SYSTEM_NAMESPACES: &[&str] = &[
    "java.",
    "javax.",
    "sun.",
    "com.sun.",
    "jdk.",
    "org.apache.",
    "org.springframework.",
    "net.bytebuddy.",
    "interpose.",
    "std::",
    "core::",
    "alloc::",
];

static EXCLUDE_SYSTEM_NAMESPACES: Lazy<Matcher> = Lazy::new(|| {
    let system = Matcher::any_of(
        SYSTEM_NAMESPACES
            .iter()
            .map(|prefix| Matcher::name_starts_with(*prefix)),
    );
    tracing::debug!(
        "[Matcher] system namespace exclusion built over {} prefixes",
        SYSTEM_NAMESPACES.len()
    );
    system.negate()
});

/// `Not(Or(NameStartsWith(..), ...))` over [`SYSTEM_NAMESPACES`]
///
/// Matches types that are *not* infrastructure. The returned value shares
/// the process-wide tree, so calling this repeatedly costs one `Arc` clone.
pub fn exclude_system_namespaces() -> Matcher {
    EXCLUDE_SYSTEM_NAMESPACES.clone()
}

/// Whether `name` falls under one of [`SYSTEM_NAMESPACES`]
pub fn is_system_namespace(name: &str) -> bool {
    SYSTEM_NAMESPACES.iter().any(|prefix| name.starts_with(prefix))
}
