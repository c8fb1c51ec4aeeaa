//! Error types for the interception pipeline
//!
//! The guiding rule: instrumentation faults may only ever result in
//! instrumentation not applying. They never change what the intercepted
//! program observes.

use std::any::Any;

use thiserror::Error;

use crate::{InterceptorId, Value};

/// Malformed selector, pattern or option. Aborts only the affected binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Mode `{0}` requires a selector")]
    MissingSelector(String),

    #[error("Unknown mode `{0}`, using the default binding")]
    UnknownMode(String),

    #[error("Malformed selector `{0}`")]
    MalformedSelector(String),

    #[error("Unknown option `{0}`")]
    UnknownOption(String),

    #[error("Invalid value for `{key}`: {value}")]
    InvalidValue { key: String, value: String },
}

/// A transformation could not be applied to one type. Isolated per type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallationError {
    #[error("Interceptor {interceptor} rejected {type_name}.{method}: {reason}")]
    Rejected {
        interceptor: InterceptorId,
        type_name: String,
        method: String,
        reason: String,
    },

    #[error("Substrate refused {type_name}.{method}: {reason}")]
    Substrate {
        type_name: String,
        method: String,
        reason: String,
    },

    #[error("Installation panicked for {type_name}: {message}")]
    Panicked { type_name: String, message: String },
}

impl InstallationError {
    /// Name of the type whose installation failed
    pub fn type_name(&self) -> &str {
        match self {
            InstallationError::Rejected { type_name, .. }
            | InstallationError::Substrate { type_name, .. }
            | InstallationError::Panicked { type_name, .. } => type_name,
        }
    }
}

/// A listener callback failed. Always swallowed and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("Listener failed: {0}")]
    Failed(String),

    #[error("Listener panicked: {0}")]
    Panicked(String),
}

/// Failure raised by an original method body
///
/// Interceptors observe it and, by default, hand it back to the caller
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct Failure {
    /// Failure class, e.g. `IllegalArgument`
    pub kind: String,
    pub message: String,
}

impl Failure {
    /// Kind used for panics surfaced from a method body
    pub const PANIC: &'static str = "panic";

    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Failure {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Failure::new(Self::PANIC, message)
    }

    pub fn is_panic(&self) -> bool {
        self.kind == Self::PANIC
    }
}

/// Top-level error for the interception pipeline
#[derive(Error, Debug)]
pub enum InterposeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Installation(#[from] InstallationError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Interception failure: {0}")]
    Interception(#[from] Failure),
}

/// Result type for pipeline operations
pub type InterposeResult<T> = Result<T, InterposeError>;

/// Outcome of one method invocation
pub type CallResult = Result<Value, Failure>;

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
