//! Per-call execution context
//!
//! An `ExecutionContext` is created at call entry, lives on the calling
//! thread's stack for the duration of one invocation, and is dropped at
//! call exit. It is never shared across threads or persisted.

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::{CallResult, MethodDescriptor, SuperCall, ThreadIdentity, TypeDescriptor, Value};

/// Key identifying one method (overloads are distinguished by parameters)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub type_name: String,
    pub method: String,
    pub parameters: Vec<String>,
}

impl MethodKey {
    pub fn new(
        type_name: impl Into<String>,
        method: impl Into<String>,
        parameters: Vec<String>,
    ) -> Self {
        MethodKey {
            type_name: type_name.into(),
            method: method.into(),
            parameters,
        }
    }

    /// Key for a parameterless method
    pub fn of(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        MethodKey::new(type_name, method, Vec::new())
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}({})",
            self.type_name,
            self.method,
            self.parameters.join(",")
        )
    }
}

/// A method selected for interception, as handed to the substrate
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodTarget {
    /// Fully qualified declaring type name
    pub type_name: String,
    /// Package of the declaring type
    pub package: String,
    pub method: MethodDescriptor,
}

impl MethodTarget {
    pub fn new(ty: &TypeDescriptor, method: &MethodDescriptor) -> Self {
        MethodTarget {
            type_name: ty.name.clone(),
            package: ty.package.clone(),
            method: method.clone(),
        }
    }

    pub fn key(&self) -> MethodKey {
        MethodKey::new(
            self.type_name.clone(),
            self.method.name.clone(),
            self.method.parameter_types.clone(),
        )
    }

    pub fn method_name(&self) -> &str {
        &self.method.name
    }

    pub fn simple_type_name(&self) -> &str {
        match self.type_name.rfind('.') {
            Some(pos) => &self.type_name[pos + 1..],
            None => &self.type_name,
        }
    }
}

impl fmt::Display for MethodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method.name)
    }
}

/// Ephemeral per-call record
pub struct ExecutionContext<'a> {
    pub target: &'a MethodTarget,
    /// Wall-clock time at call entry
    pub started_at: SystemTime,
    pub thread: ThreadIdentity,
    /// Argument snapshot (shallow)
    pub arguments: Arc<[Value]>,
    start: Instant,
    outcome: Option<CallResult>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(target: &'a MethodTarget, arguments: Arc<[Value]>) -> Self {
        ExecutionContext {
            target,
            started_at: SystemTime::now(),
            thread: ThreadIdentity::current(),
            arguments,
            start: Instant::now(),
            outcome: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.target.type_name
    }

    pub fn method_name(&self) -> &str {
        &self.target.method.name
    }

    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Entry timestamp in milliseconds since the Unix epoch
    pub fn started_at_millis(&self) -> i64 {
        epoch_millis(self.started_at)
    }

    /// Time since call entry
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Run the original body through `call` and record its outcome
    pub fn proceed(&mut self, call: &mut SuperCall<'_>) -> CallResult {
        let outcome = call.call();
        self.outcome = Some(outcome.clone());
        outcome
    }

    /// Record the outcome of the original body
    pub fn complete(&mut self, outcome: CallResult) {
        self.outcome = Some(outcome);
    }

    /// Outcome of the original body, once it has run
    pub fn outcome(&self) -> Option<&CallResult> {
        self.outcome.as_ref()
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("target", &self.target.to_string())
            .field("thread", &self.thread)
            .field("arguments", &self.arguments.len())
            .field("completed", &self.outcome.is_some())
            .finish()
    }
}

/// Milliseconds since the Unix epoch
pub fn epoch_millis(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Thread metadata and a bounded call-stack snippet
#[derive(Clone, Debug)]
pub struct ExtendedContext {
    pub thread: ThreadIdentity,
    /// Innermost frames first
    pub frames: Vec<String>,
    /// Frames beyond the captured snippet
    pub omitted: usize,
}

impl ExtendedContext {
    /// Default snippet depth
    pub const DEFAULT_DEPTH: usize = 5;

    /// Capture the current thread and up to `depth` stack frames
    pub fn capture(depth: usize) -> Self {
        let rendered = Backtrace::force_capture().to_string();
        let all: Vec<String> = rendered
            .lines()
            .filter_map(|line| {
                let line = line.trim_start();
                let (index, symbol) = line.split_once(": ")?;
                index
                    .chars()
                    .all(|c| c.is_ascii_digit())
                    .then(|| symbol.trim().to_string())
            })
            .collect();

        let omitted = all.len().saturating_sub(depth);
        ExtendedContext {
            thread: ThreadIdentity::current(),
            frames: all.into_iter().take(depth).collect(),
            omitted,
        }
    }
}
