//! Built-in interceptors
//!
//! All of them observe and pass through; none substitutes a return value or
//! swallows a failure.

mod advanced;
mod controller;
mod package;
mod timing;

pub use advanced::AdvancedInterceptor;
pub use controller::ControllerInterceptor;
pub use package::PackageInterceptor;
pub use timing::TimingAdvice;

use std::time::Duration;

use interpose_core::Value;

/// `arg0=1, arg1=alice`
pub(crate) fn render_arguments(arguments: &[Value]) -> String {
    if arguments.is_empty() {
        return "none".to_string();
    }
    arguments
        .iter()
        .enumerate()
        .map(|(i, v)| format!("arg{}={}", i, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Durations rounded to microseconds for logs
pub(crate) fn render_duration(elapsed: Duration) -> String {
    let rounded = Duration::from_micros(elapsed.as_micros() as u64);
    humantime::format_duration(rounded).to_string()
}
