use std::time::{Duration, SystemTime, UNIX_EPOCH};

use interpose_core::{AdviceInterceptor, Failure, InterceptorId, MethodTarget, Value};

use super::{render_arguments, render_duration};

/// Enter/exit timing advice
///
/// The enter hook hands its timestamp (microseconds since the Unix epoch)
/// to the exit hook as the correlation value. Return values are never
/// inspected.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimingAdvice;

impl TimingAdvice {
    pub const ID: &'static str = "timing";
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

impl AdviceInterceptor for TimingAdvice {
    fn id(&self) -> InterceptorId {
        Self::ID.into()
    }

    fn on_enter(&self, target: &MethodTarget, arguments: &[Value]) -> Value {
        let entered = now_micros();
        tracing::info!(
            interceptor = Self::ID,
            entered_at = entered,
            "[Dispatcher] enter {}: {}",
            target.method_name(),
            render_arguments(arguments)
        );
        Value::Int(entered)
    }

    fn on_exit(&self, target: &MethodTarget, correlation: &Value, outcome: Result<&Value, &Failure>) {
        let elapsed = correlation
            .as_int()
            .map(|entered| Duration::from_micros(now_micros().saturating_sub(entered).max(0) as u64));
        let elapsed = elapsed.map(render_duration).unwrap_or_else(|| "?".to_string());
        match outcome {
            Ok(_) => tracing::info!(
                interceptor = Self::ID,
                "[Dispatcher] exit {} after {}",
                target.method_name(),
                elapsed
            ),
            Err(failure) => tracing::warn!(
                interceptor = Self::ID,
                "[Dispatcher] exit {} with {} after {}: {}",
                target.method_name(),
                failure.kind,
                elapsed,
                failure.message
            ),
        }
    }
}
