use interpose_core::{CallResult, DelegationInterceptor, ExecutionContext, InterceptorId, SuperCall};

use super::{render_arguments, render_duration};

/// Call logging for web entry points
///
/// Logs class, method and arguments on entry, then duration and the return
/// value (cut at 200 characters) or the failure on exit.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControllerInterceptor;

impl ControllerInterceptor {
    pub const ID: &'static str = "controller";
    pub const RETURN_LIMIT: usize = 200;
}

impl DelegationInterceptor for ControllerInterceptor {
    fn id(&self) -> InterceptorId {
        Self::ID.into()
    }

    fn intercept(&self, ctx: &mut ExecutionContext<'_>, call: &mut SuperCall<'_>) -> CallResult {
        let class = ctx.target.simple_type_name().to_string();
        tracing::info!(
            interceptor = Self::ID,
            started_at = ctx.started_at_millis(),
            "[Dispatcher] call {}.{} ({} arg(s)): {}",
            class,
            ctx.method_name(),
            ctx.arguments.len(),
            render_arguments(&ctx.arguments)
        );

        let outcome = ctx.proceed(call);
        let elapsed = render_duration(ctx.elapsed());
        match &outcome {
            Ok(value) => tracing::info!(
                interceptor = Self::ID,
                "[Dispatcher] {}.{} ok in {}, returned {}",
                class,
                ctx.method_name(),
                elapsed,
                value.truncated(Self::RETURN_LIMIT)
            ),
            Err(failure) => tracing::warn!(
                interceptor = Self::ID,
                "[Dispatcher] {}.{} failed in {}: {}",
                class,
                ctx.method_name(),
                elapsed,
                failure
            ),
        }
        outcome
    }
}
