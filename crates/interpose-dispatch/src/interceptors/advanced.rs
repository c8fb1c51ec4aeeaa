use interpose_core::{
    CallResult, DelegationInterceptor, ExecutionContext, ExtendedContext, InterceptorId, SuperCall,
};

use super::render_duration;

/// Call logging with thread metadata, a call-stack snippet and value
/// fingerprints
#[derive(Clone, Copy, Debug)]
pub struct AdvancedInterceptor {
    stack_depth: usize,
}

impl AdvancedInterceptor {
    pub const ID: &'static str = "advanced";
    pub const RETURN_LIMIT: usize = 200;

    pub fn new() -> Self {
        AdvancedInterceptor {
            stack_depth: ExtendedContext::DEFAULT_DEPTH,
        }
    }

    /// Capture at most `depth` frames per call
    pub fn with_stack_depth(mut self, depth: usize) -> Self {
        self.stack_depth = depth;
        self
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_depth
    }
}

impl Default for AdvancedInterceptor {
    fn default() -> Self {
        AdvancedInterceptor::new()
    }
}

impl DelegationInterceptor for AdvancedInterceptor {
    fn id(&self) -> InterceptorId {
        Self::ID.into()
    }

    fn intercept(&self, ctx: &mut ExecutionContext<'_>, call: &mut SuperCall<'_>) -> CallResult {
        let target = ctx.target;
        let method = &target.method;
        let _span = tracing::info_span!("advanced", method = %target).entered();

        tracing::info!(
            "[Dispatcher] class {} (simple {}, package {})",
            target.type_name,
            target.simple_type_name(),
            if target.package.is_empty() { "default" } else { target.package.as_str() }
        );
        tracing::info!(
            "[Dispatcher] method {} returns {} with {} parameter(s) [{}]",
            method.signature(),
            method.return_type,
            method.parameter_types.len(),
            method.parameter_types.join(", ")
        );

        let extended = ExtendedContext::capture(self.stack_depth);
        tracing::info!("[Dispatcher] thread {}", extended.thread);
        for (i, frame) in extended.frames.iter().enumerate() {
            tracing::info!("[Dispatcher]   [{}] {}", i, frame);
        }
        if extended.omitted > 0 {
            tracing::info!("[Dispatcher]   ... {} more frame(s)", extended.omitted);
        }

        if ctx.arguments.is_empty() {
            tracing::info!("[Dispatcher] no arguments");
        }
        for (i, arg) in ctx.arguments.iter().enumerate() {
            tracing::info!(
                "[Dispatcher]   arg[{}] {} = {} (fingerprint {:016x})",
                i,
                arg.kind(),
                arg,
                arg.fingerprint()
            );
        }

        let outcome = ctx.proceed(call);
        let elapsed = render_duration(ctx.elapsed());
        match &outcome {
            Ok(value) if value.is_unit() => {
                tracing::info!("[Dispatcher] succeeded in {}, no return value", elapsed)
            }
            Ok(value) => tracing::info!(
                "[Dispatcher] succeeded in {}, returned {} {} (fingerprint {:016x})",
                elapsed,
                value.kind(),
                value.truncated(Self::RETURN_LIMIT),
                value.fingerprint()
            ),
            Err(failure) => tracing::warn!(
                kind = %failure.kind,
                "[Dispatcher] failed in {}: {}",
                elapsed,
                failure.message
            ),
        }
        outcome
    }
}
