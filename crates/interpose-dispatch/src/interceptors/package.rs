use interpose_core::{CallResult, DelegationInterceptor, ExecutionContext, InterceptorId, SuperCall};

use super::render_duration;

/// Call logging for namespace-selected types
///
/// Logs package, class and full signature, typed arguments, and the return
/// value (cut at 100 characters) with its runtime kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackageInterceptor;

impl PackageInterceptor {
    pub const ID: &'static str = "package";
    pub const RETURN_LIMIT: usize = 100;
}

impl DelegationInterceptor for PackageInterceptor {
    fn id(&self) -> InterceptorId {
        Self::ID.into()
    }

    fn intercept(&self, ctx: &mut ExecutionContext<'_>, call: &mut SuperCall<'_>) -> CallResult {
        let target = ctx.target;
        let method = &target.method;
        tracing::info!(
            interceptor = Self::ID,
            package = %target.package,
            "[Dispatcher] {} :: {}",
            target.simple_type_name(),
            method.signature()
        );
        for (i, arg) in ctx.arguments.iter().enumerate() {
            let declared = method.parameter_types.get(i).map(String::as_str).unwrap_or("?");
            tracing::info!(
                interceptor = Self::ID,
                "[Dispatcher]   arg{} [{}] {}",
                i,
                declared,
                arg
            );
        }

        let outcome = ctx.proceed(call);
        let elapsed = render_duration(ctx.elapsed());
        match &outcome {
            Ok(_) if method.is_void() => tracing::info!(
                interceptor = Self::ID,
                "[Dispatcher] {} completed in {}",
                ctx.method_name(),
                elapsed
            ),
            Ok(value) => tracing::info!(
                interceptor = Self::ID,
                "[Dispatcher] {} completed in {}, returned ({}) {}",
                ctx.method_name(),
                elapsed,
                value.kind(),
                value.truncated(Self::RETURN_LIMIT)
            ),
            Err(failure) => tracing::warn!(
                interceptor = Self::ID,
                "[Dispatcher] {} failed in {}: {}",
                ctx.method_name(),
                elapsed,
                failure
            ),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_core::{MethodDescriptor, MethodTarget, TypeDescriptor, Value};

    #[test]
    fn test_void_method_passes_through() {
        let ty = TypeDescriptor::new("org.example.service.UserService")
            .with_method(MethodDescriptor::new("deleteUser").with_parameter("java.lang.Long"));
        let target = MethodTarget::new(&ty, &ty.methods[0]);
        let mut ctx = ExecutionContext::new(&target, vec![Value::Int(3)].into());
        let mut call = SuperCall::new(|| Ok(Value::Unit));

        assert_eq!(PackageInterceptor.intercept(&mut ctx, &mut call), Ok(Value::Unit));
    }

    #[test]
    fn test_long_return_is_returned_whole() {
        let ty = TypeDescriptor::new("org.example.service.UserService")
            .with_method(MethodDescriptor::new("dump").returning("java.lang.String"));
        let target = MethodTarget::new(&ty, &ty.methods[0]);
        let long = "x".repeat(500);
        let mut ctx = ExecutionContext::new(&target, Vec::new().into());
        let expected = Value::from(long.as_str());
        let mut call = SuperCall::new(move || Ok(Value::from(long)));

        assert_eq!(PackageInterceptor.intercept(&mut ctx, &mut call), Ok(expected));
    }
}
