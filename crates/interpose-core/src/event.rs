//! Pipeline event definitions
//!
//! Every discovered type produces, in order: one `Discovery`, exactly one of
//! `Transformation` / `Ignored` / `Error`, then one `Complete`.

use std::fmt;

use crate::{
    BindingId, InstallationError, InterceptorId, Listener, ListenerResult, LoaderId, MethodKey,
    StrategyKind,
};

/// One binding as applied to a type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedBinding {
    pub binding: BindingId,
    pub kind: StrategyKind,
    pub interceptor: InterceptorId,
    /// Methods the binding was installed on
    pub methods: Vec<MethodKey>,
}

/// Summary of a successful transformation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transformation {
    /// Applied bindings, in registration order
    pub bindings: Vec<AppliedBinding>,
}

impl Transformation {
    /// Total number of (binding, method) installations
    pub fn installation_count(&self) -> usize {
        self.bindings.iter().map(|b| b.methods.len()).sum()
    }
}

/// Why a type was not transformed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// The type is in an excluded namespace
    Excluded,
    /// No binding selected the type, or none selected any of its methods
    NoApplicableBinding,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Excluded => f.write_str("excluded namespace"),
            IgnoreReason::NoApplicableBinding => f.write_str("no applicable binding"),
        }
    }
}

/// Event observed by listeners
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Discovery {
        type_name: String,
        loader: LoaderId,
    },
    Transformation {
        type_name: String,
        loader: LoaderId,
        transformation: Transformation,
    },
    Ignored {
        type_name: String,
        loader: LoaderId,
        reason: IgnoreReason,
    },
    Error {
        type_name: String,
        loader: LoaderId,
        cause: InstallationError,
    },
    Complete {
        type_name: String,
        loader: LoaderId,
    },
}

impl Event {
    pub fn type_name(&self) -> &str {
        match self {
            Event::Discovery { type_name, .. }
            | Event::Transformation { type_name, .. }
            | Event::Ignored { type_name, .. }
            | Event::Error { type_name, .. }
            | Event::Complete { type_name, .. } => type_name,
        }
    }

    pub fn loader(&self) -> LoaderId {
        match self {
            Event::Discovery { loader, .. }
            | Event::Transformation { loader, .. }
            | Event::Ignored { loader, .. }
            | Event::Error { loader, .. }
            | Event::Complete { loader, .. } => *loader,
        }
    }

    /// Short event name
    pub fn name(&self) -> &'static str {
        match self {
            Event::Discovery { .. } => "discovery",
            Event::Transformation { .. } => "transformation",
            Event::Ignored { .. } => "ignored",
            Event::Error { .. } => "error",
            Event::Complete { .. } => "complete",
        }
    }

    /// Is this one of the three mutually exclusive outcome events?
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            Event::Transformation { .. } | Event::Ignored { .. } | Event::Error { .. }
        )
    }

    /// Route the event to the matching listener callback
    pub fn deliver(&self, listener: &dyn Listener) -> ListenerResult {
        match self {
            Event::Discovery { type_name, loader } => listener.on_discovery(type_name, *loader),
            Event::Transformation {
                type_name,
                loader,
                transformation,
            } => listener.on_transformation(type_name, *loader, transformation),
            Event::Ignored {
                type_name,
                loader,
                reason,
            } => listener.on_ignored(type_name, *loader, *reason),
            Event::Error {
                type_name,
                loader,
                cause,
            } => listener.on_error(type_name, *loader, cause),
            Event::Complete { type_name, loader } => listener.on_complete(type_name, *loader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ListenerError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Names(Mutex<Vec<&'static str>>);

    impl Listener for Names {
        fn on_discovery(&self, _type_name: &str, _loader: LoaderId) -> ListenerResult {
            self.0.lock().unwrap().push("discovery");
            Ok(())
        }

        fn on_ignored(&self, _type_name: &str, _loader: LoaderId, _reason: IgnoreReason) -> ListenerResult {
            self.0.lock().unwrap().push("ignored");
            Err(ListenerError::Failed("nope".into()))
        }
    }

    #[test]
    fn test_deliver_routes_by_variant() {
        let names = Names::default();
        let discovery = Event::Discovery {
            type_name: "a.B".into(),
            loader: LoaderId::BOOTSTRAP,
        };
        let ignored = Event::Ignored {
            type_name: "a.B".into(),
            loader: LoaderId::BOOTSTRAP,
            reason: IgnoreReason::Excluded,
        };
        let complete = Event::Complete {
            type_name: "a.B".into(),
            loader: LoaderId::BOOTSTRAP,
        };

        assert!(discovery.deliver(&names).is_ok());
        assert!(ignored.deliver(&names).is_err());
        // default callback
        assert!(complete.deliver(&names).is_ok());

        assert_eq!(*names.0.lock().unwrap(), vec!["discovery", "ignored"]);
    }

    #[test]
    fn test_outcome_classification() {
        let complete = Event::Complete {
            type_name: "a.B".into(),
            loader: LoaderId::new(3),
        };
        assert!(!complete.is_outcome());
        assert_eq!(complete.loader(), LoaderId::new(3));
        assert_eq!(complete.name(), "complete");
    }

    #[test]
    fn test_installation_count() {
        let t = Transformation {
            bindings: vec![
                AppliedBinding {
                    binding: BindingId::new(0),
                    kind: StrategyKind::Delegation,
                    interceptor: "package".into(),
                    methods: vec![MethodKey::of("a.B", "x"), MethodKey::of("a.B", "y")],
                },
                AppliedBinding {
                    binding: BindingId::new(1),
                    kind: StrategyKind::Advice,
                    interceptor: "timing".into(),
                    methods: vec![MethodKey::of("a.B", "x")],
                },
            ],
        };
        assert_eq!(t.installation_count(), 3);
    }
}
