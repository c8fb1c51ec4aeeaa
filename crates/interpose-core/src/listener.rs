//! Listener contract
//!
//! Listeners observe the discovery -> resolve -> install lifecycle without
//! influencing it. A callback that returns an error (or panics) is logged
//! and discarded by the pipeline.

use crate::{ConfigurationError, IgnoreReason, InstallationError, ListenerError, LoaderId, Transformation};

/// Result of a listener callback
pub type ListenerResult = Result<(), ListenerError>;

/// Observer of pipeline events; every callback defaults to a no-op
pub trait Listener: Send + Sync {
    /// A type was presented to the pipeline, before resolution
    fn on_discovery(&self, _type_name: &str, _loader: LoaderId) -> ListenerResult {
        Ok(())
    }

    fn on_transformation(
        &self,
        _type_name: &str,
        _loader: LoaderId,
        _transformation: &Transformation,
    ) -> ListenerResult {
        Ok(())
    }

    fn on_ignored(&self, _type_name: &str, _loader: LoaderId, _reason: IgnoreReason) -> ListenerResult {
        Ok(())
    }

    fn on_error(&self, _type_name: &str, _loader: LoaderId, _cause: &InstallationError) -> ListenerResult {
        Ok(())
    }

    /// Processing of a type finished
    fn on_complete(&self, _type_name: &str, _loader: LoaderId) -> ListenerResult {
        Ok(())
    }

    /// A startup option or selector was rejected
    fn on_configuration_error(&self, _error: &ConfigurationError) -> ListenerResult {
        Ok(())
    }
}
