//! interpose dispatch - Interception at call time
//!
//! A method may carry several interception layers, one per applicable
//! binding. Layers form a chain ordered by binding id, first registered
//! outermost; the innermost layer runs the original body.
//!
//! Two strategies can appear in a chain:
//! - Delegation: the interceptor wraps the call and drives a `SuperCall`
//! - Advice: enter/exit hooks with a correlation value
//!
//! Installation goes through the [`Substrate`] trait. [`WrapperTable`] is
//! the bundled substrate for hosts that register wrappers by hand.

pub mod dispatcher;
pub mod substrate;
pub mod interceptors;

pub use dispatcher::*;
pub use substrate::*;
pub use interceptors::*;
