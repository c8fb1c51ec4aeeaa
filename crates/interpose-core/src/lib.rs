//! interpose core - Fundamental types for runtime method interception
//!
//! This crate defines the data model shared by every stage of the pipeline:
//! - Identifiers (LoaderId, BindingId, InterceptorId)
//! - Read-only type and method descriptors
//! - Call-time values, failures and the per-call execution context
//! - Interception strategies and the interceptor traits
//! - Pipeline events and the listener contract
//! - The error taxonomy

pub mod id;
pub mod descriptor;
pub mod value;
pub mod context;
pub mod strategy;
pub mod event;
pub mod listener;
pub mod error;

pub use id::*;
pub use descriptor::*;
pub use value::*;
pub use context::*;
pub use strategy::*;
pub use event::*;
pub use listener::*;
pub use error::*;
