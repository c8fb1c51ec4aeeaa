//! interpose runtime - The interception pipeline
//!
//! Wires the other crates together:
//! 1. Parse the agent argument string into bindings and options
//! 2. Freeze the registry
//! 3. For each discovered type: filter, resolve, install, report
//! 4. Run the heartbeat side channel on its own thread
//!
//! Nothing here sits on the call path; calls go through the substrate.

pub mod agent;
pub mod config;
pub mod heartbeat;
pub mod listener;
pub mod telemetry;

pub use agent::*;
pub use config::*;
pub use heartbeat::*;
pub use listener::*;
pub use telemetry::*;
