//! Game Foundation Module
//!
//! The dispatch core every area is built on:
//!
//! - StateOperator: observable, lockable boolean flags
//! - Handled: liveness + per-capability handling flags of a game object
//! - Handler: ordered fan-out over all objects sharing one capability
//! - HandlerRelay: routes objects to every handler whose capability they provide
//!
//! Everything here is single-threaded and synchronous. Dispatch passes run to
//! completion, listeners run inside `set_state`, and both tolerate the callee
//! mutating the structure it is being called from.

pub mod state;
pub mod handled;
pub mod handler;
pub mod relay;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use state::{StateListener, StateOperator};
pub use handled::{Capabilities, Capability, Handled, HandlerType, HandlingOperators, SimpleHandled};
pub use handler::{DispatchSummary, Handler};
pub use relay::HandlerRelay;
