//! Bonnie areas: game object lifecycle and typed dispatch
//!
//! Game objects register with per-capability handlers, handlers are grouped
//! in relays, and relays belong to areas whose INACTIVE / PAUSED / ACTIVE
//! state switches everything inside them on and off at once.
//!
//! - `game`: state flags, handled objects, handlers and relays
//! - `world`: areas, area listeners, the area graph and area banks
//! - `error`: configuration, dispatch and construction errors
//!
//! Logging goes through `tracing`; install a subscriber in the host to see it.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod game;
pub mod world;

pub use error::{ConfigError, ConstructError, DispatchError};
pub use game::{Capability, Handled, Handler, HandlerRelay, HandlerType, SimpleHandled, StateOperator};
pub use world::{Area, AreaBank, AreaEvent, AreaEventSelector, AreaGraph, AreaListener, AreaListenerHandler, AreaState};
