//! World module - areas and how games move between them
//!
//! Layered on the dispatch core in `game`:
//! - Area: INACTIVE / PAUSED / ACTIVE state machine owning a handler relay
//! - AreaListener: typed observers of area transitions, with selectors
//! - AreaGraph: labelled routes between areas, one current area at a time
//! - AreaBank: areas built once from a manifest, grouped in named banks
//! - AreaObjectCreator: populates an area on start, clears it on end

mod area;
mod bank;
mod creator;
mod descriptor;
mod event;
mod graph;
mod listener;

#[cfg(test)]
mod testing;

pub use area::*;
pub use bank::*;
pub use creator::*;
pub use descriptor::*;
pub use event::*;
pub use graph::*;
pub use listener::*;
