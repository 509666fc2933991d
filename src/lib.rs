//! flow-ar
//!
//! A block placement sandbox for augmented-reality sessions. The user points
//! a device at the world, a hit-test finds a surface and small cubes are
//! placed on (or removed from) a 0.1 unit grid. The crate holds the decision
//! logic and leaves rendering and the XR runtime to the host, which makes it
//! usable natively and from the browser via WASM.
//!
//! High-level modules
//! - `context`: runtime configuration (grid step, block scale, highlight opacity)
//! - `data_structures`: blocks, transforms and the scene graph registry
//! - `flow`: the sandbox state, command queue and async output handling
//! - `manager`: block creation/removal and the appearance selection
//! - `pick`: ray casting against placed blocks
//! - `placement`: per-frame cursor arbitration between blocks and surfaces
//! - `session`: AR session state machine
//! - `xr`: traits the host implements for its immersive session
//!

pub mod context;
pub mod data_structures;
pub mod flow;
pub mod manager;
pub mod pick;
pub mod placement;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;
pub mod xr;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
