//! Sandbox data structures: blocks, transforms and the scene graph.
//!
//! - `block` contains placed blocks, their appearance and material
//! - `instance` holds per-object transformation data and grid snapping
//! - `scene_graph` is the block registry plus AR-mode dependent UI nodes

pub mod block;
pub mod instance;
pub mod scene_graph;
