//! Geometry and styling shared by every renderer.
//!
//! - [`visuals`]: per-kind dispatch table (shape, colors, size, default label)
//! - [`shapes`]: outline paths for each node shape
//! - [`curves`]: connector curves between nodes
//! - [`arrows`]: arrowheads at connector ends

pub mod arrows;
pub mod curves;
pub mod shapes;
pub mod visuals;

pub use visuals::{NodeShape, NodeVisual, visual};
