//! Browser front end for the flow diagram designer
//!
//! Client-side rendered with Leptos 0.7 and compiled to WASM. The designer
//! state machine lives in `flowdesign-designer`; this crate supplies the
//! browser pieces it needs:
//!
//! - `surface`: a DOM-backed render surface
//! - `delivery`: Blob download with a `window.open` fallback
//! - `toast`: notifications as transient toasts
//! - `clock`: `performance.now()` as the designer clock
//! - `component`: the `<FlowDesigner/>` component

#![forbid(unsafe_code)]

pub mod clock;
pub mod component;
pub mod delivery;
pub mod surface;
pub mod toast;

pub use component::FlowDesigner;
