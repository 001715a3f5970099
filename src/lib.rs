//! # flowdesign
//!
//! Command-line front end for the flow diagram designer. The designer
//! itself lives in `flowdesign-designer`; this crate wires it to files.

pub mod cli;
pub mod commands;

pub use flowdesign_core;
pub use flowdesign_designer;
