//! Core types shared by every flowdesign crate.
//!
//! - `error`: the workspace-wide [`Error`] enum and its [`Result`] alias

#![forbid(unsafe_code)]

pub mod error;

pub use error::{Error, Result};
