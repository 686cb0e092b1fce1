//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes and reads the flat JSON documents the pipelines exchange

pub mod json;
