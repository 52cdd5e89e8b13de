//! Transformation module.
//!
//! This module handles spreadsheet to canonical export conversion:
//! - Encode: per-column value encoders
//! - Pipeline: the batch conversion and its generated files

pub mod encode;
pub mod pipeline;

pub use pipeline::*;
