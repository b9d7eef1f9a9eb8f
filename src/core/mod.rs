//! Core conversion pipeline
//!
//! Data flows strictly forward: raw lines are joined into logical lines,
//! optionally restricted to selected frames, then dispatched per line by
//! the driver into the transform engine or the block expanders.

pub mod autotemplate;
pub mod code;
pub mod driver;
pub mod filter;
pub mod joiner;
pub mod modes;
pub mod state;
pub mod transform;
