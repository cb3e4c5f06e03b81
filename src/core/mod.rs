//! Core infrastructure shared by the pipeline
//!
//! Configuration, host detection, version comparison and terminal output.

pub mod config;
pub mod output;
pub mod platform;
pub mod version;
