// ABOUTME: Configuration constants for sysconf
// ABOUTME: Environment variable names shared by the core, storage and manager packages

pub mod constants;

pub use constants::*;
