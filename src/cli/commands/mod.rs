//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod harvest;
pub mod init;
pub mod status;
pub mod validate;
