//! # graphlog testkit
//!
//! Test utilities for graphlog.
//!
//! This crate provides:
//! - Sample commands and log helpers
//! - Property-based test generators using proptest
//! - Crash simulation and recovery checks
//! - Cross-crate integration test helpers
//! - Fuzz testing harnesses
//! - Stress testing utilities
//! - Byte-level test vectors
//!
//! ## Usage
//!
//! ```rust
//! use graphlog_testkit::prelude::*;
//!
//! let commands = sample_commands();
//! assert_handles_truncation(&commands);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod integration;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use crash::*;
pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
pub use vectors::*;
