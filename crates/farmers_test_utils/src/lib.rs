//! # Farmers Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Recording mock engine handles
//! - Scripted heading sources
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
