//! treesync integration test suite
//!
//! This crate holds the end-to-end tests that drive a real scan, diff and
//! apply across two temporary trees, plus the fixtures they share.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Shared fixtures for building and inspecting directory trees
///
/// Keeps tree construction and comparison consistent across test files.
pub mod test_utils;
