//! Integration test suite for bosh-render
//!
//! End-to-end tests that render the templates under `tests/assets` through
//! the library API and through the `bosh-render` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **erb_rendering**: ERB templates through Ruby and `bosh-template`; every
//!   test returns early when Ruby or the gem is missing
//! - **tera_rendering**: the same scenarios through the in-process engine
//! - **cli**: `render`, `job`, `context` and `check` commands

mod common;

mod cli;
mod erb_rendering;
mod tera_rendering;
