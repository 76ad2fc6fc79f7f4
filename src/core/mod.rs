//! Core types for bosh-render
//!
//! Holds the error system shared by every module:
//! - [`RenderError`] and [`ErrorKind`] for typed error handling in code
//! - [`ErrorContext`] and [`user_friendly_error`] for CLI presentation
//! - [`FileOperation`] and [`IoResultExt`] to attach operation context to I/O failures

pub mod error;
pub mod error_formatting;
pub mod file_error;

pub use error::{ErrorContext, ErrorKind, RenderError};
pub use error_formatting::{create_error_context, user_friendly_error};
pub use file_error::{FileOperation, IoResultExt};

/// Result alias used throughout the library
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
