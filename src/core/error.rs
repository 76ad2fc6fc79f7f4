//! Error handling for bosh-render
//!
//! The error system is built around two types:
//! - [`RenderError`] - the strongly-typed error returned by every library operation
//! - [`ErrorContext`] - a user-facing wrapper with details and an actionable suggestion
//!
//! # Error Categories
//!
//! Every [`RenderError`] maps onto one [`ErrorKind`]:
//! - **EnvironmentUnavailable**: the expansion engine or its extension is missing
//! - **DataShape**: property, index or link data does not have the expected structure
//! - **TemplateExpansion**: the engine raised while evaluating the template
//! - **Io**: workspace, template or output file operations failed
//! - **Timeout**: the engine did not finish within the configured limit
//!
//! None of these are retried internally. `TemplateExpansion` and `DataShape` are
//! deterministic; `Io` and `Timeout` are safe to retry by the caller because a failed
//! render never leaves a partial output file behind.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bosh_render_cli::core::{ErrorKind, RenderError, user_friendly_error};
//!
//! let error = RenderError::DataShape {
//!     path: "spec.index".to_string(),
//!     message: "expected a number, found string \"first\"".to_string(),
//! };
//! assert_eq!(error.kind(), ErrorKind::DataShape);
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::file_error::FileOperation;

/// The main error type for rendering operations
#[derive(Error, Debug)]
pub enum RenderError {
    /// The expansion engine or a component it needs cannot be found
    ///
    /// Raised before any temporary workspace is created.
    #[error("{message}: {reason}")]
    EnvironmentUnavailable {
        /// What is missing (e.g. "ruby", "bosh-template gem")
        requirement: String,
        /// Actionable description naming what to install
        message: String,
        /// Underlying lookup or command failure
        reason: String,
    },

    /// Structurally incompatible data
    ///
    /// Raised when a schema default and a supplied value disagree on shape, when an
    /// instance index cannot be compared to zero, or when a consumes declaration is
    /// malformed.
    #[error("invalid data at '{path}': {message}")]
    DataShape {
        /// Dotted path of the offending value
        path: String,
        /// What was expected and what was found
        message: String,
    },

    /// The expansion engine failed while evaluating the template
    ///
    /// `diagnostic` is the engine's own output, kept verbatim.
    #[error("failed to render template {}: {diagnostic}", template.display())]
    TemplateExpansion {
        /// Template that failed
        template: PathBuf,
        /// Engine diagnostic text, unmodified
        diagnostic: String,
        /// Template line named by the diagnostic, if any
        line: Option<usize>,
    },

    /// A filesystem or process operation failed
    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        /// Operation that was attempted
        operation: FileOperation,
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The expansion engine exceeded the configured timeout
    #[error("rendering {} timed out after {}s", template.display(), after.as_secs())]
    Timeout {
        /// Template being rendered
        template: PathBuf,
        /// Configured limit
        after: Duration,
    },

    /// The evaluation context could not be serialized for the engine
    #[error("failed to serialize the evaluation context: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The temporary workspace could not be removed
    ///
    /// When the render itself also failed, that failure is kept in `primary` and
    /// takes priority in [`RenderError::kind`].
    #[error("{}failed to clean up temporary workspace {}: {source}", primary_prefix(primary), path.display())]
    Cleanup {
        /// Workspace directory
        path: PathBuf,
        /// Removal failure
        #[source]
        source: std::io::Error,
        /// Error that ended the render, if it did not succeed
        primary: Option<Box<RenderError>>,
    },
}

fn primary_prefix(primary: &Option<Box<RenderError>>) -> String {
    match primary {
        Some(err) => format!("{err}; additionally "),
        None => String::new(),
    }
}

/// Classification of a [`RenderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EnvironmentUnavailable,
    DataShape,
    TemplateExpansion,
    Io,
    Timeout,
}

impl RenderError {
    /// Shorthand for a [`RenderError::DataShape`]
    pub fn data_shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataShape {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The category this error belongs to.
    ///
    /// A cleanup failure reports the kind of the render failure it accompanies.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::EnvironmentUnavailable {
                ..
            } => ErrorKind::EnvironmentUnavailable,
            RenderError::DataShape {
                ..
            }
            | RenderError::Serialization(_) => ErrorKind::DataShape,
            RenderError::TemplateExpansion {
                ..
            } => ErrorKind::TemplateExpansion,
            RenderError::Io {
                ..
            } => ErrorKind::Io,
            RenderError::Timeout {
                ..
            } => ErrorKind::Timeout,
            RenderError::Cleanup {
                primary,
                ..
            } => primary.as_ref().map_or(ErrorKind::Io, |err| err.kind()),
        }
    }

    /// The error that ended the render, looking through cleanup failures.
    #[must_use]
    pub fn primary(&self) -> &RenderError {
        match self {
            RenderError::Cleanup {
                primary: Some(err),
                ..
            } => err.primary(),
            other => other,
        }
    }
}

/// User-facing error wrapper with details and a suggestion
///
/// ```rust,no_run
/// use bosh_render_cli::core::ErrorContext;
///
/// let context = ErrorContext::new("rendering BOSH templates requires ruby")
///     .with_suggestion("Install ruby and make sure it is in your PATH");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The headline error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}
