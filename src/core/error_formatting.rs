//! Error formatting utilities for bosh-render
//!
//! Converts internal errors into clear, actionable messages for CLI users.

use super::error::{ErrorContext, RenderError};
use super::file_error::FileOperation;
use crate::engine::erb::RUBY_REQUIREMENT;

/// Keywords that indicate permission-related errors
const PERMISSION_ERROR_KEYWORDS: &[&str] = &["permission", "denied", "access"];

/// Convert any error into a user-friendly format with contextual suggestions
///
/// Walks the error chain looking for a [`RenderError`] first, then for plain
/// [`std::io::Error`]s, and falls back to the top-level message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let mut current_error: &dyn std::error::Error = error.as_ref();
    loop {
        if let Some(render_error) = current_error.downcast_ref::<RenderError>() {
            let ctx = create_error_context(render_error);
            // Keep any anyhow context the CLI attached on top of the render error
            return if current_error.to_string() == error.to_string() {
                ctx
            } else {
                ErrorContext {
                    message: format!("{error}: {}", ctx.message),
                    ..ctx
                }
            };
        }

        match current_error.source() {
            Some(source) => current_error = source,
            None => break,
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return ErrorContext::new(error.to_string())
            .with_suggestion("Check that the path exists and you have the necessary permissions")
            .with_details(format!("IO error: {io_error}"));
    }

    let error_msg = format!("{error:#}");

    if PERMISSION_ERROR_KEYWORDS.iter().any(|&keyword| error_msg.contains(keyword)) {
        return ErrorContext::new(error_msg)
            .with_suggestion("Check file permissions and try running with appropriate privileges");
    }

    ErrorContext::new(error_msg)
}

/// Create a user-friendly error context from a [`RenderError`]
pub fn create_error_context(error: &RenderError) -> ErrorContext {
    match error {
        RenderError::EnvironmentUnavailable {
            requirement,
            message,
            reason,
        } => {
            let suggestion = if requirement == RUBY_REQUIREMENT {
                "Install ruby (e.g. 'apt install ruby' or 'brew install ruby'), or point `ruby` in the config file at an absolute path".to_string()
            } else {
                format!("Install it with 'gem install {requirement}'")
            };
            ErrorContext::new(message.clone())
                .with_suggestion(suggestion)
                .with_details(reason.clone())
        }
        RenderError::DataShape {
            path,
            message,
        } => ErrorContext::new(error.to_string())
            .with_suggestion(format!(
                "Check the value supplied for '{path}' against the job spec default"
            ))
            .with_details(message.clone()),
        RenderError::TemplateExpansion {
            template,
            diagnostic,
            line,
        } => {
            let headline = match line {
                Some(line) => format!("failed to render template {}:{line}", template.display()),
                None => format!("failed to render template {}", template.display()),
            };
            ErrorContext::new(headline)
                .with_details(diagnostic.clone())
                .with_suggestion("Check that every property the template reads is declared in the job spec or has a default")
        }
        RenderError::Io {
            operation,
            source,
            ..
        } => {
            let suggestion = match (operation, source.kind()) {
                (_, std::io::ErrorKind::PermissionDenied) => {
                    "Check file permissions and try running with appropriate privileges"
                }
                (FileOperation::Read | FileOperation::Metadata, std::io::ErrorKind::NotFound) => {
                    "Check that the template path is correct"
                }
                (FileOperation::Spawn, _) => "Check the engine configuration",
                _ => "Check that the path exists and you have the necessary permissions",
            };
            ErrorContext::new(error.to_string()).with_suggestion(suggestion)
        }
        RenderError::Timeout {
            ..
        } => ErrorContext::new(error.to_string())
            .with_suggestion("Increase `timeout_secs` in the config file or pass --timeout")
            .with_details("The destination file was left untouched"),
        RenderError::Serialization(_) => ErrorContext::new(error.to_string()),
        RenderError::Cleanup {
            primary: Some(primary),
            ..
        } => {
            let ctx = create_error_context(primary);
            ErrorContext {
                details: Some(match ctx.details {
                    Some(details) => format!("{details}\n{error}"),
                    None => error.to_string(),
                }),
                ..ctx
            }
        }
        RenderError::Cleanup {
            primary: None,
            ..
        } => ErrorContext::new(error.to_string())
            .with_details("The rendered output was written; only the temporary workspace remains"),
    }
}
