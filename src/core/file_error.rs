//! File operation descriptors used by [`RenderError::Io`].
//!
//! Capturing the operation at the call site keeps error messages precise
//! without parsing OS error strings later.
//!
//! [`RenderError::Io`]: crate::core::RenderError::Io

use std::path::Path;

use crate::core::RenderError;

/// Types of file operations performed while rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    /// Reading a template or input document
    Read,
    /// Writing the rendered output
    Write,
    /// Getting file metadata (permission bits)
    Metadata,
    /// Setting permissions on the rendered output
    SetPermissions,
    /// Creating the output directory
    CreateDir,
    /// Creating the temporary engine workspace
    CreateWorkspace,
    /// Moving the finished output into place
    Persist,
    /// Spawning the expansion engine process
    Spawn,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "read"),
            FileOperation::Write => write!(f, "write"),
            FileOperation::Metadata => write!(f, "read metadata of"),
            FileOperation::SetPermissions => write!(f, "set permissions on"),
            FileOperation::CreateDir => write!(f, "create directory"),
            FileOperation::CreateWorkspace => write!(f, "create temporary workspace in"),
            FileOperation::Persist => write!(f, "move rendered output to"),
            FileOperation::Spawn => write!(f, "run"),
        }
    }
}

/// Extension trait to attach a [`FileOperation`] and path to [`std::io::Result`].
pub trait IoResultExt<T> {
    /// Convert an I/O failure into [`RenderError::Io`].
    fn with_file_op(self, operation: FileOperation, path: &Path) -> Result<T, RenderError>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_file_op(self, operation: FileOperation, path: &Path) -> Result<T, RenderError> {
        self.map_err(|source| RenderError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        })
    }
}
