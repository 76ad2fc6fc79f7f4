//! Atomic file writes and input document loading.

use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::Path;

use crate::core::{FileOperation, IoResultExt, RenderError, Result};

/// Create a directory and all of its parents.
///
/// # Errors
///
/// Returns [`RenderError::Io`] with [`FileOperation::CreateDir`] on failure.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.as_os_str().is_empty() && !path.is_dir() {
        std::fs::create_dir_all(path).with_file_op(FileOperation::CreateDir, path)?;
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Creates the parent directory if needed
/// 2. Writes the content to a temporary file in that directory
/// 3. Applies `mode` (Unix permission bits) when given
/// 4. Syncs and renames the temporary file over `path`
///
/// Readers see either the previous file or the complete new one. If any step
/// fails the temporary file is removed and `path` is left untouched.
///
/// # Examples
///
/// ```rust,no_run
/// use bosh_render_cli::utils::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> bosh_render_cli::core::Result<()> {
/// atomic_write(Path::new("out/bin/ctl"), b"#!/bin/bash\n", Some(0o755))?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`RenderError::Io`] naming the failing step.
pub fn atomic_write(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent).with_file_op(FileOperation::Write, parent)?;
    file.write_all(content).with_file_op(FileOperation::Write, file.path())?;

    if let Some(mode) = mode {
        set_mode(file.as_file(), mode).with_file_op(FileOperation::SetPermissions, path)?;
    }

    file.as_file().sync_all().with_file_op(FileOperation::Write, file.path())?;
    file.persist(path).map_err(|e| RenderError::Io {
        operation: FileOperation::Persist,
        path: path.to_path_buf(),
        source: e.error,
    })?;

    tracing::trace!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Permission bits of a file (`None` on platforms without Unix modes).
///
/// # Errors
///
/// Returns [`RenderError::Io`] with [`FileOperation::Metadata`] on failure.
pub fn file_mode(path: &Path) -> Result<Option<u32>> {
    let metadata = std::fs::metadata(path).with_file_op(FileOperation::Metadata, path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(Some(metadata.permissions().mode() & 0o7777))
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        Ok(None)
    }
}

/// Read and parse a YAML document.
///
/// An empty file parses as YAML `null`, so targets with `#[serde(default)]`
/// fields accept it.
///
/// # Errors
///
/// Returns [`RenderError::Io`] when the file cannot be read and
/// [`RenderError::DataShape`] when it does not match `T`.
pub fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = std::fs::read_to_string(path).with_file_op(FileOperation::Read, path)?;
    serde_yaml::from_str(&content).map_err(|e| RenderError::data_shape(path.display().to_string(), e.to_string()))
}
