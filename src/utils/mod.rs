//! Filesystem helpers shared by the render driver and the CLI
//!
//! - [`fs`] - Atomic writes with explicit permission bits, YAML document loading

pub mod fs;

pub use fs::{atomic_write, ensure_dir, file_mode, read_yaml_file};
