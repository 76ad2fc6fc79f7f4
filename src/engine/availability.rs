//! Per-process memo of successful engine availability checks.
//!
//! Only successes are stored. A failed check is repeated on the next call so
//! that installing Ruby mid-session is picked up.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct AvailabilityKey {
    pub ruby: PathBuf,
    pub gem: PathBuf,
    pub gem_name: String,
}

static CHECKED: LazyLock<DashMap<AvailabilityKey, PathBuf>> = LazyLock::new(DashMap::new);

/// Resolved interpreter path for a configuration that already passed its check.
pub(crate) fn cached(key: &AvailabilityKey) -> Option<PathBuf> {
    CHECKED.get(key).map(|entry| entry.value().clone())
}

pub(crate) fn remember(key: AvailabilityKey, ruby: &Path) {
    CHECKED.insert(key, ruby.to_path_buf());
}
