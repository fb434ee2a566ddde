//! Scratch directories for the mount helper's local cache.

use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use rand::Rng;
use regfs_common::constants::{CACHE_DIR_ATTEMPTS, CACHE_DIR_NAME_LEN};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Creates a new, uniquely named directory under `root`.
///
/// Returns `None` when every attempt failed, whether from name collisions,
/// missing permissions, or a missing `root`.
#[must_use]
pub fn allocate_cache_dir(root: &Path) -> Option<PathBuf> {
    allocate_cache_dir_with(root, CACHE_DIR_ATTEMPTS, || random_name(CACHE_DIR_NAME_LEN))
}

/// Like [`allocate_cache_dir`], drawing candidate names from `next_name`.
///
/// Creation fails if the name already exists, so concurrent allocators
/// never hand out the same directory; a failure just moves on to the next
/// candidate.
pub fn allocate_cache_dir_with(
    root: &Path,
    attempts: u32,
    mut next_name: impl FnMut() -> String,
) -> Option<PathBuf> {
    let mut builder = std::fs::DirBuilder::new();
    let _ = builder.mode(0o755);

    for attempt in 1..=attempts {
        let candidate = root.join(next_name());
        match builder.create(&candidate) {
            Ok(()) => {
                tracing::debug!(path = %candidate.display(), attempt, "cache directory created");
                return Some(candidate);
            }
            Err(e) => {
                tracing::trace!(path = %candidate.display(), attempt, error = %e, "cache directory attempt failed");
            }
        }
    }

    tracing::warn!(root = %root.display(), attempts, "no cache directory could be created");
    None
}

/// Returns `len` letters drawn uniformly from `a-z` and `A-Z`.
///
/// Uses the thread-local generator, which is seeded once from the OS.
#[must_use]
pub fn random_name(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(LETTERS[rng.random_range(0..LETTERS.len())]))
        .collect()
}
