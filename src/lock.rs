use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use fs2::FileExt;

use crate::error::{Error, Result};

/// Hold the store's write lock while `f` runs.
///
/// Takes the in-process `guard` first, then an exclusive advisory lock on
/// `<gitdir>/gitwiki.lock`, so writes are serialized across threads and
/// across processes sharing the repository. Both are released when `f`
/// returns, whether or not it succeeded.
///
/// # Arguments
/// * `gitdir` - Path to the bare repository directory.
/// * `guard` - The store's in-process write mutex.
/// * `f` - Closure to execute while the lock is held.
///
/// # Errors
/// Returns an error if the lock file cannot be opened or locked, or if the
/// mutex was poisoned by a panicking writer.
pub fn with_repo_lock<F, T>(gitdir: &Path, guard: &Mutex<()>, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let _held = guard
        .lock()
        .map_err(|e| Error::git_msg(format!("write lock poisoned: {}", e)))?;

    let lock_path = gitdir.join("gitwiki.lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;
    FileExt::lock_exclusive(&file).map_err(|e| Error::io(&lock_path, e))?;

    let result = f();

    // Closing the file releases the lock as well; unlock eagerly so the
    // next writer does not wait on drop order.
    let _ = FileExt::unlock(&file);
    result
}
