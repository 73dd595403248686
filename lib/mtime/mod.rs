//! Reading file `mtime`s to check if targets are out of date.

use crate::paths::BuildPath;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Error;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The modification time of a file.
pub type Timestamp = SystemTime;

/// Looks up the `mtime` of a file. Returns `None` if the file does not
/// exist.
///
/// Each call to this function corresponds to a syscall. To save on
/// syscalls, consider using [`StatCache`] if you're going to check the
/// same path multiple times.
pub fn mtime(file: &Path) -> Result<Option<Timestamp>, Error> {
	match std::fs::metadata(file).and_then(|m| m.modified()) {
		Ok(time) => Ok(Some(time)),
		Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e),
	}
}

/// A cache that remembers the `mtime`s of files.
pub struct StatCache {
	// `None` means the file does not exist.
	cache: HashMap<PathBuf, Option<Timestamp>>,
}

impl StatCache {
	/// Create an empty StatCache.
	pub fn new() -> Self {
		StatCache {
			cache: HashMap::new(),
		}
	}

	/// Looks up the `mtime` of a file, returning the cached value if it
	/// exists.
	pub fn mtime(&mut self, file: &Path) -> Result<Option<Timestamp>, Error> {
		match self.cache.entry(file.to_path_buf()) {
			Entry::Vacant(v) => Ok(*v.insert(mtime(file)?)),
			Entry::Occupied(v) => Ok(*v.get()),
		}
	}

	/// Forget a file, so the next lookup hits the file system again.
	///
	/// Used after a rule ran, since it will have changed its targets.
	pub fn invalidate(&mut self, file: &Path) {
		self.cache.remove(file);
	}
}

/// Check whether `target` needs to be rebuilt from `deps`.
///
/// A target is rebuilt if it is virtual, if it does not exist, or if any
/// dependency file is strictly newer than it. Virtual dependencies are
/// skipped: there is nothing to compare them to.
pub fn should_rebuild(
	target: &BuildPath,
	deps: &[BuildPath],
	cache: &mut StatCache,
) -> Result<bool, Error> {
	let target = match target.as_path() {
		Some(path) => path,
		// Target is virtual, always rebuild.
		None => return Ok(true),
	};
	let target_mtime = match cache.mtime(target)? {
		Some(mtime) => mtime,
		// Target does not exist yet.
		None => return Ok(true),
	};
	for dep in deps {
		if let Some(dep) = dep.as_path() {
			if cache.mtime(dep)? > Some(target_mtime) {
				// Dep is more recent than the target.
				return Ok(true);
			}
		}
	}
	Ok(false)
}
