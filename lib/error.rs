//! Errors at a specific line in a file.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// A line in a configuration file: the place where something went wrong.
///
/// Line numbers start at 1. A line number of 0 means the line is not
/// known, for example because the file could not be opened at all.
#[derive(Copy, Clone, Debug)]
pub struct Location<'a> {
	pub file: &'a Path,
	pub line: u32,
}

impl<'a> Location<'a> {
	/// Create an error carrying this location.
	pub fn error<E>(&self, error: E) -> Located<E> {
		Located {
			file: self.file.to_path_buf(),
			line: self.line,
			error,
		}
	}
}

/// An error which happened at a specific line in some file.
#[derive(Debug)]
pub struct Located<E> {
	pub file: PathBuf,
	pub line: u32,
	pub error: E,
}

impl<E> Located<E> {
	/// Convert one error type to another, while keeping the location
	/// information.
	pub fn convert<F: From<E>>(self) -> Located<F> {
		Located {
			file: self.file,
			line: self.line,
			error: F::from(self.error),
		}
	}
}

/// Extension trait: Adds [`err_at()`][ErrAt::err_at] to [`Result`].
pub trait ErrAt {
	type WithLocation;
	/// Add location information to the error.
	fn err_at(self, location: Location) -> Self::WithLocation;
}

impl<T, E> ErrAt for Result<T, E> {
	type WithLocation = Result<T, Located<E>>;
	fn err_at(self, location: Location) -> Self::WithLocation {
		self.map_err(|e| location.error(e))
	}
}

impl<E: fmt::Display> fmt::Display for Located<E> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		if self.line > 0 {
			write!(f, "{}:{}: ", self.file.display(), self.line)?;
		}
		write!(f, "{}", self.error)
	}
}

impl<E: Error> Error for Located<E> {}
