//! Errors that can occur while reading or parsing `ReMakeFile`s.

use crate::error::Located;
use std::error::Error;
use std::fmt;

/// A parsing error.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParseError {
	ExpectedStatement,
	ExpectedVarDef,
	UnexpectedIndent,
	ExpectedPath,
	ExpectedName,
	ExpectedColon,
	ExpectedEndOfLine,
	ExpectedSinglePattern,
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		use self::ParseError::*;
		write!(
			f,
			"{}",
			match self {
				ExpectedStatement => {
					"Expected `builder', `rule', `pattern', `target', `virtual', or `subdir'"
				}
				ExpectedVarDef => "Expected `var = value'",
				UnexpectedIndent => "Unexpected indent",
				ExpectedPath => "Missing path",
				ExpectedName => "Missing name of definition",
				ExpectedColon => "Missing `:'",
				ExpectedEndOfLine => "Garbage at end of line",
				ExpectedSinglePattern => "Expected exactly one target pattern",
			}
		)
	}
}

impl Error for ParseError {}

/// An error while reading a `ReMakeFile`.
#[derive(Debug)]
pub enum ReadError {
	/// Some syntax error.
	ParseError(ParseError),
	/// A rule refers to a builder which doesn't exist.
	UndefinedBuilder(String),
	/// A builder with this name was already defined in this file.
	DuplicateBuilder(String),
	/// A builder definition without a `command =` line.
	MissingCommand(String),
	/// A rule definition without a `builder =` line.
	MissingBuilder,
	/// Got a definition of a variable which is not recognized in this
	/// (`builder`, `rule` or `pattern`) definition.
	UnknownVariable(String),
	/// A pattern without exactly one `*` wildcard.
	BadPattern(String),
	/// A wildcard in an explicit rule; that takes a `pattern` statement.
	PatternInRule(String),
	/// A `target` statement names a pattern no pattern rule produces.
	UnknownTargetPattern(String),
	/// A problem while trying to open or read a file.
	IoError {
		file_name: std::path::PathBuf,
		error: std::io::Error,
	},
}

impl fmt::Display for ReadError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ReadError::ParseError(e) => write!(f, "{}", e),
			ReadError::UndefinedBuilder(n) => write!(f, "Undefined builder name: {}", n),
			ReadError::DuplicateBuilder(n) => write!(f, "Duplicate builder: {}", n),
			ReadError::MissingCommand(n) => {
				write!(f, "Builder {} has no `command =' line", n)
			}
			ReadError::MissingBuilder => write!(f, "Missing `builder =' line"),
			ReadError::UnknownVariable(n) => write!(f, "Unexpected variable: {}", n),
			ReadError::BadPattern(p) => {
				write!(f, "Pattern {} must contain exactly one `*'", p)
			}
			ReadError::PatternInRule(p) => {
				write!(f, "Wildcard {} in a `rule' (use a `pattern' statement)", p)
			}
			ReadError::UnknownTargetPattern(p) => {
				write!(f, "No pattern rule produces {}", p)
			}
			ReadError::IoError { file_name, error } => {
				write!(f, "Unable to read {:?}: {}", file_name, error)
			}
		}
	}
}

impl Error for ReadError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ReadError::IoError { error, .. } => Some(error),
			_ => None,
		}
	}
}

impl From<ParseError> for ReadError {
	fn from(src: ParseError) -> ReadError {
		ReadError::ParseError(src)
	}
}

impl From<Located<ParseError>> for Located<ReadError> {
	fn from(src: Located<ParseError>) -> Self {
		src.convert()
	}
}
