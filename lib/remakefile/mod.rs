//! Everything related to the `ReMakeFile` format.
//!
//! > `ReMakeFile` → [`read()`][read::read] → [`Remakefile`]

mod eat;

pub mod error;
pub mod parse;
pub mod read;

pub use self::read::read;
pub use self::read::read_from;

use crate::builders::Builder;
use crate::paths::BuildPath;
use crate::rules::{PatternRule, Rule};
use indexmap::IndexMap;
use std::path::PathBuf;

/// The result of reading a `ReMakeFile`: everything one directory
/// declares.
///
/// A stack of these forms the execution context while sub-directories
/// build: rule lookup walks the stack from the innermost file outwards.
#[derive(Debug)]
pub struct Remakefile {
	/// The directory the file was read from. All paths in the other
	/// fields are resolved against it.
	pub dir: PathBuf,
	/// The declared builders, including the stock ones.
	pub builders: IndexMap<String, Builder>,
	/// The explicit rules, in declaration order.
	pub rules: Vec<Rule>,
	/// The pattern rules, in declaration order.
	pub pattern_rules: Vec<PatternRule>,
	/// The registered build goals.
	pub targets: Vec<BuildPath>,
	/// Sub-directories with their own ReMakeFile, in declaration order.
	pub sub_dirs: Vec<PathBuf>,
}
