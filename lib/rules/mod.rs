//! Rules: how targets are made from dependencies.
//!
//! An explicit [`Rule`] binds fixed targets to fixed dependencies. A
//! [`PatternRule`] is a rule template with a single `*` wildcard, which
//! is expanded into a concrete rule for every target it matches.

use crate::builders::Builder;
use crate::paths::{BuildPath, Pattern};
use std::io;
use std::path::Path;

/// An explicit rule: a fixed set of targets made from a fixed set of
/// dependencies by one builder.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
	pub targets: Vec<BuildPath>,
	pub deps: Vec<BuildPath>,
	pub builder: Builder,
}

impl Rule {
	/// The target equal to `goal`, if this rule produces it.
	pub fn match_target(&self, goal: &BuildPath) -> Option<&BuildPath> {
		self.targets.iter().find(|target| *target == goal)
	}

	/// The concrete action string for this rule, with the automatic
	/// variables expanded.
	pub fn action(&self) -> String {
		self.builder
			.action(&path_strings(&self.deps), &path_strings(&self.targets))
	}
}

fn path_strings(paths: &[BuildPath]) -> Vec<String> {
	paths.iter().map(|path| path.to_string()).collect()
}

/// A rule template: `pattern *.o: *.c` makes any `.o` file from the
/// matching `.c` file.
///
/// Patterns are matched against paths relative to the directory of the
/// ReMakeFile that declared the rule.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternRule {
	pub target: Pattern,
	pub deps: Vec<Pattern>,
	/// Concrete target paths this pattern must never match.
	pub exclude: Vec<String>,
	pub builder: Builder,
}

impl PatternRule {
	/// Match `goal` against the target pattern, giving the dependency
	/// paths the `*` stem instantiates. An empty result means no match.
	pub fn match_target(&self, goal: &BuildPath, dir: &Path) -> Vec<BuildPath> {
		let stem = match self.stem_of(goal, dir) {
			Some(stem) => stem,
			None => return Vec::new(),
		};
		self.deps
			.iter()
			.map(|dep| BuildPath::file(dir, &dep.instantiate(&stem)))
			.collect()
	}

	/// Expand the template into a concrete rule for `goal`.
	///
	/// Returns `None` if `goal` does not match the target pattern.
	pub fn expand(&self, goal: &BuildPath, dir: &Path) -> Option<Rule> {
		let stem = self.stem_of(goal, dir)?;
		let deps = self
			.deps
			.iter()
			.map(|dep| BuildPath::file(dir, &dep.instantiate(&stem)))
			.collect();
		Some(Rule {
			targets: vec![goal.clone()],
			deps,
			builder: self.builder.clone(),
		})
	}

	/// Every target this pattern can currently produce: the dependency
	/// patterns are globbed under `dir` and mapped to target names, with
	/// excluded targets removed.
	pub fn all_targets(&self, dir: &Path) -> io::Result<Vec<BuildPath>> {
		let mut targets = Vec::new();
		for dep in &self.deps {
			for found in dep.glob(dir)? {
				let stem = match dep.stem(&found) {
					Some(stem) => stem,
					None => continue,
				};
				let name = self.target.instantiate(stem);
				if self.exclude.iter().any(|excluded| excluded == &name) {
					continue;
				}
				let target = BuildPath::file(dir, &name);
				if !targets.contains(&target) {
					targets.push(target);
				}
			}
		}
		Ok(targets)
	}

	fn stem_of(&self, goal: &BuildPath, dir: &Path) -> Option<String> {
		let path = goal.as_path()?;
		// Match relative to the declaring directory; a goal outside of it
		// is matched on the full path.
		let rel = path.strip_prefix(dir).unwrap_or(path);
		let text = rel.to_str()?;
		if self.exclude.iter().any(|excluded| excluded == text) {
			return None;
		}
		self.target.stem(text).map(|stem| stem.to_string())
	}
}
