//! Resolving build goals into an ordered dependency list.
//!
//! [`resolve`] turns a set of goals into a [`DepList`]: a flat list in
//! which every entry comes after the entries it depends on. Entries name
//! the rule that produces them; an entry without a rule is a *ground*
//! dependency (a pre-existing file, or a virtual name).

use crate::paths::BuildPath;
use crate::remakefile::Remakefile;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

/// Identifies a rule inside a stack of [`Remakefile`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleId {
	/// Index of the remakefile in the stack.
	pub file: usize,
	pub kind: RuleKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
	/// Index into [`Remakefile::rules`].
	Rule(usize),
	/// Index into [`Remakefile::pattern_rules`].
	Pattern(usize),
}

/// One entry of a resolved dependency list.
///
/// For a named rule this holds every target of the rule that is needed;
/// for a pattern rule, each target expands the pattern separately.
#[derive(Debug, PartialEq)]
pub struct DepEntry {
	pub targets: Vec<BuildPath>,
	pub rule: Option<RuleId>,
}

/// An ordered, optimized dependency list: dependencies come before the
/// entries that need them.
pub type DepList = Vec<DepEntry>;

/// How resolution is allowed to treat files that do not exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveMode {
	/// A goal without a rule must exist.
	Build,
	/// Missing ground dependencies are accepted; nothing will run anyway.
	DryRun,
	/// A missing ground dependency is an error: there is nothing to
	/// clean.
	Clean,
}

#[derive(Debug)]
pub enum ResolveError {
	/// No rule makes the goal, and no such file exists.
	NoRule { target: BuildPath },
	/// A goal without a rule does not exist, so it cannot be cleaned.
	CleanMissing { target: BuildPath },
	/// The rules depend on themselves.
	Cycle { chain: Vec<BuildPath> },
}

impl fmt::Display for ResolveError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ResolveError::NoRule { target } => write!(f, "No rule to make {}", target),
			ResolveError::CleanMissing { target } => write!(
				f,
				"Attempting to clean a ground dependency that does not exist: {}",
				target
			),
			ResolveError::Cycle { chain } => {
				write!(f, "Dependency cycle detected: ")?;
				for target in chain {
					write!(f, "{} -> ", target)?;
				}
				write!(f, "{}", chain[0])
			}
		}
	}
}

impl Error for ResolveError {}

/// Resolve `goals` against a stack of remakefiles into an ordered,
/// optimized dependency list.
///
/// The innermost (last) remakefile is searched first.
pub fn resolve(
	goals: &[BuildPath],
	stack: &[Remakefile],
	mode: ResolveMode,
) -> Result<DepList, ResolveError> {
	let mut trees = Vec::with_capacity(goals.len());
	let mut visiting = Vec::new();
	for goal in goals {
		trees.push(find_build_path(goal, stack, mode, &mut visiting)?);
	}
	Ok(optimize(sort(trees)))
}

// One node of the dependency tree of a goal.
struct DepTree {
	path: BuildPath,
	rule: Option<RuleId>,
	deps: Vec<DepTree>,
}

/// Recursively construct the dependency tree of one goal.
///
/// Named rules are searched before pattern rules, inner remakefiles
/// before outer ones. A goal no rule produces is a ground dependency.
fn find_build_path(
	goal: &BuildPath,
	stack: &[Remakefile],
	mode: ResolveMode,
	visiting: &mut Vec<BuildPath>,
) -> Result<DepTree, ResolveError> {
	if let Some(start) = visiting.iter().position(|p| p == goal) {
		return Err(ResolveError::Cycle {
			chain: visiting[start..].to_vec(),
		});
	}
	visiting.push(goal.clone());
	let tree = find_rule(goal, stack, mode, visiting);
	visiting.pop();
	tree
}

fn find_rule(
	goal: &BuildPath,
	stack: &[Remakefile],
	mode: ResolveMode,
	visiting: &mut Vec<BuildPath>,
) -> Result<DepTree, ResolveError> {
	for (file, remakefile) in stack.iter().enumerate().rev() {
		for (i, rule) in remakefile.rules.iter().enumerate() {
			if let Some(matched) = rule.match_target(goal) {
				let matched = matched.clone();
				let mut deps = Vec::with_capacity(rule.deps.len());
				for dep in &rule.deps {
					deps.push(find_build_path(dep, stack, mode, visiting)?);
				}
				return Ok(DepTree {
					path: matched,
					rule: Some(RuleId {
						file,
						kind: RuleKind::Rule(i),
					}),
					deps,
				});
			}
		}
		for (i, rule) in remakefile.pattern_rules.iter().enumerate() {
			let dep_paths = rule.match_target(goal, &remakefile.dir);
			if !dep_paths.is_empty() {
				let mut deps = Vec::with_capacity(dep_paths.len());
				for dep in &dep_paths {
					deps.push(find_build_path(dep, stack, mode, visiting)?);
				}
				return Ok(DepTree {
					path: goal.clone(),
					rule: Some(RuleId {
						file,
						kind: RuleKind::Pattern(i),
					}),
					deps,
				});
			}
		}
	}

	// No rule was found: this is a ground dependency.
	if goal.is_virtual() || goal.exists() {
		return Ok(DepTree {
			path: goal.clone(),
			rule: None,
			deps: Vec::new(),
		});
	}
	match mode {
		ResolveMode::DryRun => Ok(DepTree {
			path: goal.clone(),
			rule: None,
			deps: Vec::new(),
		}),
		ResolveMode::Clean => Err(ResolveError::CleanMissing {
			target: goal.clone(),
		}),
		ResolveMode::Build => Err(ResolveError::NoRule {
			target: goal.clone(),
		}),
	}
}

/// Flatten the dependency trees with a reverse level-order traversal, so
/// that dependencies come before the entries that need them.
fn sort(trees: Vec<DepTree>) -> Vec<(BuildPath, Option<RuleId>)> {
	let mut queue = VecDeque::new();
	let mut sorted = VecDeque::new();

	// Start with the last goal, so the first ends up in front.
	for tree in trees.into_iter().rev() {
		queue.push_back(tree);
		while let Some(node) = queue.pop_front() {
			sorted.push_front((node.path, node.rule));
			for dep in node.deps {
				queue.push_back(dep);
			}
		}
	}

	sorted.into_iter().collect()
}

/// Optimize the sorted list: drop duplicate entries, and merge entries
/// sharing a named rule into one multi-target entry. Pattern rules are
/// never merged, as they expand per target.
fn optimize(deps: Vec<(BuildPath, Option<RuleId>)>) -> DepList {
	// Drop exact duplicates, keeping the first occurrence.
	let mut unique: Vec<(BuildPath, Option<RuleId>)> = Vec::with_capacity(deps.len());
	for dep in deps {
		if !unique.contains(&dep) {
			unique.push(dep);
		}
	}

	// Merge the targets of entries sharing a named rule into the last
	// occurrence, so the dependencies of every merged target stay in
	// front of it.
	let mut out = Vec::with_capacity(unique.len());
	for (i, (path, rule)) in unique.iter().enumerate() {
		match rule {
			Some(id) if matches!(id.kind, RuleKind::Rule(_)) => {
				let last = unique
					.iter()
					.rposition(|(_, r)| r.as_ref() == Some(id))
					.unwrap_or(i);
				if last == i {
					let mut targets = Vec::new();
					for (p, r) in &unique {
						if r.as_ref() == Some(id) && !targets.contains(p) {
							targets.push(p.clone());
						}
					}
					out.push(DepEntry {
						targets,
						rule: Some(*id),
					});
				}
			}
			_ => out.push(DepEntry {
				targets: vec![path.clone()],
				rule: *rule,
			}),
		}
	}
	out
}
