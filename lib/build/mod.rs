//! Loading, resolving and executing ReMakeFiles.
//!
//! [`execute_dir`] is the entry point: it loads the configuration of a
//! directory, recurses into its `subdir`s, resolves the goals into a
//! dependency list, and runs the selected [`Mode`] over it. Progress is
//! reported through the [`Report`] trait, so the caller decides how (and
//! whether) to display it.

mod subprocess;

pub use self::subprocess::run_action;

use crate::error::Located;
use crate::graph::{self, DepList, ResolveError, ResolveMode, RuleId, RuleKind};
use crate::mtime::{should_rebuild, StatCache};
use crate::paths::BuildPath;
use crate::remakefile::{self, error::ReadError, Remakefile};
use crate::rules::{PatternRule, Rule};
use log::debug;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// What a run should do, and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
	pub mode: Mode,
	/// Announce actions without running them, and without touching any
	/// file.
	pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
	/// Bring the goals up to date.
	Build,
	/// Remove the targets that rules produced.
	Clean,
	/// Clean, then build.
	Rebuild,
}

/// Position of an event in the dependency list.
#[derive(Clone, Copy, Debug)]
pub struct Step {
	/// 1-based index of the current entry.
	pub index: usize,
	pub total: usize,
}

/// One step of a run, reported to a [`Report`].
pub enum Event<'a> {
	/// A ReMakeFile is about to be executed.
	Enter { dir: &'a Path, config_file: &'a str },
	/// A rule's action is about to run.
	Run { step: Step, action: &'a str },
	/// A rule's targets were all up to date; nothing ran.
	UpToDate { step: Step, action: &'a str },
	/// A ground dependency that already exists.
	Present { step: Step, target: &'a BuildPath },
	/// A ground virtual dependency; there is nothing to do for it.
	VirtualDep { step: Step, target: &'a BuildPath },
	/// What would happen, in dry-run mode.
	WouldRun {
		step: Step,
		target: &'a BuildPath,
		action: Option<&'a str>,
	},
	/// A target is being removed.
	Clean { step: Step, target: &'a BuildPath },
	/// Output of a running action.
	Output { data: &'a [u8] },
}

/// Something the executor reports progress to.
pub trait Report {
	fn event(&mut self, event: Event);
}

/// A report that discards everything.
pub struct Silent;

impl Report for Silent {
	fn event(&mut self, _: Event) {}
}

/// An error that stops a run.
#[derive(Debug)]
pub enum BuildError {
	/// The ReMakeFile could not be read.
	Read(Located<ReadError>),
	/// No build path for a goal.
	Resolve(ResolveError),
	/// A dependency is missing right when an action needs it.
	MissingDep {
		dep: BuildPath,
		targets: Vec<BuildPath>,
	},
	/// An action exited with a failure status.
	ActionFailed {
		action: String,
		status: ExitStatus,
		output: Vec<u8>,
	},
	/// An action did not create one of its targets.
	TargetNotCreated { target: BuildPath, action: String },
	/// A destructive action did not remove one of its targets.
	TargetNotDestroyed { target: BuildPath, action: String },
	Io(io::Error),
}

impl fmt::Display for BuildError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			BuildError::Read(e) => write!(f, "{}", e),
			BuildError::Resolve(e) => write!(f, "{}", e),
			BuildError::MissingDep { dep, targets } => {
				write!(f, "Dependency {} does not exist", dep)?;
				if !targets.is_empty() {
					write!(f, " to make")?;
					for target in targets {
						write!(f, " {}", target)?;
					}
				}
				Ok(())
			}
			BuildError::ActionFailed {
				action,
				status,
				output,
			} => {
				write!(f, "Command exited with {}: {}", status, action)?;
				if !output.is_empty() {
					write!(f, "\n{}", String::from_utf8_lossy(output).trim_end())?;
				}
				Ok(())
			}
			BuildError::TargetNotCreated { target, action } => {
				write!(f, "Target {} not created by rule `{}'", target, action)
			}
			BuildError::TargetNotDestroyed { target, action } => {
				write!(f, "Target {} not destroyed by rule `{}'", target, action)
			}
			BuildError::Io(e) => write!(f, "{}", e),
		}
	}
}

impl std::error::Error for BuildError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			BuildError::Read(e) => Some(e),
			BuildError::Resolve(e) => Some(e),
			BuildError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<Located<ReadError>> for BuildError {
	fn from(src: Located<ReadError>) -> BuildError {
		BuildError::Read(src)
	}
}

impl From<ResolveError> for BuildError {
	fn from(src: ResolveError) -> BuildError {
		BuildError::Resolve(src)
	}
}

impl From<io::Error> for BuildError {
	fn from(src: io::Error) -> BuildError {
		BuildError::Io(src)
	}
}

/// The result of executing one directory.
#[derive(Debug)]
pub struct Outcome {
	pub dir: PathBuf,
	/// The resolved, ordered dependency list.
	pub deps: DepList,
	/// The rules that actually ran, with the targets they made.
	pub applied: Vec<AppliedRule>,
	/// Outcomes of `subdir` builds, in order.
	pub subs: Vec<Outcome>,
}

#[derive(Debug)]
pub struct AppliedRule {
	pub targets: Vec<BuildPath>,
	pub action: String,
}

/// Execute the ReMakeFile of `dir`.
///
/// Loads the configuration, executes any sub-directories, resolves the
/// goals (`goals` overrides the registered ones), and runs the selected
/// mode over the resolved dependency list.
pub fn execute_dir(
	dir: &Path,
	config_file: &str,
	goals: Option<&[String]>,
	settings: Settings,
	report: &mut dyn Report,
) -> Result<Outcome, BuildError> {
	let mut stack = Vec::new();
	execute_in(&mut stack, dir, config_file, goals, settings, report)
}

fn execute_in(
	stack: &mut Vec<Remakefile>,
	dir: &Path,
	config_file: &str,
	goals: Option<&[String]>,
	settings: Settings,
	report: &mut dyn Report,
) -> Result<Outcome, BuildError> {
	let dir = if dir.is_absolute() {
		dir.to_path_buf()
	} else {
		std::env::current_dir()?.join(dir)
	};
	debug!("Executing {} for {:?}", config_file, dir);
	report.event(Event::Enter {
		dir: &dir,
		config_file,
	});

	let remakefile = remakefile::read(&dir, config_file)?;
	let sub_dirs = remakefile.sub_dirs.clone();
	stack.push(remakefile);

	// Sub-directories build before this directory's own goals.
	let mut subs = Vec::with_capacity(sub_dirs.len());
	for sub_dir in &sub_dirs {
		subs.push(execute_in(stack, sub_dir, config_file, None, settings, report)?);
	}

	let remakefile = stack.last().unwrap();
	let goals: Vec<BuildPath> = match goals {
		Some(goals) => goals
			.iter()
			.map(|goal| resolve_goal(goal, remakefile))
			.collect(),
		None => remakefile.targets.clone(),
	};

	let resolve_mode = match (settings.mode, settings.dry_run) {
		(Mode::Clean, _) => ResolveMode::Clean,
		(_, true) => ResolveMode::DryRun,
		_ => ResolveMode::Build,
	};
	let deps = graph::resolve(&goals, &stack[..], resolve_mode)?;

	let applied = match settings.mode {
		Mode::Build => build_deps(&deps, &stack[..], settings, report)?,
		Mode::Clean => {
			clean_deps(&deps, settings, report)?;
			Vec::new()
		}
		Mode::Rebuild => {
			clean_deps(&deps, settings, report)?;
			build_deps(&deps, &stack[..], settings, report)?
		}
	};

	stack.pop();
	Ok(Outcome {
		dir,
		deps,
		applied,
		subs,
	})
}

/// A goal given on the command line: a registered virtual name, or a
/// path.
fn resolve_goal(goal: &str, remakefile: &Remakefile) -> BuildPath {
	let name = BuildPath::Virtual(goal.to_string());
	if remakefile.targets.contains(&name) {
		name
	} else {
		BuildPath::file(&remakefile.dir, goal)
	}
}

enum RuleRef<'a> {
	Named(&'a Rule),
	Pattern(&'a PatternRule),
}

fn lookup_rule(id: RuleId, stack: &[Remakefile]) -> (RuleRef, &Path) {
	let remakefile = &stack[id.file];
	match id.kind {
		RuleKind::Rule(i) => (RuleRef::Named(&remakefile.rules[i]), &remakefile.dir),
		RuleKind::Pattern(i) => (
			RuleRef::Pattern(&remakefile.pattern_rules[i]),
			&remakefile.dir,
		),
	}
}

/// Walk the dependency list in order, running the rules whose targets
/// are out of date.
fn build_deps(
	deps: &DepList,
	stack: &[Remakefile],
	settings: Settings,
	report: &mut dyn Report,
) -> Result<Vec<AppliedRule>, BuildError> {
	let mut applied = Vec::new();
	let mut cache = StatCache::new();
	let total = deps.len();

	for (index, entry) in deps.iter().enumerate() {
		let step = Step {
			index: index + 1,
			total,
		};
		let id = match entry.rule {
			Some(id) => id,
			None => {
				// Ground dependency (tree leaf).
				for target in &entry.targets {
					if settings.dry_run {
						report.event(Event::WouldRun {
							step,
							target,
							action: None,
						});
					} else if target.is_virtual() {
						report.event(Event::VirtualDep { step, target });
					} else if target.exists() {
						report.event(Event::Present { step, target });
					} else {
						// Resolution checked this, but the file may have
						// disappeared since.
						return Err(BuildError::MissingDep {
							dep: target.clone(),
							targets: Vec::new(),
						});
					}
				}
				continue;
			}
		};

		match lookup_rule(id, stack) {
			(RuleRef::Named(rule), dir) => {
				if settings.dry_run {
					let action = rule.action();
					for target in &entry.targets {
						report.event(Event::WouldRun {
							step,
							target,
							action: Some(&action),
						});
					}
				} else if apply_rule(rule, dir, step, &mut cache, report)? {
					applied.push(AppliedRule {
						targets: rule.targets.clone(),
						action: rule.action(),
					});
				}
			}
			(RuleRef::Pattern(pattern), dir) => {
				// A pattern entry expands to a fresh concrete rule for
				// each of its targets.
				for target in &entry.targets {
					let rule = match pattern.expand(target, dir) {
						Some(rule) => rule,
						// Resolution only produced matching targets.
						None => continue,
					};
					if settings.dry_run {
						report.event(Event::WouldRun {
							step,
							target,
							action: Some(&rule.action()),
						});
					} else if apply_rule(&rule, dir, step, &mut cache, report)? {
						applied.push(AppliedRule {
							targets: rule.targets.clone(),
							action: rule.action(),
						});
					}
				}
			}
		}
	}
	Ok(applied)
}

/// Run one rule, unless its targets are all up to date.
///
/// Returns whether the action ran.
fn apply_rule(
	rule: &Rule,
	dir: &Path,
	step: Step,
	cache: &mut StatCache,
	report: &mut dyn Report,
) -> Result<bool, BuildError> {
	let action = rule.action();

	// A destructive rule has work to do as long as a target is present.
	let outdated = if rule.builder.destructive {
		rule.targets
			.iter()
			.any(|target| target.is_virtual() || target.exists())
	} else {
		let mut outdated = false;
		for target in &rule.targets {
			if should_rebuild(target, &rule.deps, cache)? {
				outdated = true;
				break;
			}
		}
		outdated
	};
	if !outdated {
		report.event(Event::UpToDate {
			step,
			action: &action,
		});
		return Ok(false);
	}

	// Dependencies must exist by now; a missing one means a rule above
	// didn't produce what it promised.
	for dep in &rule.deps {
		if let Some(path) = dep.as_path() {
			if !path.exists() {
				return Err(BuildError::MissingDep {
					dep: dep.clone(),
					targets: rule.targets.clone(),
				});
			}
		}
	}

	report.event(Event::Run {
		step,
		action: &action,
	});
	let mut output = Vec::new();
	let status = run_action(&action, dir, &mut |data| {
		output.extend_from_slice(data);
		report.event(Event::Output { data });
	})?;
	if !status.success() {
		return Err(BuildError::ActionFailed {
			action,
			status,
			output,
		});
	}

	for target in &rule.targets {
		if let Some(path) = target.as_path() {
			cache.invalidate(path);
			if rule.builder.destructive {
				if path.exists() {
					return Err(BuildError::TargetNotDestroyed {
						target: target.clone(),
						action: action.clone(),
					});
				}
			} else if !path.exists() {
				return Err(BuildError::TargetNotCreated {
					target: target.clone(),
					action: action.clone(),
				});
			}
		}
	}

	Ok(true)
}

/// Walk the dependency list and remove the targets that rules produced.
///
/// Ground dependencies and virtual targets are left alone.
fn clean_deps(
	deps: &DepList,
	settings: Settings,
	report: &mut dyn Report,
) -> Result<(), BuildError> {
	let total = deps.len();
	for (index, entry) in deps.iter().enumerate() {
		let step = Step {
			index: index + 1,
			total,
		};
		if entry.rule.is_none() {
			// Ground dependency: not ours to delete.
			continue;
		}
		for target in &entry.targets {
			let path = match target.as_path() {
				Some(path) => path,
				None => continue,
			};
			if !path.exists() {
				continue;
			}
			report.event(Event::Clean { step, target });
			if settings.dry_run {
				continue;
			}
			if path.is_dir() {
				fs::remove_dir_all(path)?;
			} else {
				fs::remove_file(path)?;
			}
		}
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	fn scratch_dir(name: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("remake-build-{}-{}", name, std::process::id()));
		if dir.exists() {
			fs::remove_dir_all(&dir).unwrap();
		}
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	fn settings(mode: Mode) -> Settings {
		Settings {
			mode,
			dry_run: false,
		}
	}

	const COPY_RULE: &str = "\
builder copy
	command = cp $^ $@

rule out.txt: in.txt
	builder = copy

target out.txt
";

	#[test]
	fn builds_and_skips_up_to_date_targets() {
		let dir = scratch_dir("build");
		fs::write(dir.join("in.txt"), "hello").unwrap();
		fs::write(dir.join("ReMakeFile"), COPY_RULE).unwrap();

		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert_eq!(outcome.applied.len(), 1);
		assert_eq!(outcome.applied[0].targets, vec![BuildPath::File(dir.join("out.txt"))]);
		assert_eq!(fs::read_to_string(dir.join("out.txt")).unwrap(), "hello");

		// Nothing is out of date the second time around.
		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert!(outcome.applied.is_empty());

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn builds_pattern_targets() {
		let dir = scratch_dir("pattern");
		fs::write(dir.join("foo.src"), "foo").unwrap();
		fs::write(dir.join("bar.src"), "bar").unwrap();
		fs::write(
			dir.join("ReMakeFile"),
			"builder copy\n\tcommand = cp $< $@\n\npattern *.out: *.src\n\tbuilder = copy\n\ntarget *.out\n",
		)
		.unwrap();

		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert_eq!(outcome.applied.len(), 2);
		assert_eq!(fs::read_to_string(dir.join("foo.out")).unwrap(), "foo");
		assert_eq!(fs::read_to_string(dir.join("bar.out")).unwrap(), "bar");

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn builds_through_a_chain_of_rules() {
		let dir = scratch_dir("chain");
		fs::write(dir.join("a"), "chain").unwrap();
		fs::write(
			dir.join("ReMakeFile"),
			"builder copy\n\tcommand = cp $< $@\n\nrule b: a\n\tbuilder = copy\nrule c: b\n\tbuilder = copy\n\ntarget c\n",
		)
		.unwrap();

		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert_eq!(outcome.applied.len(), 2);
		assert_eq!(fs::read_to_string(dir.join("c")).unwrap(), "chain");

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn virtual_targets_always_run() {
		let dir = scratch_dir("virtual");
		fs::write(
			dir.join("ReMakeFile"),
			"builder note\n\tcommand = true\n\nvirtual check\nrule check:\n\tbuilder = note\n",
		)
		.unwrap();

		for _ in 0..2 {
			let outcome =
				execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
			assert_eq!(outcome.applied.len(), 1);
			assert_eq!(
				outcome.applied[0].targets,
				vec![BuildPath::Virtual("check".to_string())]
			);
		}

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn clean_removes_built_targets_only() {
		let dir = scratch_dir("clean");
		fs::write(dir.join("in.txt"), "hello").unwrap();
		fs::write(dir.join("ReMakeFile"), COPY_RULE).unwrap();

		execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert!(dir.join("out.txt").exists());

		execute_dir(&dir, "ReMakeFile", None, settings(Mode::Clean), &mut Silent).unwrap();
		assert!(!dir.join("out.txt").exists());
		assert!(dir.join("in.txt").exists());

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn rebuild_cleans_and_builds() {
		let dir = scratch_dir("rebuild");
		fs::write(dir.join("in.txt"), "hello").unwrap();
		fs::write(dir.join("ReMakeFile"), COPY_RULE).unwrap();

		execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Rebuild), &mut Silent).unwrap();
		assert_eq!(outcome.applied.len(), 1);
		assert!(dir.join("out.txt").exists());

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn dry_run_touches_nothing() {
		let dir = scratch_dir("dry-run");
		fs::write(dir.join("in.txt"), "hello").unwrap();
		fs::write(dir.join("ReMakeFile"), COPY_RULE).unwrap();

		let outcome = execute_dir(
			&dir,
			"ReMakeFile",
			None,
			Settings {
				mode: Mode::Build,
				dry_run: true,
			},
			&mut Silent,
		)
		.unwrap();
		assert!(outcome.applied.is_empty());
		assert!(!dir.join("out.txt").exists());

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn command_line_goals_override_registered_ones() {
		let dir = scratch_dir("goals");
		fs::write(dir.join("in.txt"), "hello").unwrap();
		fs::write(
			dir.join("ReMakeFile"),
			"builder copy\n\tcommand = cp $^ $@\n\nrule out.txt: in.txt\n\tbuilder = copy\nrule other.txt: in.txt\n\tbuilder = copy\n\ntarget out.txt other.txt\n",
		)
		.unwrap();

		let goals = vec!["out.txt".to_string()];
		execute_dir(
			&dir,
			"ReMakeFile",
			Some(&goals),
			settings(Mode::Build),
			&mut Silent,
		)
		.unwrap();
		assert!(dir.join("out.txt").exists());
		assert!(!dir.join("other.txt").exists());

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn sub_directories_build_first() {
		let dir = scratch_dir("subdir");
		fs::create_dir(dir.join("sub")).unwrap();
		fs::write(dir.join("sub/in.txt"), "inner").unwrap();
		fs::write(dir.join("sub/ReMakeFile"), COPY_RULE).unwrap();
		fs::write(
			dir.join("ReMakeFile"),
			"builder copy\n\tcommand = cp $^ $@\n\nsubdir sub\n\nrule top.txt: sub/out.txt\n\tbuilder = copy\n\ntarget top.txt\n",
		)
		.unwrap();

		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert_eq!(outcome.subs.len(), 1);
		assert_eq!(outcome.subs[0].applied.len(), 1);
		assert_eq!(outcome.applied.len(), 1);
		assert_eq!(fs::read_to_string(dir.join("top.txt")).unwrap(), "inner");

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn destructive_builders_remove_their_targets() {
		let dir = scratch_dir("destructive");
		fs::write(dir.join("junk"), "x").unwrap();
		fs::write(
			dir.join("ReMakeFile"),
			"builder wipe\n\tcommand = rm -f $@\n\tdestructive\n\nrule junk:\n\tbuilder = wipe\n\ntarget junk\n",
		)
		.unwrap();

		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert_eq!(outcome.applied.len(), 1);
		assert!(!dir.join("junk").exists());

		// With the target gone there is nothing left to do.
		let outcome =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap();
		assert!(outcome.applied.is_empty());

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn failing_action_stops_the_build() {
		let dir = scratch_dir("failure");
		fs::write(
			dir.join("ReMakeFile"),
			"builder fail\n\tcommand = echo broken >&2; false\n\nrule out:\n\tbuilder = fail\n\ntarget out\n",
		)
		.unwrap();

		let err =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap_err();
		match err {
			BuildError::ActionFailed { output, .. } => {
				assert!(String::from_utf8_lossy(&output).contains("broken"));
			}
			e => panic!("wrong error: {}", e),
		}

		fs::remove_dir_all(&dir).unwrap();
	}

	#[test]
	fn missing_produced_target_is_an_error() {
		let dir = scratch_dir("not-created");
		fs::write(
			dir.join("ReMakeFile"),
			"builder noop\n\tcommand = true\n\nrule out:\n\tbuilder = noop\n\ntarget out\n",
		)
		.unwrap();

		let err =
			execute_dir(&dir, "ReMakeFile", None, settings(Mode::Build), &mut Silent).unwrap_err();
		match err {
			BuildError::TargetNotCreated { target, .. } => {
				assert_eq!(target, BuildPath::File(dir.join("out")));
			}
			e => panic!("wrong error: {}", e),
		}

		fs::remove_dir_all(&dir).unwrap();
	}
}
