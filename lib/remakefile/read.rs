use super::error::ReadError;
use super::parse::{Parser, Statement, Variable};
use super::Remakefile;
use crate::builders::{builtins, Builder};
use crate::error::{ErrAt, Located, Location};
use crate::paths::{BuildPath, Pattern};
use crate::rules::{PatternRule, Rule};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

fn read_source(file_name: &Path) -> Result<String, ReadError> {
	let mut source = String::new();
	File::open(file_name)
		.and_then(|f| BufReader::with_capacity(0x10000, f).read_to_string(&mut source))
		.map_err(|error| ReadError::IoError {
			file_name: file_name.to_owned(),
			error,
		})?;
	Ok(source)
}

/// Read, parse, and resolve the `ReMakeFile` of `dir`.
///
/// All paths in the result are resolved against `dir`. Registered
/// targets written as patterns are expanded eagerly, against the files
/// present right now.
pub fn read(dir: &Path, file_name: &str) -> Result<Remakefile, Located<ReadError>> {
	let path = dir.join(file_name);
	let source = read_source(&path).err_at(Location { file: &path, line: 0 })?;
	read_from(dir, &path, &source)
}

/// [`read()`], but with the source given directly instead of read from a
/// file.
///
/// Useful for testing. `file_name` is only used in errors.
pub fn read_from(
	dir: &Path,
	file_name: &Path,
	source: &str,
) -> Result<Remakefile, Located<ReadError>> {
	let mut parser = Parser::new(file_name, source);
	let mut remakefile = Remakefile {
		dir: dir.to_path_buf(),
		builders: builtins(),
		rules: Vec::new(),
		pattern_rules: Vec::new(),
		targets: Vec::new(),
		sub_dirs: Vec::new(),
	};
	// Builder names defined in this file; the stock builders may be
	// shadowed, but a file may not define a name twice.
	let mut defined = Vec::new();
	// Names declared `virtual` so far. Declaration comes before use.
	let mut virtuals: Vec<String> = Vec::new();

	while let Some(statement) = parser.next_statement()? {
		let loc = parser.location();
		match statement {
			Statement::Builder { name } => {
				if defined.iter().any(|n| n == name) {
					return Err(loc.error(ReadError::DuplicateBuilder(name.to_string())));
				}
				let mut command = None;
				let mut destructive = false;
				while let Some(Variable { name: var, value }) =
					parser.next_variable()?
				{
					match var {
						"command" => command = Some(value.to_string()),
						"destructive" => destructive = true,
						_ => {
							return Err(parser
								.location()
								.error(ReadError::UnknownVariable(var.to_string())));
						}
					}
				}
				let command =
					command.ok_or_else(|| loc.error(ReadError::MissingCommand(name.to_string())))?;
				defined.push(name.to_string());
				remakefile.builders.insert(
					name.to_string(),
					Builder {
						name: name.to_string(),
						command,
						destructive,
					},
				);
			}
			Statement::Rule { targets, deps } => {
				let vars = rule_vars(&mut parser, &remakefile.builders, false)?;
				for token in targets.iter().chain(&deps) {
					if token.contains('*') {
						return Err(loc.error(ReadError::PatternInRule(token.to_string())));
					}
				}
				remakefile.rules.push(Rule {
					targets: resolve_paths(&targets, dir, &virtuals),
					deps: resolve_paths(&deps, dir, &virtuals),
					builder: vars.builder,
				});
			}
			Statement::Pattern { target, deps } => {
				let vars = rule_vars(&mut parser, &remakefile.builders, true)?;
				let target = Pattern::new(target)
					.ok_or_else(|| loc.error(ReadError::BadPattern(target.to_string())))?;
				let mut dep_patterns = Vec::with_capacity(deps.len());
				for dep in deps {
					dep_patterns.push(
						Pattern::new(dep)
							.ok_or_else(|| loc.error(ReadError::BadPattern(dep.to_string())))?,
					);
				}
				remakefile.pattern_rules.push(PatternRule {
					target,
					deps: dep_patterns,
					exclude: vars.exclude,
					builder: vars.builder,
				});
			}
			Statement::Target { paths } => {
				for path in paths {
					if path.contains('*') {
						// The pattern names a pattern rule; register
						// everything that rule can currently produce.
						let rule = remakefile
							.pattern_rules
							.iter()
							.rev()
							.find(|rule| rule.target.as_str() == path)
							.ok_or_else(|| {
								loc.error(ReadError::UnknownTargetPattern(path.to_string()))
							})?;
						let expanded = rule.all_targets(dir).map_err(|error| {
							loc.error(ReadError::IoError {
								file_name: dir.to_owned(),
								error,
							})
						})?;
						for target in expanded {
							add_target(&mut remakefile.targets, target);
						}
					} else {
						add_target(&mut remakefile.targets, resolve_path(path, dir, &virtuals));
					}
				}
			}
			Statement::Virtual { name } => {
				if !virtuals.iter().any(|v| v == name) {
					virtuals.push(name.to_string());
				}
				add_target(&mut remakefile.targets, BuildPath::Virtual(name.to_string()));
			}
			Statement::SubDir { path } => {
				remakefile.sub_dirs.push(dir.join(path));
			}
		}
	}

	Ok(remakefile)
}

struct RuleVars {
	builder: Builder,
	exclude: Vec<String>,
}

fn rule_vars(
	parser: &mut Parser,
	builders: &IndexMap<String, Builder>,
	allow_exclude: bool,
) -> Result<RuleVars, Located<ReadError>> {
	let mut builder = None;
	let mut exclude = Vec::new();
	while let Some(Variable { name, value }) = parser.next_variable()? {
		let loc = parser.location();
		match name {
			"builder" => {
				builder = Some(
					builders
						.get(value)
						.cloned()
						.ok_or_else(|| loc.error(ReadError::UndefinedBuilder(value.to_string())))?,
				);
			}
			"exclude" if allow_exclude => {
				exclude.extend(value.split_whitespace().map(|s| s.to_string()));
			}
			_ => return Err(loc.error(ReadError::UnknownVariable(name.to_string()))),
		}
	}
	let builder = builder.ok_or_else(|| parser.location().error(ReadError::MissingBuilder))?;
	Ok(RuleVars { builder, exclude })
}

fn resolve_path(token: &str, dir: &Path, virtuals: &[String]) -> BuildPath {
	if virtuals.iter().any(|v| v == token) {
		BuildPath::Virtual(token.to_string())
	} else {
		BuildPath::file(dir, token)
	}
}

fn resolve_paths(tokens: &[&str], dir: &Path, virtuals: &[String]) -> Vec<BuildPath> {
	tokens
		.iter()
		.map(|token| resolve_path(token, dir, virtuals))
		.collect()
}

fn add_target(targets: &mut Vec<BuildPath>, target: BuildPath) {
	if !targets.contains(&target) {
		targets.push(target);
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::fs;
	use std::path::PathBuf;

	fn file(path: &str) -> BuildPath {
		BuildPath::File(path.into())
	}

	fn read_str(source: &str) -> Result<Remakefile, Located<ReadError>> {
		read_from(
			Path::new("/work/project"),
			Path::new("/work/project/ReMakeFile"),
			source,
		)
	}

	#[test]
	fn rules_and_targets() {
		let source = "\
builder copy
	command = cp $^ $@

rule d: c a2 b1
	builder = copy
rule c: b1 b2
	builder = copy
virtual check
rule check: d
	builder = copy
target d
subdir sub
";
		let remakefile = read_str(source).unwrap();

		assert_eq!(remakefile.rules.len(), 3);
		assert_eq!(remakefile.rules[0].targets, vec![file("/work/project/d")]);
		assert_eq!(
			remakefile.rules[0].deps,
			vec![
				file("/work/project/c"),
				file("/work/project/a2"),
				file("/work/project/b1"),
			]
		);
		assert_eq!(remakefile.rules[0].builder.command, "cp $^ $@");

		// `check` was declared virtual before the rule that makes it.
		assert_eq!(
			remakefile.rules[2].targets,
			vec![BuildPath::Virtual("check".to_string())]
		);

		assert_eq!(
			remakefile.targets,
			vec![
				BuildPath::Virtual("check".to_string()),
				file("/work/project/d"),
			]
		);
		assert_eq!(remakefile.sub_dirs, vec![PathBuf::from("/work/project/sub")]);

		// The stock builders are still available next to `copy`.
		assert!(remakefile.builders.contains_key("copy"));
		assert!(remakefile.builders.contains_key("gcc"));
	}

	#[test]
	fn undefined_builder() {
		let err = read_str("rule a: b\n\tbuilder = nope\n").unwrap_err();
		match err.error {
			ReadError::UndefinedBuilder(name) => assert_eq!(name, "nope"),
			e => panic!("wrong error: {}", e),
		}
		assert_eq!(err.line, 2);
	}

	#[test]
	fn duplicate_builder() {
		let source = "builder copy\n\tcommand = a\nbuilder copy\n\tcommand = b\n";
		let err = read_str(source).unwrap_err();
		match err.error {
			ReadError::DuplicateBuilder(name) => assert_eq!(name, "copy"),
			e => panic!("wrong error: {}", e),
		}
	}

	#[test]
	fn shadowing_a_stock_builder() {
		let remakefile = read_str("builder gcc\n\tcommand = tcc $^ -o $@\n").unwrap();
		assert_eq!(remakefile.builders["gcc"].command, "tcc $^ -o $@");
	}

	#[test]
	fn missing_command() {
		let err = read_str("builder copy\n").unwrap_err();
		match err.error {
			ReadError::MissingCommand(name) => assert_eq!(name, "copy"),
			e => panic!("wrong error: {}", e),
		}
	}

	#[test]
	fn missing_builder_line() {
		let err = read_str("rule a: b\n").unwrap_err();
		match err.error {
			ReadError::MissingBuilder => {}
			e => panic!("wrong error: {}", e),
		}
	}

	#[test]
	fn bad_pattern() {
		let err = read_str("pattern a.o: *.c\n\tbuilder = gcc\n").unwrap_err();
		match err.error {
			ReadError::BadPattern(p) => assert_eq!(p, "a.o"),
			e => panic!("wrong error: {}", e),
		}
	}

	#[test]
	fn wildcard_in_rule() {
		let err = read_str("rule *.o: *.c\n\tbuilder = gcc\n").unwrap_err();
		match err.error {
			ReadError::PatternInRule(p) => assert_eq!(p, "*.o"),
			e => panic!("wrong error: {}", e),
		}
	}

	#[test]
	fn unknown_target_pattern() {
		let err = read_str("target *.o\n").unwrap_err();
		match err.error {
			ReadError::UnknownTargetPattern(p) => assert_eq!(p, "*.o"),
			e => panic!("wrong error: {}", e),
		}
	}

	#[test]
	fn unknown_variable() {
		let err = read_str("rule a: b\n\tbuilder = gcc\n\texclude = c\n").unwrap_err();
		match err.error {
			ReadError::UnknownVariable(name) => assert_eq!(name, "exclude"),
			e => panic!("wrong error: {}", e),
		}
		assert_eq!(err.line, 3);
	}

	fn scratch_dir(name: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("remake-read-{}-{}", name, std::process::id()));
		if dir.exists() {
			fs::remove_dir_all(&dir).unwrap();
		}
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	#[test]
	fn target_pattern_expansion() {
		let dir = scratch_dir("expand");
		fs::write(dir.join("x.c"), "").unwrap();
		fs::write(dir.join("y.c"), "").unwrap();
		fs::write(dir.join("skip.c"), "").unwrap();

		let source = "\
pattern *.o: *.c
	builder = gcc
	exclude = skip.o

target *.o
";
		let remakefile = read_from(&dir, &dir.join("ReMakeFile"), source).unwrap();
		assert_eq!(
			remakefile.targets,
			vec![
				BuildPath::File(dir.join("x.o")),
				BuildPath::File(dir.join("y.o")),
			]
		);

		fs::remove_dir_all(&dir).unwrap();
	}
}
