use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

const MANIFEST_PATH: &str = env!("CARGO_MANIFEST_DIR");

fn scratch_dir(name: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("remake-cli-{}-{}", name, std::process::id()));
	if dir.exists() {
		fs::remove_dir_all(&dir).unwrap();
	}
	fs::create_dir_all(&dir).unwrap();
	dir
}

fn run_remake(dir: &PathBuf, args: &[&str]) -> Output {
	let binary_path = format!("{}/target/debug/remake", MANIFEST_PATH);
	Command::new(binary_path)
		.args(args)
		.current_dir(dir)
		.output()
		.expect("could not execute remake")
}

const COPY_RULE: &str = "\
builder copy
	command = cp $^ $@

rule out.txt: in.txt
	builder = copy

target out.txt
";

#[test]
fn builds_and_then_skips() {
	let dir = scratch_dir("builds");
	fs::write(dir.join("in.txt"), "hello").unwrap();
	fs::write(dir.join("ReMakeFile"), COPY_RULE).unwrap();

	let out = run_remake(&dir, &[]);
	assert!(out.status.success(), "{:?}", out);
	assert_eq!(fs::read_to_string(dir.join("out.txt")).unwrap(), "hello");
	let stdout = String::from_utf8_lossy(&out.stdout);
	assert!(stdout.contains("cp"), "unexpected output: {}", stdout);

	// A second run has nothing to do.
	let out = run_remake(&dir, &[]);
	assert!(out.status.success());
	let stdout = String::from_utf8_lossy(&out.stdout);
	assert!(stdout.contains("[SKIP]"), "unexpected output: {}", stdout);

	fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn builds_a_named_goal() {
	let dir = scratch_dir("named-goal");
	fs::write(dir.join("in.txt"), "hello").unwrap();
	fs::write(
		dir.join("ReMakeFile"),
		"builder copy\n\tcommand = cp $^ $@\n\nrule a.txt: in.txt\n\tbuilder = copy\nrule b.txt: in.txt\n\tbuilder = copy\n\ntarget a.txt b.txt\n",
	)
	.unwrap();

	let out = run_remake(&dir, &["a.txt"]);
	assert!(out.status.success(), "{:?}", out);
	assert!(dir.join("a.txt").exists());
	assert!(!dir.join("b.txt").exists());

	fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn dry_run_announces_without_running() {
	let dir = scratch_dir("dry-run");
	fs::write(dir.join("in.txt"), "hello").unwrap();
	fs::write(dir.join("ReMakeFile"), COPY_RULE).unwrap();

	let out = run_remake(&dir, &["-n"]);
	assert!(out.status.success(), "{:?}", out);
	assert!(!dir.join("out.txt").exists());
	let stdout = String::from_utf8_lossy(&out.stdout);
	assert!(stdout.contains("[DRY-RUN]"), "unexpected output: {}", stdout);

	fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_rule_is_reported() {
	let dir = scratch_dir("no-rule");
	fs::write(dir.join("ReMakeFile"), "target nothing-makes-this\n").unwrap();

	let out = run_remake(&dir, &[]);
	assert!(!out.status.success());
	let stderr = String::from_utf8_lossy(&out.stderr);
	assert!(
		stderr.contains("No rule to make"),
		"unexpected stderr: {}",
		stderr
	);

	fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn parse_errors_name_the_line() {
	let dir = scratch_dir("parse-error");
	fs::write(dir.join("ReMakeFile"), "builder copy\n\tcommand = cp $^ $@\nrule b a\n").unwrap();

	let out = run_remake(&dir, &[]);
	assert!(!out.status.success());
	let stderr = String::from_utf8_lossy(&out.stderr);
	assert!(
		stderr.contains("ReMakeFile:3: Missing `:'"),
		"unexpected stderr: {}",
		stderr
	);

	fs::remove_dir_all(&dir).unwrap();
}
