mod console;
mod logger;

use self::console::Console;
use self::logger::Logger;
use log::{debug, error};
use remake::build::{execute_dir, Mode, Settings};
use std::path::PathBuf;
use std::process::exit;
use structopt::StructOpt;

#[derive(StructOpt)]
struct Options {
	/// The targets to build. Empty to build the registered targets.
	targets: Vec<String>,

	/// Change directory before doing anything else.
	#[structopt(short = "C", parse(from_os_str))]
	directory: Option<PathBuf>,

	/// Dry run: Don't actually run any commands, but instead list what
	/// commands would be run.
	#[structopt(short = "n", long = "dry-run")]
	dry_run: bool,

	/// Show the full commands and their output as they run.
	#[structopt(short = "v", long = "verbose")]
	verbose: bool,

	/// Clean the registered targets instead of building them.
	#[structopt(short = "c", long = "clean")]
	clean: bool,

	/// Perform a full rebuild (clean and build).
	#[structopt(short = "r", long = "rebuild")]
	rebuild: bool,

	/// The configuration file to execute.
	#[structopt(short = "f", long = "config-file", default_value = "ReMakeFile")]
	config_file: String,

	/// Enable debug messages.
	#[structopt(long = "debug")]
	debug: bool,
}

fn main() {
	log::set_logger(&Logger).unwrap();
	log::set_max_level(log::LevelFilter::Warn);

	let opt = Options::from_args();

	if let Some(dir) = opt.directory.as_ref() {
		std::env::set_current_dir(dir).unwrap_or_else(|e| {
			error!("Unable to change directory to {:?}: {}", dir, e);
			exit(1);
		});
	}

	if opt.debug {
		log::set_max_level(log::LevelFilter::Debug);
		debug!("Debug messages enabled.");
	}

	let settings = Settings {
		// Rebuild wins if both -r and -c are given; it cleans anyway.
		mode: if opt.rebuild {
			Mode::Rebuild
		} else if opt.clean {
			Mode::Clean
		} else {
			Mode::Build
		},
		dry_run: opt.dry_run,
	};

	// A dry run announces the commands it would run.
	let verbose = opt.verbose || opt.dry_run;

	let cwd = std::env::current_dir().unwrap_or_else(|e| {
		error!("Unable to determine the current directory: {}", e);
		exit(1);
	});

	let goals = if opt.targets.is_empty() {
		None
	} else {
		Some(&opt.targets[..])
	};

	let mut console = Console::new(verbose);
	execute_dir(&cwd, &opt.config_file, goals, settings, &mut console).unwrap_or_else(|e| {
		error!("{}", e);
		exit(1);
	});
}
