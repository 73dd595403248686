use remake::build::{Event, Report, Step};
use std::io::Write;

/// Prints progress as `[i/n]` lines.
pub struct Console {
	verbose: bool,
	width: Option<usize>,
}

impl Console {
	pub fn new(verbose: bool) -> Console {
		Console {
			verbose,
			width: term_size::dimensions().map(|(w, _)| w),
		}
	}

	fn line(&self, step: Step, tag: Option<&str>, text: &str) {
		let mut line = format!("[{}/{}] ", step.index, step.total);
		if let Some(tag) = tag {
			line.push('[');
			line.push_str(tag);
			line.push_str("] ");
		}
		line.push_str(text);
		if !self.verbose {
			if let Some(width) = self.width {
				truncate_to(&mut line, width);
			}
		}
		println!("{}", line);
	}
}

fn truncate_to(line: &mut String, width: usize) {
	if line.len() <= width {
		return;
	}
	let mut end = width.saturating_sub(3);
	while end > 0 && !line.is_char_boundary(end) {
		end -= 1;
	}
	line.truncate(end);
	line.push_str("...");
}

impl Report for Console {
	fn event(&mut self, event: Event) {
		match event {
			Event::Enter { dir, config_file } => {
				println!("[+] Executing {} for folder {}.", config_file, dir.display());
			}
			Event::Run { step, action } => self.line(step, None, action),
			Event::UpToDate { step, action } => self.line(step, Some("SKIP"), action),
			Event::Present { step, target } => self.line(
				step,
				Some("SKIP"),
				&format!("Dependency {} already exists.", target),
			),
			Event::VirtualDep { step, target } => self.line(
				step,
				Some("SKIP"),
				&format!("Virtual dependency: {}", target),
			),
			Event::WouldRun {
				step,
				target,
				action,
			} => match action {
				Some(action) => self.line(
					step,
					Some("DRY-RUN"),
					&format!("Dependency: {} built with rule: {}", target, action),
				),
				None => self.line(step, Some("DRY-RUN"), &format!("Dependency: {}", target)),
			},
			Event::Clean { step, target } => self.line(
				step,
				Some("CLEAN"),
				&format!("Cleaning dependency {}.", target),
			),
			Event::Output { data } => {
				if self.verbose {
					let _ = std::io::stdout().write_all(data);
				}
			}
		}
	}
}
