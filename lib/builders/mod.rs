//! Builders: the commands that realize rules.
//!
//! A builder is a named shell command template. Rules refer to builders
//! by name; a set of stock builders is available to every ReMakeFile, and
//! `builder` statements define more.

use indexmap::IndexMap;

/// A named shell command template.
///
/// The command may use the automatic variables `$@` (all targets), `$^`
/// (all dependencies) and `$<` (the first dependency). `$$` is a literal
/// dollar sign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Builder {
	pub name: String,
	pub command: String,
	/// The builder removes its targets instead of creating them. After
	/// it runs, its targets must be gone rather than present.
	pub destructive: bool,
}

impl Builder {
	pub fn new(name: &str, command: &str) -> Builder {
		Builder {
			name: name.to_string(),
			command: command.to_string(),
			destructive: false,
		}
	}

	/// Expand the automatic variables into a concrete action string.
	pub fn action(&self, deps: &[String], targets: &[String]) -> String {
		let mut action = String::with_capacity(self.command.len());
		let mut rest = self.command.as_str();
		while let Some(i) = rest.find('$') {
			action.push_str(&rest[..i]);
			rest = &rest[i + 1..];
			match rest.as_bytes().first() {
				Some(b'$') => {
					action.push('$');
					rest = &rest[1..];
				}
				Some(b'@') => {
					push_joined(&mut action, targets);
					rest = &rest[1..];
				}
				Some(b'^') => {
					push_joined(&mut action, deps);
					rest = &rest[1..];
				}
				Some(b'<') => {
					if let Some(first) = deps.first() {
						action.push_str(first);
					}
					rest = &rest[1..];
				}
				// Not an automatic variable. Keep the `$` as-is.
				_ => action.push('$'),
			}
		}
		action.push_str(rest);
		action
	}
}

fn push_joined(action: &mut String, paths: &[String]) {
	for (i, path) in paths.iter().enumerate() {
		if i > 0 {
			action.push(' ');
		}
		action.push_str(path);
	}
}

/// The stock builders available to every ReMakeFile.
///
/// `gcc` compiles a single source file to an object; `clang` compiles or
/// links a whole program. A `builder` statement may shadow any of these.
pub fn builtins() -> IndexMap<String, Builder> {
	let mut builders = IndexMap::new();
	for builder in &[
		Builder::new("gcc", "gcc -c $< -o $@"),
		Builder::new("clang", "clang $^ -o $@"),
		Builder::new("md2html", "pandoc $^ -o $@"),
		Builder::new("jinja2", "jinja2 $^ -o $@"),
		Builder::new("pdfcrop", "pdftk $^ cat 1 output $@"),
		Builder::new(
			"html2pdf_chrome",
			"google-chrome-stable --headless --disable-gpu \
			 --run-all-compositor-stages-before-draw --print-to-pdf=$@ $^",
		),
	] {
		builders.insert(builder.name.clone(), builder.clone());
	}
	builders
}
