//! The `ReMakeFile` parser.

use super::eat::{eat_identifier, eat_path, eat_paths, eat_whitespace};
use super::error::ParseError;
use crate::error::{Located, Location};
use std::path::Path;

/// A line-by-line `ReMakeFile` parser.
pub struct Parser<'a, 'b> {
	file_name: &'b Path,
	source: &'a str,
	// Number of the next unread line.
	next_line_num: u32,
	// Number of the line last returned by `take_line`.
	current_line_num: u32,
	peeked: Option<Line<'a>>,
}

#[derive(Clone, Copy)]
struct Line<'a> {
	text: &'a str,
	indented: bool,
	num: u32,
}

/// A variable bound to the preceding statement, e.g. `builder = gcc`.
///
/// A bare name with no `=` is a flag variable with an empty value.
#[derive(Debug, PartialEq, Eq)]
pub struct Variable<'a> {
	pub name: &'a str,
	pub value: &'a str,
}

/// A statement in a `ReMakeFile`.
#[derive(Debug, PartialEq, Eq)]
pub enum Statement<'a> {
	/// A builder definition.
	Builder { name: &'a str },
	/// An explicit rule: targets made from dependencies.
	Rule {
		targets: Vec<&'a str>,
		deps: Vec<&'a str>,
	},
	/// A pattern rule: a target pattern made from dependency patterns.
	Pattern {
		target: &'a str,
		deps: Vec<&'a str>,
	},
	/// Registration of build goals.
	Target { paths: Vec<&'a str> },
	/// Declaration of a virtual target.
	Virtual { name: &'a str },
	/// A sub-directory with its own ReMakeFile.
	SubDir { path: &'a str },
}

impl<'a, 'b> Parser<'a, 'b> {
	/// Create a new parser, to parse `source`.
	///
	/// The file name is only used in errors.
	pub fn new(file_name: &'b Path, source: &'a str) -> Self {
		Parser {
			file_name,
			source,
			next_line_num: 0,
			current_line_num: 0,
			peeked: None,
		}
	}

	/// The location of the last read statement or variable.
	///
	/// Used for error reporting.
	pub fn location(&self) -> Location<'b> {
		Location {
			file: self.file_name,
			line: self.current_line_num,
		}
	}

	// The next non-blank, non-comment line, with its indentation eaten.
	fn read_line(&mut self) -> Option<Line<'a>> {
		while !self.source.is_empty() {
			let line_end = self.source.find('\n').unwrap_or(self.source.len());
			let (line, rest) = self.source.split_at(line_end);
			self.source = rest.strip_prefix('\n').unwrap_or(rest);
			self.next_line_num += 1;

			let mut text = line;
			let indented = eat_whitespace(&mut text) > 0;
			let text = text.trim_end();
			if text.is_empty() || text.starts_with('#') {
				continue;
			}
			return Some(Line {
				text,
				indented,
				num: self.next_line_num,
			});
		}
		None
	}

	fn peek_line(&mut self) -> Option<Line<'a>> {
		if self.peeked.is_none() {
			self.peeked = self.read_line();
		}
		self.peeked
	}

	fn take_line(&mut self) -> Option<Line<'a>> {
		let line = self.peek_line();
		self.peeked = None;
		if let Some(line) = line {
			self.current_line_num = line.num;
		}
		line
	}

	/// Read an (indented) variable definition.
	///
	/// To be used (repeatedly) right after a statement that takes
	/// variables. Returns `None` when the indented block ends.
	pub fn next_variable(&mut self) -> Result<Option<Variable<'a>>, Located<ParseError>> {
		match self.peek_line() {
			Some(line) if line.indented => {}
			_ => return Ok(None),
		}
		let mut line = self.take_line().unwrap().text;
		let name = eat_identifier(&mut line)
			.ok_or_else(|| self.location().error(ParseError::ExpectedVarDef))?;
		eat_whitespace(&mut line);
		if let Some(mut value) = line.strip_prefix('=') {
			eat_whitespace(&mut value);
			Ok(Some(Variable { name, value }))
		} else if line.is_empty() {
			Ok(Some(Variable { name, value: "" }))
		} else {
			Err(self.location().error(ParseError::ExpectedVarDef))
		}
	}

	/// Read the next statement in the file.
	///
	/// Does *not* read the variables underneath a statement. That is a
	/// separate step, for which `next_variable` needs to be called in a
	/// loop right after the statement is read.
	pub fn next_statement(&mut self) -> Result<Option<Statement<'a>>, Located<ParseError>> {
		let line = match self.take_line() {
			Some(line) => line,
			None => return Ok(None),
		};
		if line.indented {
			return Err(self.location().error(ParseError::UnexpectedIndent));
		}
		let mut line = line.text;

		let ident = eat_identifier(&mut line)
			.ok_or_else(|| self.location().error(ParseError::ExpectedStatement))?;

		eat_whitespace(&mut line);

		let loc = self.location();

		let statement = match ident {
			"builder" => {
				let name = eat_identifier(&mut line)
					.ok_or_else(|| loc.error(ParseError::ExpectedName))?;
				Statement::Builder { name }
			}
			"rule" => {
				let (targets, colon) = eat_paths(&mut line);
				if !colon {
					return Err(loc.error(ParseError::ExpectedColon));
				}
				if targets.is_empty() {
					return Err(loc.error(ParseError::ExpectedPath));
				}
				let (deps, colon) = eat_paths(&mut line);
				if colon {
					return Err(loc.error(ParseError::ExpectedEndOfLine));
				}
				Statement::Rule { targets, deps }
			}
			"pattern" => {
				let (mut targets, colon) = eat_paths(&mut line);
				if !colon {
					return Err(loc.error(ParseError::ExpectedColon));
				}
				if targets.len() != 1 {
					return Err(loc.error(ParseError::ExpectedSinglePattern));
				}
				let (deps, colon) = eat_paths(&mut line);
				if colon {
					return Err(loc.error(ParseError::ExpectedEndOfLine));
				}
				if deps.is_empty() {
					return Err(loc.error(ParseError::ExpectedPath));
				}
				Statement::Pattern {
					target: targets.remove(0),
					deps,
				}
			}
			"target" => {
				let (paths, colon) = eat_paths(&mut line);
				if colon {
					return Err(loc.error(ParseError::ExpectedEndOfLine));
				}
				if paths.is_empty() {
					return Err(loc.error(ParseError::ExpectedPath));
				}
				Statement::Target { paths }
			}
			"virtual" => {
				let name = eat_identifier(&mut line)
					.ok_or_else(|| loc.error(ParseError::ExpectedName))?;
				Statement::Virtual { name }
			}
			"subdir" => {
				let path =
					eat_path(&mut line).ok_or_else(|| loc.error(ParseError::ExpectedPath))?;
				Statement::SubDir { path }
			}
			_ => return Err(loc.error(ParseError::ExpectedStatement)),
		};

		eat_whitespace(&mut line);
		if !line.is_empty() {
			return Err(loc.error(ParseError::ExpectedEndOfLine));
		}

		Ok(Some(statement))
	}
}
