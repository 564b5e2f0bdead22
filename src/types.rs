use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
	Command,
	Argument,
	Option,
	Target,
	Pipe,
	RedirectIn,
	RedirectOut,
	RedirectAppend,
	Separator,
}

impl TokenKind {
	pub fn is_word(self) -> bool {
		match self {
			TokenKind::Command | TokenKind::Argument | TokenKind::Option => true,
			_ => false,
		}
	}

	pub fn redirect_type(self) -> Option<RedirectType> {
		match self {
			TokenKind::RedirectIn => Some(RedirectType::Input),
			TokenKind::RedirectOut => Some(RedirectType::Output),
			TokenKind::RedirectAppend => Some(RedirectType::Append),
			_ => None,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Token<'a> {
	pub kind: TokenKind,
	pub text: &'a str,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect {
	pub target: PathBuf,
	pub typ: RedirectType,
}

/// Descriptors opened for a stage's redirections.
#[derive(Debug, Default)]
pub struct Bindings {
	pub input: Option<OwnedFd>,
	pub output: Option<OwnedFd>,
}

#[derive(Debug)]
pub struct CommandSpec {
	pub arguments: Vec<String>,
	/// Redirections in source order; for each direction the last one wins.
	pub redirects: Vec<Redirect>,
	pub bindings: Bindings,
}

impl CommandSpec {
	pub fn new(arguments: Vec<String>, redirects: Vec<Redirect>) -> CommandSpec {
		CommandSpec { arguments: arguments, redirects: redirects, bindings: Bindings::default() }
	}

	pub fn program(&self) -> &str {
		self.arguments.first().map_or("", |s| s.as_str())
	}

	pub fn input_path(&self) -> Option<&Path> {
		self.redirects.iter().rev()
			.find(|r| r.typ == RedirectType::Input)
			.map(|r| r.target.as_path())
	}

	/// The effective output target and whether it appends.
	pub fn output_path(&self) -> Option<(&Path, bool)> {
		self.redirects.iter().rev()
			.find(|r| r.typ != RedirectType::Input)
			.map(|r| (r.target.as_path(), r.typ == RedirectType::Append))
	}
}

#[derive(Debug)]
pub struct PipelineSpec {
	pub commands: Vec<CommandSpec>,
}

impl PipelineSpec {
	pub fn len(&self) -> usize {
		self.commands.len()
	}
}
