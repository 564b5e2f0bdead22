use std::fmt;

use crate::error::{Error, Result};
use crate::types::{Token, TokenKind};

/// Splits an operator word into its kind and any target written right after it.
fn split_operator(word: &str) -> Option<(TokenKind, &str, &str)> {
	if word == "|" {
		return Some((TokenKind::Pipe, word, ""));
	}
	let (kind, len) = match word.as_bytes()[0] {
		b'<' => (TokenKind::RedirectIn, 1),
		b'>' if word.starts_with(">>") => (TokenKind::RedirectAppend, 2),
		b'>' => (TokenKind::RedirectOut, 1),
		b';' => (TokenKind::Separator, 1),
		_ => { return None; },
	};
	Some((kind, &word[.. len], &word[len ..]))
}

fn is_operator(word: &str) -> bool {
	split_operator(word).is_some()
}

struct Classifier<'a> {
	tokens: Vec<Token<'a>>,
	at_stage_start: bool,
}

impl<'a> Classifier<'a> {
	fn push(&mut self, kind: TokenKind, text: &'a str) {
		self.tokens.push(Token { kind: kind, text: text });
	}

	fn push_word(&mut self, word: &'a str) {
		let kind = if self.at_stage_start {
			self.at_stage_start = false;
			TokenKind::Command
		} else if word.starts_with('-') {
			TokenKind::Option
		} else {
			TokenKind::Argument
		};
		self.push(kind, word);
	}

	/// Pushes the words following a `;` as a fresh stage.
	fn push_rest(&mut self, rest: &'a str) {
		self.at_stage_start = true;
		if !rest.is_empty() {
			self.push_word(rest);
		}
	}
}

/// Classifies every whitespace-separated word of `line`.
///
/// A redirection operator takes its target either attached (`>out`) or from
/// the next word; the next word is only taken once it is known to exist and
/// not to be an operator itself.
pub fn classify(line: &str) -> Result<Vec<Token>> {
	let mut c = Classifier { tokens: vec![], at_stage_start: true };
	let mut words = line.split_whitespace().peekable();

	while let Some(word) = words.next() {
		let (kind, op, rest) = match split_operator(word) {
			Some(t) => t,
			None => {
				c.push_word(word);
				continue;
			},
		};
		match kind {
			TokenKind::Pipe => {
				c.push(kind, op);
				c.at_stage_start = true;
			},
			TokenKind::Separator => {
				c.push(kind, op);
				c.push_rest(rest);
			},
			_ => {
				c.push(kind, op);
				let target = if !rest.is_empty() {
					rest
				} else {
					match words.peek() {
						Some(next) if !is_operator(next) => words.next().unwrap_or_default(),
						_ => { return Err(Error::MalformedRedirection { operator: op.to_string() }); },
					}
				};
				c.push(TokenKind::Target, target);
			},
		}
	}
	Ok(c.tokens)
}

impl<'a> fmt::Display for Token<'a> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.kind {
			TokenKind::Command => write!(f, "Command: {}", self.text),
			TokenKind::Argument => write!(f, "Argument: {}", self.text),
			TokenKind::Option => write!(f, "Option: {}", self.text),
			TokenKind::Target => write!(f, "Redirection File: {}", self.text),
			TokenKind::Pipe => write!(f, "Pipe"),
			TokenKind::RedirectIn | TokenKind::RedirectOut | TokenKind::RedirectAppend =>
				write!(f, "Redirection: {}", self.text),
			TokenKind::Separator => write!(f, "Separator"),
		}
	}
}
