use std::path::PathBuf;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::token;
use crate::types::*;

type ParseResult<T> = Result<T>;

struct Parser<'t, 'a> {
	tokens: &'t [Token<'a>],
	i: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
	fn peek(&self) -> Option<Token<'a>> {
		self.tokens.get(self.i).cloned()
	}

	fn parse_redirect(&mut self, typ: RedirectType) -> ParseResult<Redirect> {
		let operator = self.tokens[self.i];
		self.i += 1;
		match self.peek() {
			Some(Token { kind: TokenKind::Target, text }) => {
				self.i += 1;
				Ok(Redirect { target: PathBuf::from(text), typ: typ })
			},
			_ => Err(Error::MalformedRedirection { operator: operator.text.to_string() }),
		}
	}

	fn parse_command(&mut self) -> ParseResult<CommandSpec> {
		let mut arguments: Vec<String> = vec![];
		let mut redirects: Vec<Redirect> = vec![];

		while let Some(token) = self.peek() {
			if token.kind.is_word() {
				arguments.push(token.text.to_string());
				self.i += 1;
			} else if let Some(typ) = token.kind.redirect_type() {
				let redirect = self.parse_redirect(typ)?;
				redirects.push(redirect);
			} else {
				break;
			}
		}

		if arguments.is_empty() {
			return Err(Error::EmptyPipelineStage);
		}
		Ok(CommandSpec::new(arguments, redirects))
	}

	fn parse_pipeline(&mut self) -> ParseResult<PipelineSpec> {
		let mut commands: Vec<CommandSpec> = vec![];

		loop {
			commands.push(self.parse_command()?);
			match self.peek().map(|t| t.kind) {
				Some(TokenKind::Pipe) => { self.i += 1; },
				Some(TokenKind::Separator) => {
					warn!("ignoring everything after ';': only the first pipeline is run");
					break;
				},
				Some(_) => {
					let stray = self.tokens[self.i].text.to_string();
					return Err(Error::MalformedRedirection { operator: stray });
				},
				None => { break; },
			}
		}
		Ok(PipelineSpec { commands: commands })
	}
}

/// Groups classified tokens into pipeline stages.
pub fn build(tokens: &[Token]) -> Result<PipelineSpec> {
	let mut parser = Parser { tokens: tokens, i: 0 };
	parser.parse_pipeline()
}

/// Classifies and builds `line` without touching the file system.
pub fn parse(line: &str) -> Result<PipelineSpec> {
	let tokens = token::classify(line)?;
	let pipeline = build(&tokens)?;
	debug!("parsed {} stage(s) from {:?}", pipeline.len(), line);
	Ok(pipeline)
}
