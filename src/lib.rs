//! Runs one line of shell-like input as a pipeline of processes.
//!
//! A line goes through four steps: [`token::classify`] splits it into
//! tokens, [`parser::build`] groups them into stages, [`redirect::resolve`]
//! opens the redirection targets and [`eval::spawn`] forks one child per
//! stage with pipes in between. [`execute`] does all of it and waits.
//!
//! There is no quoting, globbing, expansion or job control. Only the first
//! of several `;`-separated pipelines is run.

pub mod config;
pub mod error;
pub mod eval;
pub mod job;
pub mod parser;
pub mod redirect;
pub mod token;
pub mod types;

pub use error::{Error, Result};
pub use eval::{execute, run, spawn};
pub use job::{ExitStatus, Job, Process};
pub use parser::parse;
pub use redirect::resolve;
pub use types::{CommandSpec, PipelineSpec, Token, TokenKind};
