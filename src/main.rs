use std::path::PathBuf;
use std::process;

use anyhow::Context;
use argh::FromArgs;
use log::LevelFilter;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use pipesh::config::Config;
use pipesh::token;

#[derive(FromArgs)]
/// Run command pipelines.
struct Args {
	#[argh(option, short = 'c')]
	/// run this pipeline and exit with its status
	command: Option<String>,
	#[argh(option)]
	/// path to a TOML config file
	config: Option<PathBuf>,
	#[argh(switch, short = 'v')]
	/// log at debug level
	verbose: bool,
}

fn run_line(config: &Config, line: &str) -> i32 {
	if config.summary {
		match token::classify(line) {
			Ok(tokens) => for t in &tokens { println!("{}", t) },
			Err(e) => { eprintln!("pipesh: {}", e); return 2; },
		}
	}
	match pipesh::execute(line) {
		Ok(status) => status.code(),
		Err(e) => {
			eprintln!("pipesh: {}", e);
			1
		},
	}
}

fn repl(config: &Config) -> anyhow::Result<i32> {
	let mut rl = DefaultEditor::new()?;
	let mut last = 0;
	loop {
		match rl.readline(&config.prompt) {
			Ok(line) => {
				if line.trim().is_empty() {
					continue;
				}
				rl.add_history_entry(line.as_str())?;
				last = run_line(config, &line);
			},
			Err(ReadlineError::Interrupted) => {},
			Err(ReadlineError::Eof) => { break; },
			Err(e) => { return Err(e.into()); },
		}
	}
	Ok(last)
}

fn init_logging(level: LevelFilter) -> anyhow::Result<()> {
	TermLogger::init(level, simplelog::Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
		.context("installing logger")
}

fn main() -> anyhow::Result<()> {
	let args: Args = argh::from_env();
	let config = Config::load(args.config.as_deref()).context("loading config")?;

	let level = if args.verbose { LevelFilter::Debug } else { config.log_level };
	init_logging(level)?;

	let code = match args.command {
		Some(ref line) => run_line(&config, line),
		None => repl(&config)?,
	};
	process::exit(code)
}
