use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("cannot read {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("invalid config: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Settings of the interactive driver. Missing keys keep their defaults.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub prompt: String,
	pub log_level: LevelFilter,
	/// Print the classified tokens of each line before running it.
	pub summary: bool,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			prompt: "pipesh> ".to_string(),
			log_level: LevelFilter::Warn,
			summary: false,
		}
	}
}

impl Config {
	pub fn from_toml(s: &str) -> Result<Config, ConfigError> {
		Ok(toml::from_str(s)?)
	}

	pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
		let path = match path {
			Some(p) => p,
			None => { return Ok(Config::default()); },
		};
		let s = fs::read_to_string(path).map_err(|e| ConfigError::Read { path: path.to_path_buf(), source: e })?;
		Config::from_toml(&s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_when_absent() {
		assert_eq!(Config::load(None).unwrap(), Config::default());
		assert_eq!(Config::from_toml("").unwrap(), Config::default());
	}

	#[test]
	fn partial_override() {
		let c = Config::from_toml("prompt = \"$ \"\nlog_level = \"debug\"\n").unwrap();
		assert_eq!(c.prompt, "$ ");
		assert_eq!(c.log_level, LevelFilter::Debug);
		assert!(!c.summary);
	}

	#[test]
	fn rejects_unknown_keys() {
		assert!(matches!(Config::from_toml("promt = \"x\""), Err(ConfigError::Parse(_))));
	}

	#[test]
	fn missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("pipesh.toml");
		assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Read { .. })));
		fs::write(&path, "summary = true").unwrap();
		assert!(Config::load(Some(&path)).unwrap().summary);
	}
}
