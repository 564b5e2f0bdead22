use std::ffi::NulError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("empty command in pipeline")]
	EmptyPipelineStage,
	#[error("missing file name after '{operator}'")]
	MalformedRedirection { operator: String },
	#[error("{}: {cause}", path.display())]
	FileOpenFailed {
		path: PathBuf,
		#[source]
		cause: io::Error,
	},
	#[error("cannot create process: {0}")]
	ProcessCreationFailed(#[source] nix::Error),
	#[error("{program}: cannot execute")]
	ExecFailed { program: String },
	#[error("argument contains a NUL byte")]
	NulByte(#[from] NulError),
	#[error("wait failed: {0}")]
	WaitFailed(#[source] nix::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
