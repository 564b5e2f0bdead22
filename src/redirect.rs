use std::fs;
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{PipelineSpec, Redirect, RedirectType};

const CREATE_MODE: u32 = 0o644;

fn open(redirect: &Redirect) -> Result<OwnedFd> {
	let mut oopt = fs::OpenOptions::new();
	let _ = match redirect.typ {
		RedirectType::Input => oopt.read(true),
		RedirectType::Output => oopt.write(true).create(true).truncate(true).mode(CREATE_MODE),
		RedirectType::Append => oopt.append(true).create(true).mode(CREATE_MODE),
	};
	let file = oopt.open(&redirect.target).map_err(|e| Error::FileOpenFailed {
		path: redirect.target.clone(),
		cause: e,
	})?;
	Ok(file.into())
}

/// Opens every redirection target of `pipeline`, in order, and binds the
/// resulting descriptors to their stages.
///
/// Nothing has been spawned yet, so a failure simply drops whatever was
/// opened so far. Output files of interior stages are still opened but the
/// executor will feed those stages into the next pipe instead.
pub fn resolve(pipeline: &mut PipelineSpec) -> Result<()> {
	let last = pipeline.len().saturating_sub(1);
	for (i, command) in pipeline.commands.iter_mut().enumerate() {
		for redirect in &command.redirects {
			let fd = open(redirect)?;
			debug!("stage {}: {:?} {} bound", i, redirect.typ, redirect.target.display());
			match redirect.typ {
				RedirectType::Input => command.bindings.input = Some(fd),
				RedirectType::Output | RedirectType::Append => {
					if i != last {
						warn!("{}: output redirection on a non-final stage is ignored", redirect.target.display());
					}
					command.bindings.output = Some(fd);
				},
			}
		}
	}
	Ok(())
}
