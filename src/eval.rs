use std::convert::Infallible;
use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::ptr;

use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, ForkResult};

use crate::error::{Error, Result};
use crate::job::{self, ExitStatus, Job, JobBuilder};
use crate::parser;
use crate::redirect;
use crate::types::{CommandSpec, PipelineSpec};

/// Everything a child needs, built before forking so the child only has to
/// shuffle descriptors and exec.
struct Image {
	argv: Vec<CString>,
	/// Null-terminated pointers into `argv` for execvp.
	argv_ptrs: Vec<*const libc::c_char>,
	failure_prefix: Vec<u8>,
}

impl Image {
	fn new(command: &CommandSpec) -> Result<Image> {
		let argv = command.arguments.iter()
			.map(|s| CString::new(s.as_str()))
			.collect::<std::result::Result<Vec<CString>, _>>()?;
		if argv.is_empty() {
			return Err(Error::EmptyPipelineStage);
		}
		let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
		argv_ptrs.push(ptr::null());
		let failure_prefix = format!("pipesh: {}: ", command.program()).into_bytes();
		Ok(Image { argv: argv, argv_ptrs: argv_ptrs, failure_prefix: failure_prefix })
	}
}

/// Moves `fd` above the standard descriptors, so that pointing stdin or
/// stdout somewhere else cannot clobber it.
fn lift_fd(fd: RawFd) -> nix::Result<RawFd> {
	if fd > libc::STDERR_FILENO {
		return Ok(fd);
	}
	fcntl::fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(libc::STDERR_FILENO + 1))
}

fn write_stderr(msg: &[u8]) {
	unsafe {
		libc::write(libc::STDERR_FILENO, msg.as_ptr() as *const libc::c_void, msg.len());
	}
}

fn do_exec_image(image: &Image, stdin: Option<RawFd>, stdout: Option<RawFd>, unused: Option<RawFd>)
                 -> nix::Result<Infallible> {
	if let Some(fd) = unused {
		unistd::close(fd)?;
	}
	// a source may sit on 0 or 1 when the caller runs with those closed
	let stdin = stdin.map(lift_fd).transpose()?;
	let stdout = stdout.map(lift_fd).transpose()?;
	if let Some(fd) = stdin {
		unistd::dup2(fd, libc::STDIN_FILENO)?;
	}
	if let Some(fd) = stdout {
		unistd::dup2(fd, libc::STDOUT_FILENO)?;
	}
	unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }?;
	unsafe { libc::execvp(image.argv[0].as_ptr(), image.argv_ptrs.as_ptr()) };
	Err(Errno::last())
}

/// Runs in the forked child; never returns into the caller's code.
fn exec_image(image: &Image, stdin: Option<RawFd>, stdout: Option<RawFd>, unused: Option<RawFd>) -> ! {
	let e = match do_exec_image(image, stdin, stdout, unused) {
		Ok(never) => match never {},
		Err(e) => e,
	};
	let status = if e == Errno::ENOENT { job::EXIT_NOT_FOUND } else { job::EXIT_CANNOT_EXEC };
	write_stderr(&image.failure_prefix);
	write_stderr(e.desc().as_bytes());
	write_stderr(b"\n");
	unsafe { libc::_exit(status) }
}

/// Starts every stage of `pipeline`, connecting neighbours with pipes.
///
/// Stage `i` reads from its input binding if it has one, otherwise from the
/// pipe left by stage `i - 1` (the first stage inherits our stdin). Interior
/// stages always write into the next pipe; only the last stage honours an
/// output binding and otherwise inherits our stdout. The parent drops each
/// write end and the previous read end as soon as the child holding them is
/// forked, so every reader sees EOF once its writer exits.
pub fn spawn(pipeline: PipelineSpec) -> Result<Job> {
	let images = pipeline.commands.iter().map(Image::new).collect::<Result<Vec<Image>>>()?;
	if images.is_empty() {
		return Err(Error::EmptyPipelineStage);
	}
	let last = images.len() - 1;

	let mut job_builder = JobBuilder::new(images.len());
	let mut in_fd: Option<OwnedFd> = None;
	for (i, (command, image)) in pipeline.commands.into_iter().zip(&images).enumerate() {
		let pipe = if i == last {
			None
		} else {
			match unistd::pipe2(OFlag::O_CLOEXEC) {
				Ok(p) => {
					job_builder.push_pipe();
					Some(p)
				},
				Err(e) => {
					drop(in_fd);
					job_builder.abort();
					return Err(Error::ProcessCreationFailed(e));
				},
			}
		};

		let stdin = command.bindings.input.as_ref().or(in_fd.as_ref()).map(AsRawFd::as_raw_fd);
		let (stdout, unused) = match pipe {
			Some((ref read_end, ref write_end)) => (Some(write_end.as_raw_fd()), Some(read_end.as_raw_fd())),
			None => (command.bindings.output.as_ref().map(AsRawFd::as_raw_fd), None),
		};

		match job_builder.push_fork(i, command.program()) {
			Ok(ForkResult::Child) => exec_image(image, stdin, stdout, unused),
			Ok(ForkResult::Parent { .. }) => {},
			Err(e) => {
				drop(pipe);
				drop(in_fd);
				drop(command);
				job_builder.abort();
				return Err(Error::ProcessCreationFailed(e));
			},
		}

		// the child owns copies now; keep only the read end for the next stage
		in_fd = pipe.map(|(read_end, _write_end)| read_end);
	}
	Ok(job_builder.build())
}

/// Parses, resolves, spawns and waits for `line`, returning the finished job.
pub fn run(line: &str) -> Result<Job> {
	let mut pipeline = parser::parse(line)?;
	redirect::resolve(&mut pipeline)?;
	let mut job = spawn(pipeline)?;
	let status = job.wait()?;
	debug!("pipeline {:?} finished with {:?}", line, status);
	Ok(job)
}

/// Runs one pipeline and returns the exit status of its last stage.
pub fn execute(line: &str) -> Result<ExitStatus> {
	let job = run(line)?;
	for e in job.exec_failures() {
		warn!("{}", e);
	}
	job.last_status().ok_or(Error::WaitFailed(Errno::ECHILD))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn one_process_per_stage() {
		let job = run("true").unwrap();
		assert_eq!(job.processes.len(), 1);
		assert_eq!(job.pipes, 0);

		let job = run("true | true | true").unwrap();
		assert_eq!(job.processes.len(), 3);
		assert_eq!(job.pipes, 2);
		let indices: Vec<usize> = job.processes.iter().map(|pr| pr.index).collect();
		assert_eq!(indices, vec![0, 1, 2]);
	}

	#[test]
	fn status_of_single_stage() {
		assert_eq!(execute("true").unwrap(), ExitStatus::Exited(0));
		assert_eq!(execute("false").unwrap(), ExitStatus::Exited(1));
	}

	#[test]
	fn last_stage_status_wins() {
		assert_eq!(execute("false | true").unwrap(), ExitStatus::Exited(0));
		let job = run("false | true").unwrap();
		assert_eq!(job.processes[0].status, Some(ExitStatus::Exited(1)));
		assert_eq!(execute("true | false").unwrap(), ExitStatus::Exited(1));
	}

	#[test]
	fn missing_program_reported_through_status() {
		let job = run("pipesh-no-such-program-here").unwrap();
		assert_eq!(job.last_status(), Some(ExitStatus::Exited(job::EXIT_NOT_FOUND)));
		match job.exec_failures().as_slice() {
			[Error::ExecFailed { program }] => assert_eq!(program, "pipesh-no-such-program-here"),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn parse_errors_spawn_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("out");
		assert!(matches!(execute(&format!("echo x > {} |", out.display())), Err(Error::EmptyPipelineStage)));
		assert!(!out.exists());
		assert!(matches!(execute("cat <"), Err(Error::MalformedRedirection { .. })));
	}

	#[test]
	fn pipe_carries_data() {
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("out");
		let status = execute(&format!("printf hello | cat > {}", out.display())).unwrap();
		assert!(status.success());
		assert_eq!(fs::read_to_string(&out).unwrap(), "hello");
	}
}
