use log::debug;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, Pid};

use crate::error::{Error, Result};

/// Status a child exits with when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Status a child exits with when the program was found but exec failed.
pub const EXIT_CANNOT_EXEC: i32 = 126;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExitStatus {
	Exited(i32),
	Signaled(Signal),
}

impl ExitStatus {
	pub fn code(self) -> i32 {
		match self {
			ExitStatus::Exited(code) => code,
			ExitStatus::Signaled(sig) => 128 + sig as i32,
		}
	}

	pub fn success(self) -> bool {
		self == ExitStatus::Exited(0)
	}
}

trait WaitStatusExt {
	fn exit_status(self) -> Option<ExitStatus>;
}

impl WaitStatusExt for WaitStatus {
	fn exit_status(self) -> Option<ExitStatus> {
		match self {
			WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
			WaitStatus::Signaled(_, sig, _) => Some(ExitStatus::Signaled(sig)),
			_ => None,
		}
	}
}

/// One spawned stage.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Process {
	pub pid: Pid,
	pub index: usize,
	pub program: String,
	pub status: Option<ExitStatus>,
}

impl Process {
	pub fn exec_failed(&self) -> bool {
		match self.status {
			Some(ExitStatus::Exited(EXIT_NOT_FOUND)) | Some(ExitStatus::Exited(EXIT_CANNOT_EXEC)) => true,
			_ => false,
		}
	}

	fn reap(&mut self) -> Result<ExitStatus> {
		if let Some(status) = self.status {
			return Ok(status);
		}
		loop {
			match waitpid(self.pid, None) {
				Ok(ws) => {
					if let Some(status) = ws.exit_status() {
						debug!("reaped {} ({}): {:?}", self.pid, self.program, status);
						self.status = Some(status);
						return Ok(status);
					}
				},
				Err(Errno::EINTR) => {},
				Err(e) => { return Err(Error::WaitFailed(e)); },
			}
		}
	}
}

/// The processes of one pipeline run, in stage order.
///
/// Every child is reaped at the latest when the job is dropped.
#[derive(Debug)]
pub struct Job {
	pub processes: Vec<Process>,
	pub pipes: usize,
}

impl Job {
	/// Waits for every stage and returns the status of the last one.
	pub fn wait(&mut self) -> Result<ExitStatus> {
		let mut first_err = None;
		for pr in self.processes.iter_mut() {
			if let Err(e) = pr.reap() {
				first_err.get_or_insert(e);
			}
		}
		if let Some(e) = first_err {
			return Err(e);
		}
		self.last_status().ok_or(Error::WaitFailed(Errno::ECHILD))
	}

	pub fn last_status(&self) -> Option<ExitStatus> {
		self.processes.last().and_then(|pr| pr.status)
	}

	/// Stages whose status says their program never started.
	pub fn exec_failures(&self) -> Vec<Error> {
		self.processes.iter()
			.filter(|pr| pr.exec_failed())
			.map(|pr| Error::ExecFailed { program: pr.program.clone() })
			.collect()
	}
}

impl Drop for Job {
	fn drop(&mut self) {
		for pr in self.processes.iter_mut() {
			let _ = pr.reap();
		}
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(size_hint: usize) -> JobBuilder {
		JobBuilder {
			imp: Job { processes: Vec::with_capacity(size_hint), pipes: 0 }
		}
	}

	pub fn push_pipe(&mut self) {
		self.imp.pipes += 1;
	}

	/// Forks; the parent records the child as stage `index`.
	pub fn push_fork(&mut self, index: usize, program: &str) -> nix::Result<unistd::ForkResult> {
		let r = unsafe { unistd::fork() }?;
		if let unistd::ForkResult::Parent { child: pid } = r {
			debug!("spawned {} ({}) as stage {}", pid, program, index);
			self.imp.processes.push(Process { pid: pid, index: index, program: program.to_string(), status: None });
		}
		Ok(r)
	}

	/// Terminates and reaps the children started so far.
	///
	/// The caller must have closed its own pipe ends first so that nothing
	/// keeps a stage blocked on I/O.
	pub fn abort(mut self) {
		for pr in &self.imp.processes {
			let _ = signal::kill(pr.pid, Signal::SIGTERM);
		}
		for pr in self.imp.processes.iter_mut() {
			let _ = pr.reap();
		}
	}

	pub fn build(self) -> Job {
		self.imp
	}
}
