use std::fs;

use nix::errno::Errno;
use nix::sys::resource::{getrlimit, setrlimit, Resource};
use nix::sys::wait::{waitpid, WaitPidFlag};
use nix::unistd::Pid;

use pipesh::Error;

fn open_fds() -> u64 {
	// the directory handle itself is counted too, which leaves room for one pipe
	fs::read_dir("/proc/self/fd").unwrap().count() as u64
}

// Lowers the descriptor limit of the whole process, so it runs alone in this binary.
#[test]
fn pipe_failure_reaps_started_stages() {
	let (soft, hard) = getrlimit(Resource::RLIMIT_NOFILE).unwrap();
	setrlimit(Resource::RLIMIT_NOFILE, open_fds() + 1, hard).unwrap();

	let r = pipesh::execute("yes | cat | cat | cat | cat | cat | head -n 1");
	setrlimit(Resource::RLIMIT_NOFILE, soft, hard).unwrap();

	match r {
		Err(Error::ProcessCreationFailed(e)) => assert_eq!(e, Errno::EMFILE),
		r => panic!("unexpected {:?}", r),
	}
	// every child that was started has been collected
	assert_eq!(waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)), Err(Errno::ECHILD));
}
