//! Running rule actions under `sh`, reading their output as they run.

use nix::poll::{poll, EventFlags, PollFd};
use std::fs::File;
use std::io;
use std::io::Read;
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Run a shell action in `dir`, reporting output chunks to `on_output`
/// as they arrive.
///
/// Standard output and standard error are interleaved in the order the
/// child produces them. Waits for the command to finish and returns its
/// [`ExitStatus`].
pub fn run_action(
	action: &str,
	dir: &Path,
	on_output: &mut dyn FnMut(&[u8]),
) -> io::Result<ExitStatus> {
	let mut child = Command::new("sh")
		.arg("-c")
		.arg(action)
		.current_dir(dir)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()?;

	// The pipes we read from. An entry is dropped once the child closes
	// its side.
	let mut pipes = [
		child.stdout.take().map(|p| unsafe { into_file(p) }),
		child.stderr.take().map(|p| unsafe { into_file(p) }),
	];

	let mut buffer = [0u8; 4096];
	while pipes.iter().any(|pipe| pipe.is_some()) {
		let mut poll_fds = Vec::with_capacity(2);
		let mut sources = Vec::with_capacity(2);
		for (i, pipe) in pipes.iter().enumerate() {
			if let Some(pipe) = pipe {
				poll_fds.push(PollFd::new(pipe.as_raw_fd(), EventFlags::POLLIN));
				sources.push(i);
			}
		}

		// Wait until one of the pipes has data, or was closed.
		poll(&mut poll_fds, -1).map_err(io_error)?;

		for (poll_fd, &i) in poll_fds.iter().zip(&sources) {
			let revents = match poll_fd.revents() {
				Some(revents) => revents,
				None => continue,
			};
			if revents.contains(EventFlags::POLLIN) {
				let n = pipes[i].as_mut().unwrap().read(&mut buffer)?;
				if n > 0 {
					on_output(&buffer[..n]);
					continue;
				}
				// Read of 0 bytes: end of stream.
			}
			if revents.intersects(EventFlags::POLLIN | EventFlags::POLLERR | EventFlags::POLLHUP) {
				// Our side of a closed pipe.
				pipes[i] = None;
			}
		}
	}

	// Both pipes have been closed. Now we just wait for the process to
	// exit.
	child.wait()
}

fn io_error(e: nix::Error) -> io::Error {
	match e.as_errno() {
		Some(errno) => io::Error::from_raw_os_error(errno as i32),
		None => io::Error::new(io::ErrorKind::Other, e),
	}
}

unsafe fn into_file(stream: impl IntoRawFd) -> File {
	File::from_raw_fd(stream.into_raw_fd())
}
