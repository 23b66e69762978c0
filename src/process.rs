//! Child processes with a deadline.
//!
//! Both the scoring script and command-line pipelines are run through
//! [`run_bounded`]: stdout is drained line by line on a reader thread while the
//! caller polls for exit, so a chatty child never stalls on a full pipe and a
//! hung one is killed once the timeout elapses. On unix the child leads its
//! own process group, and the whole group is killed, so helpers it started in
//! the background go down with it.

use std::{
    io::{self, BufRead, BufReader, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Kills and reaps the child unless it has already been waited for.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn spawn(cmd: &mut Command) -> io::Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        Ok(Self { child: cmd.spawn()?, reaped: false })
    }

    fn wait_until(&mut self, deadline: Instant) -> io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.reaped = true;
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Kill every process in the child's group.
    #[cfg(unix)]
    fn kill_group(&mut self) {
        // a negative pid addresses the process group
        let group = format!("-{}", self.child.id());
        let status = Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = status {
            log::warn!("failed to kill process group {group}: {e}");
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&mut self) {}
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill_group();
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn timed_out(timeout: Duration) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("process did not finish within {:?}", timeout))
}

/// Run `f` on its own thread, handing the result back over a channel.
fn background<T, F>(f: F) -> Receiver<io::Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx
}

/// Wait for a background result, but no later than `deadline`.
fn collect<T>(rx: Receiver<io::Result<T>>, deadline: Instant, timeout: Duration) -> io::Result<T> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(timed_out(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(io::ErrorKind::Other, "pipe thread panicked")),
    }
}

/// Run `cmd` to completion, feeding `input` on stdin if given.
///
/// Returns `ErrorKind::TimedOut` when the child outlives `timeout`, or when
/// something it left behind still holds its output pipes at the deadline. The
/// exit status is not inspected here.
pub fn run_bounded(cmd: &mut Command, input: Option<Vec<u8>>, timeout: Duration) -> io::Result<Captured> {
    let deadline = Instant::now() + timeout;
    cmd.stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut guard = ChildGuard::spawn(cmd)?;

    let writer = match (guard.child.stdin.take(), input) {
        (Some(mut stdin), Some(bytes)) => Some(background(move || {
            // the child may exit without reading everything
            match stdin.write_all(&bytes) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        })),
        _ => None,
    };
    let stdout = guard.child.stdout.take().map(|out| {
        background(move || {
            let mut text = String::new();
            for line in BufReader::new(out).lines() {
                let line = line?;
                log::debug!("{line}");
                text.push_str(&line);
                text.push('\n');
            }
            Ok(text)
        })
    });
    let stderr = guard.child.stderr.take().map(|mut err| {
        background(move || {
            let mut buf = Vec::new();
            err.read_to_end(&mut buf)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    });

    let status = match guard.wait_until(deadline)? {
        Some(status) => status,
        // dropping the guard kills the group; pipe threads end with the pipes
        None => return Err(timed_out(timeout)),
    };

    let drained = (|| -> io::Result<(String, String)> {
        if let Some(w) = writer {
            collect(w, deadline, timeout)?;
        }
        let stdout = stdout.map(|rx| collect(rx, deadline, timeout)).transpose()?;
        let stderr = stderr.map(|rx| collect(rx, deadline, timeout)).transpose()?;
        Ok((stdout.unwrap_or_default(), stderr.unwrap_or_default()))
    })();
    match drained {
        Ok((stdout, stderr)) => Ok(Captured { status, stdout, stderr }),
        Err(e) => {
            // the child is gone but a descendant still holds a pipe
            if e.kind() == io::ErrorKind::TimedOut {
                guard.kill_group();
            }
            Err(e)
        }
    }
}

/// Short human-readable description of a non-zero exit.
pub fn describe_failure(captured: &Captured) -> String {
    let code = captured
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |code| code.to_string());
    let stderr = captured.stderr.trim();
    if stderr.is_empty() {
        format!("exited with status {code}")
    } else {
        format!("exited with status {code}; stderr={stderr}")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let out = run_bounded(Command::new("sh").args(["-c", "echo one; echo two"]), None, Duration::from_secs(10)).unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout, "one\ntwo\n");
    }

    #[test]
    fn feeds_stdin() {
        let out = run_bounded(&mut Command::new("cat"), Some(b"a b c".to_vec()), Duration::from_secs(10)).unwrap();
        assert_eq!(out.stdout, "a b c\n");
    }

    #[test]
    fn kills_on_timeout() {
        let begin = Instant::now();
        let err = run_bounded(&mut Command::new("sleep").arg("30"), None, Duration::from_millis(200)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(begin.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn background_child_does_not_outlive_deadline() {
        let begin = Instant::now();
        let err = run_bounded(
            Command::new("sh").args(["-c", "sleep 30 & echo 'FB1:  99.00'"]),
            None,
            Duration::from_millis(300),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(begin.elapsed() < Duration::from_secs(10), "{:?}", begin.elapsed());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_the_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleeper.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let err = run_bounded(Command::new("sh").args(["-c", &script]), None, Duration::from_millis(300)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
        let stat = format!("/proc/{pid}/stat");
        let dead = || match std::fs::read_to_string(&stat) {
            // a zombie waiting for its new parent counts as gone
            Ok(line) => line.rsplit(')').next().map_or(false, |rest| rest.trim_start().starts_with('Z')),
            Err(_) => true,
        };
        let begin = Instant::now();
        while !dead() && begin.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(dead(), "background sleep {pid} survived the timeout");
    }

    #[test]
    fn reports_exit_code() {
        let out = run_bounded(Command::new("sh").args(["-c", "echo oops >&2; exit 3"]), None, Duration::from_secs(10)).unwrap();
        assert_eq!(describe_failure(&out), "exited with status 3; stderr=oops");
    }

    #[test]
    fn missing_program() {
        assert!(run_bounded(&mut Command::new("/nonexistent/nerbench-test"), None, Duration::from_secs(1)).is_err());
    }
}
