//! External process execution with a hard timeout.
//!
//! A non-zero exit status is data, not an error: it comes back in
//! [`ExecutionResult`] for the caller to judge. Only transport failures
//! (the binary could not be started, or the deadline passed) are `Err`.

use serde::Serialize;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, ProcessFailureDetails, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of one finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Error text for reporting. Prefers stderr, falls back to stdout.
    pub fn error_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim().to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }
}

/// Runs an argument vector to completion.
pub trait ProcessRunner {
    fn run(&self, argv: &[String], timeout: Duration) -> Result<ExecutionResult>;
}

/// Runs processes on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, argv: &[String], timeout: Duration) -> Result<ExecutionResult> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            Error::validation_invalid_argument("argv", "Empty argument vector", None)
        })?;

        tracing::trace!("exec: {}", crate::utils::shell::quote_args(argv));

        // Own process group, so a timeout also reaches anything the child spawned.
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|e| {
                Error::process_launch_failed(ProcessFailureDetails {
                    program: program.clone(),
                    args: args.to_vec(),
                    timeout_secs: None,
                    error: Some(e.to_string()),
                })
            })?;

        let deadline = Instant::now() + timeout;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // A backgrounded grandchild can hold the pipes open after the child
        // exits, so reading the streams is bound by the same deadline.
        let finished = wait_with_deadline(&mut child, deadline)?.and_then(|status| {
            let stdout = collect(&stdout, deadline)?;
            let stderr = collect(&stderr, deadline)?;
            Some(ExecutionResult {
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
            })
        });

        finished.ok_or_else(|| {
            kill_group(&mut child);
            Error::process_timeout(ProcessFailureDetails {
                program: program.clone(),
                args: args.to_vec(),
                timeout_secs: Some(timeout.as_secs()),
                error: None,
            })
        })
    }
}

fn wait_with_deadline(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(Error::internal_io(
                    e.to_string(),
                    Some("wait for child process".to_string()),
                ))
            }
        }
    }
}

fn kill_group(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; the group id is our child's pid.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut reader) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

/// `None` when the stream is still open at `deadline`.
fn collect(stream: &Receiver<Vec<u8>>, deadline: Instant) -> Option<String> {
    match stream.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).to_string()),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}
