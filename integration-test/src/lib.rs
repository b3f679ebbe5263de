//! Test driver for ldapsyntax integration tests.
//!
//! Spawns the `ldapsyntax` binary with:
//! - stdin: a pipe, written with `feed` and closed with `close_stdin`
//! - stdout, stderr: pipes, drained by background threads for assertions

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

/// Path of the `ldapsyntax` binary under test.
///
/// `LDAPSYNTAX_BIN` wins; otherwise the debug build in `CARGO_TARGET_DIR`
/// or the workspace `target/` directory.
pub fn binary() -> PathBuf {
    if let Some(bin) = std::env::var_os("LDAPSYNTAX_BIN") {
        return PathBuf::from(bin);
    }
    let target = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../target"));
    target.join("debug").join("ldapsyntax")
}

/// A running ldapsyntax process.
pub struct TestSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout_capture: Arc<Mutex<Vec<u8>>>,
    stderr_capture: Arc<Mutex<Vec<u8>>>,
    stdout_thread: thread::JoinHandle<()>,
    stderr_thread: thread::JoinHandle<()>,
}

fn drain<R: Read + Send + 'static>(
    mut pipe: R,
    capture: Arc<Mutex<Vec<u8>>>,
    what: &'static str,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    capture
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .extend_from_slice(&buf[..n]);
                }
                Err(e) => {
                    eprintln!("{what} drain error: {e}");
                    break;
                }
            }
        }
    })
}

impl TestSession {
    /// Spawn ldapsyntax with the given arguments and extra environment.
    pub fn spawn(args: &[&str], env: &[(&str, &str)]) -> std::io::Result<TestSession> {
        Self::spawn_binary(&binary(), args, env)
    }

    /// Like `spawn`, with an explicit binary path.
    pub fn spawn_binary(
        binary: &PathBuf,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> std::io::Result<TestSession> {
        let mut cmd = Command::new(binary);
        cmd.args(args);
        cmd.env_remove("RUST_LOG");
        for (k, v) in env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();
        let missing = || std::io::Error::new(std::io::ErrorKind::Other, "pipe not captured");
        let stdout_pipe = child.stdout.take().ok_or_else(missing)?;
        let stderr_pipe = child.stderr.take().ok_or_else(missing)?;

        let stdout_capture = Arc::new(Mutex::new(Vec::new()));
        let stderr_capture = Arc::new(Mutex::new(Vec::new()));
        let stdout_thread = drain(stdout_pipe, Arc::clone(&stdout_capture), "stdout");
        let stderr_thread = drain(stderr_pipe, Arc::clone(&stderr_capture), "stderr");

        Ok(TestSession {
            child,
            stdin,
            stdout_capture,
            stderr_capture,
            stdout_thread,
            stderr_thread,
        })
    }

    /// Write `input` to the child's stdin.
    pub fn feed(&mut self, input: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
        stdin.flush().expect("failed to flush stdin");
    }

    /// Close stdin so the child sees end of file.
    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }

    /// Close stdin, wait for the child to exit and assert the exit code.
    pub fn wait_exit(mut self, expected_code: i32) -> SessionOutput {
        self.close_stdin();
        let status = self.child.wait().expect("failed to wait for child");
        let code = status.code().unwrap_or(-1);

        let _ = self.stdout_thread.join();
        let _ = self.stderr_thread.join();

        let stdout = String::from_utf8_lossy(&self.stdout_capture.lock().unwrap()).to_string();
        let stderr = String::from_utf8_lossy(&self.stderr_capture.lock().unwrap()).to_string();

        assert_eq!(
            code, expected_code,
            "expected exit code {expected_code}, got {code}\nstdout:\n{stdout}\nstderr:\n{stderr}"
        );

        SessionOutput { stdout, stderr }
    }
}

/// Output captured from a completed session.
pub struct SessionOutput {
    pub stdout: String,
    pub stderr: String,
}
