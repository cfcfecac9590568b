//! Helpers for driving the `pathwatch` binary
//!
//! `WatchCommand` runs the binary to completion for cases that exit on their
//! own; `RunningWatch` keeps a live watcher around so a test can touch files
//! and then stop it with a signal.

use anyhow::{Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

/// Command builder for the `pathwatch` binary
pub struct WatchCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
}

impl WatchCommand {
    /// Create a new command in the given working directory
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_pathwatch")),
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Add a path argument
    pub fn arg_path(&mut self, path: &Path) -> &mut Self {
        self.args.push(path.display().to_string());
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary_path);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .env_remove("RUST_LOG");
        command
    }

    /// Run to completion and capture output
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();
        let output = self.command().output().context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Start a long-running watch and wait for its banner line
    pub fn spawn(&self) -> Result<RunningWatch> {
        let start = Instant::now();
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn command")?;

        let stdout = child.stdout.take().context("stdout not captured")?;
        let mut reader = BufReader::new(stdout);
        let mut banner = String::new();
        reader.read_line(&mut banner).context("Failed to read banner")?;

        if !banner.starts_with("PID ") {
            let _ = child.kill();
            anyhow::bail!("Unexpected first line: {:?}", banner);
        }

        Ok(RunningWatch {
            child,
            reader,
            banner,
            start,
        })
    }
}

/// A watcher process that has printed its banner and is blocked in read
pub struct RunningWatch {
    child: Child,
    reader: BufReader<ChildStdout>,
    pub banner: String,
    start: Instant,
}

impl RunningWatch {
    pub fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    /// Deliver `signal` and collect everything the process prints until exit
    pub fn stop_with(mut self, signal: Signal) -> Result<CommandResult> {
        // Let the kernel queue events for anything the test just did
        std::thread::sleep(Duration::from_millis(300));
        kill(self.pid(), signal).context("Failed to signal watcher")?;

        let mut stdout = self.banner.clone();
        self.reader.read_to_string(&mut stdout)?;

        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            pipe.read_to_string(&mut stderr)?;
        }

        let status = self.child.wait().context("Failed to wait for watcher")?;

        Ok(CommandResult {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
            duration: self.start.elapsed(),
        })
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Event lines, excluding the banner, read and closing notices
    pub fn event_lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .filter(|line| line.starts_with("Inotify event:") || line.starts_with('{'))
            .collect()
    }
}
