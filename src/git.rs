//! Low-level invocation of the system `git` binary.
//!
//! Using the `git` command (rather than a library) means SSH keys,
//! credential helpers and anything configured in `~/.gitconfig` work the
//! same way they do in the user's shell.
//!
//! Every call has a timeout. When it expires the child is killed and
//! [`Error::Timeout`] is returned so callers can tell a hung remote apart
//! from a failing command.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run `git <args>` and return its standard output as text.
///
/// When `dir` is given the command runs with that working directory;
/// otherwise it runs unscoped (used for `ls-remote` against a URL).
/// A non-zero exit becomes [`Error::Git`] whose message holds the
/// command's stderr followed by its stdout.
pub fn run_git(dir: Option<&Path>, args: &[&str], timeout: Duration) -> Result<String> {
    let command = args.join(" ");
    debug!(
        "git {} (in {})",
        command,
        dir.map(|d| d.display().to_string())
            .unwrap_or_else(|| ".".to_string())
    );

    let mut cmd = Command::new("git");
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| Error::Git {
        command: command.clone(),
        message: format!("failed to start git: {}", e),
    })?;

    // Drain both pipes on their own threads so a chatty command can't block
    // on a full pipe while we poll for exit.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            debug!("git {} killed after {:?}", command, timeout);
            return Err(Error::Timeout {
                command,
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if !status.success() {
        let message = [stderr.trim(), stdout.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        debug!("git {} failed ({}): {}", command, status, message);
        return Err(Error::Git { command, message });
    }

    Ok(stdout)
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Extract the default branch from `git ls-remote --symref <url> HEAD`.
///
/// The relevant line looks like `ref: refs/heads/main\tHEAD`.
pub fn parse_symref_head(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.strip_prefix("ref:")?;
        let target = rest.split_whitespace().next()?;
        target.strip_prefix("refs/heads/").map(str::to_string)
    })
}

/// Parse the output of `git log -1 --format=%ct` (seconds since the epoch).
pub fn parse_commit_time(output: &str) -> Option<i64> {
    output.trim().parse().ok()
}

/// Parse `git sparse-checkout list` or the rule file into a rule list,
/// dropping blank lines and comments.
pub fn parse_rules(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
