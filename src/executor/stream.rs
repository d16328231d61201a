//! Streaming build-step execution
//!
//! Each build step's stdout is echoed line by line to the console and copied
//! into `<log_dir>/<label>.log` as it arrives, so a failing step leaves the
//! same partial output in both places.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::thread;
use std::time::Duration;

use crate::error::BuildError;

use super::traits::CommandSpec;

/// Pause between exit-status polls once the output stream is exhausted
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Path of the log file for a step label
pub fn log_path(log_dir: &Path, label: &str) -> PathBuf {
    log_dir.join(format!("{}.log", label))
}

/// Run `spec`, streaming stdout to our stdout and the step log
pub fn run_streaming(label: &str, spec: &CommandSpec, log_dir: &Path) -> Result<(), BuildError> {
    let stdout = io::stdout();
    let mut console = stdout.lock();
    stream_to(label, spec, log_dir, &mut console)
}

/// Run `spec`, streaming stdout to `console` and the step log
///
/// The log file is truncated at the start of every run.
pub fn stream_to<W: Write>(
    label: &str,
    spec: &CommandSpec,
    log_dir: &Path,
    console: &mut W,
) -> Result<(), BuildError> {
    let mut log = File::create(log_path(log_dir, label))?;
    let command_str = spec.display();

    let mut cmd = spec.to_command();
    cmd.stdout(Stdio::piped());

    tracing::debug!("Executing [{}]: {}", label, command_str);

    let mut child = cmd.spawn().map_err(|e| BuildError::SpawnFailed {
        command: command_str.clone(),
        error: e.to_string(),
    })?;

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut line = Vec::with_capacity(4096);
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            console.write_all(&line)?;
            console.flush()?;
            log.write_all(&line)?;
        }
    }

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        thread::sleep(POLL_INTERVAL);
    };

    if status.success() {
        Ok(())
    } else {
        Err(BuildError::CommandFailed {
            command: command_str,
            exit_code: status.code(),
            suggestion: None,
        })
    }
}
