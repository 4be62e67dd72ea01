//! Trace session orchestration
//!
//! Owns the lifecycle of one traced run: scratch log, tracer invocation,
//! fallback to plain execution when no tracer exists, and driving the
//! parsed log through the classifier into the sink on success. Everything
//! here is best-effort by design: uncertainty resolves toward reporting no
//! dependency, never toward failing the build step.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::classifier::{Classifier, DEFAULT_IGNORED_PREFIXES};
use crate::parser;
use crate::sink::DepSink;

/// Syscalls the tracer is asked to record; everything else is noise here.
const TRACE_EXPR: &str = "trace=open,creat,rename,mkdir,chdir";

/// Result of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    /// Exit code to propagate as the build step's own.
    pub code: i32,
    /// Whether the command actually ran under the tracer. False means the
    /// fallback path executed and the sink was never consulted.
    pub traced: bool,
}

/// Run `command` under `tracer`, interpret the trace log, and report the
/// discovered dependency sets to `sink`.
///
/// Three outcomes:
/// - tracer present, command fails: no parsing, the command's exit code is
///   propagated (a failed step's partial filesystem effects are
///   build-irrelevant);
/// - tracer present, command succeeds: the log is interpreted, the sink
///   receives both sets, code 0 is returned;
/// - tracer binary missing: the command runs directly with no detection.
///
/// Blocks until the traced process tree exits; the tracer follows forks and
/// interleaves all children into one ordered log.
pub fn run(tracer: &str, command: &[String], sink: &mut dyn DepSink) -> Result<Outcome> {
    if command.is_empty() {
        anyhow::bail!("Command array is empty");
    }

    // The scratch log lives exactly as long as this scope; dropping the
    // handle removes it on every exit path, best-effort.
    let log = tempfile::Builder::new()
        .prefix("rastro-")
        .suffix(".trace")
        .tempfile()
        .context("Failed to create scratch trace log")?;

    let spawned = Command::new(tracer)
        .arg("-f")
        .arg("-q")
        .arg("-e")
        .arg(TRACE_EXPR)
        .arg("-o")
        .arg(log.path())
        .arg("--")
        .args(command)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(tracer, "tracer not found, running without dependency detection");
            let code = run_untraced(command)?;
            return Ok(Outcome {
                code,
                traced: false,
            });
        }
        Err(err) => {
            return Err(err).context(format!("Failed to spawn tracer {tracer}"));
        }
    };

    let status = child.wait().context("Failed to wait for traced command")?;
    let code = exit_code(status);
    if code != 0 {
        debug!(code, "traced command failed, skipping dependency detection");
        return Ok(Outcome { code, traced: true });
    }

    let reader = BufReader::new(File::open(log.path()).context("Failed to open trace log")?);
    let mut classifier = Classifier::new(DEFAULT_IGNORED_PREFIXES);
    let mut total = 0usize;
    let mut decoded = 0usize;
    for line in reader.lines() {
        let line = line.context("Failed to read trace log")?;
        total += 1;
        if let Some(event) = parser::parse_line(&line) {
            decoded += 1;
            classifier.apply(event);
        }
    }
    debug!(total, decoded, "trace log interpreted");
    classifier.report_to(sink);

    Ok(Outcome {
        code: 0,
        traced: true,
    })
}

/// Plain passthrough execution for the tracer-missing fallback.
fn run_untraced(command: &[String]) -> Result<i32> {
    let status = Command::new(&command[0])
        .args(&command[1..])
        .status()
        .with_context(|| format!("Failed to run {}", command[0]))?;
    Ok(exit_code(status))
}

/// Map a wait status to a shell-style exit code (128 + N for signal deaths).
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectedDeps;

    #[test]
    fn test_run_requires_nonempty_command() {
        let mut deps = CollectedDeps::new();
        let result = run("strace", &[], &mut deps);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_missing_tracer_falls_back_to_plain_run() {
        let mut deps = CollectedDeps::new();
        let command = vec!["true".to_string()];
        let outcome = run("/nonexistent/rastro-test-tracer", &command, &mut deps).unwrap();
        assert_eq!(outcome.code, 0);
        assert!(!outcome.traced);
        assert!(deps.is_empty());
    }

    #[test]
    fn test_fallback_propagates_exit_code() {
        let mut deps = CollectedDeps::new();
        let command = vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()];
        let outcome = run("/nonexistent/rastro-test-tracer", &command, &mut deps).unwrap();
        assert_eq!(outcome.code, 7);
        assert!(!outcome.traced);
    }

    #[test]
    fn test_exit_code_from_normal_exit() {
        // Raw wait status encodes the exit code in the high byte.
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(2 << 8)), 2);
    }

    #[test]
    fn test_exit_code_from_signal_death() {
        // Low byte is the terminating signal.
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }
}
