//! Launching and supervising bar processes

use colored::Colorize;
use crossbeam_channel as channel;
use crossbeam_utils::thread;
use serde::{Deserialize, Serialize};
use std::{
    io::{self, BufRead, BufReader, Read, Write},
    process::{Command, ExitStatus, Stdio},
};

// ============================ BarCommand ============================
// ====================================================================

/// Structured invocation template launching one bar.
///
/// The bar name is appended as the final argument and nothing passes
/// through a shell, so names scanned out of theme files cannot smuggle
/// shell syntax into the launch.
#[derive(Debug, Clone)]
pub(crate) struct BarCommand {
    /// Program to execute
    program: String,
    /// Arguments placed before the bar name
    args:    Vec<String>,
}

impl BarCommand {
    /// Create a new [`BarCommand`]
    pub(crate) fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// The stock `polybar -r <bar>` invocation
    pub(crate) fn polybar() -> Self {
        Self::new("polybar", vec![String::from("-r")])
    }

    /// Program the template executes
    pub(crate) fn program(&self) -> &str {
        &self.program
    }

    /// Build the [`Command`] launching `bar`, with `env` layered over
    /// the inherited environment and both output streams piped
    fn command(&self, bar: &str, env: &[(String, String)]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(bar)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

// ============================ KillScope =============================
// ====================================================================

/// Which processes the pre-launch cleanup is allowed to kill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum KillScope {
    /// Kill every matching process on the system
    SystemWide,
    /// Kill only matching processes owned by the invoking user
    CurrentUser,
}

impl Default for KillScope {
    fn default() -> Self {
        Self::SystemWide
    }
}

impl KillScope {
    /// Argument vector of the `killall` invocation for this scope
    fn killall_args(self, process: &str) -> Vec<String> {
        let mut args = vec![String::from("-q")];
        if self == Self::CurrentUser {
            args.push(String::from("-u"));
            args.push(whoami::username());
        }
        args.push(process.to_owned());
        args
    }
}

// ============================= Reports ==============================
// ====================================================================

/// What happened to one launched bar
#[derive(Debug)]
pub(crate) enum BarOutcome {
    /// The subprocess ran to completion, cleanly or not
    Completed {
        /// Exit status of the subprocess
        status: ExitStatus,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },
    /// The subprocess could not be started or awaited
    Failed {
        /// Underlying I/O failure
        error: io::Error,
    },
}

/// Per-bar completion report
#[derive(Debug)]
pub(crate) struct BarReport {
    /// Name of the bar
    pub(crate) bar:     String,
    /// How its subprocess fared
    pub(crate) outcome: BarOutcome,
}

impl BarReport {
    /// Whether the bar's subprocess exited cleanly
    pub(crate) fn success(&self) -> bool {
        matches!(&self.outcome, BarOutcome::Completed { status, .. } if status.success())
    }
}

// ============================ Supervisor ============================
// ====================================================================

/// Terminates stale bar processes and fans out one task per bar
#[derive(Debug, Clone)]
pub(crate) struct Supervisor {
    /// Invocation template shared by every bar
    command: BarCommand,
    /// Cleanup policy for stale processes
    scope:   KillScope,
}

impl Supervisor {
    /// Create a new [`Supervisor`]
    pub(crate) fn new(command: BarCommand, scope: KillScope) -> Self {
        Self { command, scope }
    }

    /// Kill stale bar processes, then launch every bar and wait for
    /// the whole batch to finish
    pub(crate) fn run(&self, bars: &[String], env: &[(String, String)]) -> Vec<BarReport> {
        self.kill_stale();
        self.launch_all(bars, env)
    }

    /// Best-effort cleanup of bar processes left over from an earlier
    /// run.
    ///
    /// `killall` exiting non-zero means nothing matched, which is the
    /// normal first-run state. This runs once, before fan-out, and is
    /// never re-checked: a bar started by a concurrent invocation may
    /// be killed or survive depending on timing.
    fn kill_stale(&self) {
        let args = self.scope.killall_args(self.command.program());
        log::debug!("killall {}", args.join(" "));

        match Command::new("killall").args(&args).output() {
            Ok(output) if output.status.success() => {
                log::info!("killed running {} processes", self.command.program());
            },
            Ok(_) => {
                log::debug!("no running {} processes to kill", self.command.program());
            },
            Err(e) => log::error!("failed to invoke killall: {}", e),
        }
    }

    /// Launch one concurrent task per bar and join them all.
    ///
    /// Bars race freely; output relayed to the shared streams may
    /// interleave across bars. A bar that fails never aborts its
    /// siblings.
    fn launch_all(&self, bars: &[String], env: &[(String, String)]) -> Vec<BarReport> {
        let (tx, rx) = channel::unbounded();

        // The scope joins every task before returning, so the whole
        // batch has reported by the time the channel is drained
        let scoped = thread::scope(|s| {
            for bar in bars {
                let tx = tx.clone();
                s.spawn(move |_| {
                    if tx.send(self.launch(bar, env)).is_err() {
                        log::error!("report channel closed before bar {} finished", bar);
                    }
                });
            }
        });
        drop(tx);

        if scoped.is_err() {
            log::error!("a bar task panicked before reporting");
        }

        rx.iter().collect()
    }

    /// Launch a single bar and block until its subprocess exits,
    /// relaying both output streams while buffering copies
    fn launch(&self, bar: &str, env: &[(String, String)]) -> BarReport {
        log::info!("loading bar {}", bar.green());

        let mut child = match self.command.command(bar, env).spawn() {
            Ok(child) => child,
            Err(error) => {
                log::error!("failed to start bar {}: {}", bar.red(), error);
                return BarReport {
                    bar:     bar.to_owned(),
                    outcome: BarOutcome::Failed { error },
                };
            },
        };

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        // Drain stdout on this task while a scoped reader drains stderr
        let (stdout, stderr) = thread::scope(|s| {
            let stderr_task = s.spawn(move |_| {
                stderr_pipe.map_or_else(String::new, |pipe| tee(pipe, io::stderr()))
            });
            let stdout = stdout_pipe.map_or_else(String::new, |pipe| tee(pipe, io::stdout()));
            (stdout, stderr_task.join().unwrap_or_default())
        })
        .unwrap_or_default();

        match child.wait() {
            Ok(status) => {
                if status.success() {
                    log::info!("bar {} exited cleanly", bar.green());
                } else {
                    log::error!("bar {} exited with {}", bar.red(), status);
                }
                BarReport {
                    bar:     bar.to_owned(),
                    outcome: BarOutcome::Completed { status, stdout, stderr },
                }
            },
            Err(error) => {
                log::error!("failed to wait on bar {}: {}", bar.red(), error);
                BarReport {
                    bar:     bar.to_owned(),
                    outcome: BarOutcome::Failed { error },
                }
            },
        }
    }
}

/// Copy `reader` line-wise into `sink` while buffering a copy.
///
/// Relay failures are ignored; capture continues until the stream
/// closes with the subprocess.
fn tee<R: Read, W: Write>(reader: R, mut sink: W) -> String {
    let mut captured = String::new();

    for line in BufReader::new(reader).lines() {
        match line {
            Ok(line) => {
                writeln!(sink, "{}", line).ok();
                captured.push_str(&line);
                captured.push('\n');
            },
            Err(_) => break,
        }
    }

    captured
}

// =============================== Tests ==============================
// ====================================================================

/// Tests for the [`Supervisor`]
#[cfg(test)]
mod tests {
    use super::{BarCommand, BarOutcome, BarReport, KillScope, Supervisor};

    /// A supervisor whose "bars" are tiny shell scripts; the bar name
    /// arrives as `$0`
    fn shell_supervisor(script: &str) -> Supervisor {
        Supervisor::new(
            BarCommand::new("sh", vec![String::from("-c"), script.to_owned()]),
            KillScope::SystemWide,
        )
    }

    /// Bar names used throughout
    fn bars() -> Vec<String> {
        vec![String::from("top"), String::from("bottom")]
    }

    #[test]
    fn every_bar_reports_completion() {
        let supervisor = shell_supervisor("echo started-$0");
        let mut reports = supervisor.launch_all(&bars(), &[]);
        reports.sort_by(|a, b| a.bar.cmp(&b.bar));

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].bar, "bottom");
        assert_eq!(reports[1].bar, "top");
        assert!(reports.iter().all(BarReport::success));

        match &reports[1].outcome {
            BarOutcome::Completed { stdout, .. } => assert_eq!(stdout, "started-top\n"),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn failing_bar_does_not_abort_siblings() {
        let supervisor = shell_supervisor("test \"$0\" = top");
        let mut reports = supervisor.launch_all(&bars(), &[]);
        reports.sort_by(|a, b| a.bar.cmp(&b.bar));

        assert_eq!(reports.len(), 2);
        assert!(!reports[0].success(), "bottom should exit non-zero");
        assert!(reports[1].success(), "top should exit cleanly");
    }

    #[test]
    fn unlaunchable_bars_still_report() {
        let supervisor = Supervisor::new(
            BarCommand::new("polyctl-no-such-binary", vec![]),
            KillScope::SystemWide,
        );
        let reports = supervisor.launch_all(&bars(), &[]);

        assert_eq!(reports.len(), 2);
        assert!(reports
            .iter()
            .all(|r| matches!(r.outcome, BarOutcome::Failed { .. })));
    }

    #[test]
    fn environment_reaches_the_subprocess() {
        let supervisor = shell_supervisor("printf %s \"$MONITOR_MAIN\"");
        let env = vec![(String::from("MONITOR_MAIN"), String::from("DP-4"))];
        let reports = supervisor.launch_all(&[String::from("solo")], &env);

        match &reports[0].outcome {
            BarOutcome::Completed { stdout, .. } => assert_eq!(stdout, "DP-4\n"),
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn user_scope_narrows_killall() {
        let args = KillScope::CurrentUser.killall_args("polybar");
        assert_eq!(args.first().map(String::as_str), Some("-q"));
        assert!(args.contains(&String::from("-u")));
        assert_eq!(args.last().map(String::as_str), Some("polybar"));

        let args = KillScope::SystemWide.killall_args("polybar");
        assert_eq!(args, vec!["-q", "polybar"]);
    }
}
