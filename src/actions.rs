//! Composite actions built from fixed sequences of system commands.
//!
//! Each [`CommandAction`] runs its steps fail-forward: a failing or timed-out
//! command is recorded and the next one still runs. A step whose program is
//! not on `PATH` fails without being launched. The action's verdict is
//! decided afterwards by its [`Policy`].
use std::fmt;
use std::time::Duration;

use crate::exec::{CommandLine, Executor, Markers};
use crate::logging::Log;

/// How per-step results combine into the action's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Every step must succeed.
    AllRequired,
    /// One successful step is enough.
    AnySuccess,
}

/// One command inside an action.
#[derive(Debug, Clone, Copy)]
pub struct CommandStep {
    /// Short label used in logs.
    pub label: &'static str,
    /// Program to run.
    pub program: &'static str,
    /// Arguments passed verbatim.
    pub args: &'static [&'static str],
    /// Timeout in seconds; `None` uses the configured default.
    pub timeout: Option<u64>,
    /// Line written to stdin after launch.
    pub input: Option<&'static str>,
    /// Output markers; empty markers mean exit status only.
    pub markers: Markers,
}

impl CommandStep {
    const fn plain(label: &'static str, program: &'static str, args: &'static [&'static str]) -> Self {
        Self {
            label,
            program,
            args,
            timeout: None,
            input: None,
            markers: Markers {
                success: &[],
                failure: &[],
            },
        }
    }

    fn command_line(&self) -> CommandLine {
        CommandLine::new(self.program, self.args.iter().copied())
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// The step's label.
    pub label: &'static str,
    /// Whether the step counted as successful.
    pub passed: bool,
    /// Failure detail, if any.
    pub detail: Option<String>,
}

/// Result of a whole action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Per-step outcomes in execution order.
    pub steps: Vec<StepOutcome>,
    /// Verdict under the action's policy.
    pub passed: bool,
}

impl ActionResult {
    /// Number of steps that passed.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.passed).count()
    }

    /// `"N of M commands succeeded"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} of {} commands succeeded", self.succeeded(), self.steps.len())
    }
}

/// A named, fixed sequence of commands.
#[derive(Debug, Clone, Copy)]
pub struct CommandAction {
    /// Identifier used by `--skip`/`--only`.
    pub name: &'static str,
    /// Human-readable title.
    pub title: &'static str,
    /// Commands in execution order.
    pub steps: &'static [CommandStep],
    /// Verdict policy.
    pub policy: Policy,
}

impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title)
    }
}

impl CommandAction {
    /// Run every step in order and judge the result.
    pub fn run(&self, executor: &dyn Executor, log: &dyn Log, default_timeout: Duration) -> ActionResult {
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in self.steps {
            if !executor.which(step.program) {
                let detail = format!("{} not found on PATH", step.program);
                log.warn(&format!("{}: {detail}", step.label));
                steps.push(StepOutcome {
                    label: step.label,
                    passed: false,
                    detail: Some(detail),
                });
                continue;
            }
            let timeout = step.timeout.map_or(default_timeout, Duration::from_secs);
            let cmd = step.command_line();
            log.debug(&format!("running: {cmd} (timeout {}s)", timeout.as_secs()));

            let outcome = match executor.execute(&cmd, timeout, step.input) {
                Ok(result) if step.markers.judge(&result) => {
                    log.info(&format!("{}: done", step.label));
                    StepOutcome {
                        label: step.label,
                        passed: true,
                        detail: None,
                    }
                }
                Ok(result) => {
                    let detail = match result.code {
                        Some(code) => format!("exit code {code}"),
                        None => "terminated".to_string(),
                    };
                    let first_line = result.combined();
                    let first_line = first_line.lines().find(|l| !l.trim().is_empty());
                    log.warn(&format!(
                        "{}: failed ({detail}){}",
                        step.label,
                        first_line.map(|l| format!(": {}", l.trim())).unwrap_or_default()
                    ));
                    StepOutcome {
                        label: step.label,
                        passed: false,
                        detail: Some(detail),
                    }
                }
                Err(e) => {
                    log.warn(&format!("{}: {e}", step.label));
                    StepOutcome {
                        label: step.label,
                        passed: false,
                        detail: Some(e.to_string()),
                    }
                }
            };
            steps.push(outcome);
        }

        let passed = match self.policy {
            Policy::AllRequired => !steps.is_empty() && steps.iter().all(|s| s.passed),
            Policy::AnySuccess => steps.iter().any(|s| s.passed),
        };
        ActionResult { steps, passed }
    }
}

/// Release, reset and renew the TCP/IP stack.
pub const NETWORK_RESET: CommandAction = CommandAction {
    name: "network-reset",
    title: "Network reset",
    steps: &[
        CommandStep::plain("release IP address", "ipconfig", &["/release"]),
        CommandStep::plain("reset Winsock catalog", "netsh", &["winsock", "reset"]),
        CommandStep::plain("reset TCP/IP stack", "netsh", &["int", "ip", "reset"]),
        CommandStep::plain("renew IP address", "ipconfig", &["/renew"]),
        CommandStep::plain("flush DNS cache", "ipconfig", &["/flushdns"]),
    ],
    policy: Policy::AllRequired,
};

/// Clear user certificate stores and the URL cache.
pub const SSL_CLEANUP: CommandAction = CommandAction {
    name: "ssl",
    title: "SSL certificate cleanup",
    steps: &[
        CommandStep::plain(
            "clear personal certificates",
            "certutil",
            &["-delstore", "-user", "MY", "*"],
        ),
        CommandStep::plain(
            "clear intermediate certificates",
            "certutil",
            &["-delstore", "-user", "CA", "*"],
        ),
        CommandStep::plain("clear URL cache", "certutil", &["-URLCache", "*", "delete"]),
    ],
    policy: Policy::AllRequired,
};

/// Stop background update services, then flush DNS.
///
/// Service start types are owned by the `services` domain so that they can
/// be restored; this action only stops what is running now.
pub const SYSTEM_OPTIMIZATION: CommandAction = CommandAction {
    name: "system-optimization",
    title: "System optimization",
    steps: &[
        CommandStep::plain("stop Windows Update", "net", &["stop", "wuauserv"]),
        CommandStep::plain("stop Update Orchestrator", "net", &["stop", "UsoSvc"]),
        CommandStep::plain("stop Delivery Optimization", "net", &["stop", "dosvc"]),
        CommandStep::plain("stop BITS", "net", &["stop", "BITS"]),
        CommandStep::plain("flush DNS cache", "ipconfig", &["/flushdns"]),
    ],
    policy: Policy::AnySuccess,
};

const CHKDSK_MARKERS: Markers = Markers {
    success: &[
        "will be checked the next time",
        "found no problems",
        "no further action is required",
        "será verificado na próxima vez",
        "nenhum problema",
    ],
    failure: &["cannot open volume", "access denied", "acesso negado"],
};

const SFC_MARKERS: Markers = Markers {
    success: &[
        "did not find any integrity violations",
        "successfully repaired",
        "verification 100% complete",
        "não encontrou nenhuma violação",
        "reparou com êxito",
    ],
    failure: &[
        "could not perform the requested operation",
        "found corrupt files but was unable to fix",
        "must be an administrator",
        "não pôde executar",
    ],
};

const DISM_MARKERS: Markers = Markers {
    success: &[
        "the operation completed successfully",
        "the restore operation completed successfully",
        "operação foi concluída com êxito",
    ],
    failure: &["error:", "erro:"],
};

/// Disk check, system file check and component store repair.
pub const SYSTEM_REPAIR: CommandAction = CommandAction {
    name: "system-repair",
    title: "System repair",
    steps: &[
        CommandStep {
            label: "schedule disk check",
            program: "chkdsk",
            args: &["C:", "/F", "/R"],
            timeout: Some(3600),
            input: Some("Y"),
            markers: CHKDSK_MARKERS,
        },
        CommandStep {
            label: "system file check",
            program: "sfc",
            args: &["/scannow"],
            timeout: Some(3600),
            input: None,
            markers: SFC_MARKERS,
        },
        CommandStep {
            label: "restore component store health",
            program: "DISM",
            args: &["/Online", "/Cleanup-Image", "/RestoreHealth"],
            timeout: Some(7200),
            input: None,
            markers: DISM_MARKERS,
        },
        CommandStep {
            label: "clean up component store",
            program: "DISM",
            args: &["/Online", "/Cleanup-Image", "/StartComponentCleanup", "/ResetBase"],
            timeout: Some(3600),
            input: None,
            markers: DISM_MARKERS,
        },
    ],
    policy: Policy::AllRequired,
};
