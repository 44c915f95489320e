//! Step transcript and run report
//!
//! Both operations are an ordered pipeline of named steps. Each step finishes
//! in exactly one of three states: it ran and succeeded, it did not apply to
//! this run, or it failed with a reason. Steps are recorded as they complete
//! and aggregated into a final summary instead of branching ad hoc on each
//! result.
//!
//! The run status classifies the whole pipeline for exit-code purposes:
//! recoverable step failures (a skipped archive, a failed mirror) leave the
//! status at `Success`; only the fatal-local and post-mutation categories turn
//! the exit code non-zero.

use std::fmt;

use crate::observability::Logger;

/// Terminal state of a single pipeline step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran to completion
    Succeeded,
    /// The step did not apply to this run (for the stated reason)
    Skipped(String),
    /// The step ran and failed; the pipeline decided to continue
    Failed(String),
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped(reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        StepOutcome::Failed(reason.into())
    }

    fn marker(&self) -> &'static str {
        match self {
            StepOutcome::Succeeded => "ok",
            StepOutcome::Skipped(_) => "skipped",
            StepOutcome::Failed(_) => "FAILED",
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Succeeded => write!(f, "ok"),
            StepOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            StepOutcome::Failed(reason) => write!(f, "FAILED: {}", reason),
        }
    }
}

/// One completed step
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: &'static str,
    pub outcome: StepOutcome,
}

/// Overall classification of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Local operation succeeded (recoverable step failures allowed)
    Success,
    /// A fatal-local condition aborted the run
    FatalLocal,
    /// State was mutated but the service did not resume
    PostMutation,
}

impl RunStatus {
    /// Process exit code for this status
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::FatalLocal => 1,
            RunStatus::PostMutation => 2,
        }
    }
}

/// Ordered transcript of a backup or restore run
#[derive(Debug)]
pub struct RunReport {
    operation: &'static str,
    steps: Vec<StepRecord>,
    status: RunStatus,
}

impl RunReport {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            steps: Vec::new(),
            status: RunStatus::Success,
        }
    }

    /// Record a completed step and emit its event line.
    pub fn record(&mut self, name: &'static str, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Succeeded => {
                Logger::info("STEP_COMPLETED", &[("operation", self.operation), ("step", name)]);
            }
            StepOutcome::Skipped(reason) => {
                Logger::info(
                    "STEP_SKIPPED",
                    &[("operation", self.operation), ("reason", reason), ("step", name)],
                );
            }
            StepOutcome::Failed(reason) => {
                Logger::warn(
                    "STEP_FAILED",
                    &[("operation", self.operation), ("reason", reason), ("step", name)],
                );
            }
        }
        self.steps.push(StepRecord { name, outcome });
    }

    /// Escalate to a fatal-local failure. PostMutation is never downgraded.
    pub fn mark_fatal(&mut self) {
        if self.status == RunStatus::Success {
            self.status = RunStatus::FatalLocal;
        }
    }

    /// Escalate to a post-mutation failure: data already replaced, service
    /// did not come back.
    pub fn mark_post_mutation(&mut self) {
        self.status = RunStatus::PostMutation;
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// True when any step ran and failed (even if the run as a whole counts
    /// as a success).
    pub fn has_step_failures(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.outcome, StepOutcome::Failed(_)))
    }

    /// Human-readable end-of-run summary on stdout.
    pub fn print_summary(&self) {
        println!();
        println!("{} summary:", self.operation);
        for step in &self.steps {
            match &step.outcome {
                StepOutcome::Succeeded => println!("  [{:>7}] {}", step.outcome.marker(), step.name),
                StepOutcome::Skipped(reason) | StepOutcome::Failed(reason) => {
                    println!("  [{:>7}] {} ({})", step.outcome.marker(), step.name, reason)
                }
            }
        }
        let verdict = match self.status {
            RunStatus::Success => "completed",
            RunStatus::FatalLocal => "aborted",
            RunStatus::PostMutation => "completed with service failure",
        };
        println!("{} {}", self.operation, verdict);
    }
}
