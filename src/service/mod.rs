//! Service lifecycle control
//!
//! The consumer must not replace the live database or uploads tree while the
//! web application is serving requests, so it stops the service before
//! mutating and starts it again afterwards. The supervisor is a trait seam:
//! production uses systemd through `systemctl`, tests substitute a scripted
//! double, and deployments without a managed unit run with no supervisor at
//! all (the steps are recorded as skipped).

use std::io;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

/// Default budget for post-start health polling
pub const DEFAULT_RESUME_BUDGET: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Stop/start/is-running operations over the web application's process
pub trait ServiceSupervisor {
    fn stop(&self) -> io::Result<()>;
    fn start(&self) -> io::Result<()>;
    fn is_running(&self) -> io::Result<bool>;
    /// Operator-facing identity, e.g. the unit name
    fn describe(&self) -> String;
}

/// systemd-backed supervisor
pub struct SystemdSupervisor {
    unit: String,
}

impl SystemdSupervisor {
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }

    fn systemctl(&self, verb: &str) -> io::Result<std::process::Output> {
        Command::new("systemctl").arg(verb).arg(&self.unit).output()
    }
}

impl ServiceSupervisor for SystemdSupervisor {
    fn stop(&self) -> io::Result<()> {
        let output = self.systemctl("stop")?;
        if output.status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "systemctl stop {} failed: {}",
                    self.unit,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ))
        }
    }

    fn start(&self) -> io::Result<()> {
        let output = self.systemctl("start")?;
        if output.status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "systemctl start {} failed: {}",
                    self.unit,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ))
        }
    }

    fn is_running(&self) -> io::Result<bool> {
        // `is-active` exits 0 only for an active unit
        let output = self.systemctl("is-active")?;
        Ok(output.status.success())
    }

    fn describe(&self) -> String {
        self.unit.clone()
    }
}

/// Poll `is_running` until it reports true or the budget runs out.
///
/// Returns whether the service came up. Probe errors consume budget rather
/// than aborting; a supervisor that cannot answer is indistinguishable from a
/// service that is not up yet.
pub fn await_running(supervisor: &dyn ServiceSupervisor, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    loop {
        if let Ok(true) = supervisor.is_running() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted supervisor double shared by unit and integration tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Supervisor that records calls and answers `is_running` from a script.
    pub struct ScriptedSupervisor {
        pub calls: Mutex<Vec<&'static str>>,
        running_answers: Mutex<Vec<bool>>,
        probes: AtomicUsize,
        pub fail_start: bool,
    }

    impl ScriptedSupervisor {
        pub fn new(running_answers: Vec<bool>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                running_answers: Mutex::new(running_answers),
                probes: AtomicUsize::new(0),
                fail_start: false,
            }
        }

        pub fn probe_count(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }
    }

    impl ServiceSupervisor for ScriptedSupervisor {
        fn stop(&self) -> io::Result<()> {
            self.calls.lock().unwrap().push("stop");
            Ok(())
        }

        fn start(&self) -> io::Result<()> {
            self.calls.lock().unwrap().push("start");
            if self.fail_start {
                Err(io::Error::new(io::ErrorKind::Other, "unit failed"))
            } else {
                Ok(())
            }
        }

        fn is_running(&self) -> io::Result<bool> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            let mut answers = self.running_answers.lock().unwrap();
            if answers.len() > 1 {
                Ok(answers.remove(0))
            } else {
                Ok(answers.first().copied().unwrap_or(false))
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }
}
