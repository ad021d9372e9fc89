// src/sandbox/mod.rs — Resource-limited child process execution
//
// Runs `<interpreter> <program> [args...]` with a scrubbed environment,
// the workspace as working directory, bounded output capture and a hard
// wall-clock deadline. On expiry the whole process group is killed.
//
// Per-run outcomes (denials, timeouts, non-zero exits) are always reported
// through `ExecutionResult`. Only failing to start a process at all is an
// error.

mod capture;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::infra::config::SandboxConfig;
use crate::infra::errors::SkillforgeError;
use crate::infra::paths::WorkspaceLayout;
use crate::security::SafetyEnforcer;

/// How long to wait for the output readers after the child is gone.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Outcome of one sandboxed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// A run that was refused before any process was spawned.
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            stderr: reason.into(),
            ..Default::default()
        }
    }

    /// The per-attempt error this run amounts to, if it failed.
    pub fn as_error(&self, timeout: Duration) -> Option<SkillforgeError> {
        if self.success {
            return None;
        }
        if self.timed_out {
            return Some(SkillforgeError::SandboxTimeout {
                seconds: timeout.as_secs(),
            });
        }
        Some(SkillforgeError::SandboxRuntime {
            exit_code: self.exit_code,
            stderr: self.stderr.trim().to_string(),
        })
    }

    /// Short diagnostic for the failure log.
    pub fn failure_reason(&self, timeout: Duration) -> String {
        self.as_error(timeout)
            .map(|e| e.to_string())
            .unwrap_or_default()
    }
}

pub struct Sandbox {
    layout: WorkspaceLayout,
    safety: Arc<SafetyEnforcer>,
    interpreter: String,
    timeout: Duration,
    path_env: String,
    env_allowlist: Vec<String>,
    max_output_bytes: usize,
}

impl Sandbox {
    pub fn new(layout: WorkspaceLayout, config: &SandboxConfig, safety: Arc<SafetyEnforcer>) -> Self {
        Self {
            layout,
            safety,
            interpreter: config.interpreter.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            path_env: config.path.clone(),
            env_allowlist: config.env_allowlist.clone(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    /// Override the wall-clock limit (tests use sub-second deadlines).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Run `program` (absolute, or relative to the workspace root).
    pub async fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> Result<ExecutionResult, SkillforgeError> {
        let root = self.layout.root();

        if let Err(violation) = self.safety.check_path(program, root).into_result() {
            tracing::warn!(program = %program.display(), "Sandbox refused path: {}", violation);
            return Ok(ExecutionResult::refused(violation.to_string()));
        }
        let program_path = if program.is_absolute() {
            program.to_path_buf()
        } else {
            root.join(program)
        };

        let source = match tokio::fs::read_to_string(&program_path).await {
            Ok(s) => s,
            Err(e) => {
                return Ok(ExecutionResult::refused(format!(
                    "cannot read program {}: {e}",
                    program_path.display()
                )))
            }
        };
        if let Err(violation) = self.safety.check_source(&source).into_result() {
            tracing::warn!(program = %program_path.display(), "Sandbox refused source: {}", violation);
            return Ok(ExecutionResult::refused(violation.to_string()));
        }

        let exec_dir = self.prepare_exec_dir().await?;
        self.spawn_and_wait(&program_path, args, &exec_dir).await
    }

    /// Clear `exec/` so every run starts from an empty scratch directory.
    async fn prepare_exec_dir(&self) -> Result<PathBuf, SkillforgeError> {
        let exec_dir = self.layout.exec_dir();
        match tokio::fs::remove_dir_all(&exec_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(infra(format!("cannot clear {}: {e}", exec_dir.display()))),
        }
        tokio::fs::create_dir_all(&exec_dir)
            .await
            .map_err(|e| infra(format!("cannot create {}: {e}", exec_dir.display())))?;
        Ok(exec_dir)
    }

    /// The complete child environment. Nothing else is inherited.
    fn child_env(&self, exec_dir: &Path) -> Vec<(String, String)> {
        let exec = exec_dir.display().to_string();
        let mut env = vec![
            ("PATH".to_string(), self.path_env.clone()),
            (
                "PYTHONPATH".to_string(),
                self.layout.root().display().to_string(),
            ),
            ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
            ("HOME".to_string(), exec.clone()),
            ("TMPDIR".to_string(), exec),
        ];
        for name in &self.env_allowlist {
            if is_proxy_var(name) || env.iter().any(|(k, _)| k == name) {
                continue;
            }
            if let Ok(value) = std::env::var(name) {
                env.push((name.clone(), value));
            }
        }
        env
    }

    async fn spawn_and_wait(
        &self,
        program_path: &Path,
        args: &[String],
        exec_dir: &Path,
    ) -> Result<ExecutionResult, SkillforgeError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(program_path)
            .args(args)
            .current_dir(self.layout.root())
            .env_clear()
            .envs(self.child_env(exec_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            infra(format!("failed to spawn '{}': {e}", self.interpreter))
        })?;

        let stdout = child
            .stdout
            .take()
            .map(|out| capture::OutputReader::spawn(out, self.max_output_bytes));
        let stderr = child
            .stderr
            .take()
            .map(|err| capture::OutputReader::spawn(err, self.max_output_bytes));

        // Taken before waiting: a reaped child no longer reports its id.
        let pgid = child.id();
        let waited = tokio::time::timeout(self.timeout, child.wait()).await;

        // Anything left in the group outlived its parent or the deadline.
        kill_process_group(pgid);

        let (exit_code, timed_out) = match waited {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => return Err(infra(format!("failed to wait for child: {e}"))),
            Err(_) => {
                tracing::warn!(
                    program = %program_path.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Sandbox deadline reached, killed process group",
                );
                let _ = child.kill().await;
                (None, true)
            }
        };

        let (stdout, stderr) = tokio::join!(
            capture::collect(stdout, READER_GRACE),
            capture::collect(stderr, READER_GRACE),
        );
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = ExecutionResult {
            success: !timed_out && exit_code == Some(0),
            stdout,
            stderr,
            exit_code,
            timed_out,
            duration_ms,
        };
        tracing::info!(
            program = %program_path.display(),
            success = result.success,
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            duration_ms,
            "Sandbox run finished",
        );
        Ok(result)
    }
}

fn infra(message: String) -> SkillforgeError {
    SkillforgeError::SandboxInfrastructure { message }
}

fn is_proxy_var(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with("_proxy")
}

#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    if let Some(pgid) = pgid {
        // The child leads its own group (process_group(0) at spawn), so
        // signalling -pgid reaches every descendant it started. The id stays
        // reserved while any member lives; ESRCH just means the group is empty.
        unsafe {
            libc::kill(-(pgid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_in(dir: &Path, allowlist: Vec<String>) -> Sandbox {
        let layout = WorkspaceLayout::new(dir).ensure().unwrap();
        let config = SandboxConfig {
            interpreter: "/bin/sh".into(),
            env_allowlist: allowlist,
            ..Default::default()
        };
        Sandbox::new(layout, &config, Arc::new(SafetyEnforcer::new(&[]).unwrap()))
    }

    #[test]
    fn test_proxy_vars_detected() {
        assert!(is_proxy_var("HTTP_PROXY"));
        assert!(is_proxy_var("https_proxy"));
        assert!(!is_proxy_var("LANG"));
    }

    #[test]
    fn test_child_env_is_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = sandbox_in(
            dir.path(),
            vec!["HTTPS_PROXY".into(), "SKILLFORGE_TEST_UNSET_VAR".into()],
        );
        let env = sandbox.child_env(&sandbox.layout().exec_dir());
        let keys: Vec<&str> = env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["PATH", "PYTHONPATH", "PYTHONDONTWRITEBYTECODE", "HOME", "TMPDIR"]
        );
        assert_eq!(env[0].1, "/usr/bin:/bin");
    }

    #[test]
    fn test_failure_reason_variants() {
        let timeout = Duration::from_secs(15);
        let timed = ExecutionResult {
            timed_out: true,
            ..Default::default()
        };
        assert_eq!(timed.failure_reason(timeout), "Sandbox timeout after 15s");
        assert!(matches!(
            timed.as_error(timeout),
            Some(SkillforgeError::SandboxTimeout { seconds: 15 })
        ));

        let with_stderr = ExecutionResult {
            stderr: "Traceback: NameError\n".into(),
            exit_code: Some(1),
            ..Default::default()
        };
        assert_eq!(with_stderr.failure_reason(timeout), "Traceback: NameError");

        let silent = ExecutionResult {
            exit_code: Some(3),
            ..Default::default()
        };
        assert_eq!(silent.failure_reason(timeout), "exit code 3");

        let killed = ExecutionResult::default();
        assert_eq!(killed.failure_reason(timeout), "terminated by signal");

        let passed = ExecutionResult {
            success: true,
            exit_code: Some(0),
            ..Default::default()
        };
        assert!(passed.as_error(timeout).is_none());
    }

    #[tokio::test]
    async fn test_exec_dir_cleared_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = sandbox_in(dir.path(), vec![]);
        let stale = sandbox.layout().exec_dir().join("stale.txt");
        std::fs::write(&stale, "old").unwrap();
        sandbox.prepare_exec_dir().await.unwrap();
        assert!(!stale.exists());
        assert!(sandbox.layout().exec_dir().is_dir());
    }
}
