//! Sandboxed process execution
//!
//! One child process per execution, run through the language's interpreter
//! with the rendered source passed inline. The child gets its own session
//! (so the whole process group can be killed at once), a cleared environment,
//! rlimit ceilings for memory, process count, CPU time and core dumps, and
//! best-effort network isolation via an unshared network namespace.
//!
//! Supervision guarantees: the wait is always deadline-bounded, output
//! capture is capped in size and grace-bounded in time, and no child in the
//! sandbox's process group survives this function on any exit path (timeout,
//! host error, or cancellation via `kill_on_drop`).

use crate::config::{Limits, SandboxConfig};
use crate::language::Language;
use crate::protocol::MEMORY_LIMIT_EXIT_CODE;
use crate::record::{ExecStatus, ExecutionRecord};
use crate::template::RenderedProgram;
use crate::{GavelError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// How long to keep reading the output pipes after the process group is
/// gone. A guest can leak a descendant into its own session that keeps the
/// write ends open; the supervisor stops waiting for it after this grace.
const CAPTURE_GRACE: Duration = Duration::from_millis(500);

/// Spawns and supervises sandboxed executions.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    config: SandboxConfig,
}

impl SandboxExecutor {
    #[must_use]
    pub const fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run a rendered program to completion under the given limits.
    ///
    /// Normal exit yields `Completed` regardless of what was printed;
    /// correctness of the output is a later stage's job.
    ///
    /// # Errors
    /// Only host-side supervision failures (spawn, pipe I/O) surface as
    /// errors; everything the sandboxed program does wrong is classified
    /// into the record's status instead.
    pub async fn execute(
        &self,
        program: &RenderedProgram,
        limits: &Limits,
    ) -> Result<ExecutionRecord> {
        let interpreter = self.config.interpreter(program.language);

        tracing::debug!(
            language = %program.language,
            interpreter = %interpreter.display(),
            source_len = program.source.len(),
            time_ms = limits.wall_time.as_millis() as u64,
            memory_bytes = limits.memory_bytes,
            "spawning sandboxed process"
        );

        let mut cmd = Command::new(interpreter);
        cmd.args(program.language.memory_args(limits.memory_bytes))
            .arg(program.language.inline_flag())
            .arg(&program.source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .envs(self.config.env.iter().cloned())
            .current_dir(&self.config.workdir)
            .kill_on_drop(true);

        apply_isolation(&mut cmd, limits, program.language, self.config.max_pids);

        let mut child = cmd
            .spawn()
            .map_err(|e| GavelError::Execution(format!("failed to spawn {}: {e}", interpreter.display())))?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GavelError::Execution("stdout pipe missing".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GavelError::Execution("stderr pipe missing".into()))?;

        let cap = self.config.capture_limit;
        let stdout_capture = spawn_capture(stdout, cap);
        let stderr_capture = spawn_capture(stderr, cap);

        let started = Instant::now();
        let (status, exit) = match tokio::time::timeout(limits.wall_time, child.wait()).await {
            Ok(wait_result) => {
                let exit = wait_result?;
                (classify_exit(exit), Some(exit))
            }
            Err(_) => {
                tracing::warn!(pid, "wall-clock deadline expired, killing process group");
                kill_group(pid);
                let _ = child.kill().await;
                let exit = child.wait().await.ok();
                (ExecStatus::TimedOut, exit)
            }
        };
        // Sweep same-group stragglers on every path so they release the
        // pipe write ends.
        kill_group(pid);
        let wall_time = started.elapsed();

        // A descendant that escaped the group (own session) can still hold
        // the pipes open; each join is grace-bounded, never indefinite.
        let (stdout, stdout_truncated) = stdout_capture.finish(CAPTURE_GRACE).await?;
        let (stderr, stderr_truncated) = stderr_capture.finish(CAPTURE_GRACE).await?;

        let record = ExecutionRecord {
            status,
            exit_code: exit.and_then(|e| e.code()),
            signal: exit.and_then(|e| e.signal()),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            stdout_truncated,
            stderr_truncated,
            wall_time,
        };

        tracing::info!(
            status = ?record.status,
            exit_code = record.exit_code,
            signal = record.signal,
            wall_ms = wall_time.as_millis() as u64,
            "sandboxed execution finished"
        );

        Ok(record)
    }
}

/// Classify a reaped exit status.
///
/// Exit 0 is `Completed` no matter what was printed. The drivers exit with
/// [`MEMORY_LIMIT_EXIT_CODE`] when the guest hits the memory ceiling, and a
/// CPU-backstop signal or an outright SIGKILL (the kernel's memory killer;
/// the supervisor only ever group-kills on the timeout path, which is
/// classified before reaching here) also counts as `LimitExceeded`.
/// Everything else is `Crashed`.
fn classify_exit(exit: ExitStatus) -> ExecStatus {
    match (exit.code(), exit.signal()) {
        (Some(0), _) => ExecStatus::Completed,
        (Some(MEMORY_LIMIT_EXIT_CODE), _) => ExecStatus::LimitExceeded,
        (Some(_), _) => ExecStatus::Crashed,
        (None, Some(sig)) if sig == libc::SIGXCPU || sig == libc::SIGKILL => {
            ExecStatus::LimitExceeded
        }
        _ => ExecStatus::Crashed,
    }
}

/// Install the pre-exec isolation hooks on the command.
///
/// The memory ceiling is per-language: `RLIMIT_AS` for runtimes with modest
/// address-space habits, `RLIMIT_DATA` for V8, which reserves multi-GB
/// address space at startup and would die instantly under any realistic
/// `RLIMIT_AS` value (the heap budget is additionally enforced in-runtime
/// via [`Language::memory_args`]).
fn apply_isolation(cmd: &mut Command, limits: &Limits, language: Language, max_pids: u32) {
    let memory = limits.memory_bytes;
    let memory_resource = match language {
        Language::Python => libc::RLIMIT_AS,
        Language::JavaScript => libc::RLIMIT_DATA,
    };
    let cpu_secs = limits.cpu_seconds();
    let nproc = u64::from(max_pids);

    // SAFETY: the closure runs between fork and exec, so only
    // async-signal-safe calls are allowed; raw libc syscall wrappers qualify.
    #[allow(unsafe_code)]
    unsafe {
        cmd.pre_exec(move || {
            // Own session: lets the supervisor SIGKILL the whole group.
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }

            set_rlimit(memory_resource, memory)?;
            set_rlimit(libc::RLIMIT_NPROC, nproc)?;
            set_rlimit(libc::RLIMIT_CPU, cpu_secs)?;
            set_rlimit(libc::RLIMIT_CORE, 0)?;

            // Network isolation needs an unprivileged user namespace first;
            // tolerated to fail on kernels that refuse it, same layering
            // policy as the filesystem restrictions.
            let _ = libc::unshare(libc::CLONE_NEWUSER | libc::CLONE_NEWNET);

            Ok(())
        });
    }
}

#[allow(unsafe_code)]
fn set_rlimit(resource: libc::__rlimit_resource_t, value: u64) -> std::io::Result<()> {
    let limit = libc::rlimit {
        rlim_cur: value,
        rlim_max: value,
    };
    // SAFETY: plain syscall wrapper with a stack-local argument.
    if unsafe { libc::setrlimit(resource, &limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// SIGKILL the child's whole process group (it called setsid, so the group id
/// is its pid). ESRCH just means everything is already gone.
fn kill_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        #[allow(clippy::cast_possible_wrap)]
        let pgid = Pid::from_raw(pid as i32);
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            if e != nix::errno::Errno::ESRCH {
                tracing::warn!(pid, error = %e, "failed to kill process group");
            }
        }
    }
}

#[derive(Default)]
struct CaptureState {
    buf: Vec<u8>,
    truncated: bool,
}

/// An output stream being drained in the background. The buffer is shared so
/// whatever was captured is still available if the reader has to be
/// abandoned at the grace deadline.
struct CaptureTask {
    state: Arc<Mutex<CaptureState>>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl CaptureTask {
    /// Wait for the stream to reach EOF, but never longer than `grace`.
    /// On grace expiry the reader is aborted and the capture is flagged
    /// truncated: some process outside the killable group is still holding
    /// the write end.
    async fn finish(mut self, grace: Duration) -> Result<(Vec<u8>, bool)> {
        let abandoned = match tokio::time::timeout(grace, &mut self.task).await {
            Ok(join_result) => {
                join_result
                    .map_err(|e| GavelError::Execution(format!("capture task failed: {e}")))?
                    .map_err(GavelError::Io)?;
                false
            }
            Err(_) => {
                tracing::warn!("output pipe still open after kill, abandoning capture");
                self.task.abort();
                true
            }
        };

        let mut state = self.state.lock();
        let buf = std::mem::take(&mut state.buf);
        Ok((buf, state.truncated || abandoned))
    }
}

/// Drain a stream in a background task, keeping at most `cap` bytes. The
/// remainder is read and discarded so the child never blocks on a full pipe,
/// and the host never buffers unboundedly.
fn spawn_capture<R>(mut reader: R, cap: usize) -> CaptureTask
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let state = Arc::new(Mutex::new(CaptureState::default()));
    let shared = Arc::clone(&state);

    let task = tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            let mut state = shared.lock();
            if state.buf.len() < cap {
                let take = n.min(cap - state.buf.len());
                state.buf.extend_from_slice(&chunk[..take]);
                if take < n {
                    state.truncated = true;
                }
            } else {
                state.truncated = true;
            }
        }
        Ok(())
    });

    CaptureTask { state, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn exit_statuses_map_to_terminal_statuses() {
        assert_eq!(classify_exit(ExitStatus::from_raw(0)), ExecStatus::Completed);
        // Exit code 1 (wait status 0x0100)
        assert_eq!(classify_exit(ExitStatus::from_raw(1 << 8)), ExecStatus::Crashed);
        // The drivers' memory-ceiling exit code
        assert_eq!(
            classify_exit(ExitStatus::from_raw(MEMORY_LIMIT_EXIT_CODE << 8)),
            ExecStatus::LimitExceeded
        );
        // Killed by SIGSEGV: a plain crash, not a limit
        assert_eq!(
            classify_exit(ExitStatus::from_raw(libc::SIGSEGV)),
            ExecStatus::Crashed
        );
        // Killed by SIGXCPU: CPU backstop tripped
        assert_eq!(
            classify_exit(ExitStatus::from_raw(libc::SIGXCPU)),
            ExecStatus::LimitExceeded
        );
        // Killed by SIGKILL outside the timeout path: memory killer
        assert_eq!(
            classify_exit(ExitStatus::from_raw(libc::SIGKILL)),
            ExecStatus::LimitExceeded
        );
    }

    #[tokio::test]
    async fn capture_truncates_and_drains() {
        let data = vec![b'x'; 100_000];
        let (out, truncated) = spawn_capture(std::io::Cursor::new(data), 1024)
            .finish(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.len(), 1024);
        assert!(truncated);

        let (out, truncated) = spawn_capture(&b"short"[..], 1024)
            .finish(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, b"short");
        assert!(!truncated);
    }

    #[tokio::test]
    async fn capture_is_grace_bounded_when_writer_never_closes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"partial").await.unwrap();

        let capture = spawn_capture(rx, 1024);
        let started = Instant::now();
        let (out, truncated) = capture.finish(Duration::from_millis(200)).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(out, b"partial");
        assert!(truncated);
        drop(tx);
    }
}
