//! Spawn, wait for, and if needed terminate the sample.
//!
//! On Unix the sample leads its own process group, so termination reaches
//! anything it forked. Termination escalates from SIGTERM to SIGKILL after a
//! grace period; a child that survives even that is recorded as an error on
//! the [`ExecutionRecord`], never raised. A sample that exits on its own still
//! has its group swept, so background children do not outlive the run.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::core::dynamic_report::ExecutionRecord;
use crate::timeout::within;

/// Return code recorded when the sample was killed for running too long.
pub const TIMEOUT_RETURN_CODE: i32 = -1;

/// Result of one execution plus the deadline the rest of teardown must meet.
#[derive(Debug)]
pub struct Execution {
    pub record: ExecutionRecord,
    /// Fixed when the wait on the child ended; bounds termination, output
    /// capture and whatever the caller still has to join.
    pub teardown_deadline: Instant,
}

fn build_command(path: &Path) -> Command {
    let mut std_cmd = std::process::Command::new(path);
    std_cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }
    let mut cmd = Command::from(std_cmd);
    cmd.kill_on_drop(true);
    cmd
}

/// Exit code, or the negated signal number when the child was signalled.
fn return_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }
    -1
}

/// Bytes read so far from one of the child's pipes.
type SharedBuf = Arc<Mutex<Vec<u8>>>;

fn lock(buf: &SharedBuf) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|e| e.into_inner())
}

/// Drain `reader` to EOF into `kept`, keeping at most `cap` bytes.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize, kept: SharedBuf) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut kept = lock(&kept);
                let room = cap.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
}

/// A pipe reader whose output survives being cut off at the deadline.
struct OutputCapture {
    kept: SharedBuf,
    task: JoinHandle<()>,
}

impl OutputCapture {
    fn spawn<R>(reader: Option<R>, cap: usize) -> Option<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        reader.map(|r| {
            let kept = SharedBuf::default();
            let task = tokio::spawn(read_capped(r, cap, kept.clone()));
            Self { kept, task }
        })
    }

    /// Wait for EOF until `deadline`, then return whatever was read.
    async fn finish(mut self, deadline: Instant, what: &str) -> String {
        let budget = deadline.saturating_duration_since(Instant::now());
        match within(budget, what, &mut self.task).await {
            Some(Err(e)) => debug!(error = %e, "{} reader failed", what),
            Some(Ok(())) => {}
            None => self.task.abort(),
        }
        let kept = lock(&self.kept);
        let text = String::from_utf8_lossy(&kept).into_owned();
        text
    }
}

async fn collect_output(capture: Option<OutputCapture>, deadline: Instant, what: &str) -> String {
    match capture {
        Some(capture) => capture.finish(deadline, what).await,
        None => String::new(),
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
    // Safety: kill(2) has no memory effects; a negative pid addresses the
    // process group created for the sample at spawn.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn force_kill_group(pid: u32) {
    if let Err(e) = signal_group(pid, libc::SIGKILL) {
        if e.raw_os_error() != Some(libc::ESRCH) {
            warn!(pid, error = %e, "SIGKILL to sample process group failed");
        }
    }
}

/// Terminate whatever is left in the group of a sample that already exited.
///
/// SIGTERM first; anything still in the group after `grace` gets SIGKILL.
#[cfg(unix)]
async fn sweep_group(pid: u32, grace: std::time::Duration) {
    // Signal 0 only checks whether the group still has members
    if signal_group(pid, 0).is_err() {
        return;
    }
    info!(pid, "sample left processes behind; terminating its group");
    if let Err(e) = signal_group(pid, libc::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM to leftover group failed");
    }
    let until = Instant::now() + grace;
    while Instant::now() < until {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        if signal_group(pid, 0).is_err() {
            return;
        }
    }
    force_kill_group(pid);
}

/// Graceful terminate, then forced kill. Returns an error description if the
/// child could not be confirmed dead.
async fn terminate(child: &mut Child, pid: Option<u32>, cfg: &MonitorConfig) -> Option<String> {
    let grace = cfg.termination_grace();

    #[cfg(unix)]
    if let Some(pid) = pid {
        if let Err(e) = signal_group(pid, libc::SIGTERM) {
            warn!(pid, error = %e, "SIGTERM to sample process group failed");
        }
        let exited = matches!(timeout(grace, child.wait()).await, Ok(Ok(_)));
        // Sweep the group even if the leader exited; stragglers may remain
        force_kill_group(pid);
        if exited {
            return None;
        }
        warn!(pid, "sample survived SIGTERM; killed");
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill after group kill");
    }
    match timeout(grace, child.wait()).await {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(format!("failed to reap sample after forced kill: {e}")),
        Err(_) => Some("sample still running after forced kill".to_string()),
    }
}

/// Run the sample at `path` under `cfg.timeout()`.
///
/// `on_exit` is called with the teardown deadline as soon as the wait on the
/// child ends (or spawning fails), before termination and output capture.
pub async fn run_sample<F>(path: &Path, cfg: &MonitorConfig, on_exit: F) -> Execution
where
    F: FnOnce(Instant),
{
    let started = Instant::now();
    let mut child = match build_command(path).spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "sample could not be started");
            let teardown_deadline = Instant::now() + cfg.teardown_budget();
            on_exit(teardown_deadline);
            return Execution {
                record: ExecutionRecord {
                    return_code: -1,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                    stdout: String::new(),
                    stderr: String::new(),
                    timeout_occurred: false,
                    error: Some(format!("failed to start sample: {e}")),
                },
                teardown_deadline,
            };
        }
    };

    let pid = child.id();
    info!(pid, timeout_secs = cfg.timeout_secs, "sample started");
    let stdout = OutputCapture::spawn(child.stdout.take(), cfg.max_output_bytes);
    let stderr = OutputCapture::spawn(child.stderr.take(), cfg.max_output_bytes);

    let waited = timeout(cfg.timeout(), child.wait()).await;
    let teardown_deadline = Instant::now() + cfg.teardown_budget();
    on_exit(teardown_deadline);

    let (return_code, timeout_occurred, error) = match waited {
        Ok(Ok(status)) => {
            let code = return_code(status);
            info!(pid, return_code = code, "sample exited");
            #[cfg(unix)]
            if let Some(pid) = pid {
                sweep_group(pid, cfg.termination_grace()).await;
            }
            (code, false, None)
        }
        Ok(Err(e)) => {
            warn!(pid, error = %e, "waiting on sample failed");
            let err = terminate(&mut child, pid, cfg).await;
            (-1, false, Some(err.unwrap_or_else(|| format!("wait failed: {e}"))))
        }
        Err(_) => {
            warn!(pid, timeout_secs = cfg.timeout_secs, "sample timed out; terminating");
            let err = terminate(&mut child, pid, cfg).await;
            (TIMEOUT_RETURN_CODE, true, err)
        }
    };

    let (stdout, stderr) = tokio::join!(
        collect_output(stdout, teardown_deadline, "stdout capture"),
        collect_output(stderr, teardown_deadline, "stderr capture"),
    );

    Execution {
        record: ExecutionRecord {
            return_code,
            elapsed_secs: started.elapsed().as_secs_f64(),
            stdout,
            stderr,
            timeout_occurred,
            error,
        },
        teardown_deadline,
    }
}
