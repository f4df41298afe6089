//! Runs transcoder commands with cancellation, timeout and a diagnostic tail.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::watch;

use crate::shared::constants::DIAGNOSTIC_TAIL_LINES;
use crate::shared::error::{MediaError, MediaResult};
use crate::splicing::infrastructure::ffmpeg_command::FfmpegCommand;
use crate::splicing::infrastructure::progress::{
    is_progress_line, parse_progress_line, FfmpegProgress, ProgressCallback,
};

/// Runs one [`FfmpegCommand`] per call as its own child process.
///
/// The child is killed on cancellation, on timeout, and when the returned
/// future is dropped.
pub struct FfmpegRunner {
    program: PathBuf,
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cancel_rx: None,
            timeout: None,
        }
    }

    /// Cancels the run once the channel carries `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, None).await
    }

    pub async fn run_with_progress(
        &self,
        cmd: &FfmpegCommand,
        on_progress: Option<ProgressCallback>,
    ) -> MediaResult<()> {
        let tool = self.program.display().to_string();

        if self.cancel_rx.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(MediaError::Cancelled);
        }

        let args = cmd.build_args();
        log::debug!("Running {tool} {}", args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::SpawnFailed {
                tool: tool.clone(),
                source,
            })?;

        let stderr = child.stderr.take().ok_or_else(|| {
            MediaError::io(
                format!("{tool} stderr"),
                std::io::Error::other("stderr not captured"),
            )
        })?;
        let stderr_task = tokio::spawn(collect_stderr(stderr, on_progress));

        let outcome = self.wait_for_completion(&mut child).await;

        let tail = match stderr_task.await {
            Ok(tail) => tail,
            Err(e) => {
                log::warn!("{tool} stderr reader failed: {e}");
                VecDeque::new()
            }
        };

        let status = outcome?;
        if status.success() {
            return Ok(());
        }

        let diagnostic = Vec::from(tail).join("\n");
        log::warn!("{tool} exited with {status}: {diagnostic}");
        Err(MediaError::SubprocessFailed {
            tool,
            exit_code: status.code(),
            diagnostic,
        })
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let outcome = tokio::select! {
            status = child.wait() => Ok(status),
            _ = cancellation(self.cancel_rx.clone()) => Err(MediaError::Cancelled),
            elapsed = deadline(self.timeout) => Err(MediaError::Timeout(elapsed)),
        };

        match outcome {
            Ok(status) => status.map_err(|e| MediaError::io("Failed to wait for transcoder", e)),
            Err(interrupt) => {
                log::warn!("{interrupt}, killing {}", self.program.display());
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill {}: {e}", self.program.display());
                }
                Err(interrupt)
            }
        }
    }
}

/// Resolves once cancellation is requested; never if the sender goes away.
async fn cancellation(cancel_rx: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = cancel_rx {
        if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(timeout) => {
            tokio::time::sleep(timeout).await;
            timeout
        }
        None => std::future::pending().await,
    }
}

/// Forwards progress blocks and keeps the last diagnostic lines.
async fn collect_stderr(
    stderr: ChildStderr,
    on_progress: Option<ProgressCallback>,
) -> VecDeque<String> {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
    let mut current = FfmpegProgress::default();

    while let Ok(Some(line)) = lines.next_line().await {
        if is_progress_line(&line) {
            if let (Some(snapshot), Some(callback)) =
                (parse_progress_line(&line, &mut current), on_progress.as_ref())
            {
                callback(snapshot);
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == DIAGNOSTIC_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail
}
