use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `output` holds whatever the child printed before it was killed.
    #[error("{program} timed out after {}s", after.as_secs())]
    TimedOut {
        program: String,
        after: Duration,
        output: String,
    },
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// stdout followed by stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// A toolchain binary run with a fixed timeout.
///
/// Children are spawned with `kill_on_drop`, so a timeout here or a dropped
/// request future upstream terminates the process instead of leaking it.
#[derive(Debug, Clone)]
pub struct GoCommand {
    program: PathBuf,
    timeout: Duration,
}

impl GoCommand {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub async fn run<I, S>(&self, dir: &Path, args: I) -> Result<CommandOutput, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.program.display().to_string();

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Running {:?} in {}", cmd, dir.display());

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;

        // Readers own the pipes so the child can be killed while they run.
        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        match timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status.map_err(|source| CommandError::Spawn { program, source })?;
                let mut output = stdout.finish().await;
                output.push_str(&stderr.finish().await);
                Ok(CommandOutput { status, output })
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill {} after timeout: {}", program, e);
                }
                let mut output = stdout.contents();
                output.push_str(&stderr.contents());
                Err(CommandError::TimedOut {
                    program,
                    after: self.timeout,
                    output,
                })
            }
        }
    }
}

/// Drains one pipe into a shared buffer, so what was read survives even if
/// the reader never sees EOF.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else { return };
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buf, task }
    }

    async fn finish(mut self) -> String {
        let _ = (&mut self.task).await;
        self.contents()
    }

    fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Drop for Capture {
    // A grandchild can hold the pipe open after the child is killed.
    fn drop(&mut self) {
        self.task.abort();
    }
}
