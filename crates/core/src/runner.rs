use std::{
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};

/// Name looked up on PATH when nothing better is available.
pub const BINARY_NAME: &str = "ffmpeg";

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-stream ceiling on captured subprocess output.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("{binary} is unavailable: {reason}")]
    Unavailable { binary: PathBuf, reason: String },

    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    ExecutionFailed {
        binary: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{binary} did not finish within {timeout:?}")]
    TimedOut { binary: PathBuf, timeout: Duration },

    #[error("{binary} produced more than {limit} bytes of output")]
    OutputLimitExceeded { binary: PathBuf, limit: usize },

    #[error("I/O error while talking to {binary}: {source}")]
    Io {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the binary path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySource {
    Override,
    Bundled,
    SystemPath,
}

impl fmt::Display for BinarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinarySource::Override => "override",
            BinarySource::Bundled => "bundled",
            BinarySource::SystemPath => "system-path",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub max_output_bytes: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[derive(Debug)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs the transcoding executable with an argument vector. Nothing goes
/// through a shell.
#[derive(Debug, Clone)]
pub struct BinaryRunner {
    binary: PathBuf,
    source: BinarySource,
    probe_timeout: Duration,
}

impl BinaryRunner {
    /// Resolve the binary: explicit override, then a copy shipped next to the
    /// running executable, then `ffmpeg` on PATH.
    pub fn resolve(override_path: Option<PathBuf>) -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::resolve_in(override_path, exe_dir.as_deref())
    }

    /// Same order as [`BinaryRunner::resolve`], with the bundled copy looked up
    /// in `exe_dir` instead of the running executable's directory.
    pub fn resolve_in(override_path: Option<PathBuf>, exe_dir: Option<&Path>) -> Self {
        if let Some(path) = override_path {
            return Self::new(path, BinarySource::Override);
        }

        if let Some(path) = exe_dir.and_then(bundled_binary_path) {
            return Self::new(path, BinarySource::Bundled);
        }

        Self::new(PathBuf::from(BINARY_NAME), BinarySource::SystemPath)
    }

    pub fn new(binary: PathBuf, source: BinarySource) -> Self {
        Self {
            binary,
            source,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn source(&self) -> BinarySource {
        self.source
    }

    /// Probe the binary with `-version`. Returns the first line of its output.
    pub async fn check_available(&self) -> Result<String, RunnerError> {
        let options = RunOptions {
            timeout: Some(self.probe_timeout),
            ..RunOptions::default()
        };

        let output = self
            .run(["-version"], options)
            .await
            .map_err(|e| RunnerError::Unavailable {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(version)
    }

    pub async fn run<I, S>(&self, args: I, options: RunOptions) -> Result<RunOutput, RunnerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = options.max_output_bytes;
        let binary = self.binary.clone();

        // The child moves into the future so that dropping it on timeout kills
        // the process.
        let execution = async move {
            let (stdout, stderr) = tokio::try_join!(
                read_capped(stdout, limit, &binary),
                read_capped(stderr, limit, &binary),
            )?;
            let status = child.wait().await.map_err(|source| RunnerError::Io {
                binary: binary.clone(),
                source,
            })?;
            Ok::<_, RunnerError>((status, stdout, stderr))
        };

        let (status, stdout, stderr) = match options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, execution)
                .await
                .map_err(|_| RunnerError::TimedOut {
                    binary: self.binary.clone(),
                    timeout,
                })??,
            None => execution.await?,
        };

        if !status.success() {
            return Err(RunnerError::ExecutionFailed {
                binary: self.binary.clone(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(RunOutput { stdout, stderr })
    }
}

fn bundled_binary_path(exe_dir: &Path) -> Option<PathBuf> {
    let candidate = exe_dir.join(format!("{}{}", BINARY_NAME, std::env::consts::EXE_SUFFIX));
    candidate.is_file().then_some(candidate)
}

async fn read_capped<R>(
    reader: Option<R>,
    limit: usize,
    binary: &Path,
) -> Result<Vec<u8>, RunnerError>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut buf)
        .await
        .map_err(|source| RunnerError::Io {
            binary: binary.to_path_buf(),
            source,
        })?;

    if buf.len() > limit {
        return Err(RunnerError::OutputLimitExceeded {
            binary: binary.to_path_buf(),
            limit,
        });
    }

    Ok(buf)
}
