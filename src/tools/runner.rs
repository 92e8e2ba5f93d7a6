/// Structured invocation of external command-line tools
///
/// Commands are built as a program plus an argument list and never pass
/// through a shell. `render` produces the human-readable form recorded in
/// reports.
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STDERR_TAIL: usize = 2000;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("`{program}` not found: {reason}")]
    NotFound { program: String, reason: String },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` did not finish within {seconds}s and was killed")]
    Timeout { program: String, seconds: u64 },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("I/O error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    stdout: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Send the tool's standard output to a file
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Shell-style rendering of the invocation
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 3);
        parts.push(quote(self.program.as_os_str()));
        parts.extend(self.args.iter().map(|a| quote(a)));
        if let Some(stdout) = &self.stdout {
            parts.push(">".to_string());
            parts.push(quote(stdout.as_os_str()));
        }
        parts.join(" ")
    }

    /// Run to completion, killing the process if `timeout` elapses first
    pub fn run(&self, timeout: Option<Duration>) -> Result<(), RunError> {
        let program = self.program.display().to_string();
        let executable = locate(&self.program).ok_or_else(|| RunError::NotFound {
            program: program.clone(),
            reason: if self.program.components().count() > 1 {
                "not an executable file".to_string()
            } else {
                "no executable of that name on PATH".to_string()
            },
        })?;
        let io_err = |source| RunError::Io {
            program: program.clone(),
            source,
        };

        let mut stderr_file = tempfile::tempfile().map_err(io_err)?;
        let stdout = match &self.stdout {
            Some(path) => Stdio::from(File::create(path).map_err(io_err)?),
            None => Stdio::null(),
        };

        debug!("Running: {}", self.render());
        let mut child = Command::new(&executable)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::from(stderr_file.try_clone().map_err(io_err)?))
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;

        let status = match timeout {
            None => child.wait().map_err(io_err)?,
            Some(limit) => {
                let start = Instant::now();
                loop {
                    if let Some(status) = child.try_wait().map_err(io_err)? {
                        break status;
                    }
                    if start.elapsed() >= limit {
                        warn!("{} exceeded {:?}, killing it", program, limit);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(RunError::Timeout {
                            program: program.clone(),
                            seconds: limit.as_secs(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        };

        if !status.success() {
            stderr_file.seek(SeekFrom::Start(0)).map_err(io_err)?;
            let mut bytes = Vec::new();
            stderr_file.read_to_end(&mut bytes).map_err(io_err)?;
            let stderr = String::from_utf8_lossy(&bytes);
            return Err(RunError::Failed {
                program: program.clone(),
                status,
                stderr: tail(stderr.trim(), STDERR_TAIL).to_string(),
            });
        }
        Ok(())
    }
}

/// Resolve `program` to an executable. Names containing a path separator are
/// checked as given, bare names are searched for on `PATH`.
pub fn locate(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_path_buf());
    }
    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// A private scratch directory for one tool invocation, removed on drop
pub fn staging_dir(root: Option<&Path>, label: &str) -> std::io::Result<TempDir> {
    let prefix = format!("odbgroup-{}-", sanitize(label));
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix);
    match root {
        Some(root) => {
            std::fs::create_dir_all(root)?;
            builder.tempdir_in(root)
        }
        None => builder.tempdir(),
    }
}

/// File-name-safe form of an identifier such as `9606_0:001c7b`
pub fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn quote(arg: &OsStr) -> String {
    let s = arg.to_string_lossy();
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,%@".contains(c));
    if plain {
        s.into_owned()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

fn tail(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
