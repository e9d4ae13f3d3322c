use anyhow::{anyhow, Context, Result};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs one external CLI (`git`, `oc`, `gh`) with a fixed working directory
/// and wall-clock timeout.
#[derive(Debug, Clone)]
pub struct Tool {
    exe: PathBuf,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl Tool {
    pub fn new(exe: impl Into<PathBuf>, timeout_seconds: u64) -> Self {
        Self {
            exe: exe.into(),
            cwd: None,
            timeout: Duration::from_secs(timeout_seconds.max(1)),
        }
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Runs the tool and returns its stdout; a non-zero exit is an error
    /// carrying stderr.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        self.run_with_stdin(args, None)
    }

    pub fn run_with_stdin(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<String> {
        let label = format!("{} {}", self.exe.display(), args.join(" "));
        debug!("exec {label} timeout={:?}", self.timeout);

        let mut cmd = Command::new(&self.exe);
        cmd.args(args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.exe.display()))?;

        if let Some(bytes) = stdin {
            let mut pipe = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            pipe.write_all(bytes)?;
            pipe.flush().ok();
        }

        let output = wait_with_timeout(&mut child, self.timeout, &label)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{label} exited with {}: {}", output.status, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

/// Reads a child pipe to the end on its own thread so the child never blocks
/// on a full pipe buffer.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(handle: Drain, stream: &str, label: &str) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow!("{stream} reader for {label} panicked"))?
        .with_context(|| format!("reading {stream} of {label}"))
}

fn wait_with_timeout(child: &mut Child, timeout: Duration, label: &str) -> Result<Output> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait().with_context(|| format!("polling {label}"))? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!("{label} still running after {timeout:?}; killing it");
            if let Err(err) = child.kill() {
                debug!("kill {label}: {err}");
            }
            child.wait().with_context(|| format!("reaping {label}"))?;
            let stderr = collect(stderr, "stderr", label).unwrap_or_default();
            if let Err(err) = collect(stdout, "stdout", label) {
                debug!("discarding stdout of killed {label}: {err:#}");
            }
            return Err(anyhow!(
                "{label} timed out after {timeout:?}; stderr: {}",
                String::from_utf8_lossy(&stderr).trim()
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: collect(stdout, "stdout", label)?,
        stderr: collect(stderr, "stderr", label)?,
    })
}
