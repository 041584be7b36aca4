use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::error::IpfsError;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const STREAM_BUFFER: usize = 64 * 1024;
const MAX_CID_LEN: usize = 128;

/// Result of `ipfs add`: the content identifier and the bytes fed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    pub cid: String,
    pub size: u64,
}

/// Handle on the daemon CLI. Cheap to clone; holds no process or connection.
#[derive(Debug, Clone)]
pub struct IpfsClient {
    program: PathBuf,
    base_args: Vec<String>,
    probe_timeout: Duration,
}

impl IpfsClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Talk to a daemon at `multiaddr` instead of the local default.
    pub fn with_api(self, multiaddr: impl Into<String>) -> Self {
        self.with_base_args(["--api".to_string(), multiaddr.into()])
    }

    /// Arguments placed before every operation's own arguments.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// `ipfs add -q --pin=true`, feeding `body` to stdin while counting bytes.
    ///
    /// Exceeding `limit` or an error from `body` kills the process before it
    /// can finish the add.
    pub async fn add<S, E>(&self, body: S, limit: Option<u64>) -> Result<Added, IpfsError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
    {
        const OP: &str = "add";

        let mut child = self.spawn(OP, &["add", "-q", "--pin=true"], Stdio::piped())?;
        let mut stdin = child.stdin.take();
        let mut stdout = take_pipe(OP, child.stdout.take())?;
        let mut stderr = take_pipe(OP, child.stderr.take())?;
        let body = std::pin::pin!(body);

        let fed = tokio::try_join!(
            feed(&mut stdin, body, limit),
            read_pipe(OP, &mut stdout),
            read_pipe(OP, &mut stderr),
        );

        let (size, out, diagnostics) = match fed {
            Ok(parts) => parts,
            Err(e) if e.is_broken_pipe() => {
                // The daemon quit while we were still writing; its exit status explains why
                drop(stdin);
                let mut rest = String::new();
                let _ = stderr.read_to_string(&mut rest).await;
                let status = child.wait().await.map_err(IpfsError::io(OP))?;
                if status.success() {
                    return Err(e);
                }
                return Err(IpfsError::Exit {
                    op: OP,
                    status,
                    stderr: rest.trim().to_string(),
                });
            }
            Err(e) => {
                let _ = child.start_kill();
                drop(stdin);
                let _ = child.wait().await;
                return Err(e);
            }
        };

        let status = child.wait().await.map_err(IpfsError::io(OP))?;
        if !status.success() {
            return Err(IpfsError::Exit {
                op: OP,
                status,
                stderr: diagnostics.trim().to_string(),
            });
        }

        let cid = out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .ok_or(IpfsError::MissingCid)?
            .to_string();

        debug!(%cid, size, "ipfs add complete");
        Ok(Added { cid, size })
    }

    /// `ipfs cat <cid>`, buffered in memory.
    pub async fn cat(&self, cid: &str) -> Result<Bytes, IpfsError> {
        const OP: &str = "cat";

        check_cid(cid)?;
        let output = self
            .spawn(OP, &["cat", cid], Stdio::null())?
            .wait_with_output()
            .await
            .map_err(IpfsError::io(OP))?;

        if !output.status.success() {
            return Err(IpfsError::Exit {
                op: OP,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(Bytes::from(output.stdout))
    }

    /// `ipfs cat <cid>` as a byte stream.
    ///
    /// Spawn failures are returned up front. A non-zero exit shows up as the
    /// stream's final item. Dropping the stream kills the process.
    pub fn cat_stream(
        &self,
        cid: &str,
    ) -> Result<impl Stream<Item = io::Result<Bytes>> + Send + 'static, IpfsError> {
        const OP: &str = "cat";

        check_cid(cid)?;
        let mut child = self.spawn(OP, &["cat", cid], Stdio::null())?;
        let stdout = take_pipe(OP, child.stdout.take())?;
        let mut stderr = take_pipe(OP, child.stderr.take())?;
        let cid = cid.to_string();

        // Drained alongside stdout so a chatty daemon cannot fill the pipe and stall
        let diagnostics = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        Ok(async_stream::stream! {
            let mut chunks = ReaderStream::with_capacity(stdout, STREAM_BUFFER);
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(bytes) => yield Ok(bytes),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            let diagnostics = diagnostics.await.unwrap_or_default();

            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    warn!(%cid, %status, stderr = diagnostics.trim(), "ipfs cat failed");
                    yield Err(io::Error::other(format!(
                        "ipfs cat exited with {}: {}",
                        status,
                        diagnostics.trim()
                    )));
                }
                Err(e) => yield Err(e),
            }
        })
    }

    /// `ipfs pin add <cid>`
    pub async fn pin(&self, cid: &str) -> Result<(), IpfsError> {
        const OP: &str = "pin";

        check_cid(cid)?;
        let output = self
            .spawn(OP, &["pin", "add", cid], Stdio::null())?
            .wait_with_output()
            .await
            .map_err(IpfsError::io(OP))?;

        if !output.status.success() {
            return Err(IpfsError::Exit {
                op: OP,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(%cid, "ipfs pin complete");
        Ok(())
    }

    /// `ipfs id`, bounded by the probe timeout. Never errors: any failure,
    /// including a timeout, reads as "not connected".
    pub async fn is_online(&self) -> bool {
        let mut cmd = self.command(&["id"]);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!("ipfs id could not be spawned: {}", e);
                return false;
            }
        };

        match tokio::time::timeout(self.probe_timeout, child.wait()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                warn!("ipfs id wait failed: {}", e);
                false
            }
            Err(_) => {
                warn!("ipfs id timed out after {:?}", self.probe_timeout);
                let _ = child.kill().await;
                false
            }
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args).args(args).kill_on_drop(true);
        cmd
    }

    fn spawn(&self, op: &'static str, args: &[&str], stdin: Stdio) -> Result<Child, IpfsError> {
        self.command(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| IpfsError::Spawn {
                program: self.program.display().to_string(),
                op,
                source,
            })
    }
}

/// Identifiers handed to the CLI as arguments must be plain ASCII
/// alphanumerics so they can never be read as flags.
pub fn is_valid_cid(cid: &str) -> bool {
    !cid.is_empty() && cid.len() <= MAX_CID_LEN && cid.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn check_cid(cid: &str) -> Result<(), IpfsError> {
    if is_valid_cid(cid) {
        Ok(())
    } else {
        Err(IpfsError::InvalidCid(cid.to_string()))
    }
}

fn take_pipe<T>(op: &'static str, pipe: Option<T>) -> Result<T, IpfsError> {
    pipe.ok_or_else(|| IpfsError::Io {
        op,
        source: io::Error::other("child pipe was not captured"),
    })
}

/// Copy `body` into the daemon's stdin and close it. On error stdin stays
/// open so the caller can kill the process before it sees EOF.
async fn feed<S, E>(
    slot: &mut Option<ChildStdin>,
    mut body: Pin<&mut S>,
    limit: Option<u64>,
) -> Result<u64, IpfsError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let stdin = take_pipe("add", slot.as_mut())?;
    let mut received: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| IpfsError::Input(e.to_string()))?;
        received += chunk.len() as u64;

        if let Some(limit) = limit {
            if received > limit {
                return Err(IpfsError::TooLarge { limit });
            }
        }

        stdin.write_all(&chunk).await.map_err(IpfsError::io("add"))?;
    }

    stdin.flush().await.map_err(IpfsError::io("add"))?;
    slot.take();

    Ok(received)
}

async fn read_pipe<R>(op: &'static str, pipe: &mut R) -> Result<String, IpfsError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).await.map_err(IpfsError::io(op))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
