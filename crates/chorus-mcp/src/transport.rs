//! Stdio Transport
//!
//! Multiplexes concurrent JSON-RPC requests over one child process. Each
//! request gets a fresh integer id and a private oneshot slot in the pending
//! table; a single reader task routes responses back by id. A single writer
//! task owns the provider's stdin and writes whole frames taken from a
//! channel, so a caller that stops waiting can never leave half a frame
//! behind.
//!
//! Every slot leaves the table exactly once: when its response arrives, when
//! its caller stops waiting, or when the transport shuts down and fails it
//! with [`McpError::Closed`].

use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chorus_core::observe::{Event, Observer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{McpError, Result};
use crate::protocol::{Incoming, JSONRPC_VERSION, NotificationFrame, RequestFrame, classify};

/// How to start a tool provider process
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for the child
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Command line, for logs
    pub fn label(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

type Slot = oneshot::Sender<Result<Value>>;

#[derive(Default)]
struct PendingTable {
    entries: HashMap<u64, Slot>,
    closed: bool,
}

/// State shared between callers and the reader task
struct Shared {
    label: String,
    pending: Mutex<PendingTable>,
    observer: Arc<dyn Observer>,
}

impl Shared {
    fn table(&self) -> MutexGuard<'_, PendingTable> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: u64, slot: Slot) -> Result<()> {
        let mut table = self.table();
        if table.closed {
            return Err(McpError::Closed);
        }
        table.entries.insert(id, slot);
        Ok(())
    }

    /// Deliver `outcome` to `id`; false if nobody is waiting for it
    fn complete(&self, id: u64, outcome: Result<Value>) -> bool {
        let slot = self.table().entries.remove(&id);
        // a caller that already gave up dropped its receiver; that's fine
        slot.map(|slot| slot.send(outcome)).is_some()
    }

    fn remove(&self, id: u64) {
        self.table().entries.remove(&id);
    }

    /// Close the table and fail everything still pending
    fn fail_all(&self) {
        let drained: Vec<Slot> = {
            let mut table = self.table();
            table.closed = true;
            table.entries.drain().map(|(_, slot)| slot).collect()
        };
        if !drained.is_empty() {
            tracing::debug!(provider = %self.label, pending = drained.len(), "Failing pending requests");
        }
        for slot in drained {
            let _ = slot.send(Err(McpError::Closed));
        }
    }

    fn discard(&self, reason: &str) {
        self.observer.on_event(&Event::FrameDiscarded {
            source: &self.label,
            reason,
        });
    }
}

/// Removes its entry when the owning `send` finishes or is dropped
struct PendingGuard<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.remove(self.id);
    }
}

/// Frames queued ahead of the writer task
const WRITE_QUEUE: usize = 256;

/// One complete newline-terminated frame and where to report the write
struct Outgoing {
    line: Vec<u8>,
    written: oneshot::Sender<std::io::Result<()>>,
}

/// JSON-RPC channel to one tool provider
pub struct Transport {
    shared: Arc<Shared>,
    frames: mpsc::Sender<Outgoing>,
    next_id: AtomicU64,
    child: tokio::sync::Mutex<Option<Child>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    stderr: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("label", &self.shared.label)
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Start the provider process and attach to its stdio
    pub fn spawn(config: &ServerConfig, observer: Arc<dyn Observer>) -> Result<Self> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(McpError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(McpError::MissingPipe("stdout"))?;

        let mut transport = Self::from_streams(config.label(), stdout, stdin, observer);
        if let Some(stderr) = child.stderr.take() {
            transport.stderr = Some(tokio::spawn(drain_stderr(
                stderr,
                Arc::clone(&transport.shared),
            )));
        }
        transport.child = tokio::sync::Mutex::new(Some(child));

        tracing::info!(provider = %transport.shared.label, "Tool provider started");
        Ok(transport)
    }

    /// Run the protocol over arbitrary byte streams. Must be called inside a
    /// tokio runtime.
    pub fn from_streams<R, W>(
        label: impl Into<String>,
        reader: R,
        writer: W,
        observer: Arc<dyn Observer>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Shared {
            label: label.into(),
            pending: Mutex::new(PendingTable::default()),
            observer,
        });
        let reader = tokio::spawn(read_loop(BufReader::new(reader), Arc::clone(&shared)));
        let (frames, queue) = mpsc::channel(WRITE_QUEUE);
        let writer = tokio::spawn(write_loop(writer, queue, Arc::clone(&shared)));

        Self {
            shared,
            frames,
            next_id: AtomicU64::new(1),
            child: tokio::sync::Mutex::new(None),
            reader,
            writer,
            stderr: None,
        }
    }

    /// Send a request and wait for its result.
    ///
    /// Dropping the returned future before it resolves releases the pending
    /// slot.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.insert(id, tx)?;
        let _guard = PendingGuard {
            shared: &self.shared,
            id,
        };

        let frame = RequestFrame {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: &params,
            id,
        };
        self.write_frame(&frame).await?;
        tracing::trace!(provider = %self.shared.label, id, method, "Request sent");

        rx.await.unwrap_or(Err(McpError::Closed))
    }

    /// Send a notification; there is no response
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }
        let frame = NotificationFrame {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: params.as_ref(),
        };
        self.write_frame(&frame).await
    }

    /// Queue a whole frame for the writer task and wait until it is flushed.
    ///
    /// Once queued the frame is written in full even if this future is
    /// dropped.
    async fn write_frame<T: Serialize>(&self, frame: &T) -> Result<()> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');

        if self.is_closed() {
            return Err(McpError::Closed);
        }
        let (written, done) = oneshot::channel();
        self.frames
            .send(Outgoing { line, written })
            .await
            .map_err(|_| McpError::Closed)?;
        match done.await {
            Ok(result) => result.map_err(McpError::Write),
            Err(_) => Err(McpError::Closed),
        }
    }

    /// Kill the provider and fail every outstanding request
    pub async fn close(&self) {
        self.shared.fail_all();
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(provider = %self.shared.label, error = %e, "Failed to kill tool provider");
            }
        }
        self.reader.abort();
        self.writer.abort();
        if let Some(stderr) = &self.stderr {
            stderr.abort();
        }
        tracing::info!(provider = %self.shared.label, "Tool provider closed");
    }

    /// Requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.shared.table().entries.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.table().closed
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shared.fail_all();
        self.reader.abort();
        self.writer.abort();
        if let Some(stderr) = &self.stderr {
            stderr.abort();
        }
    }
}

async fn write_loop<W>(mut writer: W, mut queue: mpsc::Receiver<Outgoing>, shared: Arc<Shared>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(Outgoing { line, written }) = queue.recv().await {
        let mut result = writer.write_all(&line).await;
        if result.is_ok() {
            result = writer.flush().await;
        }
        let failed = result.is_err();
        if let Err(error) = &result {
            tracing::warn!(provider = %shared.label, %error, "Tool provider write failed");
            shared.fail_all();
        }
        // the caller may have stopped waiting; the frame is out either way
        let _ = written.send(result);
        if failed {
            break;
        }
    }
}

async fn read_loop<R>(mut reader: BufReader<R>, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(provider = %shared.label, error = %e, "Tool provider read failed");
                break;
            }
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match classify(&line) {
            Incoming::Response { id, outcome } => {
                if !shared.complete(id, outcome) {
                    shared.discard("no pending request with this id");
                }
            }
            Incoming::Discard(reason) => shared.discard(reason),
        }
    }

    tracing::debug!(provider = %shared.label, "Tool provider output closed");
    shared.fail_all();
}

async fn drain_stderr<R>(stderr: R, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        shared.observer.on_event(&Event::ProviderStderr {
            source: &shared.label,
            line: &line,
        });
    }
}
