//! Browser host over the native-messaging port

use async_trait::async_trait;
use focusward_api::{
    BrowserEvent, CommandResult, HostCommand, HostMessage, HostRequest, OverlayOutcome,
    OverlayRequest, TabObservation,
};
use focusward_host_api::{BrowserHost, HostError, HostResult};
use bytes::Bytes;
use focusward_util::{RequestId, TabId};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::{decode_message, encode_message, NativeCodec, NativeError};

type Pending = Arc<Mutex<HashMap<RequestId, oneshot::Sender<CommandResult>>>>;

/// [`BrowserHost`] speaking the native-messaging protocol.
///
/// A reader task routes replies to their waiting requests and forwards
/// events; a writer task serializes outgoing frames. When the browser
/// closes the port the event stream ends and every pending request fails.
pub struct NativeHost {
    frame_tx: mpsc::UnboundedSender<Bytes>,
    pending: Pending,
    event_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<BrowserEvent>>>,
    connected: Arc<AtomicBool>,
    request_timeout: Duration,
}

impl NativeHost {
    /// Start serving over arbitrary byte streams
    pub fn spawn<R, W>(reader: R, writer: W, request_timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        tokio::spawn(run_writer(writer, frame_rx, connected.clone()));
        tokio::spawn(run_reader(reader, pending.clone(), event_tx, connected.clone()));

        Self {
            frame_tx,
            pending,
            event_rx: std::sync::Mutex::new(Some(event_rx)),
            connected,
            request_timeout,
        }
    }

    /// Serve over this process's stdin/stdout, as launched by the browser
    pub fn stdio(request_timeout: Duration) -> Self {
        Self::spawn(tokio::io::stdin(), tokio::io::stdout(), request_timeout)
    }

    /// Send a command and wait for its result
    pub async fn request(&self, command: HostCommand) -> HostResult<CommandResult> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(HostError::Disconnected);
        }

        let request = HostRequest::new(command);
        let id = request.id;
        let name = request.command.name();
        let body = encode_message(&request).map_err(|e| HostError::Internal(e.to_string()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(id, reply_tx);

        if self.frame_tx.send(body).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(HostError::Disconnected);
        }

        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(HostError::Disconnected),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                debug!(request_id = %id, command = name, "Request timed out");
                Err(HostError::Timeout)
            }
        }
    }
}

async fn run_writer<W>(
    writer: W,
    mut frame_rx: mpsc::UnboundedReceiver<Bytes>,
    connected: Arc<AtomicBool>,
) where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, NativeCodec::new());
    while let Some(body) = frame_rx.recv().await {
        if let Err(e) = sink.send(body).await {
            error!(error = %e, "Failed to write to browser");
            break;
        }
    }
    connected.store(false, Ordering::SeqCst);
}

async fn run_reader<R>(
    reader: R,
    pending: Pending,
    event_tx: mpsc::UnboundedSender<BrowserEvent>,
    connected: Arc<AtomicBool>,
) where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, NativeCodec::new());
    loop {
        let body = match frames.next().await {
            Some(Ok(body)) => body,
            None => {
                info!("Browser closed the native port");
                break;
            }
            Some(Err(e)) => {
                error!(error = %e, "Failed to read from browser");
                break;
            }
        };

        match decode_message::<HostMessage>(&body) {
            Ok(HostMessage::Reply { id, result }) => match pending.lock().await.remove(&id) {
                Some(tx) => {
                    let _ = tx.send(result);
                }
                None => debug!(request_id = %id, "Dropping reply for unknown or expired request"),
            },
            Ok(HostMessage::Event { event }) => {
                if event_tx.send(event).is_err() {
                    debug!("No event consumer, dropping browser event");
                }
            }
            Err(NativeError::Json(e)) => {
                warn!(error = %e, "Ignoring malformed message from browser");
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable message from browser");
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    // Dropping the senders fails every waiting request
    pending.lock().await.clear();
}

fn unexpected(command: &str, result: CommandResult) -> HostError {
    match result {
        CommandResult::Failed { message } => HostError::Rejected(message),
        other => HostError::Internal(format!("Unexpected reply to {}: {:?}", command, other)),
    }
}

#[async_trait]
impl BrowserHost for NativeHost {
    async fn list_tabs(&self) -> HostResult<Vec<TabObservation>> {
        match self.request(HostCommand::ListTabs).await? {
            CommandResult::Tabs { tabs } => Ok(tabs),
            other => Err(unexpected("list_tabs", other)),
        }
    }

    async fn get_tab(&self, tab_id: TabId) -> HostResult<Option<TabObservation>> {
        match self.request(HostCommand::GetTab { tab_id }).await? {
            CommandResult::Tab { tab } => Ok(tab),
            other => Err(unexpected("get_tab", other)),
        }
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> HostResult<()> {
        let command = HostCommand::Navigate {
            tab_id,
            url: url.to_string(),
        };
        match self.request(command).await? {
            CommandResult::Done => Ok(()),
            other => Err(unexpected("navigate", other)),
        }
    }

    async fn overlay(&self, tab_id: TabId, request: OverlayRequest) -> OverlayOutcome {
        let name = request.name();
        match self.request(HostCommand::Overlay { tab_id, request }).await {
            Ok(CommandResult::Overlay { reply }) => OverlayOutcome::Ok(reply),
            Ok(other) => {
                debug!(tab_id = %tab_id, message = name, result = ?other, "Overlay unreachable");
                OverlayOutcome::Unreachable
            }
            Err(e) => {
                debug!(tab_id = %tab_id, message = name, error = %e, "Overlay unreachable");
                OverlayOutcome::Unreachable
            }
        }
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<BrowserEvent>> {
        self.event_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    fn is_healthy(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
