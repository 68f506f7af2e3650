//! WebSocket client session for connecting to the arena server

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{normalize_username, ClientMsg, ServerMsg};

use super::interpolation::Reconciler;

/// How long to wait for the server's welcome after the socket opens
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// Outgoing messages buffered before new ones are dropped
const OUTGOING_QUEUE_SIZE: usize = 64;

/// Client session errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to connect: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Server message could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Please enter a username")]
    EmptyUsername,

    #[error("Outgoing queue full")]
    QueueFull,

    #[error("Connection closed")]
    Closed,
}

type GameOverCallback = Arc<dyn Fn() + Send + Sync>;

const IDLE: u8 = 0;
/// JOIN_GAME sent, no snapshot yet
const JOINING: u8 = 1;
const PLAYING: u8 = 2;

/// Tracks the current life and fires the game-over callback once per join
#[derive(Clone)]
struct LifeState {
    state: Arc<AtomicU8>,
    callback: GameOverCallback,
}

impl LifeState {
    fn joining(&self) {
        self.state.store(JOINING, Ordering::SeqCst);
    }

    /// First snapshot after a join confirms the player exists
    fn confirm(&self) {
        let _ = self
            .state
            .compare_exchange(JOINING, PLAYING, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Join refused; nothing was alive, so no game over
    fn rejected(&self) -> bool {
        self.state
            .compare_exchange(JOINING, IDLE, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn is_playing(&self) -> bool {
        self.state.load(Ordering::SeqCst) == PLAYING
    }

    fn game_over(&self) {
        if self.state.swap(IDLE, Ordering::SeqCst) != IDLE {
            (self.callback)();
        }
    }
}

/// A live connection to the arena server.
///
/// Inbound snapshots are timestamped and buffered in the reconciler; nothing
/// here blocks the caller.
pub struct ClientSession {
    connection_id: Uuid,
    outgoing: mpsc::Sender<ClientMsg>,
    /// Latest steering direction; superseded values are never sent
    input: watch::Sender<Option<f32>>,
    reconciler: Arc<Mutex<Reconciler>>,
    life: LifeState,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ClientSession {
    /// Connect and wait for the server's welcome.
    ///
    /// `on_game_over` runs once each time the joined player dies or the
    /// connection drops while playing.
    pub async fn connect(
        url: &str,
        on_game_over: impl Fn() + Send + Sync + 'static,
    ) -> Result<Self, ClientError> {
        info!("Connecting to {}...", url);
        let (ws_stream, _) = connect_async(url).await?;
        let (mut write, mut read) = ws_stream.split();

        let first = tokio::time::timeout(HANDSHAKE_TIMEOUT, read.next())
            .await
            .map_err(|_| ClientError::Handshake("timed out waiting for welcome".to_string()))?;

        let connection_id = match first {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMsg>(&text)? {
                ServerMsg::Welcome { connection_id, .. } => connection_id,
                other => {
                    return Err(ClientError::Handshake(format!(
                        "expected welcome, got {other:?}"
                    )))
                }
            },
            Some(Ok(other)) => {
                return Err(ClientError::Handshake(format!(
                    "expected text frame, got {other:?}"
                )))
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ClientError::Closed),
        };

        info!(connection_id = %connection_id, "Connected to arena");

        let reconciler = Arc::new(Mutex::new(Reconciler::default()));
        let life = LifeState {
            state: Arc::new(AtomicU8::new(IDLE)),
            callback: Arc::new(on_game_over),
        };

        // Writer task: outgoing queue and latest input -> WebSocket
        let (outgoing, mut outgoing_rx) = mpsc::channel::<ClientMsg>(OUTGOING_QUEUE_SIZE);
        let (input, mut input_rx) = watch::channel::<Option<f32>>(None);
        let writer = tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    // Joins go out before any input queued behind them
                    biased;
                    msg = outgoing_rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                    changed = input_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let direction = *input_rx.borrow_and_update();
                        ClientMsg::Input { direction }
                    }
                };

                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode client message");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    debug!(error = %e, "WebSocket send failed");
                    break;
                }
            }
        });

        // Reader task: WebSocket -> snapshot buffer
        let reader_reconciler = reconciler.clone();
        let reader_life = life.clone();
        let reader = tokio::spawn(async move {
            while let Some(result) = read.next().await {
                match result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMsg>(&text) {
                        Ok(ServerMsg::GameUpdate(snapshot)) => {
                            reader_reconciler.lock().push(snapshot, Instant::now());
                            reader_life.confirm();
                        }
                        Ok(ServerMsg::GameOver) => {
                            info!("Server reported game over");
                            reader_life.game_over();
                        }
                        Ok(ServerMsg::Error { code, message }) => {
                            if reader_life.rejected() {
                                warn!(code = %code, "Join refused: {}", message);
                            } else {
                                warn!(code = %code, "Server error: {}", message);
                            }
                        }
                        Ok(ServerMsg::Welcome { .. }) => {
                            debug!("Ignoring repeated welcome");
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to parse server message");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("Server closed connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "WebSocket read error");
                        break;
                    }
                }
            }

            // A dropped connection ends the game too
            reader_life.game_over();
        });

        Ok(Self {
            connection_id,
            outgoing,
            input,
            reconciler,
            life,
            reader,
            writer,
        })
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Shared snapshot buffer, read by the frame loop
    pub fn reconciler(&self) -> Arc<Mutex<Reconciler>> {
        self.reconciler.clone()
    }

    /// False once the server side of the socket has gone away
    pub fn is_connected(&self) -> bool {
        !self.reader.is_finished()
    }

    /// True once the server has sent a snapshot for the current join
    pub fn is_in_game(&self) -> bool {
        self.life.is_playing()
    }

    /// Ask to enter the arena. Empty names never leave the client.
    pub fn join(&self, username: &str) -> Result<(), ClientError> {
        let username = normalize_username(username).ok_or(ClientError::EmptyUsername)?;

        self.reconciler.lock().reset();
        self.life.joining();
        self.send(ClientMsg::JoinGame { username }).map_err(|e| {
            self.life.rejected();
            e
        })
    }

    /// Fire-and-forget steering update. Only the newest direction is kept
    /// if the socket is slower than the caller.
    pub fn send_input(&self, direction: Option<f32>) {
        self.input.send_replace(direction);
    }

    pub fn send(&self, msg: ClientMsg) -> Result<(), ClientError> {
        if let ClientMsg::Input { direction } = msg {
            if self.writer.is_finished() {
                return Err(ClientError::Closed);
            }
            self.send_input(direction);
            return Ok(());
        }

        self.outgoing.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!("Outgoing queue full, dropping message");
                ClientError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => ClientError::Closed,
        })
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
