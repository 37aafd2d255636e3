//! Client-Verbindung – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede akzeptierte TCP-Verbindung bekommt eine `ClientConnection` in einem
//! eigenen tokio-Task: WebSocket-Handshake, Leseschleife fuer eingehende
//! Frames, Schreibseite fuer die Send-Queue aus der Registry.
//!
//! ## State Machine
//! ```text
//! Unjoined -> Joined -> Unjoined -> (erneut Joined) -> Closed
//! ```
//! Der Uebergang nach `Closed` laeuft immer ueber `geschlossen()` –
//! implizites Leave plus Deregistrierung – bevor der Task endet. Eine
//! Verbindung ohne dieses Cleanup waere ein Ressourcen-Leck: ihr Raum
//! wuerde nie leer und damit nie geloescht.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use stammtisch_core::types::ConnectionId;
use stammtisch_protocol::ServerMessage;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::dispatcher::MessageDispatcher;
use crate::error::RelayResult;
use crate::state::RelayState;

/// Schreibseite der WebSocket-Verbindung
type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Verarbeitet eine einzelne WebSocket-Verbindung
///
/// Liest Textframes, dispatcht an den `MessageDispatcher` und leitet
/// Nachrichten aus der Send-Queue an den Client weiter. Laeuft in einem
/// eigenen tokio-Task.
pub struct ClientConnection {
    state: Arc<RelayState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<RelayState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Diese Methode laeuft bis die Verbindung getrennt wird oder ein
    /// Shutdown-Signal eingeht. Das Close-Cleanup laeuft in jedem Fall.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;

        // WebSocket-Handshake
        let ws = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(peer = %peer_addr, fehler = %e, "WebSocket-Handshake fehlgeschlagen");
                return;
            }
        };

        let verbindung = ConnectionId::new();
        let mut sende_rx = self.state.registry.registrieren(verbindung);
        let dispatcher = MessageDispatcher::neu(self.state.broadcaster.clone());
        let (mut sink, mut strom) = ws.split();

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Neue Verbindung");

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = strom.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            tracing::trace!(verbindung = %verbindung, "Frame empfangen");
                            dispatcher.dispatch(verbindung, &text);
                        }
                        Some(Ok(Message::Ping(daten))) => {
                            if let Err(e) = sink.send(Message::Pong(daten)).await {
                                tracing::warn!(peer = %peer_addr, fehler = %e, "Pong-Senden fehlgeschlagen");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::debug!(peer = %peer_addr, "Close-Frame empfangen");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Binary/Pong sind kein Teil des Protokolls
                            tracing::trace!(verbindung = %verbindung, "Nicht-Text-Frame ignoriert");
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus der Send-Queue
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = Self::senden(&mut sink, &ausgehend).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende – implizites Leave, immer ausgefuehrt
        self.state.broadcaster.geschlossen(&verbindung);

        tracing::info!(peer = %peer_addr, verbindung = %verbindung, "Verbindungs-Task beendet");
    }

    /// Serialisiert eine Nachricht und schreibt sie als Textframe
    async fn senden(sink: &mut WsSink, nachricht: &ServerMessage) -> RelayResult<()> {
        let json = nachricht.to_json()?;
        sink.send(Message::Text(json)).await?;
        Ok(())
    }
}
