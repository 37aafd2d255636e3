//! Fehlertypen fuer den Chat-Relay

use thiserror::Error;

/// Fehlertyp fuer den Chat-Relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket-Fehler (Handshake, Frame)
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Serialisierungsfehler (ausgehende Nachricht)
    #[error("Serialisierungsfehler: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result-Typ fuer den Chat-Relay
pub type RelayResult<T> = Result<T, RelayError>;
