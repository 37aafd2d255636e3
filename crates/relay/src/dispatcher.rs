//! Message-Dispatcher – Routet eingehende Frames an den RoomBroadcaster
//!
//! Der Dispatcher parst rohe Textframes an der Systemgrenze in den
//! geschlossenen `ClientMessage`-Typ und routet die Varianten an die
//! Kern-Operationen. `Unknown` (kein JSON, fehlende Felder, unbekannter
//! `type`-Tag) wird geloggt und verworfen – fehlerhafte Eingaben duerfen
//! weder den Server noch fremde Verbindungen beeintraechtigen.

use stammtisch_core::types::ConnectionId;
use stammtisch_protocol::ClientMessage;

use crate::rooms::RoomBroadcaster;

/// Zentraler Message-Dispatcher
///
/// Zustandslos bis auf den geteilten Broadcaster; ein Clone pro
/// Verbindungs-Task.
#[derive(Clone)]
pub struct MessageDispatcher {
    broadcaster: RoomBroadcaster,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(broadcaster: RoomBroadcaster) -> Self {
        Self { broadcaster }
    }

    /// Verarbeitet einen rohen Textframe einer Verbindung
    pub fn dispatch(&self, verbindung: ConnectionId, text: &str) {
        match ClientMessage::parsen(text) {
            ClientMessage::Join(anfrage) => {
                self.broadcaster
                    .beitreten(verbindung, anfrage.room_id, anfrage.username);
            }
            ClientMessage::Message(anfrage) => {
                self.broadcaster.chat(verbindung, anfrage.message);
            }
            ClientMessage::Unknown => {
                tracing::debug!(
                    verbindung = %verbindung,
                    "Unbekannte oder ungueltige Nachricht ignoriert"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
