//! Verbindungs-Registry – Send-Queues und Mitgliedschaft pro Verbindung
//!
//! Die Registry verwaltet die Send-Queues aller verbundenen Clients sowie
//! die Raum-Mitgliedschaft jeder Verbindung als explizite Seitentabelle.
//! Raum und Anzeigename sind ein einziger optionaler Wert – eine Verbindung
//! ist damit immer atomar "beigetreten" oder "nicht beigetreten", niemals
//! halb.
//!
//! Die Registry kennt keine Raum-Semantik: Join/Leave/Fan-out laufen
//! ausschliesslich ueber den `RoomBroadcaster`, der die beiden Seiten
//! (Raum-Tabelle und Mitgliedschaft) im selben kritischen Abschnitt
//! aktualisiert.

use dashmap::DashMap;
use stammtisch_core::types::{ConnectionId, RoomId};
use stammtisch_protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Client (konfigurierbar via `[relay]`)
pub const STANDARD_SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// Mitgliedschaft
// ---------------------------------------------------------------------------

/// Raum-Mitgliedschaft einer Verbindung
///
/// Raum und Anzeigename werden nur gemeinsam gesetzt und geloescht.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: RoomId,
    pub username: String,
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    pub tx: mpsc::Sender<ServerMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    /// Ein langsamer oder toter Peer blockiert so niemals den Fan-out
    /// an die restlichen Mitglieder.
    pub fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    verbindung = %self.connection_id,
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    verbindung = %self.connection_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Eintrag einer registrierten Verbindung
#[derive(Debug)]
struct ConnectionEntry {
    sender: ClientSender,
    membership: Option<Membership>,
}

/// Registry aller lebenden Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<DashMap<ConnectionId, ConnectionEntry>>,
    queue_groesse: usize,
}

impl ConnectionRegistry {
    /// Erstellt eine neue, leere Registry mit der gegebenen Queue-Groesse
    pub fn neu(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            queue_groesse,
        }
    }

    /// Registriert eine neu aufgebaute Verbindung und gibt ihre
    /// Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und schreibt auf den
    /// WebSocket. Mitgliedschaft ist anfangs ungesetzt.
    pub fn registrieren(&self, verbindung: ConnectionId) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(self.queue_groesse);
        let sender = ClientSender {
            connection_id: verbindung,
            tx,
        };
        self.inner.insert(
            verbindung,
            ConnectionEntry {
                sender,
                membership: None,
            },
        );
        tracing::debug!(verbindung = %verbindung, "Verbindung registriert");
        rx
    }

    /// Entfernt eine Verbindung vollstaendig aus der Registry
    ///
    /// Idempotent – ein zweiter Aufruf fuer dieselbe Verbindung ist ein No-op.
    pub fn entfernen(&self, verbindung: &ConnectionId) {
        if self.inner.remove(verbindung).is_some() {
            tracing::debug!(verbindung = %verbindung, "Verbindung entfernt");
        }
    }

    /// Setzt Raum und Anzeigename einer Verbindung
    ///
    /// Reine Buchhaltung, keine Seiteneffekte. Ueberschreibt eine bereits
    /// vorhandene Mitgliedschaft.
    pub fn mitgliedschaft_setzen(
        &self,
        verbindung: &ConnectionId,
        room_id: RoomId,
        username: String,
    ) {
        if let Some(mut eintrag) = self.inner.get_mut(verbindung) {
            eintrag.membership = Some(Membership { room_id, username });
        }
    }

    /// Loescht die Mitgliedschaft einer Verbindung und gibt die alte zurueck
    pub fn mitgliedschaft_loeschen(&self, verbindung: &ConnectionId) -> Option<Membership> {
        self.inner
            .get_mut(verbindung)
            .and_then(|mut eintrag| eintrag.membership.take())
    }

    /// Gibt die aktuelle Mitgliedschaft einer Verbindung zurueck
    pub fn mitgliedschaft(&self, verbindung: &ConnectionId) -> Option<Membership> {
        self.inner.get(verbindung)?.membership.clone()
    }

    /// Sendet eine Nachricht nicht-blockierend an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Verbindung registriert ist und die
    /// Nachricht eingereiht wurde.
    pub fn senden(&self, verbindung: &ConnectionId, nachricht: ServerMessage) -> bool {
        match self.inner.get(verbindung) {
            Some(eintrag) => eintrag.sender.senden(nachricht),
            None => {
                tracing::debug!(verbindung = %verbindung, "Senden an unbekannte Verbindung");
                false
            }
        }
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, verbindung: &ConnectionId) -> bool {
        self.inner.contains_key(verbindung)
    }

    /// Gibt die Anzahl der registrierten Verbindungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::neu(STANDARD_SEND_QUEUE_GROESSE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
