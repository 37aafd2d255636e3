//! Nachrichtentypen des Chat-Relay-Protokolls
//!
//! Eingehend (Client -> Server): `join`, `message`.
//! Ausgehend (Server -> Client): `message`, `userCount`, `error`.
//!
//! Jede Nachricht traegt ein `type`-Feld als Tag. Payloads die nicht als
//! JSON parsbar sind oder einen unbekannten Tag tragen werden als
//! `ClientMessage::Unknown` geparst und vom Dispatcher verworfen – sie
//! duerfen den Server niemals zum Absturz bringen.

use serde::{Deserialize, Serialize};
use stammtisch_core::types::RoomId;

// ---------------------------------------------------------------------------
// Eingehende Nachrichten (Client -> Server)
// ---------------------------------------------------------------------------

/// Raum beitreten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Ziel-Raum (beliebiger nicht-leerer String, case-sensitiv)
    pub room_id: RoomId,
    /// Anzeigename im Raum
    pub username: String,
}

/// Chat-Nachricht an den aktuellen Raum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Roher Nachrichtentext – wird vom Server nie interpretiert
    pub message: String,
}

/// Alle moeglichen Client-Nachrichten (typsicher via Tagged Enum)
///
/// `Unknown` faengt unbekannte `type`-Tags ab; `parsen` bildet zusaetzlich
/// jeden Parse-Fehler (kein JSON, fehlende Felder) auf `Unknown` ab.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Join(JoinRequest),
    Message(ChatRequest),
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parst einen rohen Textframe in eine Client-Nachricht
    ///
    /// Gibt `Unknown` zurueck wenn der Frame kein gueltiges JSON ist,
    /// Pflichtfelder fehlen oder der `type`-Tag unbekannt ist.
    pub fn parsen(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or(Self::Unknown)
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten (Server -> Client)
// ---------------------------------------------------------------------------

/// Alle moeglichen Server-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Chat-Nachricht an alle Mitglieder des Raums
    #[serde(rename_all = "camelCase")]
    Message {
        room_id: RoomId,
        username: String,
        message: String,
        /// Mitgliederzahl des Raums zum Zeitpunkt des Fan-outs
        user_count: u32,
    },

    /// Praesenz-Update an alle Mitglieder des Raums (Join/Leave)
    #[serde(rename_all = "camelCase")]
    UserCount {
        room_id: RoomId,
        user_count: u32,
        /// Anzeigename des Verlassenden – nur bei Leave gesetzt
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username_left: Option<String>,
    },

    /// Fehler-Antwort, nur an die verursachende Verbindung
    Error { error: String },
}

impl ServerMessage {
    /// Erstellt eine Chat-Nachricht fuer den Fan-out
    pub fn chat(
        room_id: RoomId,
        username: impl Into<String>,
        message: impl Into<String>,
        user_count: u32,
    ) -> Self {
        Self::Message {
            room_id,
            username: username.into(),
            message: message.into(),
            user_count,
        }
    }

    /// Erstellt ein Mitgliederzahl-Update nach einem Join
    pub fn user_count(room_id: RoomId, user_count: u32) -> Self {
        Self::UserCount {
            room_id,
            user_count,
            username_left: None,
        }
    }

    /// Erstellt ein Mitgliederzahl-Update nach einem Leave
    pub fn user_count_nach_leave(
        room_id: RoomId,
        user_count: u32,
        username_left: impl Into<String>,
    ) -> Self {
        Self::UserCount {
            room_id,
            user_count,
            username_left: Some(username_left.into()),
        }
    }

    /// Erstellt eine Fehler-Antwort
    pub fn fehler(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
