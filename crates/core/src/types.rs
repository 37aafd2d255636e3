//! Gemeinsame Identifikationstypen fuer Stammtisch
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID
///
/// Wird serverseitig beim Akzeptieren der Transport-Verbindung vergeben.
/// Taucht nie auf dem Wire auf – Clients kennen ihre eigene ID nicht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Raum-Bezeichner
///
/// Extern vom Client vergeben: beliebiger nicht-leerer String,
/// case-sensitiv. Kein Newtype ueber UUID, weil die Raum-Identitaet
/// vollstaendig vom Client kommt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    /// Erstellt eine RoomId aus einem beliebigen String
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt den inneren String als Slice zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prueft ob der Bezeichner leer ist (ungueltig fuer Joins)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_eindeutig() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b, "Zwei neue ConnectionIds muessen verschieden sein");
    }

    #[test]
    fn room_id_case_sensitiv() {
        assert_ne!(RoomId::from("Lobby"), RoomId::from("lobby"));
        assert_eq!(RoomId::from("lobby"), RoomId::new("lobby"));
    }

    #[test]
    fn room_id_serialisiert_als_nackter_string() {
        let id = RoomId::from("raum1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"raum1\"");
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let cid = ConnectionId::new();
        let json = serde_json::to_string(&cid).unwrap();
        let cid2: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(cid, cid2);
    }
}
