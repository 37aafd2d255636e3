//! stammtisch-protocol – JSON-Wire-Protokoll
//!
//! Definiert alle Nachrichten die ueber die WebSocket-Verbindung zwischen
//! Client und Server ausgetauscht werden.
//!
//! ## Design
//! - JSON-Serialisierung via serde, Textframes auf dem WebSocket
//! - Tagged Enums (`type`-Feld) fuer typsichere Nachrichtentypen
//! - Feldnamen auf dem Wire sind camelCase (`roomId`, `userCount`),
//!   kompatibel zu bestehenden JavaScript-Clients
//! - Eingehende Nachrichten werden an der Grenze in einen geschlossenen
//!   Varianten-Typ geparst; alles Unbekannte landet in `Unknown` und
//!   erreicht die Kernlogik nie

pub mod messages;

// Bequeme Re-Exporte
pub use messages::{ChatRequest, ClientMessage, JoinRequest, ServerMessage};
