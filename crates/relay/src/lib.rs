//! stammtisch-relay – WebSocket Chat-Relay
//!
//! Dieser Crate implementiert den Kern des Chat-Relays: Clients treten
//! benannten Raeumen bei, tauschen Textnachrichten mit allen aktuellen
//! Mitgliedern aus und erhalten Praesenz-Updates (Join/Leave,
//! Mitgliederzahl).
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task, WebSocket-Handshake)
//!     |  State Machine: Unjoined -> Joined -> Unjoined -> ... -> Closed
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- join     -> RoomBroadcaster::beitreten
//!     +-- message  -> RoomBroadcaster::chat
//!     +-- Unknown  -> verworfen (geloggt)
//!
//! ConnectionRegistry – Send-Queues + Mitgliedschaft pro Verbindung
//! RoomBroadcaster    – Raum -> Mitglieder, Join/Leave/Fan-out unter einem Lock
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod rooms;
pub mod state;
pub mod ws;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{RelayError, RelayResult};
pub use registry::{ConnectionRegistry, STANDARD_SEND_QUEUE_GROESSE};
pub use rooms::RoomBroadcaster;
pub use state::{RelayConfig, RelayState};
pub use ws::RelayServer;
