//! Gemeinsamer Zustand des Chat-Relays
//!
//! Haelt Konfiguration, Registry und Broadcaster als geteilte Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use std::sync::Arc;

use crate::registry::{ConnectionRegistry, STANDARD_SEND_QUEUE_GROESSE};
use crate::rooms::RoomBroadcaster;

/// Konfiguration fuer den Chat-Relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Anzeigename des Servers (nur fuers Logging)
    pub server_name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
    /// Groesse der Send-Queue pro Client
    pub send_queue_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server_name: "Stammtisch Server".to_string(),
            max_clients: 512,
            send_queue_groesse: STANDARD_SEND_QUEUE_GROESSE,
        }
    }
}

/// Gemeinsamer Relay-Zustand (thread-safe, Arc-geteilt)
pub struct RelayState {
    /// Relay-Konfiguration
    pub config: Arc<RelayConfig>,
    /// Verbindungs-Registry (Send-Queues, Mitgliedschaft)
    pub registry: ConnectionRegistry,
    /// Raum-Broadcaster (Join/Leave/Fan-out)
    pub broadcaster: RoomBroadcaster,
}

impl RelayState {
    /// Erstellt einen neuen RelayState
    pub fn neu(config: RelayConfig) -> Arc<Self> {
        let registry = ConnectionRegistry::neu(config.send_queue_groesse);
        let broadcaster = RoomBroadcaster::neu(registry.clone());
        Arc::new(Self {
            config: Arc::new(config),
            registry,
            broadcaster,
        })
    }
}
