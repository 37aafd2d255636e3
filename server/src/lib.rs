//! stammtisch-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use stammtisch_relay::{RelayConfig, RelayServer, RelayState};
use std::net::SocketAddr;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Relay und laeuft bis zum Shutdown-Signal (Ctrl-C)
    pub async fn starten(self) -> Result<()> {
        let bind_addr: SocketAddr = self.config.ws_bind_adresse().parse()?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let state = RelayState::neu(RelayConfig {
            server_name: self.config.server.name.clone(),
            max_clients: self.config.server.max_clients,
            send_queue_groesse: self.config.relay.send_queue_groesse,
        });

        let relay = RelayServer::binden(state, bind_addr).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let relay_task = tokio::spawn(relay.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        shutdown_tx.send(true)?;
        relay_task.await??;

        Ok(())
    }
}
