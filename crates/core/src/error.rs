//! Fehlertypen fuer Stammtisch
//!
//! Zentraler Fehler-Enum fuer Fehlerzustaende die Crate-Grenzen
//! ueberschreiten. Transportnahe Fehler definiert der Relay selbst.

use thiserror::Error;

/// Globaler Result-Alias fuer Stammtisch
pub type Result<T> = std::result::Result<T, StammtischError>;

/// Crate-uebergreifende Fehler im Stammtisch-System
#[derive(Debug, Error)]
pub enum StammtischError {
    /// Konfigurationsdatei fehlerhaft oder nicht lesbar
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    /// Client-Limit erreicht, neue Verbindungen werden abgelehnt
    #[error("Server voll: maximale Clientanzahl erreicht")]
    ServerVoll,
}
