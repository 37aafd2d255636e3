//! Raum-Broadcaster – Join, Leave und Nachrichten-Fan-out
//!
//! Der `RoomBroadcaster` besitzt die Zuordnung Raum -> Mitglieder exklusiv
//! und ist die einzige Stelle, die sie veraendert. Raeume entstehen lazy
//! beim ersten Join und verschwinden sofort, wenn das letzte Mitglied geht.
//!
//! ## Locking
//! Die gesamte Raum-Tabelle liegt hinter einem einzigen Mutex. Jede
//! Read-Modify-Write-Sequenz (Join, Leave, Fan-out) laeuft komplett in
//! diesem kritischen Abschnitt, inklusive der Mitgliedschafts-Updates in
//! der Registry – beide Seiten bleiben so immer konsistent. Der Fan-out
//! selbst ist nicht-blockierend (`try_send` pro Peer), der Abschnitt wird
//! also nie von einem langsamen Client aufgehalten.

use parking_lot::Mutex;
use stammtisch_core::types::{ConnectionId, RoomId};
use stammtisch_protocol::ServerMessage;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::registry::{ConnectionRegistry, Membership};

/// Fehlertext wenn `message` vor einem erfolgreichen `join` eintrifft
const FEHLER_NICHT_BEIGETRETEN: &str =
    "You must join a room with a username before sending messages.";

/// Fehlertext fuer einen Join mit leerem Raum oder leerem Namen
const FEHLER_LEERE_FELDER: &str = "roomId and username must be non-empty strings.";

// ---------------------------------------------------------------------------
// RoomBroadcaster
// ---------------------------------------------------------------------------

/// Verwaltet Raum-Mitgliedschaften und verteilt Nachrichten
///
/// Thread-safe via Arc. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct RoomBroadcaster {
    inner: Arc<RoomBroadcasterInner>,
}

struct RoomBroadcasterInner {
    /// Registry mit Send-Queues und Mitgliedschafts-Seitentabelle
    registry: ConnectionRegistry,
    /// Raum -> Mitglieder. Invariante: jeder Eintrag ist nicht-leer.
    raeume: Mutex<HashMap<RoomId, HashSet<ConnectionId>>>,
}

impl RoomBroadcaster {
    /// Erstellt einen neuen RoomBroadcaster ueber der gegebenen Registry
    pub fn neu(registry: ConnectionRegistry) -> Self {
        Self {
            inner: Arc::new(RoomBroadcasterInner {
                registry,
                raeume: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Gibt die zugrundeliegende Registry zurueck
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    /// Verarbeitet einen Join: Raum ggf. anlegen, Mitglied eintragen,
    /// Mitgliederzahl an alle (inklusive Beitretendem) verteilen
    ///
    /// Ist die Verbindung bereits in einem *anderen* Raum, verlaesst sie
    /// diesen zuerst mit vollstaendiger Leave-Semantik (stille Migration).
    /// Ein erneuter Join in denselben Raum aktualisiert nur den
    /// Anzeigenamen und verteilt die Zahl erneut.
    pub fn beitreten(&self, verbindung: ConnectionId, room_id: RoomId, username: String) {
        if room_id.is_empty() || username.is_empty() {
            tracing::debug!(verbindung = %verbindung, "Join mit leeren Feldern abgelehnt");
            self.inner
                .registry
                .senden(&verbindung, ServerMessage::fehler(FEHLER_LEERE_FELDER));
            return;
        }

        let mut raeume = self.inner.raeume.lock();

        // Raumwechsel: alten Raum zuerst sauber verlassen
        if let Some(alte) = self.inner.registry.mitgliedschaft(&verbindung) {
            if alte.room_id != room_id {
                self.verlassen_unter_lock(&mut raeume, &verbindung);
            }
        }

        let mitglieder = raeume.entry(room_id.clone()).or_default();
        mitglieder.insert(verbindung);
        self.inner
            .registry
            .mitgliedschaft_setzen(&verbindung, room_id.clone(), username.clone());

        let anzahl = mitglieder.len() as u32;
        let update = ServerMessage::user_count(room_id.clone(), anzahl);
        for mitglied in mitglieder.iter() {
            self.inner.registry.senden(mitglied, update.clone());
        }

        tracing::info!(
            verbindung = %verbindung,
            raum = %room_id,
            benutzer = %username,
            mitglieder = anzahl,
            "Raum beigetreten"
        );
    }

    /// Verteilt eine Chat-Nachricht an alle aktuellen Mitglieder des Raums
    /// der sendenden Verbindung (inklusive Absender)
    ///
    /// Ohne Mitgliedschaft erhaelt nur der Absender eine Fehler-Antwort;
    /// es wird nichts verteilt. Der Fan-out iteriert einen Schnappschuss
    /// der Mitglieder unter dem Raum-Lock – waehrend des Fan-outs dazu-
    /// gekommene oder gegangene Mitglieder werden nicht halb beliefert.
    pub fn chat(&self, verbindung: ConnectionId, text: String) {
        let Some(Membership { room_id, username }) =
            self.inner.registry.mitgliedschaft(&verbindung)
        else {
            tracing::debug!(verbindung = %verbindung, "Chat ohne Raum-Mitgliedschaft abgelehnt");
            self.inner
                .registry
                .senden(&verbindung, ServerMessage::fehler(FEHLER_NICHT_BEIGETRETEN));
            return;
        };

        let raeume = self.inner.raeume.lock();
        let Some(mitglieder) = raeume.get(&room_id) else {
            // Darf nicht vorkommen: Mitgliedschaft und Raum-Tabelle werden
            // im selben kritischen Abschnitt gepflegt
            tracing::error!(
                verbindung = %verbindung,
                raum = %room_id,
                "Mitgliedschaft zeigt auf unbekannten Raum"
            );
            return;
        };

        let anzahl = mitglieder.len() as u32;
        let nachricht = ServerMessage::chat(room_id.clone(), username.clone(), text, anzahl);
        for mitglied in mitglieder.iter() {
            self.inner.registry.senden(mitglied, nachricht.clone());
        }

        tracing::debug!(
            verbindung = %verbindung,
            raum = %room_id,
            benutzer = %username,
            empfaenger = anzahl,
            "Nachricht verteilt"
        );
    }

    /// Verarbeitet einen Leave: Mitglied austragen, leeren Raum loeschen,
    /// verbleibende Mitglieder benachrichtigen
    ///
    /// Idempotent – ohne aktuelle Mitgliedschaft ist der Aufruf ein No-op.
    pub fn verlassen(&self, verbindung: &ConnectionId) {
        let mut raeume = self.inner.raeume.lock();
        self.verlassen_unter_lock(&mut raeume, verbindung);
    }

    /// Cleanup beim Transport-Close: implizites Leave plus Deregistrierung
    ///
    /// Wird fuer jede Verbindung genau am Ende ihres Tasks aufgerufen –
    /// auch fuer Verbindungen, die nie einem Raum beigetreten sind.
    pub fn geschlossen(&self, verbindung: &ConnectionId) {
        self.verlassen(verbindung);
        self.inner.registry.entfernen(verbindung);
    }

    /// Gibt die Anzahl der existierenden Raeume zurueck
    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.lock().len()
    }

    /// Gibt die Mitgliederzahl eines Raums zurueck (0 wenn unbekannt)
    pub fn mitglieder_anzahl(&self, room_id: &RoomId) -> usize {
        self.inner
            .raeume
            .lock()
            .get(room_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Prueft ob ein Raum existiert
    pub fn raum_existiert(&self, room_id: &RoomId) -> bool {
        self.inner.raeume.lock().contains_key(room_id)
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Leave-Semantik innerhalb des bereits gehaltenen Raum-Locks
    fn verlassen_unter_lock(
        &self,
        raeume: &mut HashMap<RoomId, HashSet<ConnectionId>>,
        verbindung: &ConnectionId,
    ) {
        let Some(Membership { room_id, username }) =
            self.inner.registry.mitgliedschaft_loeschen(verbindung)
        else {
            return;
        };

        let Some(mitglieder) = raeume.get_mut(&room_id) else {
            tracing::error!(
                verbindung = %verbindung,
                raum = %room_id,
                "Leave fuer unbekannten Raum"
            );
            return;
        };

        mitglieder.remove(verbindung);

        if mitglieder.is_empty() {
            // Niemand mehr zu benachrichtigen
            raeume.remove(&room_id);
            tracing::debug!(raum = %room_id, "Letztes Mitglied weg – Raum geloescht");
            return;
        }

        let anzahl = mitglieder.len() as u32;
        let update = ServerMessage::user_count_nach_leave(room_id.clone(), anzahl, username.clone());
        for mitglied in mitglieder.iter() {
            self.inner.registry.senden(mitglied, update.clone());
        }

        tracing::info!(
            verbindung = %verbindung,
            raum = %room_id,
            benutzer = %username,
            verbleibend = anzahl,
            "Raum verlassen"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    /// Baut Broadcaster plus eine registrierte Verbindung samt Empfangs-Queue
    fn verbindung_anlegen(
        broadcaster: &RoomBroadcaster,
    ) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let id = ConnectionId::new();
        let rx = broadcaster.registry().registrieren(id);
        (id, rx)
    }

    /// Leert die Empfangs-Queue und gibt alle Nachrichten zurueck
    fn abholen(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut nachrichten = Vec::new();
        while let Ok(n) = rx.try_recv() {
            nachrichten.push(n);
        }
        nachrichten
    }

    fn broadcaster() -> RoomBroadcaster {
        RoomBroadcaster::neu(ConnectionRegistry::default())
    }

    #[tokio::test]
    async fn join_erstellt_raum_lazy_und_verteilt_mitgliederzahl() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);

        assert!(!b.raum_existiert(&RoomId::from("raum1")));

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());

        assert!(b.raum_existiert(&RoomId::from("raum1")));
        assert_eq!(b.mitglieder_anzahl(&RoomId::from("raum1")), 1);
        assert_eq!(
            abholen(&mut rx_alice),
            vec![ServerMessage::user_count(RoomId::from("raum1"), 1)]
        );
    }

    #[tokio::test]
    async fn zweiter_join_informiert_alle_mitglieder() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);
        let (bob, mut rx_bob) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        abholen(&mut rx_alice);

        b.beitreten(bob, RoomId::from("raum1"), "bob".into());

        // Beide sehen die aktualisierte Zahl, inklusive des Beitretenden
        let erwartet = vec![ServerMessage::user_count(RoomId::from("raum1"), 2)];
        assert_eq!(abholen(&mut rx_alice), erwartet);
        assert_eq!(abholen(&mut rx_bob), erwartet);
    }

    #[tokio::test]
    async fn chat_fanout_an_alle_inklusive_absender() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);
        let (bob, mut rx_bob) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        b.beitreten(bob, RoomId::from("raum1"), "bob".into());
        abholen(&mut rx_alice);
        abholen(&mut rx_bob);

        b.chat(alice, "hi".into());

        let erwartet = vec![ServerMessage::chat(RoomId::from("raum1"), "alice", "hi", 2)];
        assert_eq!(abholen(&mut rx_alice), erwartet);
        assert_eq!(abholen(&mut rx_bob), erwartet);
    }

    #[tokio::test]
    async fn chat_vor_join_gibt_genau_einen_fehler_und_keinen_broadcast() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);
        let (bob, mut rx_bob) = verbindung_anlegen(&b);
        b.beitreten(bob, RoomId::from("raum1"), "bob".into());
        abholen(&mut rx_bob);

        b.chat(alice, "hi".into());

        let antworten = abholen(&mut rx_alice);
        assert_eq!(
            antworten,
            vec![ServerMessage::fehler(
                "You must join a room with a username before sending messages."
            )]
        );
        assert_eq!(abholen(&mut rx_bob), vec![], "kein Broadcast an Dritte");
    }

    #[tokio::test]
    async fn close_benachrichtigt_verbleibende_mit_username_left() {
        let b = broadcaster();
        let (alice, _rx_alice) = verbindung_anlegen(&b);
        let (bob, mut rx_bob) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        b.beitreten(bob, RoomId::from("raum1"), "bob".into());
        abholen(&mut rx_bob);

        b.geschlossen(&alice);

        assert_eq!(
            abholen(&mut rx_bob),
            vec![ServerMessage::user_count_nach_leave(
                RoomId::from("raum1"),
                1,
                "alice"
            )]
        );
        assert_eq!(b.mitglieder_anzahl(&RoomId::from("raum1")), 1);
        assert!(!b.registry().ist_registriert(&alice));
    }

    #[tokio::test]
    async fn letzter_leave_loescht_den_raum() {
        let b = broadcaster();
        let (alice, _rx_alice) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("r"), "a".into());
        assert_eq!(b.raum_anzahl(), 1);

        b.geschlossen(&alice);
        assert_eq!(b.raum_anzahl(), 0, "leerer Raum muss sofort verschwinden");

        // Neuer Join startet frisch bei 1, nicht bei 2
        let (carol, mut rx_carol) = verbindung_anlegen(&b);
        b.beitreten(carol, RoomId::from("r"), "c".into());
        assert_eq!(
            abholen(&mut rx_carol),
            vec![ServerMessage::user_count(RoomId::from("r"), 1)]
        );
    }

    #[tokio::test]
    async fn raumwechsel_verlaesst_alten_raum_zuerst() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);
        let (bob, mut rx_bob) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        b.beitreten(bob, RoomId::from("raum1"), "bob".into());
        abholen(&mut rx_alice);
        abholen(&mut rx_bob);

        b.beitreten(alice, RoomId::from("raum2"), "alice".into());

        // Alter Raum: Leave-Update an Bob, Zaehler dekrementiert
        assert_eq!(
            abholen(&mut rx_bob),
            vec![ServerMessage::user_count_nach_leave(
                RoomId::from("raum1"),
                1,
                "alice"
            )]
        );
        assert_eq!(b.mitglieder_anzahl(&RoomId::from("raum1")), 1);

        // Neuer Raum: Join-Update an Alice
        assert_eq!(
            abholen(&mut rx_alice),
            vec![ServerMessage::user_count(RoomId::from("raum2"), 1)]
        );
        assert_eq!(b.mitglieder_anzahl(&RoomId::from("raum2")), 1);
    }

    #[tokio::test]
    async fn rejoin_desselben_raums_aktualisiert_nur_den_namen() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        abholen(&mut rx_alice);

        b.beitreten(alice, RoomId::from("raum1"), "alicia".into());

        // Kein Leave-Update, nur die erneute Mitgliederzahl
        assert_eq!(
            abholen(&mut rx_alice),
            vec![ServerMessage::user_count(RoomId::from("raum1"), 1)]
        );
        assert_eq!(b.mitglieder_anzahl(&RoomId::from("raum1")), 1);
        let m = b.registry().mitgliedschaft(&alice).unwrap();
        assert_eq!(m.username, "alicia");
    }

    #[tokio::test]
    async fn doppeltes_verlassen_ist_idempotent() {
        let b = broadcaster();
        let (alice, _rx_alice) = verbindung_anlegen(&b);
        let (bob, mut rx_bob) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        b.beitreten(bob, RoomId::from("raum1"), "bob".into());
        abholen(&mut rx_bob);

        b.verlassen(&alice);
        abholen(&mut rx_bob);

        // Zweites Leave und nochmaliges Close: keine weiteren Broadcasts
        b.verlassen(&alice);
        b.geschlossen(&alice);
        assert_eq!(abholen(&mut rx_bob), vec![]);
    }

    #[tokio::test]
    async fn join_mit_leeren_feldern_wird_abgelehnt() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from(""), "alice".into());
        b.beitreten(alice, RoomId::from("raum1"), "".into());

        let antworten = abholen(&mut rx_alice);
        assert_eq!(antworten.len(), 2);
        assert!(antworten
            .iter()
            .all(|a| matches!(a, ServerMessage::Error { .. })));
        assert_eq!(b.raum_anzahl(), 0, "kein Raum darf entstanden sein");
        assert_eq!(b.registry().mitgliedschaft(&alice), None);
    }

    #[tokio::test]
    async fn toter_peer_blockiert_fanout_nicht() {
        let b = broadcaster();
        let (alice, mut rx_alice) = verbindung_anlegen(&b);
        let (bob, rx_bob) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        b.beitreten(bob, RoomId::from("raum1"), "bob".into());
        abholen(&mut rx_alice);

        // Bobs Queue ist tot – Alice muss trotzdem beliefert werden
        drop(rx_bob);
        b.chat(alice, "hi".into());

        assert_eq!(
            abholen(&mut rx_alice),
            vec![ServerMessage::chat(RoomId::from("raum1"), "alice", "hi", 2)]
        );
    }

    #[tokio::test]
    async fn volle_queue_eines_mitglieds_stoppt_fanout_nicht() {
        // Queue-Groesse 1: Bobs Queue ist nach seinem Join-Update voll
        let b = RoomBroadcaster::neu(ConnectionRegistry::neu(1));
        let (alice, mut rx_alice) = verbindung_anlegen(&b);
        let (bob, mut rx_bob) = verbindung_anlegen(&b);

        b.beitreten(alice, RoomId::from("raum1"), "alice".into());
        abholen(&mut rx_alice);
        b.beitreten(bob, RoomId::from("raum1"), "bob".into());
        abholen(&mut rx_alice);

        b.chat(alice, "hi".into());

        // Alice wird trotz Bobs voller Queue beliefert
        assert_eq!(
            abholen(&mut rx_alice),
            vec![ServerMessage::chat(RoomId::from("raum1"), "alice", "hi", 2)]
        );
        // Bob hat nur sein Join-Update, die Chat-Nachricht wurde verworfen
        assert_eq!(
            abholen(&mut rx_bob),
            vec![ServerMessage::user_count(RoomId::from("raum1"), 2)]
        );
    }

    #[tokio::test]
    async fn mitgliederzahl_entspricht_beigetretenen_verbindungen() {
        let b = broadcaster();
        let raum = RoomId::from("raum1");
        let mut verbindungen = Vec::new();

        // Invariante nach jeder Operation pruefen
        for i in 0..4 {
            let (id, _rx) = verbindung_anlegen(&b);
            b.beitreten(id, raum.clone(), format!("user{}", i));
            verbindungen.push((id, _rx));
            assert_eq!(b.mitglieder_anzahl(&raum), i + 1);
        }

        for (i, (id, _)) in verbindungen.iter().enumerate() {
            b.verlassen(id);
            assert_eq!(b.mitglieder_anzahl(&raum), 4 - i - 1);
        }

        assert!(!b.raum_existiert(&raum));
    }
}
