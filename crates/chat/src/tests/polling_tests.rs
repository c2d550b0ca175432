//! Polling-Tests mit angehaltener Tokio-Uhr

use std::sync::atomic::Ordering;
use std::time::Duration;

use ourchat_core::NachrichtenTyp;
use ourchat_crypto::{CipherEngine, KeyMaterial};

use crate::error::ChatError;
use crate::render::Anzeige;
use crate::service::ChatKonfiguration;

use super::mock::{exchange_fuer, MockServer, ALICE, ALICE_KEY, BOB, CAROL};

fn abrufe(server: &MockServer) -> usize {
    server.nachrichten_abrufe.load(Ordering::SeqCst)
}

#[tokio::test(start_paused = true)]
async fn test_polling_holt_neue_nachrichten() {
    let server = MockServer::neu();
    let alice = exchange_fuer(&server, ALICE, ALICE_KEY, ChatKonfiguration::default());
    alice.konversation_oeffnen(BOB).await.unwrap();
    assert_eq!(abrufe(&server), 1);

    let envelope = CipherEngine::new()
        .encrypt("neu da", &KeyMaterial::new(ALICE_KEY))
        .unwrap();
    server.einfuegen(BOB, ALICE, NachrichtenTyp::Text, Some(&envelope));

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(abrufe(&server), 2);
    let ansicht = alice.ansicht();
    assert_eq!(ansicht.nachrichten.len(), 1);
    assert_eq!(
        ansicht.nachrichten[0].anzeige,
        Anzeige::Entschluesselt {
            text: "neu da".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_nur_ein_timer_nach_mehrfachem_oeffnen() {
    let server = MockServer::neu();
    let alice = exchange_fuer(&server, ALICE, ALICE_KEY, ChatKonfiguration::default());

    alice.konversation_oeffnen(BOB).await.unwrap();
    alice.konversation_oeffnen(CAROL).await.unwrap();
    alice.konversation_oeffnen(BOB).await.unwrap();
    assert_eq!(abrufe(&server), 3);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(abrufe(&server), 4);

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(abrufe(&server), 5);
}

#[tokio::test(start_paused = true)]
async fn test_logout_stoppt_polling() {
    let server = MockServer::neu();
    let alice = exchange_fuer(&server, ALICE, ALICE_KEY, ChatKonfiguration::default());
    alice.konversation_oeffnen(BOB).await.unwrap();
    assert!(alice.polling_aktiv());

    alice.abmelden();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(abrufe(&server), 1);
    assert!(!alice.polling_aktiv());
}

#[tokio::test(start_paused = true)]
async fn test_schliessen_stoppt_polling() {
    let server = MockServer::neu();
    let alice = exchange_fuer(&server, ALICE, ALICE_KEY, ChatKonfiguration::default());
    alice.konversation_oeffnen(BOB).await.unwrap();

    alice.konversation_schliessen();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(abrufe(&server), 1);
    assert_eq!(alice.ansicht().partner, None);
}

#[tokio::test(start_paused = true)]
async fn test_fehler_im_tick_beendet_polling_nicht() {
    let server = MockServer::neu();
    let alice = exchange_fuer(&server, ALICE, ALICE_KEY, ChatKonfiguration::default());
    alice.konversation_oeffnen(BOB).await.unwrap();

    server.laden_fehler.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(abrufe(&server), 2);
    assert!(alice.ansicht().nachrichten.is_empty());

    server.laden_fehler.store(false, Ordering::SeqCst);
    server.einfuegen(BOB, ALICE, NachrichtenTyp::Text, Some("wieder da"));
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(abrufe(&server), 3);
    assert_eq!(alice.ansicht().nachrichten.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fehlgeschlagenes_oeffnen_startet_polling_trotzdem() {
    let server = MockServer::neu();
    server.laden_fehler.store(true, Ordering::SeqCst);
    let alice = exchange_fuer(&server, ALICE, ALICE_KEY, ChatKonfiguration::default());

    let fehler = alice.konversation_oeffnen(BOB).await.unwrap_err();
    assert!(matches!(fehler, ChatError::Transport(_)));
    assert!(fehler.ist_wiederholbar());
    assert!(alice.polling_aktiv());
    assert!(alice.ansicht().laedt);

    server.laden_fehler.store(false, Ordering::SeqCst);
    server.einfuegen(BOB, ALICE, NachrichtenTyp::Text, Some("hallo"));
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let ansicht = alice.ansicht();
    assert!(!ansicht.laedt);
    assert_eq!(ansicht.nachrichten.len(), 1);
}
