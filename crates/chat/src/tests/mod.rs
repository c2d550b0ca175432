//! Tests fuer Verzeichnis, Nachrichten-Austausch und Polling

mod polling_tests;
