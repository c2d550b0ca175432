//! Heuristik: "sieht das wie unser Envelope aus?"
//!
//! Keine Garantie. Lange Base64-artige Strings, die kein Envelope sind,
//! werden bewusst als Kandidat gemeldet; Aufrufer versuchen dann zu
//! entschluesseln und muessen den Fehlschlag akzeptieren.

use serde::{Deserialize, Serialize};

use crate::types::MIN_ENVELOPE_LEN;

/// Mindestlaenge eines Envelopes in Base64-Zeichen (44 Bytes -> 60 Zeichen)
pub const MIN_ENVELOPE_ZEICHEN: usize = MIN_ENVELOPE_LEN.div_ceil(3) * 4;

/// Mindestlaenge fuer den Fallback-Versuch
pub const MIN_FALLBACK_ZEICHEN: usize = 24;

/// Ergebnis der Klassifikation eines Nachrichteninhalts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiphertextHint {
    /// Kein Envelope, wird unveraendert angezeigt
    DefinitelyPlaintext,
    /// Standard-Base64 mit mindestens Envelope-Laenge
    LooksLikeEnvelope,
    /// Nach Normalisierung Base64-foermig, aber kein sicherer Treffer
    AmbiguousFallbackCandidate,
}

/// `true` wenn `text` Standard-Base64 ist und mindestens 60 Zeichen lang
pub fn is_encrypted(text: &str) -> bool {
    text.len() >= MIN_ENVELOPE_ZEICHEN && ist_base64_form(text)
}

/// Tri-State-Klassifikation eines Text-Inhalts
pub fn classify(text: &str) -> CiphertextHint {
    if is_encrypted(text) {
        return CiphertextHint::LooksLikeEnvelope;
    }
    let normalisiert = normalisieren(text);
    if normalisiert.len() >= MIN_FALLBACK_ZEICHEN && ist_base64_form(&normalisiert) {
        CiphertextHint::AmbiguousFallbackCandidate
    } else {
        CiphertextHint::DefinitelyPlaintext
    }
}

/// Entfernt umgebende Leerzeichen sowie Zeilenumbrueche und bildet das
/// URL-sichere Alphabet (`-_`) auf das Standard-Alphabet ab.
pub fn normalisieren(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect()
}

/// Base64-Alphabet, `=` nur als Padding am Ende (hoechstens zwei)
fn ist_base64_form(text: &str) -> bool {
    let ohne_padding = text.trim_end_matches('=');
    let padding = text.len() - ohne_padding.len();
    padding <= 2
        && !ohne_padding.is_empty()
        && ohne_padding
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
