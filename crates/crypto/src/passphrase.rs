//! Erzeugung und Pruefung von Key Material im Format `wort-wort-wort-1234`
//!
//! Drei Woerter aus einer festen Liste (mit Zuruecklegen) plus vier
//! Ziffern, alles aus dem OS-Zufallsgenerator.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::KeyMaterial;

/// Feste Wortliste fuer Passphrasen
pub static WORTLISTE: [&str; 54] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
    "uniform", "victor", "whiskey", "xray", "yankee", "zulu", "ocean", "river", "mountain",
    "forest", "desert", "valley", "castle", "bridge", "tower", "garden", "island", "harbor",
    "meadow", "canyon", "storm", "thunder", "lightning", "rainbow", "sunrise", "sunset",
    "moonlight", "starlight", "comet", "galaxy", "planet", "asteroid", "nebula", "cosmic",
];

const ANZAHL_WOERTER: usize = 3;
const ANZAHL_ZIFFERN: usize = 4;

/// Erzeugt neues Key Material fuer einen Benutzer
pub fn generate_passphrase() -> KeyMaterial {
    let mut rng = OsRng;
    let mut teile: Vec<String> = (0..ANZAHL_WOERTER)
        .filter_map(|_| WORTLISTE.choose(&mut rng).map(|w| (*w).to_string()))
        .collect();
    let ziffern: String = (0..ANZAHL_ZIFFERN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    teile.push(ziffern);
    KeyMaterial::new(teile.join("-"))
}

/// Prueft das Format `wort-wort-wort-dddd`
pub fn is_valid_passphrase(text: &str) -> bool {
    let teile: Vec<&str> = text.split('-').collect();
    let Some((ziffern, woerter)) = teile.split_last() else {
        return false;
    };

    woerter.len() == ANZAHL_WOERTER
        && woerter
            .iter()
            .all(|w| !w.is_empty() && w.bytes().all(|b| b.is_ascii_lowercase()))
        && ziffern.len() == ANZAHL_ZIFFERN
        && ziffern.bytes().all(|b| b.is_ascii_digit())
}
