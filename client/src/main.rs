//! OurChat Terminal-Client – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt den
//! gewaehlten Befehl aus.

use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ourchat_client::config::{ClientConfig, Herkunft};
use ourchat_client::logging::logging_initialisieren;
use ourchat_client::terminal::{self, ChatAnfrage};
use ourchat_core::UserId;
use ourchat_crypto::{generate_passphrase, CipherEngine};

/// OurChat Terminal-Client
#[derive(Parser, Debug)]
#[command(name = "ourchat-client")]
#[command(about = "Ende-zu-Ende-verschluesselter Chat im Terminal")]
#[command(version)]
struct Args {
    /// Pfad zur Konfigurationsdatei
    #[arg(short, long, env = "OURCHAT_CONFIG", default_value = "ourchat.toml")]
    config: String,

    #[command(subcommand)]
    befehl: Befehl,
}

#[derive(Subcommand, Debug)]
enum Befehl {
    /// Anmelden und mit einem Kontakt chatten
    Chat {
        /// Benutzername
        #[arg(short, long)]
        benutzer: String,
        /// Benutzer-ID des Gespraechspartners
        #[arg(short, long)]
        partner: i64,
        /// Passwort (sonst interaktive Abfrage)
        #[arg(long, env = "OURCHAT_PASSWORT", hide_env_values = true)]
        passwort: Option<String>,
    },
    /// Neues Key Material fuer ein Benutzerkonto erzeugen
    Passphrase {
        /// Anzahl der Passphrasen
        #[arg(short, long, default_value_t = 1)]
        anzahl: usize,
    },
    /// Prueft, ob ein Text wie ein verschluesselter Envelope aussieht
    Pruefen { text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let (config, herkunft) = ClientConfig::laden(&args.config)?;

    logging_initialisieren(&config.logging)?;

    if herkunft == Herkunft::Standardwerte {
        tracing::warn!(
            pfad = %args.config,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config,
        "OurChat Client wird gestartet"
    );

    match args.befehl {
        Befehl::Chat {
            benutzer,
            partner,
            passwort,
        } => {
            let passwort = match passwort {
                Some(p) => p,
                None => passwort_abfragen()?,
            };
            terminal::chat_ausfuehren(
                &config,
                ChatAnfrage {
                    benutzername: benutzer,
                    passwort,
                    partner: UserId(partner),
                },
            )
            .await?;
        }
        Befehl::Passphrase { anzahl } => {
            for _ in 0..anzahl {
                println!("{}", generate_passphrase().as_str());
            }
        }
        Befehl::Pruefen { text } => {
            let hint = CipherEngine::classify(&text);
            println!("{hint:?} (is_encrypted: {})", CipherEngine::is_encrypted(&text));
        }
    }

    Ok(())
}

fn passwort_abfragen() -> Result<String> {
    eprint!("Passwort: ");
    std::io::stderr().flush()?;
    let mut zeile = String::new();
    std::io::stdin().read_line(&mut zeile)?;
    Ok(zeile.trim_end_matches(['\r', '\n']).to_string())
}
