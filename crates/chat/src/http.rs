//! HTTP-Transport auf Basis von reqwest
//!
//! Authentifizierung laeuft ueber das Session-Cookie des Servers, daher
//! haelt der Client einen Cookie-Store. Login und Logout sind keine
//! Trait-Methoden, der Austausch selbst braucht sie nicht.

use std::time::Duration;

use async_trait::async_trait;
use ourchat_core::{BenutzerProfil, Nachricht, NeueNachricht, OurchatError, Result, UserId};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::transport::ChatTransport;

#[derive(Debug, Deserialize)]
struct SchluesselAntwort {
    #[serde(default)]
    encryption_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FehlerAntwort {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginAnfrage<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginAntwort {
    #[serde(default)]
    success: bool,
    user: Option<BenutzerProfil>,
}

/// reqwest-basierter Transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    basis_url: String,
}

impl HttpTransport {
    /// Erstellt einen Transport fuer `basis_url` (z.B. `https://chat.example.org`)
    pub fn neu(basis_url: impl Into<String>, zeitlimit: Duration) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(zeitlimit)
            .build()
            .map_err(|e| OurchatError::Verbindung(e.to_string()))?;

        let basis_url = basis_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, basis_url })
    }

    fn url(&self, pfad: &str) -> String {
        format!("{}{}", self.basis_url, pfad)
    }

    /// `POST /api/auth/login`, setzt das Session-Cookie
    pub async fn anmelden(&self, username: &str, password: &str) -> Result<BenutzerProfil> {
        let antwort = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&LoginAnfrage { username, password })
            .send()
            .await
            .map_err(anfrage_fehler)?;

        let login: LoginAntwort = json_lesen(pruefen(antwort).await?).await?;
        match login.user {
            Some(profil) if login.success => {
                tracing::info!(user_id = %profil.id, "Am Server angemeldet");
                Ok(profil)
            }
            _ => Err(OurchatError::UngueltigeAntwort(
                "Login-Antwort ohne Benutzerprofil".to_string(),
            )),
        }
    }

    /// `POST /api/auth/logout`
    pub async fn abmelden(&self) -> Result<()> {
        let antwort = self
            .client
            .post(self.url("/api/auth/logout"))
            .send()
            .await
            .map_err(anfrage_fehler)?;
        pruefen(antwort).await?;
        tracing::info!("Vom Server abgemeldet");
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn encryption_key(&self, user_id: UserId) -> Result<Option<String>> {
        let antwort = self
            .client
            .get(self.url(&format!("/api/user/{}/encryption-key", user_id.inner())))
            .send()
            .await
            .map_err(anfrage_fehler)?;

        let schluessel: SchluesselAntwort = json_lesen(pruefen(antwort).await?).await?;
        Ok(schluessel.encryption_key)
    }

    async fn nachrichten_laden(&self, partner: UserId) -> Result<Vec<Nachricht>> {
        let antwort = self
            .client
            .get(self.url(&format!("/api/messages/{}", partner.inner())))
            .send()
            .await
            .map_err(anfrage_fehler)?;

        json_lesen(pruefen(antwort).await?).await
    }

    async fn nachricht_senden(&self, neu: &NeueNachricht) -> Result<Nachricht> {
        let antwort = self
            .client
            .post(self.url("/api/messages"))
            .json(neu)
            .send()
            .await
            .map_err(anfrage_fehler)?;

        json_lesen(pruefen(antwort).await?).await
    }
}

/// Bildet Nicht-Erfolgs-Status auf `OurchatError` ab
async fn pruefen(antwort: Response) -> Result<Response> {
    let status = antwort.status();
    if status.is_success() {
        return Ok(antwort);
    }

    let nachricht = antwort
        .json::<FehlerAntwort>()
        .await
        .ok()
        .and_then(|f| f.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unbekannt").to_string());

    tracing::debug!(status = status.as_u16(), %nachricht, "Server meldet Fehler");
    Err(status_fehler(status.as_u16(), nachricht))
}

fn status_fehler(code: u16, nachricht: String) -> OurchatError {
    match code {
        401 => OurchatError::NichtAuthentifiziert,
        404 => OurchatError::NichtGefunden(nachricht),
        code => OurchatError::Status { code, nachricht },
    }
}

async fn json_lesen<T: serde::de::DeserializeOwned>(antwort: Response) -> Result<T> {
    antwort
        .json::<T>()
        .await
        .map_err(|e| OurchatError::UngueltigeAntwort(e.to_string()))
}

fn anfrage_fehler(e: reqwest::Error) -> OurchatError {
    if e.is_timeout() {
        OurchatError::Zeitlimit(e.to_string())
    } else if e.is_decode() {
        OurchatError::UngueltigeAntwort(e.to_string())
    } else {
        OurchatError::Verbindung(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_abbildung() {
        assert!(matches!(
            status_fehler(401, "Not authenticated".into()),
            OurchatError::NichtAuthentifiziert
        ));
        assert!(matches!(
            status_fehler(404, "User not found".into()),
            OurchatError::NichtGefunden(m) if m == "User not found"
        ));
        let e = status_fehler(503, "down".into());
        assert!(matches!(e, OurchatError::Status { code: 503, .. }));
        assert!(e.ist_wiederholbar());
    }

    #[test]
    fn basis_url_ohne_schraegstrich() {
        let t = HttpTransport::neu("https://chat.example.org/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            t.url("/api/messages/3"),
            "https://chat.example.org/api/messages/3"
        );
    }

    #[test]
    fn schluessel_antwort_ohne_feld() {
        let a: SchluesselAntwort = serde_json::from_str("{}").unwrap();
        assert!(a.encryption_key.is_none());
        let a: SchluesselAntwort =
            serde_json::from_str(r#"{"encryption_key":"ocean-river-comet-0042"}"#).unwrap();
        assert_eq!(a.encryption_key.as_deref(), Some("ocean-river-comet-0042"));
    }

    #[test]
    fn login_antwort_parsen() {
        let json = r#"{"success":true,"user":{"id":4,"username":"bob","email":"b@x.org",
            "user_code":"AB12CD","display_name":"Bob","profile_picture":null,
            "encryption_key":"delta-echo-golf-1234","is_admin":false}}"#;
        let a: LoginAntwort = serde_json::from_str(json).unwrap();
        assert!(a.success);
        let profil = a.user.unwrap();
        assert_eq!(profil.id, UserId(4));
        assert_eq!(profil.encryption_key.as_deref(), Some("delta-echo-golf-1234"));
    }
}
