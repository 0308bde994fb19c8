//! OAuth 2.0 credentials for the YouTube Data API.
//!
//! The token file uses the authorized-user JSON layout written by Google's own client libraries
//! (`token`, `refresh_token`, `token_uri`, `client_id`, `client_secret`, `scopes`, `expiry`), so a
//! `token.json` produced by other tooling can be reused as-is and vice versa.

use std::fmt;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use crate::YouTubeError;

/// Read-only access to the account's YouTube data.
pub const SCOPE_READONLY: &str = "https://www.googleapis.com/auth/youtube.readonly";
/// Full management of the account's YouTube data over SSL.
pub const SCOPE_FORCE_SSL: &str = "https://www.googleapis.com/auth/youtube.force-ssl";
/// Upload videos.
pub const SCOPE_UPLOAD: &str = "https://www.googleapis.com/auth/youtube.upload";
/// Full management of the account's YouTube data.
pub const SCOPE_MANAGE: &str = "https://www.googleapis.com/auth/youtube";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EXPIRY_MARGIN_SECS: i64 = 300;

const SUCCESS_PAGE: &str = "<html><body>The authentication flow has completed. \
You may close this window.</body></html>";
const FAILURE_PAGE: &str = "<html><body>The authentication flow failed. \
Check the terminal for details.</body></html>";

/// OAuth client registration downloaded from the Google Cloud console.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecrets {
    /// Load `client_secret.json`, accepting both `installed` and `web` registrations.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, YouTubeError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, YouTubeError> {
        let file: ClientSecretsFile = serde_json::from_str(raw)?;
        file.installed
            .or(file.web)
            .ok_or(YouTubeError::MissingField(
                "client secrets file has neither an 'installed' nor a 'web' section",
            ))
    }
}

/// Credentials persisted in the token file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Current access token.
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Absolute expiry of [`StoredCredentials::token`]; `None` when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

impl StoredCredentials {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, YouTubeError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), YouTubeError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn access_token(&self) -> &str {
        &self.token
    }

    /// Whether the access token expires within five minutes of `now`.
    ///
    /// Tokens without a recorded expiry are assumed valid; the API will reject them otherwise.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) <= now,
            None => false,
        }
    }

    /// Whether the granted scopes include (or imply) every scope in `wanted`.
    pub fn covers(&self, wanted: &[&str]) -> bool {
        wanted.iter().all(|want| {
            self.scopes
                .iter()
                .any(|granted| scope_implies(granted, want))
        })
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// The refresh token itself is kept unless the server rotates it.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::OAuth`] if there is no refresh token or the token endpoint rejects it
    /// - [`YouTubeError::InvalidUrl`] if the stored `token_uri` is not a URL
    pub async fn refresh(&self) -> Result<Self, YouTubeError> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| YouTubeError::OAuth("token file has no refresh token".into()))?;

        let client = oauth_client(
            &self.client_id,
            &self.client_secret,
            DEFAULT_AUTH_URI,
            &self.token_uri,
        )?;
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(async_http_client)
            .await
            .map_err(|err| YouTubeError::OAuth(format!("token refresh failed: {err}")))?;

        let mut refreshed = self.clone();
        refreshed.apply_token_response(&response, Utc::now());
        Ok(refreshed)
    }

    fn apply_token_response(&mut self, response: &BasicTokenResponse, now: DateTime<Utc>) {
        self.token = response.access_token().secret().clone();
        if let Some(refresh_token) = response.refresh_token() {
            self.refresh_token = Some(refresh_token.secret().clone());
        }
        self.expiry = response
            .expires_in()
            .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
            .map(|lifetime| now + lifetime);
        if let Some(scopes) = response.scopes() {
            self.scopes = scopes.iter().map(|scope| scope.as_str().to_owned()).collect();
        }
    }
}

fn scope_implies(granted: &str, wanted: &str) -> bool {
    if granted == wanted {
        return true;
    }
    matches!(granted, SCOPE_MANAGE | SCOPE_FORCE_SSL)
        && matches!(wanted, SCOPE_READONLY | SCOPE_UPLOAD | SCOPE_MANAGE | SCOPE_FORCE_SSL)
}

fn oauth_client(
    client_id: &str,
    client_secret: &str,
    auth_uri: &str,
    token_uri: &str,
) -> Result<BasicClient, YouTubeError> {
    Ok(BasicClient::new(
        ClientId::new(client_id.to_string()),
        Some(ClientSecret::new(client_secret.to_string())),
        AuthUrl::new(auth_uri.to_string())?,
        Some(TokenUrl::new(token_uri.to_string())?),
    ))
}

/// Authorization-code flow for installed applications.
///
/// A listener on an ephemeral loopback port receives the browser redirect; PKCE and a CSRF state
/// protect the exchange.
#[derive(Debug, Clone)]
pub struct InstalledFlow {
    secrets: ClientSecrets,
    scopes: Vec<String>,
}

impl InstalledFlow {
    pub fn new(secrets: ClientSecrets, scopes: &[&str]) -> Self {
        Self {
            secrets,
            scopes: scopes.iter().map(|scope| scope.to_string()).collect(),
        }
    }

    /// Print the consent URL, wait for the redirect, and exchange the code for tokens.
    ///
    /// # Errors
    ///
    /// - [`YouTubeError::Io`] if the loopback listener cannot be bound or read
    /// - [`YouTubeError::OAuth`] if consent is denied, the state does not match, or the code
    ///   exchange fails
    pub async fn run_local_server(&self) -> Result<StoredCredentials, YouTubeError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{port}/");

        let client = oauth_client(
            &self.secrets.client_id,
            &self.secrets.client_secret,
            &self.secrets.auth_uri,
            &self.secrets.token_uri,
        )?
        .set_redirect_uri(RedirectUrl::new(redirect_uri)?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        println!("Please visit this URL to authorize this application: {auth_url}");
        log::info!("waiting for the OAuth redirect on port {port}");

        let callback = wait_for_callback(&listener).await?;
        if callback.state.as_deref() != Some(csrf_state.secret().as_str()) {
            return Err(YouTubeError::OAuth(
                "state parameter mismatch in OAuth redirect".into(),
            ));
        }

        let response = client
            .exchange_code(AuthorizationCode::new(callback.code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|err| YouTubeError::OAuth(format!("code exchange failed: {err}")))?;

        let mut credentials = StoredCredentials {
            token: String::new(),
            refresh_token: None,
            token_uri: self.secrets.token_uri.clone(),
            client_id: self.secrets.client_id.clone(),
            client_secret: self.secrets.client_secret.clone(),
            scopes: self.scopes.clone(),
            expiry: None,
            extra: Map::new(),
        };
        credentials.apply_token_response(&response, Utc::now());
        Ok(credentials)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct AuthCallback {
    pub(crate) code: String,
    pub(crate) state: Option<String>,
}

/// Extract the authorization code from the request line of the browser redirect.
///
/// Returns `Ok(None)` for unrelated requests (for example `/favicon.ico`).
pub(crate) fn parse_callback(request_line: &str) -> Result<Option<AuthCallback>, YouTubeError> {
    let Some(target) = request_line.split_whitespace().nth(1) else {
        return Ok(None);
    };
    let url = Url::parse("http://localhost/")?.join(target)?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(YouTubeError::OAuth(format!("authorization denied: {value}")));
            }
            _ => {}
        }
    }

    Ok(code.map(|code| AuthCallback { code, state }))
}

async fn wait_for_callback(listener: &TcpListener) -> Result<AuthCallback, YouTubeError> {
    loop {
        let (mut stream, _) = listener.accept().await?;

        let mut request_line = String::new();
        {
            let mut reader = BufReader::new(&mut stream);
            reader.read_line(&mut request_line).await?;
        }

        let parsed = parse_callback(&request_line);
        let (status, body) = match &parsed {
            Ok(Some(_)) => ("200 OK", SUCCESS_PAGE),
            Ok(None) => ("404 Not Found", ""),
            Err(_) => ("400 Bad Request", FAILURE_PAGE),
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await?;
        let _ = stream.shutdown().await;

        if let Some(callback) = parsed? {
            return Ok(callback);
        }
    }
}

/// Token file plus client registration: the "load or obtain a credential" step.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    token_path: PathBuf,
    client_secret_path: PathBuf,
}

impl CredentialStore {
    pub fn new(token_path: impl Into<PathBuf>, client_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
            client_secret_path: client_secret_path.into(),
        }
    }

    /// Return credentials valid for `scopes`, obtaining or refreshing them as needed.
    ///
    /// 1. Reuse the token file when it covers `scopes` and has not expired.
    /// 2. Refresh it when expired and a refresh token is available.
    /// 3. Otherwise run the installed-app flow with the client secrets file.
    ///
    /// The token file is rewritten after a refresh or a new authorization.
    pub async fn authorize(&self, scopes: &[&str]) -> Result<StoredCredentials, YouTubeError> {
        if self.token_path.exists() {
            let credentials = StoredCredentials::load(&self.token_path)?;
            if !credentials.covers(scopes) {
                log::info!(
                    "{} lacks the requested scopes; starting a new authorization",
                    self.token_path.display()
                );
            } else if !credentials.is_expired(Utc::now()) {
                log::debug!("using cached credentials from {}", self.token_path.display());
                return Ok(credentials);
            } else if credentials.refresh_token.is_some() {
                match credentials.refresh().await {
                    Ok(refreshed) => {
                        refreshed.save(&self.token_path)?;
                        log::info!("refreshed access token");
                        return Ok(refreshed);
                    }
                    Err(err) => log::warn!("{err}; starting a new authorization"),
                }
            }
        }

        let secrets = ClientSecrets::from_file(&self.client_secret_path)?;
        let credentials = InstalledFlow::new(secrets, scopes)
            .run_local_server()
            .await?;
        credentials.save(&self.token_path)?;
        log::info!("saved credentials to {}", self.token_path.display());
        Ok(credentials)
    }
}
