//! Installed-app OAuth for Google: PKCE authorization code with a loopback
//! redirect, and refresh-token grants.
//!
//! The interactive grant runs once (`jess auth google`). Every later process
//! start only refreshes.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{RemoteError, RemoteResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Random bytes behind the PKCE verifier.
const CODE_VERIFIER_BYTES: usize = 32;

/// How long the user has to finish the consent screen.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_OK: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>jess is authorized</h1><p>You can close this window.</p></body></html>";
const CALLBACK_FAILED: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization failed</h1><p>Check the terminal for details.</p></body></html>";

/// Talks to Google's authorization and token endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> RemoteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::internal("failed to build HTTP client").with_source(e))?;
        Ok(Self {
            credentials,
            http,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    /// Sends token requests somewhere other than Google.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Runs the interactive consent flow and returns the granted tokens.
    ///
    /// Opens the browser on the consent page and waits for the redirect on a
    /// loopback port from `port_range`.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> RemoteResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{port}/callback");
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("opening browser for Google consent");
        debug!(url = %auth_url, "authorization URL");
        if let Err(e) = open::that(&auth_url) {
            warn!(error = %e, "failed to open browser");
            eprintln!("\nOpen this URL in your browser:\n\n{auth_url}\n");
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, accept_callback(listener))
            .await
            .map_err(|_| RemoteError::authentication("timed out waiting for the OAuth redirect"))??;

        if callback.state.as_deref() != Some(pkce.state.as_str()) {
            return Err(RemoteError::authentication(
                "OAuth state mismatch; the redirect did not come from this login",
            ));
        }

        info!("exchanging authorization code");
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", callback.code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let token = self.token_request(&params).await?;

        let granted = match token.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => scopes.to_vec(),
        };
        Ok(TokenInfo::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            granted,
        ))
    }

    /// Trades a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> RemoteResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let token = self.token_request(&params).await?;
        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> RemoteResult<TokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| RemoteError::network("token request failed").with_source(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::network("failed to read token response").with_source(e))?;

        if !status.is_success() {
            // Google answers `{"error": "invalid_grant", "error_description": "..."}`.
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or(body);
            return Err(RemoteError::authentication(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                reason
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            RemoteError::invalid_response("token endpoint returned malformed JSON").with_source(e)
        })
    }
}

/// Result of a refresh grant.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Only present when Google rotates the refresh token.
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

async fn bind_loopback(port_range: (u16, u16)) -> RemoteResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            debug!(port, "loopback listener bound");
            return Ok((listener, port));
        }
    }
    Err(RemoteError::configuration(format!(
        "no free loopback port in {}-{}",
        port_range.0, port_range.1
    )))
}

/// Serves connections until one carries the OAuth redirect.
async fn accept_callback(listener: TcpListener) -> RemoteResult<CallbackParams> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| RemoteError::internal("loopback accept failed").with_source(e))?;
        debug!(%peer, "loopback connection");

        let (read_half, mut write_half) = stream.into_split();
        let mut request_line = String::new();
        if BufReader::new(read_half)
            .read_line(&mut request_line)
            .await
            .is_err()
        {
            continue;
        }

        let Some(result) = parse_callback(&request_line) else {
            // Favicon requests and the like.
            let _ = write_half
                .write_all(b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n")
                .await;
            continue;
        };

        let page = if result.is_ok() {
            CALLBACK_OK
        } else {
            CALLBACK_FAILED
        };
        let _ = write_half.write_all(page.as_bytes()).await;
        let _ = write_half.shutdown().await;
        return result;
    }
}

#[derive(Debug, PartialEq, Eq)]
struct CallbackParams {
    code: String,
    state: Option<String>,
}

/// Parses `GET /callback?code=..&state=.. HTTP/1.1`.
///
/// Returns `None` for requests that are not the redirect.
fn parse_callback(request_line: &str) -> Option<RemoteResult<CallbackParams>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(RemoteError::authorization(format!(
            "consent was not granted: {error}"
        ))));
    }
    Some(match code {
        Some(code) => Ok(CallbackParams { code, state }),
        None => Err(RemoteError::authentication(
            "redirect carried no authorization code",
        )),
    })
}

/// RFC 7636 verifier, challenge and CSRF state for one authorization.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_BYTES);
        let challenge = Self::challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// S256 challenge: base64url(sha256(verifier)), unpadded.
    fn challenge_for(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent URL. Asks for offline access so a refresh token
    /// is issued.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{GOOGLE_AUTH_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}\
             &code_challenge={}&code_challenge_method=S256&state={}\
             &access_type=offline&prompt=consent",
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}
