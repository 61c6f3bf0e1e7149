//! Interactive OAuth2 login for the domain administrator
//!
//! The directory listing is read with the administrator's own credentials,
//! obtained through the Authorization Code flow with PKCE (RFC 7636) and
//! kept in the system keyring between runs.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client registration and endpoints
//! - [`KeyringTokenStorage`] - Secure token storage using the system keyring
//! - [`PKCEFlow`] - Challenge generation, code exchange and refresh
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`AdminAuthenticator`] - Picks stored, refreshed or fresh credentials

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::GoogleError;

/// Google OAuth2 authorization endpoint
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default port of the local redirect listener
pub const DEFAULT_REDIRECT_PORT: u16 = 8400;

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "dircontacts";

/// Tokens are treated as expired this long before they actually expire
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Scope for reading domain users
pub const DIRECTORY_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/admin.directory.user.readonly";

// ============================================================================
// Tokens
// ============================================================================

/// OAuth tokens as persisted in the keyring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Whether the access token is expired (or about to be)
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE authentication flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth client ID of the installed application
    pub client_id: String,
    /// Google issues secrets even to installed apps and requires them on
    /// the token endpoint
    pub client_secret: Option<String>,
    /// Port of the local redirect listener on 127.0.0.1
    pub redirect_port: u16,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuth2Config {
    /// Creates a config with Google's endpoints and the directory scope
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_port: DEFAULT_REDIRECT_PORT,
            scopes: vec![DIRECTORY_READONLY_SCOPE.to_string()],
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    /// Points the flow at other endpoints (used by tests)
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.redirect_port)
    }
}

// ============================================================================
// Token storage
// ============================================================================

/// Persistence for the administrator's tokens
pub trait TokenStorage: Send + Sync {
    fn store(&self, username: &str, tokens: &Tokens) -> Result<()>;
    fn load(&self, username: &str) -> Result<Option<Tokens>>;
    fn clear(&self, username: &str) -> Result<()>;
}

/// Stores and retrieves OAuth tokens from the system keyring
///
/// Tokens are serialized as JSON under the service name "dircontacts".
#[derive(Debug, Clone, Default)]
pub struct KeyringTokenStorage;

impl TokenStorage for KeyringTokenStorage {
    fn store(&self, username: &str, tokens: &Tokens) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;

        entry
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;

        debug!(username, "Stored tokens in keyring");
        Ok(())
    }

    fn load(&self, username: &str) -> Result<Option<Tokens>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let tokens: Tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!(username, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(username, "No tokens found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn clear(&self, username: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!(username, "Cleared tokens from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(username, "No tokens to clear");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
}

impl PKCEFlow {
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri()).context("Invalid redirect URI")?,
            );
        let client = match &config.client_secret {
            Some(secret) => client.set_client_secret(ClientSecret::new(secret.clone())),
            None => client,
        };

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Offline access and forced consent make Google hand out a refresh
    /// token on every login.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("Failed to exchange authorization code")?;

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at: expiry(token_result.expires_in()),
        })
    }

    /// Refreshes an expired access token using a refresh token
    ///
    /// Google does not rotate refresh tokens, so the old one is kept when
    /// the response carries none.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .context("Failed to refresh token")?;

        Ok(Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expiry(token_result.expires_in()),
        })
    }
}

fn expiry(expires_in: Option<std::time::Duration>) -> DateTime<Utc> {
    expires_in
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .map_or_else(|| Utc::now() + Duration::hours(1), |secs| Utc::now() + Duration::seconds(secs))
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that receives the OAuth2 redirect on 127.0.0.1.
///
/// Serves connections until a request to `/callback` arrives, answers it
/// with a small HTML page and returns the authorization code.
pub struct LocalCallbackServer;

/// Parameters extracted from the OAuth2 callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

impl LocalCallbackServer {
    /// Waits for the redirect and verifies its CSRF state
    ///
    /// # Errors
    /// Fails if the port cannot be bound, the provider reports an error, or
    /// the returned state does not match `expected_state`.
    pub async fn start(port: u16, expected_state: &str) -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::header::{HeaderValue, CONTENT_TYPE};
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::net::TcpListener;
        use tokio::sync::{oneshot, Mutex};

        fn html(status: StatusCode, body: String) -> Response<Full<Bytes>> {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            response
        }

        let addr = format!("127.0.0.1:{port}");
        info!(%addr, "Starting local OAuth callback server");
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {addr}"))?;

        let (tx, mut rx) = oneshot::channel::<std::result::Result<CallbackParams, String>>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let outcome = loop {
            tokio::select! {
                outcome = &mut rx => {
                    break outcome.context("Callback server closed without a response")?;
                }
                accepted = listener.accept() => {
                    let (stream, _peer) = accepted
                        .context("Failed to accept connection on callback server")?;
                    let tx = tx.clone();
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let tx = tx.clone();
                        async move {
                            if req.uri().path() != "/callback" {
                                return Ok::<_, hyper::Error>(html(
                                    StatusCode::NOT_FOUND,
                                    error_html("Not found"),
                                ));
                            }
                            let parsed = parse_callback_params(&req.uri().to_string());
                            let page = match &parsed {
                                Ok(_) => html(StatusCode::OK, success_html()),
                                Err(message) => html(StatusCode::BAD_REQUEST, error_html(message)),
                            };
                            if let Some(sender) = tx.lock().await.take() {
                                let _ = sender.send(parsed);
                            }
                            Ok(page)
                        }
                    });
                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            warn!(error = %e, "Callback server connection error");
                        }
                    });
                }
            }
        };

        let params = outcome.map_err(|message| anyhow::anyhow!("Authorization failed: {message}"))?;
        if params.state != expected_state {
            anyhow::bail!("Authorization callback state mismatch");
        }
        info!("Received OAuth callback with authorization code");
        Ok(params)
    }
}

/// Extracts the authorization code and state from a callback URI.
///
/// Returns the provider's `error` value (or a generic message) when the
/// code is missing.
fn parse_callback_params(uri: &str) -> std::result::Result<CallbackParams, String> {
    let url = url::Url::parse(&format!("http://localhost{uri}"))
        .map_err(|e| format!("Malformed callback URL: {e}"))?;
    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            _ => {}
        }
    }

    match code {
        Some(code) => Ok(CallbackParams {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(error.unwrap_or_else(|| "Missing authorization code in callback".into())),
    }
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>dircontacts - Authorization Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Successful</h1>
    <p>dircontacts can now read your domain directory.</p>
    <p>You can close this window.</p>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>dircontacts - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{message}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#
    )
}

// ============================================================================
// AdminAuthenticator
// ============================================================================

/// Supplies the administrator's access token for directory calls.
///
/// Stored tokens are used while valid and refreshed when expired. A fresh
/// interactive login happens when there is nothing usable stored or when
/// `reauth` is set; in batch mode that situation is an error instead.
pub struct AdminAuthenticator {
    config: OAuth2Config,
    storage: Arc<dyn TokenStorage>,
}

impl AdminAuthenticator {
    pub fn new(config: OAuth2Config, storage: Arc<dyn TokenStorage>) -> Self {
        Self { config, storage }
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Keyring username; tokens belong to the OAuth client they were
    /// issued to
    fn username(&self) -> &str {
        &self.config.client_id
    }

    /// Returns a usable access token.
    ///
    /// # Errors
    /// [`GoogleError::ReauthorizationRequired`] when `batch` is set and an
    /// interactive login would be needed.
    pub async fn access_token(&self, reauth: bool, batch: bool) -> Result<String> {
        if !reauth {
            if let Some(tokens) = self.storage.load(self.username())? {
                if !tokens.is_expired() {
                    debug!("Using stored administrator token");
                    return Ok(tokens.access_token);
                }
                if let Some(refresh) = tokens.refresh_token.as_deref() {
                    match self.refresh(refresh).await {
                        Ok(tokens) => return Ok(tokens.access_token),
                        Err(e) => warn!(error = %e, "Token refresh failed"),
                    }
                }
            }
        }

        if batch {
            return Err(GoogleError::ReauthorizationRequired.into());
        }
        Ok(self.login().await?.access_token)
    }

    /// Performs the interactive login and stores the resulting tokens
    ///
    /// 1. Generates a PKCE authorization URL
    /// 2. Opens the browser on Google's consent page
    /// 3. Waits for the redirect on the local callback server
    /// 4. Exchanges the code for tokens
    pub async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 PKCE login flow");
        let flow = PKCEFlow::new(&self.config)?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Opening browser for authorization");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Could not open a browser");
            eprintln!("Open this URL to authorize dircontacts:\n{auth_url}");
        }

        let callback =
            LocalCallbackServer::start(self.config.redirect_port, csrf_token.secret()).await?;
        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;
        self.storage.store(self.username(), &tokens)?;

        info!("OAuth2 PKCE login completed successfully");
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let tokens = PKCEFlow::new(&self.config)?.refresh_token(refresh_token).await?;
        self.storage.store(self.username(), &tokens)?;
        Ok(tokens)
    }

    /// Stored tokens, if any
    pub fn status(&self) -> Result<Option<Tokens>> {
        self.storage.load(self.username())
    }

    pub fn logout(&self) -> Result<()> {
        self.storage.clear(self.username())
    }
}
