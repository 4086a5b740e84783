use std::sync::Arc;

use common::api::{LoginRequest, LoginResponse, RefreshTokenRequest};
use reqwest::{Client, Url};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{SdkError, render_controller_error};

const LOGIN_PATH: &str = "/user/login";
const REFRESH_PATH: &str = "/user/refresh";

/// How a [`Session`] obtains its bearer token.
#[derive(Clone)]
pub enum AuthMode {
    /// Pre-issued bearer token, used as is.
    Token(String),
    /// Email/password login, optionally seeded with a refresh token.
    Credentials {
        email: String,
        password: String,
        refresh_token: Option<String>,
    },
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Token(_) => f.write_str("Token(<redacted>)"),
            AuthMode::Credentials { email, .. } => f
                .debug_struct("Credentials")
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Authenticated view of one controller endpoint.
///
/// Cloning is cheap; clones share the cached token pair, so a login done by
/// one clone is reused by every other.
#[derive(Clone)]
pub struct Session {
    endpoint: String,
    auth: Arc<AuthMode>,
    http: Client,
    state: Arc<Mutex<TokenState>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth)
            .finish()
    }
}

impl Session {
    pub fn new(endpoint: impl Into<String>, auth: AuthMode) -> Self {
        Self::with_http_client(Client::new(), endpoint, auth)
    }

    pub fn with_http_client(http: Client, endpoint: impl Into<String>, auth: AuthMode) -> Self {
        let refresh_token = match &auth {
            AuthMode::Credentials { refresh_token, .. } => {
                refresh_token.clone().filter(|t| !t.trim().is_empty())
            }
            AuthMode::Token(_) => None,
        };
        Self {
            endpoint: endpoint.into(),
            auth: Arc::new(auth),
            http,
            state: Arc::new(Mutex::new(TokenState {
                access_token: None,
                refresh_token,
            })),
        }
    }

    pub fn with_token(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(endpoint, AuthMode::Token(token.into()))
    }

    pub fn with_credentials(
        endpoint: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self::new(
            endpoint,
            AuthMode::Credentials {
                email: email.into(),
                password: password.into(),
                refresh_token,
            },
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn auth_mode(&self) -> &AuthMode {
        &self.auth
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub fn base_url(&self) -> Result<Url, SdkError> {
        let url = Url::parse(self.endpoint.trim()).map_err(|err| {
            SdkError::Auth(format!(
                "failed to parse controller endpoint '{}' as URL: {err}",
                self.endpoint
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SdkError::Auth(format!(
                "controller endpoint '{}' must use http or https",
                self.endpoint
            )));
        }
        Ok(url)
    }

    /// Absolute URL for a controller path, keeping any base path on the endpoint.
    pub fn url(&self, path: &str) -> Result<String, SdkError> {
        let base = self.base_url()?;
        let trimmed = path.trim_start_matches('/');
        Ok(format!("{}/{}", base.as_str().trim_end_matches('/'), trimmed))
    }

    /// Returns the bearer token to sign requests with.
    ///
    /// Static tokens come back without a network call. Credential sessions
    /// reuse the cached access token, otherwise try the refresh token and
    /// finally log in with email and password.
    pub async fn authenticate(&self) -> Result<String, SdkError> {
        self.base_url()?;
        let (email, password) = match &*self.auth {
            AuthMode::Token(token) => return Ok(token.clone()),
            AuthMode::Credentials {
                email, password, ..
            } => (email, password),
        };

        let mut state = self.state.lock().await;
        if let Some(token) = &state.access_token {
            return Ok(token.clone());
        }

        if let Some(refresh_token) = state.refresh_token.clone() {
            match self.refresh(&refresh_token).await {
                Ok(pair) => {
                    debug!(endpoint = %self.endpoint, "session refreshed");
                    return Ok(store(&mut state, pair));
                }
                Err(err) => {
                    debug!(error = %err, "refresh token rejected, falling back to login");
                }
            }
        }

        let pair = self.login(email, password).await?;
        info!(endpoint = %self.endpoint, "logged in to controller");
        Ok(store(&mut state, pair))
    }

    /// Drops the cached access token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.access_token = None;
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.lock().await.refresh_token.clone()
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, SdkError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            totp: String::new(),
        };
        self.exchange(LOGIN_PATH, &body).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, SdkError> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.exchange(REFRESH_PATH, &body).await
    }

    async fn exchange<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<LoginResponse, SdkError> {
        let res = self.http.post(self.url(path)?).json(body).send().await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(SdkError::Auth(format!(
                "controller rejected {path} (status {status}): {}",
                render_controller_error(status, &text)
            )));
        }
        let pair: LoginResponse = res.json().await?;
        if pair.access_token.is_empty() {
            return Err(SdkError::Auth(format!(
                "controller answered {path} without an access token"
            )));
        }
        Ok(pair)
    }
}

fn store(state: &mut TokenState, pair: LoginResponse) -> String {
    if !pair.refresh_token.is_empty() {
        state.refresh_token = Some(pair.refresh_token);
    }
    state.access_token = Some(pair.access_token.clone());
    pair.access_token
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    #[tokio::test]
    async fn static_token_skips_network() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200);
        });

        let session = Session::with_token(server.url(""), "static-token");
        let token = session.authenticate().await.expect("token");
        assert_eq!(token, "static-token");
        assert_eq!(login.calls(), 0);
    }

    #[tokio::test]
    async fn unparseable_endpoint_is_an_auth_error() {
        let session = Session::with_token("not a url", "t");
        let err = session.authenticate().await.unwrap_err();
        assert!(matches!(err, SdkError::Auth(_)), "got {err:?}");

        let session = Session::with_token("ftp://controller", "t");
        assert!(matches!(
            session.authenticate().await,
            Err(SdkError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn credentials_login_once_and_share_across_clones() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/user/login")
                .json_body(json!({"email": "ops@example.com", "password": "pw", "totp": ""}));
            then.status(200)
                .json_body(json!({"accessToken": "access-1", "refreshToken": "refresh-1"}));
        });

        let session =
            Session::with_credentials(server.url(""), "ops@example.com", "pw", None);
        let clone = session.clone();

        assert_eq!(session.authenticate().await.expect("login"), "access-1");
        assert_eq!(clone.authenticate().await.expect("cached"), "access-1");
        assert_eq!(login.calls(), 1);
        assert_eq!(clone.refresh_token().await.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn stored_refresh_token_is_tried_first() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/user/refresh")
                .json_body(json!({"refreshToken": "seed"}));
            then.status(200)
                .json_body(json!({"accessToken": "access-r", "refreshToken": "refresh-2"}));
        });
        let login = server.mock(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200)
                .json_body(json!({"accessToken": "access-l", "refreshToken": "x"}));
        });

        let session = Session::with_credentials(
            server.url(""),
            "ops@example.com",
            "pw",
            Some("seed".to_string()),
        );
        assert_eq!(session.authenticate().await.expect("refresh"), "access-r");
        assert_eq!(refresh.calls(), 1);
        assert_eq!(login.calls(), 0);
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_login() {
        let server = MockServer::start();
        let _refresh = server.mock(|when, then| {
            when.method(POST).path("/user/refresh");
            then.status(401).json_body(json!({"message": "expired"}));
        });
        let login = server.mock(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200)
                .json_body(json!({"accessToken": "access-l", "refreshToken": "r"}));
        });

        let session = Session::with_credentials(
            server.url(""),
            "ops@example.com",
            "pw",
            Some("stale".to_string()),
        );
        assert_eq!(session.authenticate().await.expect("login"), "access-l");
        assert_eq!(login.calls(), 1);
    }

    #[tokio::test]
    async fn rejected_login_is_an_auth_error_with_message() {
        let server = MockServer::start();
        let _login = server.mock(|when, then| {
            when.method(POST).path("/user/login");
            then.status(401)
                .json_body(json!({"name": "AuthError", "message": "Invalid credentials"}));
        });

        let session = Session::with_credentials(server.url(""), "a@b.c", "wrong", None);
        let err = session.authenticate().await.unwrap_err();
        assert!(matches!(err, SdkError::Auth(_)));
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_exchange() {
        let server = MockServer::start();
        let _login = server.mock(|when, then| {
            when.method(POST).path("/user/login");
            then.status(200)
                .json_body(json!({"accessToken": "access-1", "refreshToken": "refresh-1"}));
        });
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/user/refresh")
                .json_body(json!({"refreshToken": "refresh-1"}));
            then.status(200)
                .json_body(json!({"accessToken": "access-2", "refreshToken": "refresh-2"}));
        });

        let session = Session::with_credentials(server.url(""), "a@b.c", "pw", None);
        assert_eq!(session.authenticate().await.expect("login"), "access-1");
        session.invalidate().await;
        assert_eq!(session.authenticate().await.expect("refresh"), "access-2");
        assert_eq!(refresh.calls(), 1);
    }

    #[test]
    fn url_keeps_base_path() {
        let session = Session::with_token("http://controller:51121/api/v3/", "t");
        assert_eq!(
            session.url("/microservices").expect("url"),
            "http://controller:51121/api/v3/microservices"
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let session = Session::with_credentials("http://c", "a@b.c", "hunter2", None);
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("hunter2"));
        let token = format!("{:?}", AuthMode::Token("secret".into()));
        assert!(!token.contains("secret"));
    }
}
