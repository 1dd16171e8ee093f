//! HTTP session boundary
//!
//! [`ConsoleSession`] is the abstract `GET`/`POST` JSON boundary every
//! higher-level component talks to. [`HttpSession`] implements it on top of
//! reqwest and owns base URL handling, authentication and translation of
//! error responses into [`ConsoleError`]s. Sessions never retry on their own;
//! retrying is the caller's decision (see [`crate::retry`]).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::metrics::HttpRequestMetrics;

/// Abstract JSON-over-HTTP session
#[async_trait]
pub trait ConsoleSession: Send + Sync {
    /// `GET` a path relative to the base URL
    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> ConsoleResult<Value>;

    /// `POST` a JSON body to a path or an absolute URL
    async fn post_json(&self, path_or_url: &str, body: &Value) -> ConsoleResult<Value>;

    /// Absolute URL of the search endpoint
    fn search_url(&self) -> String;

    /// Customer id of the authenticated user, if known
    fn customer_id(&self) -> Option<&str>;
}

/// Authentication material
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Email and password exchanged for a JWT
    Basic {
        /// Console account email
        email: String,
        /// Console account password
        password: String,
    },
    /// Pre-issued JWT access token
    Token {
        /// Access token, with or without `Bearer` prefix
        token: String,
        /// Verify the token by fetching the user profile
        check: bool,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("password", &"***")
                .finish(),
            Credentials::Token { check, .. } => f
                .debug_struct("Token")
                .field("token", &"***")
                .field("check", check)
                .finish(),
        }
    }
}

impl Credentials {
    /// Pick an authentication method
    ///
    /// Email and password take precedence over a token. Empty strings count
    /// as missing.
    pub fn resolve(
        email: Option<String>,
        password: Option<String>,
        token: Option<String>,
        check_token: bool,
    ) -> ConsoleResult<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (email, password, token) = (present(email), present(password), present(token));

        match (email, password, token) {
            (Some(email), Some(password), token) => {
                if token.is_some() {
                    info!("both token and email/password provided ... using email/password");
                }
                Ok(Credentials::Basic { email, password })
            }
            (_, _, Some(token)) => Ok(Credentials::Token {
                token,
                check: check_token,
            }),
            _ => Err(ConsoleError::Validation(
                "please provide either email and password or token".to_string(),
            )),
        }
    }
}

/// Profile of the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    /// Customer id used to scope order listings
    pub id: String,
    /// Organization id
    #[serde(rename = "organizationId", default)]
    pub organization_id: Option<String>,
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining profile fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// reqwest-backed session
pub struct HttpSession {
    client: Client,
    config: ClientConfig,
    auth_header: Option<String>,
    user: Option<UserInfo>,
}

impl HttpSession {
    /// Create an unauthenticated session
    pub fn new(config: ClientConfig) -> ConsoleResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ConsoleError::Network {
                kind: crate::error::NetworkErrorKind::Other,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            auth_header: None,
            user: None,
        })
    }

    /// Authenticate and, unless disabled, cache the user profile
    ///
    /// Any failure is reported as [`ConsoleError::Authentication`] naming the
    /// base URL.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> ConsoleResult<()> {
        let outcome = match credentials {
            Credentials::Basic { email, password } => self.basic_auth(email, password).await,
            Credentials::Token { token, check } => {
                self.set_auth_header(token);
                if *check {
                    self.cache_user_info().await
                } else {
                    Ok(())
                }
            }
        };

        outcome.map_err(|e| {
            debug!("authentication failed: {}", e);
            ConsoleError::Authentication(format!(
                "Unable to authenticate with {} - please check your credentials.",
                self.config.base_url()
            ))
        })?;

        match self.user().and_then(|u| u.email.as_deref()) {
            Some(email) => info!(
                "successfully authenticated as {} ({})",
                email,
                self.config.base_url()
            ),
            None => info!("successfully authenticated ({})", self.config.base_url()),
        }
        Ok(())
    }

    async fn basic_auth(&mut self, email: &str, password: &str) -> ConsoleResult<()> {
        let request = self
            .client
            .post(self.url_for("/token"))
            .basic_auth(email, Some(password));
        let value = self.send("POST", request).await?;
        let token: TokenResponse = serde_json::from_value(value)?;
        self.set_auth_header(&token.access_token);
        self.cache_user_info().await
    }

    fn set_auth_header(&mut self, token: &str) {
        let token = token.trim();
        let header = if token.starts_with("Bearer") {
            token.to_string()
        } else {
            format!("Bearer {token}")
        };
        self.auth_header = Some(header);
    }

    async fn cache_user_info(&mut self) -> ConsoleResult<()> {
        let value = self.get_json("/user", &[]).await?;
        self.user = Some(serde_json::from_value(value)?);
        Ok(())
    }

    /// Current `Authorization` header value
    pub fn authorization_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    /// Cached user profile
    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    fn url_for(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.config.base_url(), path_or_url)
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_header {
            Some(header) => request.header(AUTHORIZATION, header),
            None => request,
        }
    }

    async fn send(&self, method: &'static str, request: RequestBuilder) -> ConsoleResult<Value> {
        let timer = HttpRequestMetrics::start(method);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                timer.record_network_error();
                return Err(ConsoleError::from_reqwest(&e));
            }
        };

        let status = response.status();
        timer.record_complete(status.as_u16());

        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            warn!("{} {} returned {}: {}", method, url, status, body);
            return Err(ConsoleError::from_error_body(status.as_u16(), &body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ConsoleError::from_reqwest(&e))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ConsoleError::Parse(format!("failed to decode response body: {e}")))
    }
}

#[async_trait]
impl ConsoleSession for HttpSession {
    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> ConsoleResult<Value> {
        let url = self.url_for(path);
        debug!("GET {} with {} params", url, params.len());
        let request = self.authorized(self.client.get(url).query(params));
        self.send("GET", request).await
    }

    async fn post_json(&self, path_or_url: &str, body: &Value) -> ConsoleResult<Value> {
        let url = self.url_for(path_or_url);
        debug!("POST {}", url);
        let request = self.authorized(self.client.post(url).json(body));
        self.send("POST", request).await
    }

    fn search_url(&self) -> String {
        self.config.search_url()
    }

    fn customer_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}
