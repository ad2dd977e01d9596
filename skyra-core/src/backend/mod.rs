//! Hosted auth and database (Supabase) over plain REST.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;

pub mod auth;
pub mod session;
pub mod table;

pub use auth::{AuthClient, Session, SignUp, UserUpdate};
pub use session::{SessionManager, SignedIn};
pub use table::TableClient;

/// PostgREST's answer to `.single()` when nothing matched.
pub const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("No matching rows")]
    NoRows,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not signed in. Run `skyra auth login` first.")]
    NotSignedIn,

    #[error("No account backend configured.\nHint: run `skyra configure` or set SUPABASE_URL and SUPABASE_ANON_KEY.")]
    NotConfigured,
}

impl BackendError {
    pub fn is_no_rows(&self) -> bool {
        matches!(self, BackendError::NoRows)
    }
}

/// The various error bodies auth and PostgREST send back.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Display name given at sign-up or in the profile.
    pub fn name(&self) -> Option<&str> {
        self.user_metadata.get("name").and_then(|v| v.as_str())
    }
}

/// Shared connection details for every backend client.
#[derive(Debug, Clone)]
pub struct Backend {
    url: String,
    anon_key: String,
    http: Client,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: Option<&BackendConfig>) -> Result<Self, BackendError> {
        config.map(Self::new).ok_or(BackendError::NotConfigured)
    }

    pub fn auth(&self) -> AuthClient {
        AuthClient::new(self.clone())
    }

    pub fn table(&self, name: &str) -> TableClient {
        TableClient::new(self.clone(), name)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    /// Attaches the project key, and the user's token when there is one.
    fn authorize(&self, req: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        let bearer = access_token.unwrap_or(&self.anon_key);
        req.header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }
}

/// Passes successful responses through and turns the rest into [`BackendError`].
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let code = body.code();

    if code.as_deref() == Some(NO_ROWS_CODE) {
        return Err(BackendError::NoRows);
    }

    let message = body
        .message()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Request failed with status {status}"));

    Err(BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}
