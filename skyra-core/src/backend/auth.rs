use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Backend, BackendError, User, check};

/// Tokens for a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: i64,
    /// Unix seconds. Filled in locally when the server leaves it out.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// Refresh a little early so a request never leaves with a dying token.
    const EXPIRY_MARGIN_SECS: i64 = 60;

    fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        match self.expires_at {
            Some(at) => now_unix + Self::EXPIRY_MARGIN_SECS >= at,
            None => false,
        }
    }
}

/// Result of a sign-up. `session` is absent while email confirmation is pending.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user: User,
    pub session: Option<Session>,
}

/// Profile changes. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    backend: Backend,
}

impl AuthClient {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    fn url(&self, path: &str) -> String {
        self.backend.endpoint(&format!("/auth/v1{path}"))
    }

    /// Creates an account; `name` lands in the user metadata.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<SignUp, BackendError> {
        let mut payload = json!({ "email": email, "password": password });
        if let Some(name) = name {
            payload["data"] = json!({ "name": name });
        }

        let req = self.backend.http.post(self.url("/signup")).json(&payload);
        let response = check(self.backend.authorize(req, None).send().await?).await?;
        let body: serde_json::Value = response.json().await?;

        // With auto-confirm on the server answers with a session, otherwise with the bare user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            let session = session.stamped();
            Ok(SignUp {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user = match body.get("user") {
                Some(user) => serde_json::from_value(user.clone())?,
                None => serde_json::from_value(body)?,
            };
            Ok(SignUp { user, session: None })
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let req = self
            .backend
            .http
            .post(self.url("/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let response = check(self.backend.authorize(req, None).send().await?).await?;
        let session: Session = response.json().await?;
        Ok(session.stamped())
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let req = self
            .backend
            .http
            .post(self.url("/token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));

        let response = check(self.backend.authorize(req, None).send().await?).await?;
        let session: Session = response.json().await?;
        Ok(session.stamped())
    }

    pub async fn reset_password_for_email(&self, email: &str) -> Result<(), BackendError> {
        let req = self
            .backend
            .http
            .post(self.url("/recover"))
            .json(&json!({ "email": email }));

        check(self.backend.authorize(req, None).send().await?).await?;
        Ok(())
    }

    pub async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        let req = self.backend.http.get(self.url("/user"));
        let response = check(self.backend.authorize(req, Some(access_token)).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<User, BackendError> {
        let mut payload = json!({});
        if let Some(email) = &update.email {
            payload["email"] = json!(email);
        }
        if let Some(name) = &update.name {
            payload["data"] = json!({ "name": name });
        }

        let req = self.backend.http.put(self.url("/user")).json(&payload);
        let response = check(self.backend.authorize(req, Some(access_token)).send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let req = self.backend.http.post(self.url("/logout"));
        check(self.backend.authorize(req, Some(access_token)).send().await?).await?;
        Ok(())
    }
}
