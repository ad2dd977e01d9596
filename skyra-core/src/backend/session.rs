use anyhow::{Context, Result};
use chrono::Utc;

use super::{AuthClient, BackendError, Session, SignUp, User, UserUpdate};
use crate::store::{LocalStore, SESSION_KEY};

/// The user requests are made on behalf of.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIn {
    pub user: User,
    pub access_token: String,
}

impl From<&Session> for SignedIn {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.access_token.clone(),
        }
    }
}

/// Keeps the auth session on disk between runs and refreshes it when it lapses.
#[derive(Debug, Clone)]
pub struct SessionManager {
    auth: AuthClient,
    store: LocalStore,
}

impl SessionManager {
    pub fn new(auth: AuthClient, store: LocalStore) -> Self {
        Self { auth, store }
    }

    fn stored(&self) -> Result<Option<Session>> {
        match self.store.get_json::<Session>(SESSION_KEY) {
            Ok(session) => Ok(session),
            Err(err) => {
                tracing::warn!("discarding unreadable session: {err:#}");
                self.store.remove(SESSION_KEY)?;
                Ok(None)
            }
        }
    }

    fn persist(&self, session: &Session) -> Result<()> {
        self.store
            .set_json(SESSION_KEY, session)
            .context("Failed to store session")
    }

    /// The live session, refreshed if it has expired. A rejected refresh token signs the user out;
    /// outages and server errors leave the stored session in place.
    pub async fn session(&self) -> Result<Option<Session>> {
        let Some(session) = self.stored()? else {
            return Ok(None);
        };

        if !session.is_expired_at(Utc::now().timestamp()) {
            return Ok(Some(session));
        }

        tracing::debug!(user = %session.user.id, "session expired, refreshing");
        match self.auth.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                self.persist(&fresh)?;
                Ok(Some(fresh))
            }
            Err(err @ BackendError::Api { status: 400..=499, .. }) => {
                tracing::warn!("refresh token rejected, signing out locally: {err}");
                self.store.remove(SESSION_KEY)?;
                Ok(None)
            }
            Err(err) => {
                // Kept for the next attempt; this call proceeds signed out.
                tracing::warn!("session refresh unavailable: {err}");
                Ok(None)
            }
        }
    }

    pub async fn signed_in(&self) -> Result<Option<SignedIn>> {
        Ok(self.session().await?.as_ref().map(SignedIn::from))
    }

    pub async fn require_signed_in(&self) -> Result<SignedIn> {
        Ok(self.signed_in().await?.ok_or(BackendError::NotSignedIn)?)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        self.persist(&session)?;
        tracing::info!(user = %session.user.id, "signed in");
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: Option<&str>) -> Result<SignUp> {
        let outcome = self.auth.sign_up(email, password, name).await?;
        if let Some(session) = &outcome.session {
            self.persist(session)?;
        }
        Ok(outcome)
    }

    /// Forgets the local session even when the server cannot be reached.
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.stored()? {
            if let Err(err) = self.auth.sign_out(&session.access_token).await {
                tracing::warn!("remote sign-out failed: {err}");
            }
        }
        self.store.remove(SESSION_KEY)
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        Ok(self.auth.reset_password_for_email(email).await?)
    }

    /// The account as the server currently sees it.
    pub async fn fetch_user(&self) -> Result<User> {
        let signed_in = self.require_signed_in().await?;
        Ok(self.auth.get_user(&signed_in.access_token).await?)
    }

    pub async fn update_profile(&self, update: &UserUpdate) -> Result<User> {
        let Some(mut session) = self.session().await? else {
            return Err(BackendError::NotSignedIn.into());
        };

        let user = self.auth.update_user(&session.access_token, update).await?;
        session.user = user.clone();
        self.persist(&session)?;
        Ok(user)
    }
}
