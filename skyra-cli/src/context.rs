use anyhow::Result;

use skyra_core::backend::{Backend, BackendError, SessionManager, SignedIn};
use skyra_core::favorites::FAVORITES_TABLE;
use skyra_core::onboarding::Onboarding;
use skyra_core::preferences::PREFERENCES_TABLE;
use skyra_core::provider::default_provider_from_config;
use skyra_core::{Config, FavoritesRepository, LocalStore, PreferencesRepository, WeatherProvider};

/// Everything a command needs, built once per invocation.
pub struct AppContext {
    pub config: Config,
    pub store: LocalStore,
    backend: Option<Backend>,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let store = LocalStore::open_default()?;
        let backend = config.backend.as_ref().map(Backend::new);
        if backend.is_none() {
            tracing::debug!("no backend configured, favorites and preferences stay on this device");
        }

        Ok(Self { config, store, backend })
    }

    pub fn provider(&self) -> Result<Box<dyn WeatherProvider>> {
        default_provider_from_config(&self.config)
    }

    pub fn sessions(&self) -> Result<SessionManager> {
        let backend = self.backend.as_ref().ok_or(BackendError::NotConfigured)?;
        Ok(SessionManager::new(backend.auth(), self.store.clone()))
    }

    /// The signed-in user, if any. Session trouble means "signed out" here.
    pub async fn signed_in(&self) -> Option<SignedIn> {
        let sessions = self.sessions().ok()?;
        match sessions.signed_in().await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!("could not read session: {err:#}");
                None
            }
        }
    }

    pub fn favorites(&self) -> FavoritesRepository {
        let remote = self.backend.as_ref().map(|b| b.table(FAVORITES_TABLE));
        FavoritesRepository::new(self.store.clone(), remote)
    }

    pub fn preferences(&self) -> PreferencesRepository {
        let remote = self.backend.as_ref().map(|b| b.table(PREFERENCES_TABLE));
        PreferencesRepository::new(self.store.clone(), remote)
    }

    pub fn onboarding(&self) -> Onboarding {
        Onboarding::new(self.store.clone())
    }
}
