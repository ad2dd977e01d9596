use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::provider::ProviderId;

pub const ENV_WEATHER_API_KEY: &str = "OPENWEATHER_API_KEY";
pub const ENV_BACKEND_URL: &str = "SUPABASE_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "SUPABASE_ANON_KEY";

/// Credentials for one weather source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Overrides the provider's public endpoint, mostly for testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Hosted auth + database project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Which source `now`/`forecast` talk to, e.g. "openweather".
    pub default_provider: Option<String>,

    /// Keyed by provider id:
    /// `[providers.openweather]` with `api_key` and an optional `base_url`.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// `[backend]` with `url` and `anon_key`. Absent means device-only mode.
    #[serde(default)]
    pub backend: Option<BackendConfig>,
}

impl Config {
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let name = self.default_provider.as_deref().ok_or_else(|| {
            anyhow!(
                "No weather provider configured.\n\
                 Hint: run `skyra configure` or set {ENV_WEATHER_API_KEY}."
            )
        })?;

        ProviderId::try_from(name)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from the platform location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_from(&Self::config_file_path()?)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// A missing file is not an error: it yields the empty config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let body = toml::to_string_pretty(self).context("Failed to encode config as TOML")?;
        fs::write(path, body)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "skyra", "skyra")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for on-device state (favorites, flags, session).
    pub fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    /// Environment wins over the file. `lookup` is injectable for tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_WEATHER_API_KEY).filter(|k| !k.is_empty()) {
            self.upsert_provider_api_key(ProviderId::OpenWeather, key);
        }

        let url = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty());
        let anon_key = lookup(ENV_BACKEND_ANON_KEY).filter(|v| !v.is_empty());
        if let (Some(url), Some(anon_key)) = (&url, &anon_key) {
            self.set_backend(url.clone(), anon_key.clone());
        } else if let Some(existing) = self.backend.as_mut() {
            if let Some(url) = url {
                existing.url = url;
            }
            if let Some(anon_key) = anon_key {
                existing.anon_key = anon_key;
            }
        }
    }

    /// Replaces the key, keeps any endpoint override. The first configured provider becomes the default.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        let base_url = self
            .providers
            .get(provider_id.as_str())
            .and_then(|p| p.base_url.clone());
        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key, base_url });

        if self.default_provider.is_none() {
            self.set_default_provider(provider_id);
        }
    }

    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|p| p.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    pub fn set_backend(&mut self, url: String, anon_key: String) {
        self.backend = Some(BackendConfig { url, anon_key });
    }
}
