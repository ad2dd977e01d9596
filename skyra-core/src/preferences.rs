//! Unit and theme preferences.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::{BackendError, SignedIn, TableClient};
use crate::store::{LocalStore, TEMP_UNIT_KEY, THEME_KEY, WIND_UNIT_KEY};
use crate::units::{TemperatureUnit, WindUnit};

pub const PREFERENCES_TABLE: &str = "user_preferences";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    Light,
    Dark,
    #[default]
    System,
}

/// The theme actually applied once `System` is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Light => "light",
            ThemeName::Dark => "dark",
            ThemeName::System => "system",
        }
    }

    pub fn resolve(&self, system_dark: bool) -> ThemeMode {
        match self {
            ThemeName::Light => ThemeMode::Light,
            ThemeName::Dark => ThemeMode::Dark,
            ThemeName::System if system_dark => ThemeMode::Dark,
            ThemeName::System => ThemeMode::Light,
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ThemeName {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "light" => Ok(ThemeName::Light),
            "dark" => Ok(ThemeName::Dark),
            "system" => Ok(ThemeName::System),
            _ => Err(anyhow!("Unknown theme '{value}'. Use light, dark or system.")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub temp_unit: TemperatureUnit,
    pub wind_unit: WindUnit,
    pub theme: ThemeName,
}

impl Preferences {
    /// What a new account starts with on the backend.
    pub fn account_defaults() -> Self {
        Self {
            temp_unit: TemperatureUnit::Fahrenheit,
            wind_unit: WindUnit::Mph,
            theme: ThemeName::System,
        }
    }

    /// Takes every valid value from `row`; anything unrecognised keeps the current value.
    fn merge(mut self, row: &StoredPreferences) -> Self {
        if let Some(unit) = row.temp_unit.as_deref().and_then(|v| TemperatureUnit::try_from(v).ok()) {
            self.temp_unit = unit;
        }
        if let Some(unit) = row.wind_unit.as_deref().and_then(|v| WindUnit::try_from(v).ok()) {
            self.wind_unit = unit;
        }
        if let Some(theme) = row.theme.as_deref().and_then(|v| ThemeName::try_from(v).ok()) {
            self.theme = theme;
        }
        self
    }
}

/// A row as read back; values are checked before use.
#[derive(Debug, Default, Deserialize)]
struct StoredPreferences {
    temp_unit: Option<String>,
    wind_unit: Option<String>,
    theme: Option<String>,
}

#[derive(Debug, Serialize)]
struct PreferencesRow<'a> {
    id: &'a str,
    temp_unit: TemperatureUnit,
    wind_unit: WindUnit,
    theme: ThemeName,
}

impl<'a> PreferencesRow<'a> {
    fn new(id: &'a str, prefs: &Preferences) -> Self {
        Self {
            id,
            temp_unit: prefs.temp_unit,
            wind_unit: prefs.wind_unit,
            theme: prefs.theme,
        }
    }
}

/// Where a preference change ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    SavedRemote,
    SavedLocally,
    RemoteFailed(String),
}

#[derive(Debug, Clone)]
pub struct PreferencesRepository {
    store: LocalStore,
    remote: Option<TableClient>,
}

impl PreferencesRepository {
    pub fn new(store: LocalStore, remote: Option<TableClient>) -> Self {
        Self { store, remote }
    }

    pub fn load_local(&self) -> Result<Preferences> {
        let stored = StoredPreferences {
            temp_unit: self.store.get(TEMP_UNIT_KEY)?,
            wind_unit: self.store.get(WIND_UNIT_KEY)?,
            theme: self.store.get(THEME_KEY)?,
        };
        Ok(Preferences::default().merge(&stored))
    }

    fn save_local(&self, prefs: &Preferences) -> Result<()> {
        self.store.set(TEMP_UNIT_KEY, prefs.temp_unit.as_str())?;
        self.store.set(WIND_UNIT_KEY, prefs.wind_unit.as_str())?;
        self.store.set(THEME_KEY, prefs.theme.as_str())
    }

    async fn load_remote(
        &self,
        table: &TableClient,
        user: &SignedIn,
        local: Preferences,
    ) -> Result<Preferences, BackendError> {
        let filters = [("id", user.user.id.as_str())];
        match table
            .select_single::<StoredPreferences>(&user.access_token, "temp_unit,wind_unit,theme", &filters)
            .await
        {
            Ok(row) => Ok(local.merge(&row)),
            Err(BackendError::NoRows) => {
                let defaults = Preferences::account_defaults();
                tracing::info!(user = %user.user.id, "creating default preferences");
                table
                    .insert(&user.access_token, &PreferencesRow::new(&user.user.id, &defaults))
                    .await?;
                Ok(defaults)
            }
            Err(err) => Err(err),
        }
    }

    /// Account preferences when signed in, mirrored to the device; device values otherwise.
    pub async fn load(&self, user: Option<&SignedIn>) -> Result<Preferences> {
        let local = self.load_local()?;

        if let (Some(table), Some(user)) = (&self.remote, user) {
            match self.load_remote(table, user, local).await {
                Ok(prefs) => {
                    self.save_local(&prefs)?;
                    return Ok(prefs);
                }
                Err(err) => tracing::warn!("loading preferences from backend failed, using device copy: {err}"),
            }
        }

        Ok(local)
    }

    /// Writes the device copy, then the whole row to the backend when signed in.
    pub async fn save(&self, user: Option<&SignedIn>, prefs: &Preferences) -> Result<SaveOutcome> {
        self.save_local(prefs)?;

        let (Some(table), Some(user)) = (&self.remote, user) else {
            return Ok(SaveOutcome::SavedLocally);
        };

        match table
            .upsert(&user.access_token, &PreferencesRow::new(&user.user.id, prefs))
            .await
        {
            Ok(()) => Ok(SaveOutcome::SavedRemote),
            Err(err) => {
                tracing::warn!("saving preferences to backend failed: {err}");
                Ok(SaveOutcome::RemoteFailed(err.to_string()))
            }
        }
    }

    /// Load, change one thing, save. The other fields go out with their current values.
    pub async fn update(
        &self,
        user: Option<&SignedIn>,
        change: impl FnOnce(&mut Preferences),
    ) -> Result<(Preferences, SaveOutcome)> {
        let mut prefs = self.load(user).await?;
        change(&mut prefs);
        let outcome = self.save(user, &prefs).await?;
        Ok((prefs, outcome))
    }
}
