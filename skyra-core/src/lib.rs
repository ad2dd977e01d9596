//! Core library for the `skyra` weather client.
//!
//! This crate defines:
//! - Configuration and on-device storage
//! - Abstraction over weather providers, plus unit and forecast helpers
//! - The account backend: auth, favorites and preferences
//!
//! It is used by `skyra-cli`, but can also be reused by other front-ends.

pub mod backend;
pub mod config;
pub mod display;
pub mod favorites;
pub mod forecast;
pub mod model;
pub mod onboarding;
pub mod preferences;
pub mod provider;
pub mod search;
pub mod store;
pub mod units;

pub use config::{BackendConfig, Config, ProviderConfig};
pub use favorites::{Favorites, FavoritesRepository};
pub use model::{CitySuggestion, Forecast, ForecastEntry, LocationQuery, WeatherSnapshot};
pub use preferences::{Preferences, PreferencesRepository, SaveOutcome, ThemeName};
pub use provider::{ProviderId, WeatherProvider};
pub use store::LocalStore;
pub use units::{TemperatureUnit, WindUnit};
