use async_trait::async_trait;
use std::fmt::{self, Debug};

use crate::{
    Config,
    model::{CitySuggestion, Forecast, LocationQuery, WeatherSnapshot},
};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Weather sources the client knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "openweather" | "openweathermap" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown weather provider '{value}'. Only openweather is supported."
            )),
        }
    }
}

/// Source of current conditions, forecasts and city lookups.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, location: &LocationQuery) -> anyhow::Result<WeatherSnapshot>;

    /// The raw 3-hour feed, oldest slot first.
    async fn forecast(&self, location: &LocationQuery) -> anyhow::Result<Forecast>;

    async fn search_cities(&self, query: &str, limit: usize)
    -> anyhow::Result<Vec<CitySuggestion>>;
}

/// Builds the client for `id` from its stored credentials.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let Some(creds) = config.provider_config(id) else {
        anyhow::bail!(
            "No API key configured for provider '{id}'.\n\
             Hint: run `skyra configure` and enter your API key."
        );
    };

    match id {
        ProviderId::OpenWeather => {
            let client = OpenWeatherProvider::new(creds.api_key.clone());
            Ok(match &creds.base_url {
                Some(base) => Box::new(client.with_base_url(base.clone())),
                None => Box::new(client),
            })
        }
    }
}

pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    provider_from_config(config.default_provider_id()?, config)
}
