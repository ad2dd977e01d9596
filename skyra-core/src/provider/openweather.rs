use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::model::{CitySuggestion, Coordinates, Forecast, ForecastEntry, LocationQuery, WeatherSnapshot};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn location_params(location: &LocationQuery) -> Vec<(&'static str, String)> {
        match location {
            LocationQuery::City(name) => vec![("q", name.clone())],
            LocationQuery::Coords(c) => vec![("lat", c.lat.to_string()), ("lon", c.lon.to_string())],
        }
    }

    /// GET `path`, returning the body of a successful response.
    async fn get(&self, path: &str, what: &str, params: Vec<(&'static str, String)>) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, what, "requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {what} response body"))?;

        if !status.is_success() {
            // The API explains itself in `message`, e.g. "city not found".
            if let Ok(err) = serde_json::from_str::<OwError>(&body) {
                if let Some(message) = err.message.filter(|m| !m.is_empty()) {
                    return Err(anyhow!(message));
                }
            }
            return Err(anyhow!(
                "OpenWeather {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwError {
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: Option<u32>,
    main: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    dt: Option<i64>,
    timezone: Option<i32>,
    coord: Option<OwCoord>,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

#[derive(Debug, Default, Deserialize)]
struct OwCity {
    name: Option<String>,
    country: Option<String>,
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    dt_txt: Option<String>,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    city: OwCity,
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

impl From<OwCurrentResponse> for WeatherSnapshot {
    fn from(parsed: OwCurrentResponse) -> Self {
        let weather = parsed.weather.into_iter().next();
        let (condition_id, condition, description, icon) = match weather {
            Some(w) => (w.id, w.main, w.description, w.icon),
            None => (None, None, None, None),
        };

        WeatherSnapshot {
            city_name: parsed.name.filter(|n| !n.is_empty()),
            country: parsed.sys.country,
            coordinates: parsed.coord.map(|c| Coordinates { lat: c.lat, lon: c.lon }),
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            temp_min_c: parsed.main.temp_min,
            temp_max_c: parsed.main.temp_max,
            humidity_pct: parsed.main.humidity,
            pressure_hpa: parsed.main.pressure,
            wind_speed_mps: parsed.wind.speed,
            condition_id,
            condition,
            description,
            icon,
            sunrise: parsed.sys.sunrise.and_then(unix_to_utc),
            sunset: parsed.sys.sunset.and_then(unix_to_utc),
            observation_time: parsed.dt.and_then(unix_to_utc),
            timezone_offset: parsed.timezone,
        }
    }
}

impl OwForecastEntry {
    fn into_entry(self) -> Option<ForecastEntry> {
        let time = unix_to_utc(self.dt)?;
        let weather = self.weather.into_iter().next();
        let (condition, description, icon) = match weather {
            Some(w) => (w.main, w.description, w.icon),
            None => (None, None, None),
        };

        Some(ForecastEntry {
            time,
            time_text: self.dt_txt,
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            temp_min_c: self.main.temp_min,
            temp_max_c: self.main.temp_max,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed_mps: self.wind.speed,
            condition,
            description,
            icon,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, location: &LocationQuery) -> Result<WeatherSnapshot> {
        let mut params = Self::location_params(location);
        params.push(("units", "metric".to_string()));

        let body = self.get("/data/2.5/weather", "current weather", params).await?;
        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        Ok(parsed.into())
    }

    async fn forecast(&self, location: &LocationQuery) -> Result<Forecast> {
        let mut params = Self::location_params(location);
        params.push(("units", "metric".to_string()));

        let body = self.get("/data/2.5/forecast", "5-day forecast", params).await?;
        let parsed: OwForecastResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather forecast JSON")?;

        Ok(Forecast {
            city_name: parsed.city.name,
            country: parsed.city.country,
            timezone_offset: parsed.city.timezone,
            entries: parsed
                .list
                .into_iter()
                .filter_map(OwForecastEntry::into_entry)
                .collect(),
        })
    }

    async fn search_cities(&self, query: &str, limit: usize) -> Result<Vec<CitySuggestion>> {
        let params = vec![("q", query.to_string()), ("limit", limit.to_string())];

        let body = self.get("/geo/1.0/direct", "city search", params).await?;
        let parsed: Vec<OwGeoEntry> =
            serde_json::from_str(&body).context("Failed to parse OpenWeather geocoding JSON")?;

        Ok(parsed
            .into_iter()
            .map(|g| CitySuggestion {
                name: g.name,
                state: g.state,
                country: g.country,
                lat: g.lat,
                lon: g.lon,
            })
            .collect())
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
