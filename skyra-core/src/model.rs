use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shown wherever the provider left a value out.
pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// What to ask the provider about.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    City(String),
    Coords(Coordinates),
}

impl LocationQuery {
    pub fn city(name: impl Into<String>) -> Self {
        LocationQuery::City(name.into())
    }

    pub fn coords(lat: f64, lon: f64) -> Self {
        LocationQuery::Coords(Coordinates { lat, lon })
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::City(name) => f.write_str(name),
            LocationQuery::Coords(c) => write!(f, "{:.4}, {:.4}", c.lat, c.lon),
        }
    }
}

/// Current conditions for one place. Every field may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city_name: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub humidity_pct: Option<u8>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub condition_id: Option<u32>,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub observation_time: Option<DateTime<Utc>>,
    /// Offset from UTC in seconds for the reported place.
    pub timezone_offset: Option<i32>,
}

impl WeatherSnapshot {
    /// `"Paris, FR"`, or whichever part is known.
    pub fn location_label(&self) -> String {
        match (&self.city_name, &self.country) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (Some(city), None) => city.clone(),
            (None, Some(country)) => country.clone(),
            (None, None) => PLACEHOLDER.to_string(),
        }
    }
}

/// One slot of the 3-hour forecast feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    /// Provider-formatted `YYYY-MM-DD HH:MM:SS` (UTC), when present.
    pub time_text: Option<String>,
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub humidity_pct: Option<u8>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl ForecastEntry {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time,
            time_text: None,
            temperature_c: None,
            feels_like_c: None,
            temp_min_c: None,
            temp_max_c: None,
            humidity_pct: None,
            pressure_hpa: None,
            wind_speed_mps: None,
            condition: None,
            description: None,
            icon: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub city_name: Option<String>,
    pub country: Option<String>,
    pub timezone_offset: Option<i32>,
    pub entries: Vec<ForecastEntry>,
}

/// A geocoding hit offered while the user types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySuggestion {
    pub name: String,
    pub state: Option<String>,
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl CitySuggestion {
    pub fn label(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(state) = &self.state {
            parts.push(state);
        }
        if let Some(country) = &self.country {
            parts.push(country);
        }
        parts.join(", ")
    }

    pub fn query(&self) -> LocationQuery {
        LocationQuery::coords(self.lat, self.lon)
    }
}

impl fmt::Display for CitySuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
