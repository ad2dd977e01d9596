//! Human-friendly output.

use skyra_core::display::{capitalize_words, clock_time};
use skyra_core::model::{ForecastEntry, PLACEHOLDER, WeatherSnapshot};
use skyra_core::preferences::ThemeMode;
use skyra_core::units::{format_dual, format_wind_speed};
use skyra_core::{Preferences, SaveOutcome};

fn temp(value: Option<f64>, prefs: &Preferences) -> String {
    value
        .map(|c| prefs.temp_unit.format(c))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn wind(value: Option<f64>, prefs: &Preferences) -> String {
    value
        .map(|ms| format_wind_speed(ms, prefs.wind_unit))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn text(value: Option<&str>) -> String {
    value
        .map(capitalize_words)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn opt<T: std::fmt::Display>(value: Option<T>, suffix: &str) -> String {
    value
        .map(|v| format!("{v}{suffix}"))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn current(snap: &WeatherSnapshot, prefs: &Preferences) -> String {
    format!(
        "{label}\n{desc}\n{now}  (feels like {feels})\nH: {high}  L: {low}\n\
         Humidity: {humidity}  Pressure: {pressure}  Wind: {wind}\n\
         Sunrise: {sunrise}  Sunset: {sunset}",
        label = snap.location_label(),
        desc = text(snap.description.as_deref()),
        now = temp(snap.temperature_c, prefs),
        feels = temp(snap.feels_like_c, prefs),
        high = temp(snap.temp_max_c, prefs),
        low = temp(snap.temp_min_c, prefs),
        humidity = opt(snap.humidity_pct, "%"),
        pressure = opt(snap.pressure_hpa.map(|p| p.round()), " hPa"),
        wind = wind(snap.wind_speed_mps, prefs),
        sunrise = clock_time(snap.sunrise, snap.timezone_offset),
        sunset = clock_time(snap.sunset, snap.timezone_offset),
    )
}

pub fn hourly(entries: &[ForecastEntry], prefs: &Preferences, tz_offset: Option<i32>) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "{:>5}  {:>6}  {}",
                clock_time(Some(e.time), tz_offset),
                temp(e.temperature_c, prefs),
                text(e.description.as_deref())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn daily(days: &[ForecastEntry], prefs: &Preferences) -> String {
    days.iter()
        .map(|e| {
            format!(
                "{}  {:>6}  {:<20}  humidity {}  wind {}",
                e.time.format("%a %d %b"),
                temp(e.temperature_c, prefs),
                text(e.description.as_deref()),
                opt(e.humidity_pct, "%"),
                wind(e.wind_speed_mps, prefs)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per favorite, both units side by side.
pub fn favorite_line(city: &str, snap: &WeatherSnapshot) -> String {
    let reading = snap
        .temperature_c
        .map(format_dual)
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    format!("{city}: {reading}, {}", text(snap.description.as_deref()))
}

pub fn save_outcome(outcome: &SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::SavedRemote => "Changes saved successfully!",
        SaveOutcome::SavedLocally => "Changes saved locally!",
        SaveOutcome::RemoteFailed(_) => "Failed to save changes. Please try again.",
    }
}

/// Reads the `COLORFGBG` convention (`"15;0"` is light text on a dark background).
pub fn terminal_prefers_dark(colorfgbg: Option<&str>) -> bool {
    colorfgbg
        .and_then(|v| v.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_some_and(|bg| bg < 7 || bg == 8)
}

pub fn theme_mode(mode: ThemeMode) -> &'static str {
    match mode {
        ThemeMode::Light => "light",
        ThemeMode::Dark => "dark",
    }
}
