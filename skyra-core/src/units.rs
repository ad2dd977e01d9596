use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;

const MS_TO_MPH: f64 = 2.23694;
const MS_TO_KPH: f64 = 3.6;

/// Temperature unit preference. Provider data always arrives in Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        }
    }

    /// Rounded value in this unit for a Celsius reading.
    pub fn display(&self, celsius: f64) -> i64 {
        match self {
            TemperatureUnit::Celsius => round_half_up(celsius),
            TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }

    pub fn format(&self, celsius: f64) -> String {
        format!("{}°{}", self.display(celsius), self.as_str())
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow!("Unknown temperature unit '{value}'. Use C or F.")),
        }
    }
}

/// Wind speed unit preference. Provider data always arrives in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindUnit {
    #[default]
    Mph,
    Kph,
}

impl WindUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindUnit::Mph => "mph",
            WindUnit::Kph => "kph",
        }
    }
}

impl fmt::Display for WindUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WindUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "mph" => Ok(WindUnit::Mph),
            "kph" | "kmh" | "km/h" => Ok(WindUnit::Kph),
            _ => Err(anyhow!("Unknown wind unit '{value}'. Use mph or kph.")),
        }
    }
}

/// Rounds like the display layer always has: halves go towards positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded as i64
}

pub fn celsius_to_fahrenheit(celsius: f64) -> i64 {
    round_half_up(celsius * 9.0 / 5.0 + 32.0)
}

/// Both units side by side, e.g. `21°C / 70°F`.
pub fn format_dual(celsius: f64) -> String {
    format!(
        "{}°C / {}°F",
        round_half_up(celsius),
        celsius_to_fahrenheit(celsius)
    )
}

pub fn convert_wind_speed(speed_ms: f64, unit: WindUnit) -> i64 {
    match unit {
        WindUnit::Mph => round_half_up(speed_ms * MS_TO_MPH),
        WindUnit::Kph => round_half_up(speed_ms * MS_TO_KPH),
    }
}

pub fn format_wind_speed(speed_ms: f64, unit: WindUnit) -> String {
    format!("{} {}", convert_wind_speed(speed_ms, unit), unit)
}
