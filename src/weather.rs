//! Current weather lookup and heat-stress alerts

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationErrors};
use crate::fetch::Fetch;

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m,weather_code";

/// Conditions at a location right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_percent: f64,
    pub precipitation_mm: f64,
    pub wind_kmh: f64,

    /// WMO weather interpretation code
    pub weather_code: u16,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    #[serde(default)]
    time: Option<String>,
    temperature_2m: f64,
    #[serde(default)]
    relative_humidity_2m: f64,
    #[serde(default)]
    precipitation: f64,
    #[serde(default)]
    wind_speed_10m: f64,
    #[serde(default)]
    weather_code: u16,
}

/// Text for a WMO weather interpretation code
pub fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 => "Snow",
        77 => "Snow grains",
        80 | 81 | 82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), Error> {
    let mut errors = ValidationErrors::new();
    if !(-90.0..=90.0).contains(&latitude) {
        errors.add("latitude", "Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        errors.add("longitude", "Longitude must be between -180 and 180");
    }
    errors.into_result()
}

/// Client for the Open-Meteo forecast API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current conditions at a coordinate
    pub async fn current(&self, latitude: f64, longitude: f64) -> Result<CurrentConditions, Error> {
        check_coordinates(latitude, longitude)?;

        let url = format!("{}/v1/forecast", self.base_url);
        let response = Fetch::get(&self.client, &url)
            .query([
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "kmh".to_string()),
            ])
            .execute::<ForecastResponse>()
            .await?;

        let current = response.current;
        debug!("Weather at {},{}: {:?}", latitude, longitude, current);

        let observed_at = current
            .time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok())
            .map(|t| t.and_utc());

        Ok(CurrentConditions {
            temperature_c: current.temperature_2m,
            condition: describe_weather_code(current.weather_code).to_string(),
            humidity_percent: current.relative_humidity_2m,
            precipitation_mm: current.precipitation,
            wind_kmh: current.wind_speed_10m,
            weather_code: current.weather_code,
            observed_at,
        })
    }
}

/// How urgent an alert is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

/// Farm-facing weather warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub recommendations: Vec<String>,
    pub issued_at: DateTime<Utc>,
}

const HEAT_RECOMMENDATIONS: [&str; 4] = [
    "Provide adequate shade and ventilation",
    "Ensure constant access to fresh water",
    "Consider adding electrolytes to drinking water",
    "Feed birds during cooler parts of the day",
];

/// Heat-stress warnings for temperatures above `threshold_c`.
///
/// Anything more than five degrees over the threshold is high severity.
pub fn heat_stress_alerts(conditions: &CurrentConditions, threshold_c: f64) -> Vec<WeatherAlert> {
    let temperature = conditions.temperature_c;
    if temperature <= threshold_c {
        return Vec::new();
    }

    let severity = if temperature > threshold_c + 5.0 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    };
    info!("Heat stress alert at {:.1}°C ({:?})", temperature, severity);

    vec![WeatherAlert {
        id: uuid::Uuid::new_v4().to_string(),
        title: "Heat Wave Warning".to_string(),
        description: format!(
            "Temperature is {:.1}°C, above {:.0}°C. Poultry birds are at risk of heat stress.",
            temperature, threshold_c
        ),
        severity,
        recommendations: HEAT_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
        issued_at: Utc::now(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(temperature_c: f64) -> CurrentConditions {
        CurrentConditions {
            temperature_c,
            condition: "Clear sky".into(),
            humidity_percent: 40.0,
            precipitation_mm: 0.0,
            wind_kmh: 5.0,
            weather_code: 0,
            observed_at: None,
        }
    }

    #[test]
    fn no_alert_at_threshold() {
        assert!(heat_stress_alerts(&conditions(35.0), 35.0).is_empty());
    }

    #[test]
    fn severity_depends_on_margin() {
        let alerts = heat_stress_alerts(&conditions(36.0), 35.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
        assert_eq!(alerts[0].recommendations.len(), 4);

        let alerts = heat_stress_alerts(&conditions(41.0), 35.0);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
    }

    #[test]
    fn weather_codes() {
        assert_eq!(describe_weather_code(2), "Partly cloudy");
        assert_eq!(describe_weather_code(63), "Rain");
        assert_eq!(describe_weather_code(1000), "Unknown");
    }

    #[test]
    fn coordinates_are_checked() {
        assert!(check_coordinates(6.5, 3.4).is_ok());
        assert!(check_coordinates(91.0, 3.4).is_err());
        assert!(check_coordinates(6.5, -181.0).is_err());
        assert!(check_coordinates(f64::NAN, 0.0).is_err());
    }
}
