//! Weather lookups against the Open-Meteo geocoding and forecast APIs.
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::{ToolArgs, ToolHandler};
use crate::errors::{ToolError, ToolResult};

pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_WEATHER_TIMEOUT: Duration = Duration::from_secs(20);

/// Number of hourly temperatures reported
const NEXT_HOURS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: GEOCODING_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
            timeout: DEFAULT_WEATHER_TIMEOUT,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeatherError {
    #[error("Decime una ciudad. Ej: 'Córdoba, AR' o 'Corral de Bustos, Córdoba, AR'.")]
    EmptyCity,

    #[error("Ciudad no encontrada: {0}. Probá 'Ciudad, Provincia, AR'.")]
    NotFound(String),

    #[error("Sin datos de temperatura para {0}.")]
    NoTemperatures(String),

    #[error("fallo consultando el pronóstico: {0}")]
    Request(String),
}

impl WeatherError {
    /// Errors the user can fix by asking differently, as opposed to the
    /// forecast service failing
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, WeatherError::Request(_))
    }
}

/// A geocoding candidate
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
}

impl Place {
    pub fn label(&self) -> String {
        format!(
            "{}, {}, {}",
            self.name.as_deref().unwrap_or_default(),
            self.admin1.as_deref().unwrap_or_default(),
            self.country_code.as_deref().unwrap_or_default()
        )
    }

    fn score(&self, input_lower: &str, province_hint: Option<&str>) -> u32 {
        let mut score = 0;
        if self.country_code.as_deref() == Some("AR") {
            score += 10;
        }
        if let Some(hint) = province_hint {
            let admin1 = self.admin1.as_deref().unwrap_or_default().to_lowercase();
            if admin1.starts_with(hint) {
                score += 5;
            }
        }
        let name = self.name.as_deref().unwrap_or_default().to_lowercase();
        if !name.is_empty() && input_lower.contains(&name) {
            score += 2;
        }
        score
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<Place>>,
}

#[derive(Debug, Default, Deserialize)]
struct Hourly {
    #[serde(default)]
    temperature_2m: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    hourly: Option<Hourly>,
}

/// Temperatures for the next hours at the resolved place
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub city: String,
    pub next_hours_c: Vec<Option<f64>>,
}

impl Forecast {
    /// Temperatures as `[12.5, 13.0, ...]`
    pub fn temperatures(&self) -> String {
        let values: Vec<String> = self
            .next_hours_c
            .iter()
            .map(|t| match t {
                Some(value) => format!("{:?}", value),
                None => "-".to_string(),
            })
            .collect();
        format!("[{}]", values.join(", "))
    }
}

/// Pick the highest scoring place, the first one wins ties
pub fn best_place<'a>(places: &'a [Place], input: &str) -> Option<&'a Place> {
    let input_lower = input.to_lowercase();
    let province_hint = input
        .split(',')
        .nth(1)
        .map(|part| part.trim().to_lowercase());

    let mut best: Option<(&Place, u32)> = None;
    for place in places {
        let score = place.score(&input_lower, province_hint.as_deref());
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((place, score)),
        }
    }
    best.map(|(place, _)| place)
}

/// Geocoding queries tried in order until one yields results
pub fn candidate_queries(input: &str) -> Vec<String> {
    let first = strip_diacritics(input.split(',').next().unwrap_or_default().trim());
    vec![
        input.to_string(),
        strip_diacritics(input),
        format!("{}, Argentina", first),
        first,
    ]
}

/// Remove accents by decomposing to NFD and dropping the combining marks,
/// "Córdoba" becomes "Cordoba"
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn geocode(&self, query: &str) -> Result<Vec<Place>> {
        let response = self
            .client
            .get(&self.config.geocoding_url)
            .query(&[("name", query), ("count", "10"), ("language", "es")])
            .send()
            .await?
            .error_for_status()?;
        let body: GeocodingResponse = response.json().await?;
        Ok(body.results.unwrap_or_default())
    }

    async fn hourly_temperatures(&self, place: &Place) -> Result<Vec<Option<f64>>> {
        let params = [
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            ("hourly", "temperature_2m".to_string()),
            ("forecast_days", "1".to_string()),
            ("timezone", "auto".to_string()),
        ];
        let response = self
            .client
            .get(&self.config.forecast_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let body: ForecastResponse = response.json().await?;
        Ok(body
            .hourly
            .and_then(|hourly| hourly.temperature_2m)
            .unwrap_or_default())
    }

    /// Resolve `city` and fetch the temperatures of the next hours
    pub async fn forecast(&self, city: &str) -> Result<Forecast, WeatherError> {
        let input = city.trim();
        if input.is_empty() {
            return Err(WeatherError::EmptyCity);
        }

        let mut places = Vec::new();
        for query in candidate_queries(input) {
            match self.geocode(&query).await {
                Ok(found) if !found.is_empty() => {
                    debug!(query = %query, candidates = found.len(), "geocoding matched");
                    places = found;
                    break;
                }
                Ok(_) => debug!(query = %query, "geocoding returned no results"),
                Err(e) => warn!(query = %query, error = %e, "geocoding query failed"),
            }
        }

        let place = best_place(&places, input)
            .ok_or_else(|| WeatherError::NotFound(input.to_string()))?;
        let label = place.label();

        let mut temperatures = self
            .hourly_temperatures(place)
            .await
            .map_err(|e| WeatherError::Request(e.to_string()))?;
        temperatures.truncate(NEXT_HOURS);
        if temperatures.is_empty() {
            return Err(WeatherError::NoTemperatures(label));
        }

        Ok(Forecast {
            city: label,
            next_hours_c: temperatures,
        })
    }
}

/// The `clima` tool
pub struct WeatherTool {
    client: WeatherClient,
}

impl WeatherTool {
    pub fn new(client: WeatherClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    async fn invoke(&self, args: ToolArgs) -> ToolResult<Value> {
        let args = match args {
            ToolArgs::Weather(args) => args,
            other => return Err(other.mismatch("clima")),
        };

        match self.client.forecast(&args.city).await {
            Ok(forecast) => {
                serde_json::to_value(forecast).map_err(|e| ToolError::failed("clima", e))
            }
            Err(e) if e.is_user_facing() => Ok(json!({ "error": e.to_string() })),
            Err(e) => Err(ToolError::failed("clima", e)),
        }
    }
}
