//! Weather lookup tool backed by the OpenWeather current-weather API.

use async_trait::async_trait;
use serde::Deserialize;
use tooloop_core::error::ToolError;
use tooloop_core::tool::{FieldKind, InputSchema, Tool, ToolOutput};

const ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

pub struct WeatherLookupTool {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl WeatherLookupTool {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Tool for WeatherLookupTool {
    fn name(&self) -> &str {
        "weather_lookup"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city: temperature in °C and a short description."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::empty().required("city", FieldKind::String, "City name, e.g. 'Mumbai'")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let city = arguments["city"].as_str().unwrap_or_default().trim();
        if city.is_empty() {
            return Err(ToolError::invalid(self.name(), "city must not be empty"));
        }
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ToolError::failed(
                self.name(),
                "no OpenWeather API key configured (set OPENWEATHER_API_KEY)",
            ));
        };

        let response = self
            .client
            .get(ENDPOINT)
            .query(&[("q", city), ("units", "metric"), ("appid", api_key)])
            .send()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::failed(
                self.name(),
                format!("Failed to fetch weather for '{city}' (HTTP {})", status.as_u16()),
            ));
        }

        let report: WeatherReport = response
            .json()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("unexpected response: {e}")))?;
        Ok(ToolOutput::Text(format_weather(&report)))
    }
}

#[derive(Debug, Deserialize)]
pub struct WeatherReport {
    pub name: String,
    pub main: MainReading,
    #[serde(default)]
    pub weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
pub struct MainReading {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub description: String,
}

pub fn format_weather(report: &WeatherReport) -> String {
    let description = report
        .weather
        .first()
        .map(|c| c.description.as_str())
        .unwrap_or("no description available");
    format!("Weather in {}: {}°C, {description}", report.name, report.main.temp)
}
