//! Winds aloft from the Open-Meteo forecast API. The 800 hPa and 400 hPa
//! levels stand in for the mission's 2000 m and 8000 m wind layers.

use chrono::NaiveDateTime;
use reqwest::blocking::Client;
use serde_derive::Deserialize;
use tracing::{debug, info};

use super::{send, ProviderError};
use crate::observation::Location;

const URL: &str = "https://api.open-meteo.com/v1/forecast";
const HOURLY: &str = "windspeed_800hPa,windspeed_400hPa,winddirection_800hPa,winddirection_400hPa";

/// Wind speeds in m/s and "from" directions in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindsAloft {
    pub speed_2000: f64,
    pub direction_2000: f64,
    pub speed_8000: f64,
    pub direction_8000: f64,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    hourly: Hourly,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    time: Vec<String>,
    #[serde(rename = "windspeed_800hPa")]
    speed_800: Vec<Option<f64>>,
    #[serde(rename = "windspeed_400hPa")]
    speed_400: Vec<Option<f64>>,
    #[serde(rename = "winddirection_800hPa")]
    direction_800: Vec<Option<f64>>,
    #[serde(rename = "winddirection_400hPa")]
    direction_400: Vec<Option<f64>>,
}

pub fn fetch(
    client: &Client,
    location: Location,
    now: NaiveDateTime,
) -> Result<WindsAloft, ProviderError> {
    info!("Getting winds aloft data from Open Meteo...");
    let request = client.get(URL).query(&[
        ("latitude", format!("{:.6}", location.latitude)),
        ("longitude", format!("{:.6}", location.longitude)),
        ("hourly", String::from(HOURLY)),
        ("wind_speed_unit", String::from("ms")),
        ("timezone", String::from("GMT")),
    ]);
    let winds = parse(&send(request)?, now)?;
    debug!(?winds, "Parsed winds aloft data");
    Ok(winds)
}

/// Picks the forecast entry for the UTC hour containing `now`.
pub fn parse(body: &[u8], now: NaiveDateTime) -> Result<WindsAloft, ProviderError> {
    let forecast: Forecast = serde_json::from_slice(body)?;
    let hourly = forecast.hourly;
    let stamp = now.format("%Y-%m-%dT%H:00").to_string();

    let index = hourly
        .time
        .iter()
        .position(|time| *time == stamp)
        .ok_or_else(|| ProviderError::Format(format!("no forecast for {stamp}")))?;

    let at = |values: &[Option<f64>], what: &str| {
        values
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| ProviderError::Format(format!("missing {what} at {stamp}")))
    };

    Ok(WindsAloft {
        speed_2000: at(&hourly.speed_800, "800 hPa wind speed")?,
        direction_2000: at(&hourly.direction_800, "800 hPa wind direction")?,
        speed_8000: at(&hourly.speed_400, "400 hPa wind speed")?,
        direction_8000: at(&hourly.direction_400, "400 hPa wind direction")?,
    })
}
