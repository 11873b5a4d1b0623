//! CheckWX decoded METAR API. The same JSON layout is used for custom
//! weather files.

use reqwest::blocking::Client;
use serde_derive::{Deserialize, Serialize};

use super::{send, ProviderError, WeatherProvider};
use crate::observation::{parse_timestamp, CloudLayer, Location, PartialObservation, Wind};
use crate::units::{ft_to_m, kt_to_mps, sm_to_m};

pub const NAME: &str = "checkwx";

const BASE_URL: &str = "https://api.checkwx.com";

pub struct CheckWx {
    client: Client,
    key: String,
}

impl CheckWx {
    pub fn new(client: Client, key: &str) -> Self {
        Self {
            client,
            key: key.to_owned(),
        }
    }
}

impl WeatherProvider for CheckWx {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fetch(&self, icao: &str) -> Result<PartialObservation, ProviderError> {
        let request = self
            .client
            .get(format!("{BASE_URL}/metar/{icao}/decoded"))
            .header("X-API-Key", &self.key);
        normalize(&send(request)?)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Payload {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default)]
    pub results: usize,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barometer: Option<Barometer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Degrees>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dewpoint: Option<Degrees>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<WindRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clouds: Option<Vec<Cloud>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<Station>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Barometer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpa: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Degrees {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub celsius: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Visibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meters_float: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miles_float: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WindRecord {
    #[serde(default)]
    pub degrees: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust_mps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust_kts: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Cloud {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feet: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Condition {
    pub code: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Station {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Geometry {
    /// Longitude, latitude.
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

/// Parses a CheckWX-format document and maps its first record.
pub fn normalize(body: &[u8]) -> Result<PartialObservation, ProviderError> {
    let payload: Payload = serde_json::from_slice(body)?;
    let record = payload
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Format(String::from("no results")))?;
    Ok(record.into())
}

impl From<Record> for PartialObservation {
    fn from(record: Record) -> Self {
        PartialObservation {
            icao: record.icao.map(|icao| icao.to_uppercase()),
            observed: record.observed.as_deref().and_then(parse_timestamp),
            barometer: record
                .barometer
                .and_then(|b| b.hg.or_else(|| b.hpa.map(crate::units::hpa_to_inhg))),
            temperature: record.temperature.and_then(|t| t.celsius),
            dewpoint: record.dewpoint.and_then(|t| t.celsius),
            visibility: record
                .visibility
                .and_then(|v| v.meters_float.or_else(|| v.miles_float.map(sm_to_m))),
            wind: record.wind.map(|w| Wind {
                direction: w.degrees,
                speed: w
                    .speed_mps
                    .or_else(|| w.speed_kts.map(kt_to_mps))
                    .unwrap_or_default(),
                gust: w
                    .gust_mps
                    .or_else(|| w.gust_kts.map(kt_to_mps))
                    .unwrap_or_default(),
            }),
            clouds: record.clouds.map(|clouds| {
                clouds
                    .into_iter()
                    .map(|cloud| CloudLayer {
                        base: cloud
                            .meters
                            .or_else(|| cloud.feet.map(ft_to_m))
                            .unwrap_or_default(),
                        coverage: cloud.code,
                    })
                    .collect()
            }),
            conditions: record
                .conditions
                .map(|conditions| conditions.into_iter().map(|c| c.code).collect()),
            location: record
                .station
                .and_then(|s| s.geometry)
                .and_then(|g| match g.coordinates[..] {
                    [longitude, latitude, ..] => Some(Location {
                        longitude,
                        latitude,
                    }),
                    _ => None,
                }),
        }
    }
}
