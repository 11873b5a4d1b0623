//! aviationweather.gov METAR JSON feed.

use rand::{thread_rng, Rng};
use reqwest::blocking::Client;
use serde_derive::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{send, ProviderError, WeatherProvider};
use crate::observation::{parse_timestamp, CloudLayer, Location, PartialObservation, Wind};
use crate::units::{ft_to_m, hpa_to_inhg, kt_to_mps, sm_to_m};
use crate::weather::CLEAR_CODES;

pub const NAME: &str = "aviationweather";

const URL: &str = "https://aviationweather.gov/api/data/metar";

pub struct AviationWeather {
    client: Client,
}

impl AviationWeather {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl WeatherProvider for AviationWeather {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fetch(&self, icao: &str) -> Result<PartialObservation, ProviderError> {
        let request = self
            .client
            .get(URL)
            .query(&[("ids", icao), ("format", "json")]);
        let mut partial = normalize(&send(request)?, &mut thread_rng())?;
        partial.icao = Some(icao.to_uppercase());
        Ok(partial)
    }
}

#[derive(Debug, Deserialize)]
struct Record {
    temp: Option<f64>,
    dewp: Option<f64>,
    /// Degrees, or "VRB".
    wdir: Option<Value>,
    /// Knots.
    wspd: Option<f64>,
    wgst: Option<f64>,
    /// Statute miles, or a string such as "10+".
    visib: Option<Value>,
    /// Hectopascals.
    altim: Option<f64>,
    #[serde(rename = "wxString")]
    wx_string: Option<String>,
    #[serde(default)]
    clouds: Vec<RecordCloud>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(rename = "reportTime")]
    report_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordCloud {
    cover: Option<String>,
    /// Feet above the station.
    base: Option<f64>,
}

/// Maps the first record of a METAR feed response. Variable wind directions
/// are replaced with a random ten-degree heading.
pub fn normalize(body: &[u8], rng: &mut impl Rng) -> Result<PartialObservation, ProviderError> {
    let records: Vec<Record> = serde_json::from_slice(body)?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Format(String::from("no results")))?;

    let direction = match &record.wdir {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(_) => {
            warn!("Converting variable winds to random direction");
            f64::from(rng.gen_range(0..36u32) * 10)
        }
        None => 0.0,
    };

    Ok(PartialObservation {
        icao: None,
        observed: record.report_time.as_deref().and_then(parse_timestamp),
        barometer: record.altim.map(hpa_to_inhg),
        temperature: record.temp,
        dewpoint: record.dewp,
        visibility: record.visib.as_ref().map(visibility),
        wind: Some(Wind {
            direction,
            speed: record.wspd.map(kt_to_mps).unwrap_or_default(),
            gust: record.wgst.map(kt_to_mps).unwrap_or_default(),
        }),
        clouds: Some(
            record
                .clouds
                .into_iter()
                .filter_map(|cloud| match (cloud.cover, cloud.base) {
                    (Some(cover), _) if CLEAR_CODES.contains(&cover.as_str()) => {
                        Some(CloudLayer::new(&cover, 0.0))
                    }
                    (Some(cover), Some(base)) => Some(CloudLayer::new(&cover, ft_to_m(base))),
                    _ => None,
                })
                .collect(),
        ),
        conditions: record
            .wx_string
            .map(|wx| wx.split_whitespace().map(str::to_owned).collect()),
        location: match (record.lon, record.lat) {
            (Some(longitude), Some(latitude)) => Some(Location {
                longitude,
                latitude,
            }),
            _ => None,
        },
    })
}

fn visibility(value: &Value) -> f64 {
    let miles = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('+').parse().ok(),
        _ => None,
    };
    match miles {
        Some(miles) => sm_to_m(miles),
        None => {
            warn!("Failed to parse visibility {value}, using 9000 meters");
            9000.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const FEED: &str = r#"[{
        "icaoId": "KLAS",
        "reportTime": "2024-07-04 18:56:00",
        "temp": 41.7,
        "dewp": -5.6,
        "wdir": "VRB",
        "wspd": 5,
        "wgst": null,
        "visib": "10+",
        "altim": 1008.5,
        "wxString": "-TSRA BR",
        "lat": 36.0719,
        "lon": -115.1634,
        "clouds": [
            { "cover": "FEW", "base": 8000 },
            { "cover": "BKN", "base": 20000 },
            { "cover": "SCT" }
        ]
    }]"#;

    #[test]
    fn maps_feed_record() {
        let partial = normalize(FEED.as_bytes(), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(partial.temperature, Some(41.7));
        assert_eq!(partial.dewpoint, Some(-5.6));
        assert_eq!(partial.visibility, Some(sm_to_m(10.0)));
        assert!((partial.barometer.unwrap() - 29.78).abs() < 0.01);
        assert_eq!(partial.conditions.unwrap(), ["-TSRA", "BR"]);
        assert_eq!(
            partial.clouds.unwrap(),
            [
                CloudLayer::new("FEW", ft_to_m(8000.0)),
                CloudLayer::new("BKN", ft_to_m(20000.0))
            ]
        );
        assert_eq!(partial.location.unwrap().longitude, -115.1634);
        assert_eq!(
            partial.observed.unwrap().format("%d%H%M").to_string(),
            "041856"
        );

        let wind = partial.wind.unwrap();
        assert_eq!(wind.direction % 10.0, 0.0);
        assert!((0.0..360.0).contains(&wind.direction));
        assert_eq!(wind.speed, kt_to_mps(5.0));
        assert_eq!(wind.gust, 0.0);
    }

    #[test]
    fn numeric_fields_and_clear_sky() {
        let body = br#"[{ "wdir": 250, "wspd": 12, "wgst": 20, "visib": 6, "clouds": [ { "cover": "CLR" } ] }]"#;
        let partial = normalize(body, &mut StdRng::seed_from_u64(1)).unwrap();
        let wind = partial.wind.unwrap();
        assert_eq!(wind.direction, 250.0);
        assert_eq!(wind.gust, kt_to_mps(20.0));
        assert_eq!(partial.visibility, Some(sm_to_m(6.0)));
        assert_eq!(partial.clouds.unwrap(), [CloudLayer::new("CLR", 0.0)]);
        assert!(partial.barometer.is_none());
    }

    #[test]
    fn empty_feed_is_a_format_error() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(normalize(b"[]", &mut rng), Err(ProviderError::Format(_))));
    }
}
