use anyhow::{Context, Result};
use serde_derive::Deserialize;
use std::{fmt::Debug, fs::File, io::Read, path::Path};
use tracing::warn;

use crate::providers::{aviationweather, checkwx, custom};
use crate::weather::presets;

pub const DEFAULT_PATH: &str = "realweather.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub realweather: RealWeather,
    pub api: Api,
    pub options: Options,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RealWeather {
    pub mission: MissionFiles,
    pub log: Log,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MissionFiles {
    pub input: String,
    /// Empty means the input archive is rewritten in place.
    pub output: String,
    pub brief: Brief,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Brief {
    pub add_metar: bool,
    pub insert_key: String,
    pub remarks: String,
}

impl Default for Brief {
    fn default() -> Self {
        Self {
            add_metar: true,
            insert_key: String::from("==Real Weather METAR=="),
            remarks: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Log {
    pub level: String,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Api {
    pub provider_priority: Vec<String>,
    pub aviationweather: Toggle,
    pub checkwx: CheckWxApi,
    pub custom: CustomApi,
    pub openmeteo: Toggle,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            provider_priority: [aviationweather::NAME, checkwx::NAME, custom::NAME]
                .map(String::from)
                .to_vec(),
            aviationweather: Toggle::default(),
            checkwx: CheckWxApi::default(),
            custom: CustomApi::default(),
            openmeteo: Toggle::default(),
        }
    }
}

/// A section that only switches a feature on or off.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Toggle {
    pub enable: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enable: true }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CheckWxApi {
    pub enable: bool,
    pub key: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CustomApi {
    pub enable: bool,
    pub file: String,
    /// Merge the custom file over whatever provider succeeded.
    #[serde(rename = "override")]
    pub override_fetched: bool,
}

impl Default for CustomApi {
    fn default() -> Self {
        Self {
            enable: false,
            file: String::from("checkwx.json"),
            override_fetched: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Options {
    pub time: TimeOptions,
    pub date: DateOptions,
    pub weather: WeatherOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TimeOptions {
    pub enable: bool,
    pub system_time: bool,
    /// Duration such as `-1h30m`.
    pub offset: String,
}

impl Default for TimeOptions {
    fn default() -> Self {
        Self {
            enable: true,
            system_time: false,
            offset: String::from("0h"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DateOptions {
    pub enable: bool,
    pub system_date: bool,
    /// Calendar offset such as `+1y-2m3d`.
    pub offset: String,
}

impl Default for DateOptions {
    fn default() -> Self {
        Self {
            enable: true,
            system_date: false,
            offset: String::from("0"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WeatherOptions {
    pub enable: bool,
    pub icao: String,
    /// Meters above sea level.
    pub runway_elevation: f64,
    pub wind: WindOptions,
    pub temperature: Toggle,
    pub pressure: Toggle,
    pub fog: FogOptions,
    pub dust: DustOptions,
    pub clouds: CloudOptions,
}

impl Default for WeatherOptions {
    fn default() -> Self {
        Self {
            enable: true,
            icao: String::from(crate::observation::DEFAULT_ICAO),
            runway_elevation: 0.0,
            wind: WindOptions::default(),
            temperature: Toggle::default(),
            pressure: Toggle::default(),
            fog: FogOptions::default(),
            dust: DustOptions::default(),
            clouds: CloudOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WindOptions {
    pub enable: bool,
    pub minimum: f64,
    pub maximum: f64,
    pub gust_minimum: f64,
    pub gust_maximum: f64,
    pub stability: f64,
    pub fixed_reference: bool,
    /// Window for the mission's "to" directions, in degrees.
    pub direction_minimum: Option<i32>,
    pub direction_maximum: Option<i32>,
}

impl Default for WindOptions {
    fn default() -> Self {
        Self {
            enable: true,
            minimum: 0.0,
            maximum: 50.0,
            gust_minimum: 0.0,
            gust_maximum: 50.0,
            stability: 0.143,
            fixed_reference: false,
            direction_minimum: None,
            direction_maximum: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FogMode {
    Legacy,
    Manual,
    #[default]
    Auto,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FogOptions {
    pub enable: bool,
    pub mode: FogMode,
    pub thickness_minimum: i32,
    pub thickness_maximum: i32,
    pub visibility_minimum: i32,
    pub visibility_maximum: i32,
}

impl Default for FogOptions {
    fn default() -> Self {
        Self {
            enable: true,
            mode: FogMode::Auto,
            thickness_minimum: 0,
            thickness_maximum: 100,
            visibility_minimum: 0,
            visibility_maximum: 6000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DustOptions {
    pub enable: bool,
    pub visibility_minimum: i32,
    pub visibility_maximum: i32,
}

impl Default for DustOptions {
    fn default() -> Self {
        Self {
            enable: true,
            visibility_minimum: 300,
            visibility_maximum: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CloudOptions {
    pub enable: bool,
    pub fallback_to_legacy: bool,
    pub custom_precipitation: bool,
    pub density_minimum: u32,
    pub density_maximum: u32,
    pub base: BaseRange,
    pub presets: PresetOptions,
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self {
            enable: true,
            fallback_to_legacy: true,
            custom_precipitation: false,
            density_minimum: 0,
            density_maximum: 10,
            base: BaseRange::default(),
            presets: PresetOptions::default(),
        }
    }
}

/// Cloud base clamp in meters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BaseRange {
    pub minimum: i32,
    pub maximum: i32,
}

impl Default for BaseRange {
    fn default() -> Self {
        Self {
            minimum: 0,
            maximum: 15000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PresetOptions {
    pub default: String,
    pub disallowed: Vec<String>,
}

/// Reads the configuration file. Values are checked separately by
/// [`Config::validate`] once logging is up.
pub fn read_config(path: &Path) -> Result<Config> {
    let mut data = Vec::new();
    File::open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?
        .read_to_end(&mut data)?;

    parse_config(&data)
}

fn parse_config(data: &[u8]) -> Result<Config> {
    Ok(toml::from_slice(data)?)
}

fn ordered<T: PartialOrd + Debug>(what: &str, minimum: &mut T, maximum: &mut T) {
    if *minimum > *maximum {
        warn!("{what} minimum {minimum:?} is above maximum {maximum:?}, swapping them");
        std::mem::swap(minimum, maximum);
    }
}

fn finite(what: &str, value: &mut f64, default: f64) {
    if !value.is_finite() {
        warn!("{what} {value} is not a finite number, using {default}");
        *value = default;
    }
}

fn within<T: PartialOrd + Debug + Copy>(what: &str, value: &mut T, lower: T, upper: T) {
    if *value < lower || *value > upper {
        let clamped = if *value < lower { lower } else { upper };
        warn!("{what} {value:?} is outside {lower:?}..={upper:?}, using {clamped:?}");
        *value = clamped;
    }
}

impl Config {
    /// Corrects out-of-range settings, warning about each one.
    pub fn validate(&mut self) {
        self.api.provider_priority.retain(|name| {
            let known = [aviationweather::NAME, checkwx::NAME, custom::NAME].contains(&name.as_str());
            if !known {
                warn!("Unknown weather provider {name:?}, ignoring it");
            }
            known
        });

        let weather = &mut self.options.weather;
        finite("Runway elevation", &mut weather.runway_elevation, 0.0);

        let wind = &mut weather.wind;
        let defaults = WindOptions::default();
        finite("Wind minimum", &mut wind.minimum, defaults.minimum);
        finite("Wind maximum", &mut wind.maximum, defaults.maximum);
        finite("Gust minimum", &mut wind.gust_minimum, defaults.gust_minimum);
        finite("Gust maximum", &mut wind.gust_maximum, defaults.gust_maximum);
        finite("Wind stability", &mut wind.stability, defaults.stability);
        if !(wind.stability > 0.0) {
            warn!("Wind stability {} must be positive, using 0.143", wind.stability);
            wind.stability = 0.143;
        }
        within("Wind minimum", &mut wind.minimum, 0.0, 50.0);
        within("Wind maximum", &mut wind.maximum, 0.0, 50.0);
        ordered("Wind", &mut wind.minimum, &mut wind.maximum);
        within("Gust minimum", &mut wind.gust_minimum, 0.0, f64::MAX);
        within("Gust maximum", &mut wind.gust_maximum, 0.0, f64::MAX);
        ordered("Gust", &mut wind.gust_minimum, &mut wind.gust_maximum);
        if let (Some(minimum), Some(maximum)) =
            (&mut wind.direction_minimum, &mut wind.direction_maximum)
        {
            within("Wind direction minimum", minimum, 0, 360);
            within("Wind direction maximum", maximum, 0, 360);
            ordered("Wind direction", minimum, maximum);
        }

        let fog = &mut weather.fog;
        if fog.mode == FogMode::Unknown {
            warn!("Unknown fog mode, using auto");
            fog.mode = FogMode::Auto;
        }
        within("Fog thickness minimum", &mut fog.thickness_minimum, 0, 1000);
        within("Fog thickness maximum", &mut fog.thickness_maximum, 0, 1000);
        ordered("Fog thickness", &mut fog.thickness_minimum, &mut fog.thickness_maximum);
        within("Fog visibility minimum", &mut fog.visibility_minimum, 0, 6000);
        within("Fog visibility maximum", &mut fog.visibility_maximum, 0, 6000);
        ordered("Fog visibility", &mut fog.visibility_minimum, &mut fog.visibility_maximum);

        let dust = &mut weather.dust;
        within("Dust visibility minimum", &mut dust.visibility_minimum, 300, 3000);
        within("Dust visibility maximum", &mut dust.visibility_maximum, 300, 3000);
        ordered("Dust visibility", &mut dust.visibility_minimum, &mut dust.visibility_maximum);

        let clouds = &mut weather.clouds;
        within("Cloud density minimum", &mut clouds.density_minimum, 0, 10);
        within("Cloud density maximum", &mut clouds.density_maximum, 0, 10);
        ordered("Cloud density", &mut clouds.density_minimum, &mut clouds.density_maximum);
        within("Cloud base minimum", &mut clouds.base.minimum, 0, i32::MAX);
        within("Cloud base maximum", &mut clouds.base.maximum, 0, i32::MAX);
        ordered("Cloud base", &mut clouds.base.minimum, &mut clouds.base.maximum);

        let default = &clouds.presets.default;
        if !default.is_empty() && presets::find(default).is_none() {
            warn!("Default preset {default:?} does not exist, clearing it");
            clouds.presets.default.clear();
        }
    }
}
