//! Turns an observation into the values written to the mission: clouds,
//! wind, fog, dust, temperature and pressure.

use chrono::NaiveDate;
use rand::Rng;

use crate::config::WeatherOptions;
use crate::observation::Observation;
use crate::providers::openmeteo::WindsAloft;

mod clouds;
mod misc;
pub mod presets;
mod wind;

pub use clouds::{CloudSelection, Precipitation};
pub use misc::{Dust, Fog, Pressure};
pub use wind::{WindLayer, Winds};

pub const CLEAR_CODES: &[&str] = &["CAVOK", "CLR", "SKC", "NSC", "NCD"];

/// Splits a METAR weather group such as `+VCTSRA` into its two-letter
/// phenomena (`TS`, `RA`), dropping intensity and proximity prefixes.
pub fn condition_groups(code: &str) -> Vec<&str> {
    let code = code.trim_start_matches(&['+', '-'][..]);
    let code = code
        .strip_prefix("VC")
        .or_else(|| code.strip_prefix("RE"))
        .unwrap_or(code);
    (0..code.len())
        .step_by(2)
        .filter_map(|i| code.get(i..(i + 2).min(code.len())))
        .collect()
}

pub(crate) fn has_condition(observation: &Observation, codes: &[&str]) -> bool {
    observation
        .conditions
        .iter()
        .flat_map(|code| condition_groups(code))
        .any(|group| codes.contains(&group))
}

/// Everything the mission pipeline writes. A section left as `None` keeps
/// the mission's existing values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MissionWeatherParameters {
    pub wind: Option<Winds>,
    pub temperature: Option<f64>,
    pub pressure: Option<Pressure>,
    pub fog: Option<Fog>,
    pub dust: Option<Dust>,
    pub clouds: Option<CloudSelection>,
    /// Seconds since midnight.
    pub start_time: Option<u32>,
    pub date: Option<NaiveDate>,
}

/// Computes every enabled weather section. `aloft` is used for the upper
/// wind layers when present.
pub fn compute(
    observation: &Observation,
    options: &WeatherOptions,
    aloft: Option<&WindsAloft>,
    rng: &mut impl Rng,
) -> MissionWeatherParameters {
    let mut parameters = MissionWeatherParameters::default();

    if options.wind.enable {
        parameters.wind = Some(wind::compute_winds(
            observation,
            &options.wind,
            options.runway_elevation,
            aloft,
            rng,
        ));
    }

    if options.temperature.enable {
        parameters.temperature = Some(misc::temperature(observation));
    }

    if options.pressure.enable {
        parameters.pressure = Some(misc::pressure(observation, options.runway_elevation));
    }

    if options.fog.enable {
        parameters.fog = Some(misc::fog(observation, &options.fog, rng));
    }

    if options.dust.enable {
        parameters.dust = Some(misc::dust(observation, &options.dust));
    }

    if options.clouds.enable {
        let selection =
            clouds::select_clouds(observation, &options.clouds, options.runway_elevation, rng);
        match selection.preset_name() {
            Some(name) => tracing::info!("   Cloud preset:          {name} at {} m", selection.base()),
            None => tracing::info!("   Cloud preset:          clear"),
        }
        parameters.clouds = Some(selection);
    }

    parameters
}
