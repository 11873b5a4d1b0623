//! Renders the weather as applied to the mission as a METAR line for the
//! mission brief.

use crate::observation::Observation;
use crate::units::{m_to_ft, m_to_sm, mps_to_kt};
use crate::weather::{presets, CloudSelection, MissionWeatherParameters, CLEAR_CODES};

fn hundreds_of_feet(meters: f64) -> i64 {
    (m_to_ft(meters) / 100.0).round() as i64
}

fn temperature(celsius: f64) -> String {
    let rounded = celsius.round() as i64;
    if rounded < 0 {
        format!("M{:02}", -rounded)
    } else {
        format!("{rounded:02}")
    }
}

fn wind_group(observation: &Observation, parameters: &MissionWeatherParameters) -> String {
    let (speed, gust) = match &parameters.wind {
        Some(winds) => (winds.ground.speed, winds.gust),
        None => (observation.wind.speed, observation.wind.gust),
    };
    let direction = (observation.wind.direction.round() as i64).rem_euclid(360);
    let speed = mps_to_kt(speed).round() as i64;
    let gust = mps_to_kt(gust).round() as i64;
    if gust > 0 {
        format!("{direction:03}{speed:02}G{gust:02}KT")
    } else {
        format!("{direction:03}{speed:02}KT")
    }
}

fn cloud_groups(observation: &Observation, parameters: &MissionWeatherParameters) -> Vec<String> {
    match &parameters.clouds {
        Some(CloudSelection::Clear) => vec![String::from("CLR")],
        Some(CloudSelection::Preset { name, base }) => presets::decode(name)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(index, layer)| match index {
                0 => format!("{}{:03}", layer.coverage, hundreds_of_feet(f64::from(*base))),
                _ => format!("{}{:03}", layer.coverage, layer.base),
            })
            .collect(),
        Some(CloudSelection::Custom { kind, base, .. }) => {
            vec![format!("{kind}{:03}", hundreds_of_feet(f64::from(*base)))]
        }
        None => {
            let groups: Vec<_> = observation
                .clouds
                .iter()
                .filter(|layer| !CLEAR_CODES.contains(&layer.coverage.as_str()))
                .map(|layer| format!("{}{:03}", layer.coverage, hundreds_of_feet(layer.base)))
                .collect();
            if groups.is_empty() {
                vec![String::from("CLR")]
            } else {
                groups
            }
        }
    }
}

pub fn generate(
    observation: &Observation,
    parameters: &MissionWeatherParameters,
    remarks: &str,
) -> String {
    let mut groups = vec![
        observation.icao.clone(),
        observation.observed.format("%d%H%MZ").to_string(),
        wind_group(observation, parameters),
        format!("{}SM", m_to_sm(observation.visibility).round().clamp(0.0, 10.0) as i64),
    ];
    groups.extend(observation.conditions.iter().cloned());
    groups.extend(cloud_groups(observation, parameters));
    groups.push(format!(
        "{}/{}",
        temperature(observation.temperature),
        temperature(observation.dewpoint)
    ));
    groups.push(format!("A{:04}", (observation.barometer * 100.0).round() as i64));
    groups.push(String::from("NOSIG"));
    if !remarks.trim().is_empty() {
        groups.push(remarks.trim().to_owned());
    }
    groups.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{CloudLayer, Wind};
    use crate::units::{ft_to_m, kt_to_mps, sm_to_m};
    use crate::weather::{Precipitation, WindLayer, Winds};
    use chrono::NaiveDate;

    fn observation() -> Observation {
        let observed = NaiveDate::from_ymd_opt(2024, 5, 12)
            .unwrap()
            .and_hms_opt(14, 50, 0)
            .unwrap();
        Observation {
            icao: String::from("UGTB"),
            wind: Wind {
                direction: 270.0,
                speed: kt_to_mps(5.0),
                gust: 0.0,
            },
            ..Observation::fallback(observed)
        }
    }

    fn winds(speed: f64, gust: f64) -> Winds {
        let layer = WindLayer {
            speed,
            direction: 90,
        };
        Winds {
            ground: layer,
            at_2000: layer,
            at_8000: layer,
            gust,
        }
    }

    #[test]
    fn clear_sky() {
        let parameters = MissionWeatherParameters {
            wind: Some(winds(kt_to_mps(5.0), 0.0)),
            clouds: Some(CloudSelection::Clear),
            ..Default::default()
        };
        assert_eq!(
            generate(&observation(), &parameters, ""),
            "UGTB 121450Z 27005KT 10SM CLR 15/10 A2992 NOSIG"
        );
    }

    #[test]
    fn preset_layers_and_remarks() {
        let mut obs = observation();
        obs.temperature = -3.6;
        obs.dewpoint = -0.4;
        obs.visibility = sm_to_m(3.4);
        obs.conditions = vec![String::from("-RA"), String::from("BR")];
        obs.barometer = 29.786;
        let parameters = MissionWeatherParameters {
            wind: Some(winds(kt_to_mps(12.0), kt_to_mps(21.0))),
            clouds: Some(CloudSelection::Preset {
                name: "RainyPreset1",
                base: 457,
            }),
            ..Default::default()
        };
        assert_eq!(
            generate(&obs, &parameters, "RMK AO2"),
            "UGTB 121450Z 27012G21KT 3SM -RA BR OVC015 OVC280 FEW400 M04/00 A2979 NOSIG RMK AO2"
        );
    }

    #[test]
    fn applied_wind_and_custom_clouds() {
        let parameters = MissionWeatherParameters {
            wind: Some(winds(kt_to_mps(40.0), kt_to_mps(60.0))),
            clouds: Some(CloudSelection::Custom {
                kind: String::from("FEW"),
                base: ft_to_m(2500.0).round() as i32,
                thickness: 500,
                density: 2,
                precipitation: Precipitation::None,
            }),
            ..Default::default()
        };
        let metar = generate(&observation(), &parameters, "");
        assert!(metar.contains(" 27040G60KT "), "{metar}");
        assert!(metar.contains(" FEW025 "), "{metar}");
    }

    #[test]
    fn observed_clouds_when_clouds_are_not_applied() {
        let mut obs = observation();
        obs.clouds = vec![
            CloudLayer::new("FEW", ft_to_m(3000.0)),
            CloudLayer::new("BKN", ft_to_m(12000.0)),
        ];
        let metar = generate(&obs, &MissionWeatherParameters::default(), "");
        assert!(metar.contains(" 27005KT 10SM FEW030 BKN120 15/10 "), "{metar}");
    }
}
