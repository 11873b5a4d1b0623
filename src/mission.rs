//! Writes computed weather and clock values into an unpacked mission.

use std::{fs, io::Write, path::Path};

use tracing::{debug, info};

use crate::config::FogMode;
use crate::document::{serialize_global, DocumentError, ScriptEngine, Table, Value};
use crate::weather::{CloudSelection, MissionWeatherParameters};

pub const MISSION_FILE: &str = "mission";
const MISSION_GLOBAL: &str = "mission";

/// The field assignments for every section present in `parameters`.
pub fn assignments(parameters: &MissionWeatherParameters) -> Vec<(&'static str, Value)> {
    let mut fields: Vec<(&'static str, Value)> = Vec::new();

    if let Some(winds) = &parameters.wind {
        fields.extend([
            ("mission.weather.wind.atGround.speed", winds.ground.speed.into()),
            ("mission.weather.wind.atGround.dir", winds.ground.direction.into()),
            ("mission.weather.wind.at2000.speed", winds.at_2000.speed.into()),
            ("mission.weather.wind.at2000.dir", winds.at_2000.direction.into()),
            ("mission.weather.wind.at8000.speed", winds.at_8000.speed.into()),
            ("mission.weather.wind.at8000.dir", winds.at_8000.direction.into()),
            ("mission.weather.groundTurbulence", winds.gust.into()),
        ]);
    }

    if let Some(temperature) = parameters.temperature {
        fields.push(("mission.weather.season.temperature", temperature.into()));
    }

    if let Some(pressure) = &parameters.pressure {
        fields.push(("mission.weather.qnh", pressure.qff_mmhg.into()));
    }

    if let Some(fog) = &parameters.fog {
        let legacy = fog.enabled && fog.mode == FogMode::Legacy;
        fields.push(("mission.weather.enable_fog", legacy.into()));
        if legacy {
            fields.push(("mission.weather.fog.thickness", fog.thickness.into()));
            fields.push(("mission.weather.fog.visibility", fog.visibility.into()));
        }
        let fog2 = match fog.mode {
            _ if !fog.enabled => Value::Nil,
            FogMode::Legacy => Value::Nil,
            FogMode::Manual => {
                let mut manual = Table::new();
                manual.push(
                    Table::new()
                        .with("thickness", fog.thickness)
                        .with("time", 0)
                        .with("visibility", fog.visibility),
                );
                Table::new().with("mode", 4).with("manual", manual).into()
            }
            FogMode::Auto | FogMode::Unknown => Table::new().with("mode", 2).into(),
        };
        fields.push(("mission.weather.fog2", fog2));
    }

    if let Some(dust) = &parameters.dust {
        fields.push(("mission.weather.enable_dust", dust.enabled.into()));
        if dust.enabled {
            fields.push(("mission.weather.dust_density", dust.visibility.into()));
        }
    }

    if let Some(clouds) = &parameters.clouds {
        let (thickness, density, preset, iprecptns) = match clouds {
            CloudSelection::Clear => (200, 0, Value::Nil, 0),
            CloudSelection::Preset { name, .. } => (200, 0, Value::from(*name), 0),
            CloudSelection::Custom {
                thickness,
                density,
                precipitation,
                ..
            } => (*thickness, *density, Value::Nil, precipitation.code()),
        };
        fields.extend([
            ("mission.weather.clouds.thickness", thickness.into()),
            ("mission.weather.clouds.density", density.into()),
            ("mission.weather.clouds.preset", preset),
            ("mission.weather.clouds.base", clouds.base().into()),
            ("mission.weather.clouds.iprecptns", iprecptns.into()),
        ]);
    }

    if let Some(start_time) = parameters.start_time {
        fields.push(("mission.start_time", start_time.into()));
    }

    if let Some(date) = parameters.date {
        use chrono::Datelike;
        fields.extend([
            ("mission.date.Year", date.year().into()),
            ("mission.date.Month", date.month().into()),
            ("mission.date.Day", date.day().into()),
        ]);
    }

    fields
}

/// Replaces `path` with `text` by writing a sibling temporary file and
/// renaming it over the original.
pub fn replace_file(path: &Path, text: &str) -> Result<(), DocumentError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Loads the mission document in `dir`, applies `parameters` and writes the
/// result back. The file is left untouched if any step fails.
pub fn update_mission(
    engine: &mut impl ScriptEngine,
    dir: &Path,
    parameters: &MissionWeatherParameters,
) -> Result<(), DocumentError> {
    let path = dir.join(MISSION_FILE);
    info!("Loading mission {}", path.display());
    engine.load_document(&path)?;

    for (field, value) in assignments(parameters) {
        debug!(field, value = ?value, "Assigning");
        engine.assign(field, value)?;
    }

    let text = serialize_global(MISSION_GLOBAL, engine.get_global(MISSION_GLOBAL))?;
    replace_file(&path, &text)?;
    info!("Mission updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Interpreter;
    use crate::weather::{Dust, Fog, Precipitation, Pressure, WindLayer, Winds};
    use chrono::NaiveDate;

    const MISSION: &str = r#"mission = {
	["date"] = {
		["Day"] = 1,
		["Year"] = 2011,
		["Month"] = 6
	},
	["start_time"] = 28800,
	["weather"] = {
		["atmosphere_type"] = 0,
		["wind"] = {
			["at8000"] = {
				["speed"] = 0,
				["dir"] = 0
			},
			["atGround"] = {
				["speed"] = 0,
				["dir"] = 0
			},
			["at2000"] = {
				["speed"] = 0,
				["dir"] = 0
			}
		},
		["enable_fog"] = false,
		["season"] = {
			["temperature"] = 20
		},
		["qnh"] = 760,
		["dust_density"] = 0,
		["enable_dust"] = false,
		["clouds"] = {
			["thickness"] = 200,
			["density"] = 0,
			["preset"] = "Preset7",
			["base"] = 300,
			["iprecptns"] = 0
		},
		["fog"] = {
			["thickness"] = 0,
			["visibility"] = 0
		},
		["groundTurbulence"] = 0,
		["name"] = "Winter, clean sky",
		["fog2"] = {
			["mode"] = 2
		}
	},
	["sortie"] = "DictKey_sortie_5"
}"#;

    fn parameters() -> MissionWeatherParameters {
        let layer = |speed, direction| WindLayer { speed, direction };
        MissionWeatherParameters {
            wind: Some(Winds {
                ground: layer(2.5, 90),
                at_2000: layer(7.25, 100),
                at_8000: layer(12.0, 120),
                gust: 3.5,
            }),
            temperature: Some(-4.5),
            pressure: Some(Pressure {
                qnh_hpa: 1005.0,
                qff_mmhg: 754,
            }),
            fog: Some(Fog {
                enabled: true,
                mode: FogMode::Manual,
                thickness: 80,
                visibility: 1200,
            }),
            dust: Some(Dust {
                enabled: false,
                visibility: 0,
            }),
            clouds: Some(CloudSelection::Custom {
                kind: String::from("BKN"),
                base: 900,
                thickness: 1200,
                density: 8,
                precipitation: Precipitation::Storm,
            }),
            start_time: Some(53400),
            date: NaiveDate::from_ymd_opt(2024, 5, 12),
        }
    }

    fn updated(parameters: &MissionWeatherParameters) -> (Interpreter, String) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MISSION_FILE), MISSION).unwrap();
        let mut engine = Interpreter::new();
        update_mission(&mut engine, dir.path(), parameters).unwrap();
        let text = fs::read_to_string(dir.path().join(MISSION_FILE)).unwrap();
        (engine, text)
    }

    fn field<'a>(engine: &'a Interpreter, path: &[&str]) -> Option<&'a Value> {
        engine.get_global("mission").lookup(path)
    }

    #[test]
    fn writes_every_section() {
        let (engine, text) = updated(&parameters());
        let number = |path: &[&str]| field(&engine, path).and_then(Value::as_f64);

        assert_eq!(number(&["weather", "wind", "atGround", "dir"]), Some(90.0));
        assert_eq!(number(&["weather", "wind", "at2000", "speed"]), Some(7.25));
        assert_eq!(number(&["weather", "groundTurbulence"]), Some(3.5));
        assert_eq!(number(&["weather", "season", "temperature"]), Some(-4.5));
        assert_eq!(number(&["weather", "qnh"]), Some(754.0));
        assert_eq!(number(&["weather", "clouds", "density"]), Some(8.0));
        assert_eq!(number(&["weather", "clouds", "base"]), Some(900.0));
        assert_eq!(number(&["weather", "clouds", "iprecptns"]), Some(2.0));
        assert!(field(&engine, &["weather", "clouds", "preset"]).is_none());
        assert_eq!(number(&["weather", "fog2", "mode"]), Some(4.0));
        assert_eq!(
            field(&engine, &["weather", "enable_fog"]),
            Some(&Value::Bool(false))
        );
        assert_eq!(number(&["start_time"]), Some(53400.0));
        assert_eq!(number(&["date", "Year"]), Some(2024.0));
        assert_eq!(number(&["date", "Month"]), Some(5.0));
        assert_eq!(number(&["date", "Day"]), Some(12.0));
        assert_eq!(
            field(&engine, &["weather", "name"]).and_then(Value::as_str),
            Some("Winter, clean sky")
        );

        assert!(text.starts_with("mission = {\n\t[\"date\"] = {\n\t\t[\"Day\"] = 12,"));
        assert!(text.contains(
            "\t\t[\"fog2\"] = {\n\t\t\t[\"mode\"] = 4,\n\t\t\t[\"manual\"] = {\n\t\t\t\t[1] = {\n\t\t\t\t\t[\"thickness\"] = 80,\n\t\t\t\t\t[\"time\"] = 0,\n\t\t\t\t\t[\"visibility\"] = 1200\n\t\t\t\t}\n\t\t\t}\n\t\t}"
        ));
    }

    #[test]
    fn fog_modes() {
        let mut parameters = MissionWeatherParameters::default();
        let fog = |enabled, mode| Fog {
            enabled,
            mode,
            thickness: 50,
            visibility: 800,
        };

        parameters.fog = Some(fog(true, FogMode::Legacy));
        let (engine, _) = updated(&parameters);
        assert_eq!(field(&engine, &["weather", "enable_fog"]), Some(&Value::Bool(true)));
        assert_eq!(
            field(&engine, &["weather", "fog", "visibility"]).and_then(Value::as_f64),
            Some(800.0)
        );
        assert!(field(&engine, &["weather", "fog2"]).is_none());

        parameters.fog = Some(fog(true, FogMode::Auto));
        let (engine, _) = updated(&parameters);
        assert_eq!(
            field(&engine, &["weather", "fog2", "mode"]).and_then(Value::as_f64),
            Some(2.0)
        );

        parameters.fog = Some(fog(false, FogMode::Manual));
        let (engine, _) = updated(&parameters);
        assert_eq!(field(&engine, &["weather", "enable_fog"]), Some(&Value::Bool(false)));
        assert!(field(&engine, &["weather", "fog2"]).is_none());
    }

    #[test]
    fn preset_and_clear_clouds() {
        let mut parameters = MissionWeatherParameters {
            clouds: Some(CloudSelection::Preset {
                name: "RainyPreset1",
                base: 457,
            }),
            ..Default::default()
        };
        let (engine, _) = updated(&parameters);
        assert_eq!(
            field(&engine, &["weather", "clouds", "preset"]).and_then(Value::as_str),
            Some("RainyPreset1")
        );
        assert_eq!(
            field(&engine, &["weather", "clouds", "density"]).and_then(Value::as_f64),
            Some(0.0)
        );

        parameters.clouds = Some(CloudSelection::Clear);
        let (engine, _) = updated(&parameters);
        assert!(field(&engine, &["weather", "clouds", "preset"]).is_none());
        assert_eq!(
            field(&engine, &["weather", "clouds", "base"]).and_then(Value::as_f64),
            Some(0.0)
        );
    }

    #[test]
    fn untouched_sections_survive() {
        let (engine, text) = updated(&MissionWeatherParameters::default());
        assert_eq!(
            field(&engine, &["weather", "clouds", "preset"]).and_then(Value::as_str),
            Some("Preset7")
        );
        assert_eq!(text, MISSION);
    }

    #[test]
    fn failed_update_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MISSION_FILE);
        fs::write(&path, "mission = { [\"weather\"] = 1 }").unwrap();
        let mut engine = Interpreter::new();
        let parameters = MissionWeatherParameters {
            temperature: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(
            update_mission(&mut engine, dir.path(), &parameters),
            Err(DocumentError::Eval(_))
        ));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "mission = { [\"weather\"] = 1 }"
        );
    }
}
