//! The provider-agnostic weather snapshot every provider normalizes into.

use chrono::{NaiveDateTime, Timelike, Utc};
use tracing::warn;

pub const DEFAULT_ICAO: &str = "DGAA";

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Wind as reported: direction is where the wind blows FROM, speeds in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wind {
    pub direction: f64,
    pub speed: f64,
    pub gust: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudLayer {
    pub coverage: String,
    /// Meters above the station.
    pub base: f64,
}

impl CloudLayer {
    pub fn new(coverage: &str, base: f64) -> Self {
        Self {
            coverage: coverage.to_owned(),
            base,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub icao: String,
    /// Observation time, UTC, whole seconds.
    pub observed: NaiveDateTime,
    /// Altimeter setting, inHg.
    pub barometer: f64,
    pub temperature: f64,
    pub dewpoint: f64,
    /// Meters.
    pub visibility: f64,
    pub wind: Wind,
    pub clouds: Vec<CloudLayer>,
    pub conditions: Vec<String>,
    pub location: Location,
}

/// A provider payload after mapping but before defaults are filled in. Also
/// the shape of a custom override, where only present fields replace the
/// fetched observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialObservation {
    pub icao: Option<String>,
    pub observed: Option<NaiveDateTime>,
    pub barometer: Option<f64>,
    pub temperature: Option<f64>,
    pub dewpoint: Option<f64>,
    pub visibility: Option<f64>,
    pub wind: Option<Wind>,
    pub clouds: Option<Vec<CloudLayer>>,
    pub conditions: Option<Vec<String>>,
    pub location: Option<Location>,
}

macro_rules! or_default {
    ($field:expr, $default:expr, $what:literal) => {
        $field.unwrap_or_else(|| {
            warn!("No {} data, defaulting to {:?}", $what, $default);
            $default
        })
    };
}

impl PartialObservation {
    /// Fills every missing field with a conservative default, warning for
    /// each one.
    pub fn validate(self, icao: &str, now: NaiveDateTime) -> Observation {
        Observation {
            icao: self.icao.unwrap_or_else(|| icao.to_uppercase()),
            observed: or_default!(self.observed, whole_seconds(now), "observation time"),
            barometer: or_default!(self.barometer, 29.92, "barometer"),
            temperature: or_default!(self.temperature, 15.0, "temperature"),
            dewpoint: or_default!(self.dewpoint, 0.0, "dewpoint"),
            visibility: or_default!(self.visibility, 9000.0, "visibility"),
            wind: or_default!(self.wind, Wind::default(), "wind"),
            clouds: self.clouds.unwrap_or_default(),
            conditions: self.conditions.unwrap_or_default(),
            location: or_default!(self.location, Location::default(), "station location"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Observation {
    /// The observation used when no provider succeeds.
    pub fn fallback(now: NaiveDateTime) -> Self {
        Self {
            icao: String::from(DEFAULT_ICAO),
            observed: whole_seconds(now),
            barometer: 29.92,
            temperature: 15.0,
            dewpoint: 10.0,
            visibility: crate::units::sm_to_m(10.0),
            wind: Wind {
                direction: 270.0,
                speed: 1.25,
                gust: 3.0,
            },
            clouds: vec![CloudLayer::new("CLR", 0.0)],
            conditions: Vec::new(),
            location: Location::default(),
        }
    }

    /// Replaces every field present in `overrides`.
    pub fn merged(self, overrides: PartialObservation) -> Self {
        Self {
            icao: overrides.icao.unwrap_or(self.icao),
            observed: overrides.observed.unwrap_or(self.observed),
            barometer: overrides.barometer.unwrap_or(self.barometer),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            dewpoint: overrides.dewpoint.unwrap_or(self.dewpoint),
            visibility: overrides.visibility.unwrap_or(self.visibility),
            wind: overrides.wind.unwrap_or(self.wind),
            clouds: overrides.clouds.unwrap_or(self.clouds),
            conditions: overrides.conditions.unwrap_or(self.conditions),
            location: overrides.location.unwrap_or(self.location),
        }
    }
}

pub fn now_utc() -> NaiveDateTime {
    whole_seconds(Utc::now().naive_utc())
}

fn whole_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0).unwrap_or(time)
}

/// Parses the timestamp layouts providers report observation times in.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
}

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn validation_fills_defaults() {
        let observation = PartialObservation::default().validate("ugkO", noon());
        assert_eq!(observation.icao, "UGKO");
        assert_eq!(observation.observed, noon());
        assert_eq!(observation.barometer, 29.92);
        assert_eq!(observation.temperature, 15.0);
        assert_eq!(observation.dewpoint, 0.0);
        assert_eq!(observation.visibility, 9000.0);
        assert_eq!(observation.wind, Wind::default());
        assert!(observation.clouds.is_empty());
        assert_eq!(observation.location, Location::default());
    }

    #[test]
    fn validation_keeps_present_fields() {
        let partial = PartialObservation {
            temperature: Some(-3.5),
            clouds: Some(vec![CloudLayer::new("OVC", 457.2)]),
            ..Default::default()
        };
        let observation = partial.validate("KLAS", noon());
        assert_eq!(observation.temperature, -3.5);
        assert_eq!(observation.clouds, [CloudLayer::new("OVC", 457.2)]);
    }

    #[test]
    fn merge_replaces_only_present_fields() {
        let overrides = PartialObservation {
            wind: Some(Wind {
                direction: 90.0,
                speed: 10.0,
                gust: 0.0,
            }),
            ..Default::default()
        };
        let merged = Observation::fallback(noon()).merged(overrides);
        assert_eq!(merged.wind.direction, 90.0);
        assert_eq!(merged.icao, DEFAULT_ICAO);
        assert_eq!(merged.temperature, 15.0);
    }

    #[test]
    fn timestamps_in_provider_layouts() {
        for text in ["2024-03-09T12:00:00Z", "2024-03-09T12:00:00", "2024-03-09 12:00:00"] {
            assert_eq!(parse_timestamp(text), Some(noon()));
        }
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(format_timestamp(&noon()), "2024-03-09T12:00:00");
    }
}
