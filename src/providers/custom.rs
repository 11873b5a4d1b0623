//! Weather read from a local file in the CheckWX decoded layout, either as a
//! provider of its own or as a partial override of a fetched observation.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use super::{checkwx, ProviderError, WeatherProvider};
use crate::observation::PartialObservation;

pub const NAME: &str = "custom";

pub struct CustomFile {
    path: PathBuf,
}

impl CustomFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }
}

impl WeatherProvider for CustomFile {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fetch(&self, _icao: &str) -> Result<PartialObservation, ProviderError> {
        load(&self.path)
    }
}

/// Reads and normalizes a custom weather file. Fields absent from the file
/// stay empty so the result can be merged over another observation.
pub fn load(path: &Path) -> Result<PartialObservation, ProviderError> {
    let body = fs::read(path)?;
    if let Ok(compact) = serde_json::from_slice::<serde_json::Value>(&body) {
        debug!("Read weather data: {compact}");
    }
    let partial = checkwx::normalize(&body)?;
    info!("Parsed custom weather data from {}", path.display());
    Ok(partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{Observation, Wind};
    use chrono::NaiveDate;
    use std::io::Write;

    #[test]
    fn partial_file_overrides_only_its_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "data": [{{ "wind": {{ "degrees": 40, "speed_mps": 12, "gust_mps": 15 }} }}] }}"#
        )
        .unwrap();

        let overrides = load(file.path()).unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let merged = Observation::fallback(now).merged(overrides);
        assert_eq!(
            merged.wind,
            Wind {
                direction: 40.0,
                speed: 12.0,
                gust: 15.0,
            }
        );
        assert_eq!(merged.barometer, 29.92);
        assert_eq!(merged.icao, "DGAA");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CustomFile::new(dir.path().join("checkwx.json"));
        assert!(matches!(provider.fetch("UGTB"), Err(ProviderError::Io(_))));
    }
}
