//! Weather providers and the priority-ordered fallback between them.

use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::{
    blocking::{Client, RequestBuilder},
    StatusCode,
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Api;
use crate::observation::{Observation, PartialObservation};

pub mod aviationweather;
pub mod checkwx;
pub mod custom;
pub mod openmeteo;

pub use aviationweather::AviationWeather;
pub use checkwx::CheckWx;
pub use custom::CustomFile;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("bad status: {0}")]
    Status(StatusCode),

    #[error("unusable payload: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Format(err.to_string())
    }
}

/// A source of METAR observations.
pub trait WeatherProvider {
    fn name(&self) -> &'static str;

    /// Fetches and normalizes the latest observation for `icao`. Missing
    /// fields are left empty; defaults are filled by the caller.
    fn fetch(&self, icao: &str) -> Result<PartialObservation, ProviderError>;
}

/// Where the observation used for this run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Provider(&'static str),
    Fallback,
}

#[derive(Debug)]
pub struct Fetched {
    pub observation: Observation,
    pub source: Source,
}

pub fn http_client() -> Result<Client, ProviderError> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Sends `request` and returns the body of a successful response.
pub(crate) fn send(request: RequestBuilder) -> Result<Vec<u8>, ProviderError> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status));
    }
    Ok(response.bytes()?.to_vec())
}

/// Builds the enabled providers in configured priority order.
pub fn from_config(api: &Api, client: &Client) -> Vec<Box<dyn WeatherProvider>> {
    let mut providers: Vec<Box<dyn WeatherProvider>> = Vec::new();
    for name in &api.provider_priority {
        match name.as_str() {
            aviationweather::NAME if api.aviationweather.enable => {
                providers.push(Box::new(AviationWeather::new(client.clone())));
            }
            checkwx::NAME if api.checkwx.enable => {
                providers.push(Box::new(CheckWx::new(client.clone(), &api.checkwx.key)));
            }
            custom::NAME if api.custom.enable => {
                providers.push(Box::new(CustomFile::new(&api.custom.file)));
            }
            _ => {}
        }
    }
    providers
}

/// Tries each provider in order and returns the first observation that
/// normalizes, or the built-in fallback observation.
pub fn fetch_observation(
    providers: &[Box<dyn WeatherProvider>],
    icao: &str,
    now: NaiveDateTime,
) -> Fetched {
    for provider in providers {
        info!("Getting weather from {}...", provider.name());
        match provider.fetch(icao) {
            Ok(partial) if partial.is_empty() => {
                warn!(provider = provider.name(), "Provider returned no usable fields");
            }
            Ok(partial) => {
                info!(provider = provider.name(), "Got weather data");
                return Fetched {
                    observation: partial.validate(icao, now),
                    source: Source::Provider(provider.name()),
                };
            }
            Err(err) => {
                warn!(provider = provider.name(), "Error getting weather: {err}");
            }
        }
    }

    error!("No weather provider succeeded, using default weather");
    Fetched {
        observation: Observation::fallback(now),
        source: Source::Fallback,
    }
}
