use rand::Rng;
use tracing::info;

use super::has_condition;
use crate::config::{DustOptions, FogMode, FogOptions};
use crate::observation::Observation;
use crate::units::{hpa_to_mmhg, inhg_to_hpa, qnh_to_qff};

const FOG_CODES: &[&str] = &["FG", "BR"];
const DUST_CODES: &[&str] = &["DU", "SA", "HZ", "PO", "DS", "SS"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pressure {
    /// Altimeter setting, kept for the METAR.
    pub qnh_hpa: f64,
    /// Sea level pressure as the mission stores it.
    pub qff_mmhg: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fog {
    pub enabled: bool,
    pub mode: FogMode,
    /// Meters.
    pub thickness: i32,
    /// Meters.
    pub visibility: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dust {
    pub enabled: bool,
    /// Meters.
    pub visibility: i32,
}

pub fn temperature(observation: &Observation) -> f64 {
    info!("   Temperature:           {:.1} °C", observation.temperature);
    observation.temperature
}

pub fn pressure(observation: &Observation, runway_elevation: f64) -> Pressure {
    let qnh_hpa = inhg_to_hpa(observation.barometer);
    let qff = qnh_to_qff(
        qnh_hpa,
        runway_elevation,
        observation.temperature,
        observation.location.latitude,
    );
    let pressure = Pressure {
        qnh_hpa,
        qff_mmhg: hpa_to_mmhg(qff).round() as i32,
    };
    info!("   QNH:                   {:.1} hPa", pressure.qnh_hpa);
    info!("   QFF:                   {} mmHg", pressure.qff_mmhg);
    pressure
}

pub fn fog(observation: &Observation, options: &FogOptions, rng: &mut impl Rng) -> Fog {
    if !has_condition(observation, FOG_CODES) {
        return Fog {
            enabled: false,
            mode: options.mode,
            thickness: 0,
            visibility: 0,
        };
    }

    let fog = Fog {
        enabled: true,
        mode: options.mode,
        thickness: rng.gen_range(options.thickness_minimum..=options.thickness_maximum),
        visibility: rng.gen_range(options.visibility_minimum..=options.visibility_maximum),
    };
    info!(
        "   Fog:                   {} m thick, {} m visibility ({:?})",
        fog.thickness, fog.visibility, fog.mode
    );
    fog
}

pub fn dust(observation: &Observation, options: &DustOptions) -> Dust {
    if !has_condition(observation, DUST_CODES) {
        return Dust {
            enabled: false,
            visibility: 0,
        };
    }

    let visibility = (observation.visibility.round() as i32)
        .clamp(options.visibility_minimum, options.visibility_maximum);
    info!("   Dust visibility:       {visibility} m");
    Dust {
        enabled: true,
        visibility,
    }
}
