use rand::{seq::SliceRandom, Rng};
use tracing::{info, warn};

use super::presets::{self, CloudPreset};
use super::{condition_groups, CLEAR_CODES};
use crate::config::CloudOptions;
use crate::observation::{CloudLayer, Observation};
use crate::units::{ft_to_m, m_to_ft};

const PRECIPITATION_CODES: &[&str] = &["RA", "SN", "DZ", "GR", "GS", "PL", "IC", "SG", "UP"];
const STORM_CODE: &str = "TS";

const CUSTOM_BASE_MIN: i32 = 300;
const CUSTOM_BASE_MAX: i32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precipitation {
    None,
    Some,
    Storm,
}

impl Precipitation {
    /// Storms dominate any other precipitation reported alongside them.
    pub fn from_conditions(conditions: &[String]) -> Self {
        conditions
            .iter()
            .flat_map(|code| condition_groups(code))
            .map(|group| match group {
                STORM_CODE => Precipitation::Storm,
                group if PRECIPITATION_CODES.contains(&group) => Precipitation::Some,
                _ => Precipitation::None,
            })
            .max()
            .unwrap_or(Precipitation::None)
    }

    /// The simulator's `iprecptns` value.
    pub fn code(self) -> i32 {
        match self {
            Precipitation::None => 0,
            Precipitation::Some => 1,
            Precipitation::Storm => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloudSelection {
    Clear,
    Preset {
        name: &'static str,
        base: i32,
    },
    /// Clouds described by raw parameters when no preset fits.
    Custom {
        kind: String,
        base: i32,
        thickness: i32,
        density: u32,
        precipitation: Precipitation,
    },
}

impl CloudSelection {
    pub fn preset_name(&self) -> Option<String> {
        match self {
            CloudSelection::Clear => None,
            CloudSelection::Preset { name, .. } => Some((*name).to_owned()),
            CloudSelection::Custom { kind, .. } => Some(format!("CUSTOM {kind}")),
        }
    }

    pub fn base(&self) -> i32 {
        match self {
            CloudSelection::Clear => 0,
            CloudSelection::Preset { base, .. } | CloudSelection::Custom { base, .. } => *base,
        }
    }
}

fn coverage_rank(coverage: &str) -> u8 {
    match coverage {
        "OVC" => 4,
        "BKN" => 3,
        "SCT" => 2,
        "FEW" => 1,
        _ => 0,
    }
}

fn is_ceiling(layer: &CloudLayer) -> bool {
    matches!(layer.coverage.as_str(), "BKN" | "OVC")
}

/// Picks the layer the mission clouds are modelled on: the fullest layer
/// when it is precipitating, otherwise the first ceiling, otherwise the
/// first layer.
fn base_layer(layers: &[CloudLayer], precipitation: Precipitation) -> Option<&CloudLayer> {
    if precipitation > Precipitation::None {
        // max_by_key keeps the last maximum, so search from the back
        layers
            .iter()
            .rev()
            .max_by_key(|layer| coverage_rank(&layer.coverage))
    } else {
        layers.iter().find(|layer| is_ceiling(layer)).or(layers.first())
    }
}

pub fn select_clouds(
    observation: &Observation,
    options: &CloudOptions,
    runway_elevation: f64,
    rng: &mut impl Rng,
) -> CloudSelection {
    let precipitation = Precipitation::from_conditions(&observation.conditions);
    let Some(layer) = base_layer(&observation.clouds, precipitation) else {
        return CloudSelection::Clear;
    };

    let base = (runway_elevation.round() as i32 + layer.base.round() as i32)
        .clamp(options.base.minimum, options.base.maximum);

    select_preset(&layer.coverage, base, precipitation, options, rng)
}

pub fn select_preset(
    coverage: &str,
    base: i32,
    precipitation: Precipitation,
    options: &CloudOptions,
    rng: &mut impl Rng,
) -> CloudSelection {
    if CLEAR_CODES.contains(&coverage) {
        return CloudSelection::Clear;
    }

    let mut kind = coverage.to_owned();
    if precipitation > Precipitation::None {
        if matches!(coverage, "OVC" | "BKN" | "SCT") {
            kind = format!("{coverage}+RA");
        } else if options.fallback_to_legacy {
            info!("No precipitation preset for {coverage} clouds, using custom clouds");
            return custom_clouds(coverage, base, precipitation, options, rng);
        } else {
            warn!("No suitable preset for {coverage} clouds with precipitation, ignoring precipitation");
        }
    }

    let allowed = |preset: &&CloudPreset| !options.presets.disallowed.iter().any(|d| d == preset.name);
    let candidates: Vec<_> = presets::presets_of(&kind)
        .iter()
        .filter(allowed)
        .filter(|preset| preset.contains(base))
        .collect();

    if let Some(preset) = candidates.choose(rng) {
        return CloudSelection::Preset {
            name: preset.name,
            base,
        };
    }

    warn!("No suitable weather preset for code={kind} and base={base}");

    if options.fallback_to_legacy {
        info!("Fallback to no preset is enabled, using custom clouds");
        return custom_clouds(coverage, base, precipitation, options, rng);
    }

    let (minimum, maximum) = (options.base.minimum, options.base.maximum);
    let relaxed: Vec<_> = presets::presets_of(&kind)
        .iter()
        .filter(allowed)
        .filter(|preset| preset.overlaps(minimum, maximum))
        .collect();

    if let Some(preset) = relaxed.choose(rng) {
        info!("Expanding search to any {kind} preset within the configured base range");
        let base = rng.gen_range(preset.min_base.max(minimum)..=preset.max_base.min(maximum));
        return CloudSelection::Preset {
            name: preset.name,
            base,
        };
    }

    match default_preset(options) {
        Some(selection) => {
            warn!("No allowed presets for {kind}, using the default preset");
            selection
        }
        None => {
            warn!("No allowed presets for {kind}, defaulting to clear skies");
            CloudSelection::Clear
        }
    }
}

/// The configured default preset at its first decoded layer, if it is a
/// known preset that is allowed and reachable within the base clamp.
fn default_preset(options: &CloudOptions) -> Option<CloudSelection> {
    let name = options.presets.default.as_str();
    if name.is_empty() {
        return None;
    }
    let (minimum, maximum) = (options.base.minimum, options.base.maximum);
    let preset = presets::find(name).filter(|preset| {
        !options.presets.disallowed.iter().any(|d| d == preset.name)
            && preset.overlaps(minimum, maximum)
    });
    let Some(preset) = preset else {
        warn!("Default preset {name} cannot be used with the configured limits");
        return None;
    };
    let first = presets::decode(preset.name)?.first()?;
    let base = (ft_to_m(f64::from(first.base) * 100.0).round() as i32).clamp(minimum, maximum);
    Some(CloudSelection::Preset {
        name: preset.name,
        base,
    })
}

fn custom_clouds(
    coverage: &str,
    base: i32,
    precipitation: Precipitation,
    options: &CloudOptions,
    rng: &mut impl Rng,
) -> CloudSelection {
    let base = base
        .clamp(CUSTOM_BASE_MIN, CUSTOM_BASE_MAX)
        .clamp(options.base.minimum, options.base.maximum);

    let thickness = match precipitation {
        Precipitation::Storm => rng.gen_range(1500..=2000),
        _ => rng.gen_range(200..=2000),
    };

    let kind: String = coverage.chars().take(3).collect();
    let density: u32 = match kind.as_str() {
        "OVC" | "OVX" => 10,
        "BKN" => rng.gen_range(7..=9),
        "SCT" => rng.gen_range(4..=6),
        "FEW" => rng.gen_range(1..=3),
        _ => 0,
    };
    let density = density.clamp(options.density_minimum, options.density_maximum);

    let precipitation = if options.custom_precipitation {
        precipitation
    } else {
        Precipitation::None
    };

    info!(
        "   Custom clouds:         {kind}, base {base} m ({:.0} ft), thickness {thickness} m, density {density}",
        m_to_ft(f64::from(base))
    );

    CloudSelection::Custom {
        kind,
        base,
        thickness,
        density,
        precipitation,
    }
}
