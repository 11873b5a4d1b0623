//! The simulator's cloud presets: which base ranges each one supports, and
//! the layers each one renders as in a METAR.

/// A cloud preset and the base range, in meters, it can be placed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloudPreset {
    pub name: &'static str,
    pub min_base: i32,
    pub max_base: i32,
}

impl CloudPreset {
    pub fn contains(&self, base: i32) -> bool {
        (self.min_base..=self.max_base).contains(&base)
    }

    pub fn overlaps(&self, minimum: i32, maximum: i32) -> bool {
        self.min_base < maximum && self.max_base > minimum
    }
}

/// One decoded layer: coverage code and base in hundreds of feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer {
    pub coverage: &'static str,
    pub base: u32,
}

macro_rules! presets {
    ($($name:literal $min:literal $max:literal),* $(,)?) => {
        &[$(CloudPreset { name: $name, min_base: $min, max_base: $max }),*]
    };
}

macro_rules! layers {
    ($($coverage:literal $base:literal),* $(,)?) => {
        &[$(Layer { coverage: $coverage, base: $base }),*]
    };
}

static CATALOG: &[(&str, &[CloudPreset])] = &[
    ("FEW", presets!["Preset1" 840 4200, "Preset2" 1260 2520]),
    (
        "SCT",
        presets![
            "Preset3" 840 2520,
            "Preset4" 1260 2520,
            "Preset5" 1260 4620,
            "Preset6" 1260 4200,
            "Preset7" 1680 5040,
            "Preset8" 3780 5460,
            "Preset9" 1680 3780,
            "Preset10" 1260 4200,
            "Preset11" 2520 5460,
            "Preset12" 1680 3360,
        ],
    ),
    ("SCT+RA", presets!["RainyPreset4" 1260 4200, "NEWRAINPRESET4" 840 5174]),
    (
        "BKN",
        presets![
            "Preset13" 1680 3360,
            "Preset14" 1680 3360,
            "Preset15" 840 5040,
            "Preset16" 1260 4200,
            "Preset17" 0 2520,
            "Preset18" 0 3780,
            "Preset19" 0 2940,
            "Preset20" 0 3780,
        ],
    ),
    ("BKN+RA", presets!["RainyPreset5" 1260 2520]),
    (
        "OVC",
        presets![
            "Preset21" 1260 4200,
            "Preset22" 420 4200,
            "Preset23" 840 3360,
            "Preset24" 420 2520,
            "Preset25" 420 3360,
            "Preset26" 420 2940,
            "Preset27" 420 2520,
        ],
    ),
    (
        "OVC+RA",
        presets![
            "RainyPreset1" 420 2940,
            "RainyPreset2" 840 2520,
            "RainyPreset3" 840 2520,
            "RainyPreset6" 1260 2940,
        ],
    ),
];

static DECODE: &[(&str, &[Layer])] = &[
    ("Preset1", layers!["FEW" 70]),
    ("Preset2", layers!["FEW" 80, "SCT" 230]),
    ("Preset3", layers!["SCT" 80, "FEW" 210]),
    ("Preset4", layers!["SCT" 80, "SCT" 240]),
    ("Preset5", layers!["SCT" 140, "FEW" 270, "BKN" 400]),
    ("Preset6", layers!["SCT" 80, "FEW" 400]),
    ("Preset7", layers!["BKN" 75, "SCT" 210, "SCT" 400]),
    ("Preset8", layers!["SCT" 180, "FEW" 360, "FEW" 400]),
    ("Preset9", layers!["BKN" 75, "SCT" 200, "FEW" 410]),
    ("Preset10", layers!["SCT" 180, "FEW" 360, "FEW" 400]),
    ("Preset11", layers!["BKN" 180, "BKN" 320, "FEW" 410]),
    ("Preset12", layers!["BKN" 120, "SCT" 220, "FEW" 410]),
    ("Preset13", layers!["BKN" 120, "BKN" 260, "FEW" 410]),
    ("Preset14", layers!["BKN" 70, "FEW" 410]),
    ("Preset15", layers!["SCT" 140, "BKN" 240, "FEW" 400]),
    ("Preset16", layers!["BKN" 140, "BKN" 280, "FEW" 400]),
    ("Preset17", layers!["BKN" 70, "BKN" 200, "BKN" 320]),
    ("Preset18", layers!["BKN" 130, "BKN" 250, "BKN" 380]),
    ("Preset19", layers!["OVC" 90, "BKN" 230, "BKN" 310]),
    ("Preset20", layers!["BKN" 130, "BKN" 280, "FEW" 380]),
    ("Preset21", layers!["BKN" 70, "OVC" 170]),
    ("Preset22", layers!["OVC" 70, "BKN" 170]),
    ("Preset23", layers!["OVC" 110, "BKN" 180, "SCT" 320]),
    ("Preset24", layers!["OVC" 30, "OVC" 170, "BKN" 340]),
    ("Preset25", layers!["OVC" 120, "OVC" 220, "OVC" 400]),
    ("Preset26", layers!["OVC" 90, "BKN" 230, "SCT" 320]),
    ("Preset27", layers!["OVC" 80, "BKN" 250, "BKN" 340]),
    ("RainyPreset1", layers!["OVC" 30, "OVC" 280, "FEW" 400]),
    ("RainyPreset2", layers!["OVC" 30, "SCT" 180, "FEW" 400]),
    ("RainyPreset3", layers!["OVC" 60, "OVC" 190, "SCT" 340]),
    ("RainyPreset4", layers!["SCT" 80, "FEW" 360]),
    ("RainyPreset5", layers!["BKN" 70, "BKN" 200, "BKN" 320]),
    ("RainyPreset6", layers!["OVC" 90, "BKN" 230, "BKN" 310]),
    ("NEWRAINPRESET4", layers!["SCT" 80, "SCT" 120]),
];

/// Presets of one kind (`OVC`, `BKN+RA`, ...), in catalog order.
pub fn presets_of(kind: &str) -> &'static [CloudPreset] {
    CATALOG
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, presets)| *presets)
        .unwrap_or(&[])
}

/// Any catalog preset by name.
pub fn find(name: &str) -> Option<&'static CloudPreset> {
    CATALOG
        .iter()
        .flat_map(|(_, presets)| presets.iter())
        .find(|preset| preset.name == name)
}

/// The METAR layers a preset renders as.
pub fn decode(name: &str) -> Option<&'static [Layer]> {
    DECODE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, layers)| *layers)
}
