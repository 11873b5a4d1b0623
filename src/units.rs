//! Unit conversions and the small amount of atmospheric physics the weather
//! engine needs. Every conversion is defined by exactly one constant; the
//! inverse direction divides by that same constant.

/// Meters per second in one knot.
pub const KT_TO_MPS: f64 = 1852.0 / 3600.0;
/// Meters in one foot.
pub const FT_TO_M: f64 = 0.3048;
/// Hectopascals in one inch of mercury.
pub const INHG_TO_HPA: f64 = 33.863_886_666_7;
/// Millimeters of mercury in one inch of mercury.
pub const INHG_TO_MMHG: f64 = 25.4;
/// Meters in one statute mile.
pub const SM_TO_M: f64 = 1609.344;

/// QFE drop per meter of elevation, hPa.
const HPA_PER_METER: f64 = 0.111;

pub fn kt_to_mps(kt: f64) -> f64 {
    kt * KT_TO_MPS
}

pub fn mps_to_kt(mps: f64) -> f64 {
    mps / KT_TO_MPS
}

pub fn ft_to_m(ft: f64) -> f64 {
    ft * FT_TO_M
}

pub fn m_to_ft(m: f64) -> f64 {
    m / FT_TO_M
}

pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg * INHG_TO_HPA
}

pub fn hpa_to_inhg(hpa: f64) -> f64 {
    hpa / INHG_TO_HPA
}

pub fn hpa_to_mmhg(hpa: f64) -> f64 {
    hpa_to_inhg(hpa) * INHG_TO_MMHG
}

pub fn sm_to_m(sm: f64) -> f64 {
    sm * SM_TO_M
}

pub fn m_to_sm(m: f64) -> f64 {
    m / SM_TO_M
}

/// Extrapolates wind speed to `target_height` using the wind profile power
/// law. Heights are meters; the target is floored at 0 and the reference at
/// 1 m, and NaN heights take those floors.
pub fn wind_profile(target_height: f64, ref_height: f64, ref_speed: f64, stability: f64) -> f64 {
    let target_height = target_height.max(0.0);
    let ref_height = ref_height.max(1.0);
    ref_speed * (target_height / ref_height).powf(stability)
}

/// Converts QNH (hPa) to QFF (hPa) for a station at `elevation` meters,
/// applying the SMHI correction for temperature inversions.
pub fn qnh_to_qff(qnh: f64, elevation: f64, temperature: f64, latitude: f64) -> f64 {
    let qfe = qnh - HPA_PER_METER * elevation;

    let t = if temperature < -7.0 {
        0.5 * temperature + 275.0
    } else if temperature < 2.0 {
        0.535 * temperature + 275.6
    } else {
        1.07 * temperature + 274.5
    };

    qfe * (elevation * 0.034163 * (1.0 - 0.0026373 * latitude.to_radians().cos()) / t).exp()
}

/// Flips a meteorological "wind from" heading into the "wind to" heading the
/// simulator expects, and back.
pub fn flip_heading(heading: i32) -> i32 {
    (heading + 180).rem_euclid(360)
}
