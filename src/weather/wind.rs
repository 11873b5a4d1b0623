use rand::Rng;
use tracing::info;

use crate::config::WindOptions;
use crate::observation::Observation;
use crate::providers::openmeteo::WindsAloft;
use crate::units::{flip_heading, wind_profile};

/// Upper layers veer from the layer below by up to this many degrees when
/// extrapolated.
const MAX_VEER: i32 = 45;

/// One mission wind layer. The direction is where the wind blows TO.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindLayer {
    pub speed: f64,
    pub direction: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Winds {
    pub ground: WindLayer,
    pub at_2000: WindLayer,
    pub at_8000: WindLayer,
    /// Ground turbulence, m/s.
    pub gust: f64,
}

fn clamp_speed(speed: f64, options: &WindOptions) -> f64 {
    speed.clamp(options.minimum, options.maximum)
}

/// Converts a "from" heading into the mission's "to" heading, limited to the
/// configured direction window.
fn to_direction(from: i32, options: &WindOptions) -> i32 {
    let to = flip_heading(from);
    match (options.direction_minimum, options.direction_maximum) {
        (Some(minimum), Some(maximum)) => to.clamp(minimum, maximum) % 360,
        _ => to,
    }
}

pub fn compute_winds(
    observation: &Observation,
    options: &WindOptions,
    runway_elevation: f64,
    aloft: Option<&WindsAloft>,
    rng: &mut impl Rng,
) -> Winds {
    let ground_speed = clamp_speed(observation.wind.speed, options);
    let ground_from = (observation.wind.direction.round() as i32).rem_euclid(360);

    let (speed_2000, from_2000, speed_8000, from_8000) = match aloft {
        Some(aloft) => {
            info!("Using winds aloft from Open Meteo");
            (
                aloft.speed_2000,
                aloft.direction_2000.round() as i32,
                aloft.speed_8000,
                aloft.direction_8000.round() as i32,
            )
        }
        None => {
            let reference = if options.fixed_reference {
                1.0
            } else {
                runway_elevation.max(1.0)
            };
            let from_2000 = ground_from + rng.gen_range(0..MAX_VEER);
            let from_8000 = from_2000 + rng.gen_range(0..MAX_VEER);
            (
                wind_profile(2000.0, reference, ground_speed, options.stability),
                from_2000,
                wind_profile(8000.0, reference, ground_speed, options.stability),
                from_8000,
            )
        }
    };

    let winds = Winds {
        ground: WindLayer {
            speed: ground_speed,
            direction: to_direction(ground_from, options),
        },
        at_2000: WindLayer {
            speed: clamp_speed(speed_2000, options),
            direction: to_direction(from_2000, options),
        },
        at_8000: WindLayer {
            speed: clamp_speed(speed_8000, options),
            direction: to_direction(from_8000, options),
        },
        gust: observation
            .wind
            .gust
            .clamp(options.gust_minimum, options.gust_maximum),
    };

    info!("   Ground wind speed:     {:.1} m/s", winds.ground.speed);
    info!("   Ground wind heading:   {}°", winds.ground.direction);
    info!("   2000m wind speed:      {:.1} m/s", winds.at_2000.speed);
    info!("   2000m wind heading:    {}°", winds.at_2000.direction);
    info!("   8000m wind speed:      {:.1} m/s", winds.at_8000.speed);
    info!("   8000m wind heading:    {}°", winds.at_8000.direction);
    info!("   Ground turbulence:     {:.1} m/s", winds.gust);

    winds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Wind;
    use chrono::NaiveDate;
    use rand::{rngs::StdRng, SeedableRng};

    fn observation(direction: f64, speed: f64, gust: f64) -> Observation {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Observation {
            wind: Wind {
                direction,
                speed,
                gust,
            },
            ..Observation::fallback(now)
        }
    }

    #[test]
    fn extrapolated_layers() {
        let options = WindOptions::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let winds = compute_winds(&observation(350.0, 4.0, 7.0), &options, 0.0, None, &mut rng);
            assert_eq!(winds.ground.direction, 170);
            assert_eq!(winds.ground.speed, 4.0);
            assert_eq!(winds.gust, 7.0);

            let expected = wind_profile(2000.0, 1.0, 4.0, 0.143);
            assert!((winds.at_2000.speed - expected).abs() < 1e-9);
            assert!(winds.at_8000.speed > winds.at_2000.speed);

            let veer = (winds.at_2000.direction - winds.ground.direction).rem_euclid(360);
            assert!(veer < MAX_VEER, "{veer}");
            let veer = (winds.at_8000.direction - winds.at_2000.direction).rem_euclid(360);
            assert!(veer < MAX_VEER, "{veer}");
        }
    }

    #[test]
    fn reference_height_follows_runway_unless_fixed() {
        let mut options = WindOptions::default();
        let mut rng = StdRng::seed_from_u64(0);
        let high = compute_winds(&observation(0.0, 4.0, 0.0), &options, 1000.0, None, &mut rng);
        assert!((high.at_2000.speed - wind_profile(2000.0, 1000.0, 4.0, 0.143)).abs() < 1e-9);

        options.fixed_reference = true;
        let fixed = compute_winds(&observation(0.0, 4.0, 0.0), &options, 1000.0, None, &mut rng);
        assert!(fixed.at_2000.speed > high.at_2000.speed);
    }

    #[test]
    fn winds_aloft_override_extrapolation() {
        let aloft = WindsAloft {
            speed_2000: 12.0,
            direction_2000: 250.0,
            speed_8000: 80.0,
            direction_8000: 300.0,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let winds = compute_winds(
            &observation(240.0, 5.0, 0.0),
            &WindOptions::default(),
            0.0,
            Some(&aloft),
            &mut rng,
        );
        assert_eq!(winds.at_2000, WindLayer { speed: 12.0, direction: 70 });
        assert_eq!(winds.at_8000, WindLayer { speed: 50.0, direction: 120 });
    }

    #[test]
    fn clamps_speed_gust_and_direction() {
        let options = WindOptions {
            minimum: 2.0,
            maximum: 10.0,
            gust_maximum: 5.0,
            direction_minimum: Some(100),
            direction_maximum: Some(200),
            ..WindOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let winds = compute_winds(&observation(180.0, 0.5, 12.0), &options, 0.0, None, &mut rng);
        assert_eq!(winds.ground, WindLayer { speed: 2.0, direction: 100 });
        assert_eq!(winds.gust, 5.0);
        for layer in [winds.at_2000, winds.at_8000] {
            assert!((2.0..=10.0).contains(&layer.speed));
            assert!((100..=200).contains(&layer.direction));
        }
    }
}
