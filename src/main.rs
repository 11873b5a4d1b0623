mod archive;
mod brief;
mod config;
mod document;
mod logging;
mod metar;
mod mission;
mod observation;
mod providers;
mod time;
mod units;
mod weather;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use config::{read_config, Config};
use crossterm::{
    event::{self, Event},
    terminal,
    tty::IsTty,
};
use document::Interpreter;
use providers::{custom, openmeteo, Source};
use rand::thread_rng;
use std::{
    io::stdout,
    path::{Path, PathBuf},
    process::exit,
    thread::{sleep, spawn},
    time::Duration,
};
use tracing::{error, info, warn};

/// Whether the real weather made it into the mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    NotApplied,
}

#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Path of the configuration file
    #[clap(long, short, default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    /// Mission file to read, overriding `realweather.mission.input`
    #[clap(long, short)]
    input: Option<String>,

    /// Mission file to write, overriding `realweather.mission.output`
    #[clap(long, short)]
    output: Option<String>,

    /// Run and then exit immediately, without waiting for user input at the end
    #[clap(long, short)]
    batch: bool,

    /// Fetch the weather and print the METAR without reading or writing any miz file
    #[clap(long, short)]
    dry_run: bool,
}

fn update_miz(
    config: &Config,
    parameters: &weather::MissionWeatherParameters,
    metar: &str,
) -> Result<bool> {
    let files = &config.realweather.mission;
    let input = Path::new(&files.input);
    let output = match files.output.trim() {
        "" => input,
        output => Path::new(output),
    };

    let workdir = tempfile::tempdir().context("Cannot create a working directory")?;
    info!("Unpacking {}", input.display());
    archive::unpack(input, workdir.path())
        .with_context(|| format!("Failed to unpack {}", input.display()))?;

    let mut engine = Interpreter::new();
    let applied = match mission::update_mission(&mut engine, workdir.path(), parameters) {
        Ok(()) => true,
        Err(err) => {
            error!("Failed to update mission, leaving it unchanged: {err}");
            false
        }
    };

    if applied && files.brief.add_metar {
        if let Err(err) = brief::update_brief(&mut engine, workdir.path(), &files.brief.insert_key, metar)
        {
            error!("Failed to add METAR to the brief: {err}");
        }
    }

    info!("Writing {}", output.display());
    archive::pack(workdir.path(), output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(applied)
}

fn run(args: &Args) -> Result<Outcome> {
    let mut config = read_config(&args.config)
        .with_context(|| format!("Failed to read configuration from {}", args.config.display()))?;
    if let Some(input) = &args.input {
        config.realweather.mission.input = input.clone();
    }
    if let Some(output) = &args.output {
        config.realweather.mission.output = output.clone();
    }

    logging::init(
        &config.realweather.log.level,
        config.realweather.log.file.as_deref().map(Path::new),
    )?;
    config.validate();

    if !args.dry_run && config.realweather.mission.input.trim().is_empty() {
        return Err(anyhow!(
            "No mission file given, set realweather.mission.input or pass --input"
        ));
    }

    let options = &config.options;
    let now = observation::now_utc();
    let client = providers::http_client()?;
    let providers = providers::from_config(&config.api, &client);
    let fetched = providers::fetch_observation(&providers, &options.weather.icao, now);
    let mut observation = fetched.observation;
    let source = match fetched.source {
        Source::Provider(name) => name,
        Source::Fallback => "built-in defaults",
    };
    info!(
        "Using weather for {} observed {} from {source}",
        observation.icao,
        observation::format_timestamp(&observation.observed)
    );

    if fetched.source != Source::Fallback && config.api.custom.override_fetched {
        match custom::load(Path::new(&config.api.custom.file)) {
            Ok(overrides) => {
                info!("Overriding weather with {}", config.api.custom.file);
                observation = observation.merged(overrides);
            }
            Err(err) => warn!("Cannot read custom weather override: {err}"),
        }
    }

    let aloft = if config.api.openmeteo.enable && options.weather.wind.enable {
        openmeteo::fetch(&client, observation.location, now)
            .map_err(|err| warn!("Winds aloft unavailable, extrapolating instead: {err}"))
            .ok()
    } else {
        None
    };

    let mut parameters = if options.weather.enable {
        info!("-> Computing mission weather for {}", observation.icao);
        weather::compute(&observation, &options.weather, aloft.as_ref(), &mut thread_rng())
    } else {
        weather::MissionWeatherParameters::default()
    };

    if options.time.enable || options.date.enable {
        let clock = time::mission_clock(
            &options.time,
            &options.date,
            observation.observed,
            Local::now().naive_local(),
        );
        if options.time.enable {
            parameters.start_time = Some(clock.start_time);
        }
        if options.date.enable {
            parameters.date = Some(clock.date);
        }
    }

    let metar = metar::generate(&observation, &parameters, &config.realweather.mission.brief.remarks);

    let mut outcome = match fetched.source {
        Source::Fallback => Outcome::NotApplied,
        Source::Provider(_) => Outcome::Applied,
    };
    if args.dry_run {
        info!("Dry run, no mission file was changed");
    } else if !update_miz(&config, &parameters, &metar)? {
        outcome = Outcome::NotApplied;
    }

    info!("METAR: {metar}");
    Ok(outcome)
}

fn pause_and_exit(code: i32, batch: bool) -> ! {
    // Exit if not running in a terminal or in non-interactive mode
    if !stdout().is_tty() || batch {
        exit(code);
    }
    // Auto-exit if the user doesn't respond
    spawn(move || {
        sleep(Duration::from_secs(30));
        eprintln!("Timed out waiting for response");
        exit(code);
    });
    // Wait for user response...
    eprintln!("Press any key or wait 30 seconds to continue...");
    if terminal::enable_raw_mode().is_err() {
        exit(code);
    }
    loop {
        match event::read() {
            Ok(Event::Key(_)) | Err(_) => {
                let _ = terminal::disable_raw_mode();
                exit(code);
            }
            Ok(_) => {}
        }
    }
}

fn main() {
    match Args::try_parse() {
        Ok(args) => match run(&args) {
            Ok(Outcome::Applied) => pause_and_exit(0, args.batch),
            Ok(Outcome::NotApplied) => pause_and_exit(3, args.batch),
            Err(err) => {
                eprintln!("{err:?}\n");
                pause_and_exit(1, args.batch);
            }
        },
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            eprintln!();
            pause_and_exit(2, false);
        }
        Err(err) => err.exit(),
    }
}
