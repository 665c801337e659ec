use std::path::PathBuf;

use ascent_guidance::*;
use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Body {
    Kerbin,
    Earth,
}

/// Fly a guided ascent against the simulated vehicle.
#[derive(Parser, Debug)]
#[command(name = "ascent-guidance")]
struct Args {
    /// Flight configuration (TOML). A two-stage Kerbin demo flight is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write per-tick telemetry to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Altimeter noise amplitude, m.
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// Seed for the altimeter noise.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = Body::Kerbin)]
    body: Body,

    /// Simulated seconds per telemetry poll.
    #[arg(long, default_value_t = SIMULATION_STEP)]
    step: f64,

    /// Payload carried above the last stage, kg.
    #[arg(long, default_value_t = 5_000.0)]
    payload: f64,
}

fn demo_config() -> GuidanceConfig {
    let stages = vec![
        StageSpec::new(2_150_000.0, 60.0),
        StageSpec::new(1_000_000.0, 50.0),
    ];

    let mut config = GuidanceConfig::new(80_000.0, 80_000.0, stages);
    config.turn_end_altitude = 45_000.0;
    config.coast_time_to_apoapsis = Some(COAST_TIME_TO_APOAPSIS);
    config.orbit_hold = Some(60.0);
    config.atmosphere = Atmosphere::new(1.0, 5_000.0);
    config.tick_interval = 0.0;
    config.max_ticks = Some(50_000);
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init()?;

    let args = Args::parse();
    if !(args.payload > 0.0) {
        return Err(format!("payload must be positive, got {} kg", args.payload).into());
    }

    let config = match &args.config {
        Some(path) => GuidanceConfig::load(path)?,
        None => demo_config(),
    };

    let mut body = match args.body {
        Body::Kerbin => CelestialBody::kerbin(),
        Body::Earth => CelestialBody::earth(),
    };
    body.atmosphere = config.atmosphere;
    info!("Flying from {} with {} stage(s)", body.name, config.stages.len());

    let mut vehicle = SimulatedVehicle::new(body, &config.stages, args.payload)
        .with_thrust_model(config.thrust_model())
        .with_poll_interval(args.step);
    if args.noise > 0.0 {
        vehicle = vehicle.with_altimeter_noise(args.noise, args.seed);
    }

    let mut session = GuidanceSession::new(config, vehicle)?;
    let recorder = session.recorder();
    let outcome = session.run();

    if let Some(path) = &args.csv {
        let mut sink = CsvSink::create(path)?;
        recorder.export_to(&mut sink)?;
        info!("Wrote {} samples to {}", recorder.len(), path.display());
    }

    println!("{}", recorder.summary());

    let report = outcome?;
    println!(
        "Flight ended {:?} after {} ticks ({:.1} s simulated), final stage {:?}",
        report.status,
        report.ticks,
        session.vehicle().time(),
        report.final_stage
    );

    Ok(())
}
