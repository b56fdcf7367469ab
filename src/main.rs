use anyhow::{Context, Result};
use clap::{Parser, error::ErrorKind};
use crossbeam_channel::{Receiver, bounded, never, select, unbounded};

use kinect_position_mapper::{
    ModeController,
    config::AppConfig,
    input::{self, Command},
    pipeline::SharedPosition,
    position_log::{FileSink, PositionLogger},
    presenter::{FrameDumpRenderer, LogRenderer, Renderer},
    sensor::{
        Sensor,
        synthetic::{SyntheticBundle, SyntheticSensor, start_synthetic_stream},
    },
};

// One bundle in ten loses its color frame, as on a loaded USB bus.
const DROPPED_COLOR_EVERY: u64 = 10;

fn main() -> Result<()> {
    env_logger::init();

    let config = match AppConfig::try_parse() {
        Ok(config) => config,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return Err(err).context("invalid configuration"),
    };
    let (color_width, color_height) = config.color_size;

    let mut sensor = SyntheticSensor::new(color_width, color_height);
    sensor.open().context("failed to open sensor")?;

    let renderer: Box<dyn Renderer> = match &config.dump_dir {
        Some(dir) => Box::new(FrameDumpRenderer::new(dir, config.dump_every)?),
        None => Box::new(LogRenderer::default()),
    };

    let position = SharedPosition::default();
    let sink = FileSink::create(&config.position_log, config.log_policy)?;
    log::info!("logging spine position to {}", sink.path().display());
    let logger = PositionLogger::spawn(position.clone(), sink, config.log_interval());

    let (bundle_tx, bundle_rx) = bounded(1);
    let stream = start_synthetic_stream(
        sensor.clone(),
        config.tick_interval(),
        Some(DROPPED_COLOR_EVERY),
        bundle_tx,
    );

    let (command_tx, command_rx) = unbounded();
    let _input = input::spawn_stdin_commands(command_tx);

    let mut controller = ModeController::new(sensor, renderer, config.initial_mode, position);
    controller.poll_availability();

    run(&mut controller, &bundle_rx, command_rx);

    stream.stop();
    logger.stop();
    controller.sensor_mut().close();
    controller.poll_availability();
    Ok(())
}

fn run(
    controller: &mut ModeController<SyntheticSensor, Box<dyn Renderer>>,
    bundle_rx: &Receiver<SyntheticBundle>,
    command_rx: Receiver<Command>,
) {
    let idle = never();
    let mut stdin_open = true;
    loop {
        let commands = if stdin_open { &command_rx } else { &idle };
        select! {
            recv(bundle_rx) -> bundle => {
                let Ok(bundle) = bundle else {
                    log::error!("frame stream ended");
                    break;
                };
                let bundle = latest_bundle(bundle, bundle_rx);
                controller.poll_availability();
                if let Err(err) = controller.handle_bundle(&bundle) {
                    log::warn!("tick failed: {err}");
                }
            }
            recv(commands) -> command => match command {
                Ok(Command::Switch(mode)) => {
                    controller.switch_mode(mode);
                }
                Ok(Command::Quit) => break,
                // Stdin closed; keep running on the frame stream alone.
                Err(_) => stdin_open = false,
            }
        }
    }
}

fn latest_bundle(mut bundle: SyntheticBundle, bundle_rx: &Receiver<SyntheticBundle>) -> SyntheticBundle {
    while let Ok(newer) = bundle_rx.try_recv() {
        bundle = newer;
    }
    bundle
}
