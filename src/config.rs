use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{error::ConfigError, position_log::CreationPolicy, types::DisplayMode};

/// Startup options. Every flag can also come from its `KPM_*` variable.
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
#[command(version, about = "Depth camera frame viewer and spine position logger")]
pub struct AppConfig {
    /// File the sampled spine position is written to.
    #[arg(long, env = "KPM_POSITION_LOG", default_value = "debugwrite.txt")]
    pub position_log: PathBuf,

    #[arg(long, env = "KPM_LOG_POLICY", value_enum, default_value_t = CreationPolicy::ReplaceExisting)]
    pub log_policy: CreationPolicy,

    #[arg(
        long = "log-interval-ms",
        env = "KPM_LOG_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub log_interval_ms: u64,

    #[arg(long, env = "KPM_INITIAL_MODE", default_value = "color")]
    pub initial_mode: DisplayMode,

    /// Write published frames as PNG files into this directory.
    #[arg(long, env = "KPM_DUMP_DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Keep one dumped frame out of this many.
    #[arg(long, env = "KPM_DUMP_EVERY", default_value_t = 30)]
    pub dump_every: u64,

    #[arg(
        long = "tick-ms",
        env = "KPM_TICK_MS",
        default_value_t = 33,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub tick_ms: u64,

    /// Color frame size as WIDTHxHEIGHT. Width must be even for YUY2.
    #[arg(long, env = "KPM_COLOR_SIZE", default_value = "1920x1080", value_parser = parse_size)]
    pub color_size: (u32, u32),
}

impl AppConfig {
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn parse_size(value: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        var: "KPM_COLOR_SIZE",
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| invalid("expected WIDTHxHEIGHT"))?;
    let width: u32 = w.trim().parse().map_err(|_| invalid("width is not a number"))?;
    let height: u32 = h.trim().parse().map_err(|_| invalid("height is not a number"))?;
    if width == 0 || height == 0 || width % 2 != 0 {
        return Err(invalid("width must be even and both sides non-zero"));
    }
    Ok((width, height))
}
