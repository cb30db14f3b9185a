use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use clap::Parser;
use log::LevelFilter;

use crate::error::AppRunError;
use crate::gui::application::run_application;
use crate::headless::run_headless;

pub mod config;
pub mod device;
pub mod error;
pub mod gui;
pub mod headless;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Shows live readings from an ESP32_Pressure Bluetooth LE sensor", long_about = None)]
pub struct Args {
    /// Connect immediately and log readings instead of opening a window
    #[arg(long)]
    pub headless: bool,

    /// Use this config file instead of the portable or per-user one
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn log_level() -> LevelFilter {
    env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::Info)
}

pub fn init_logging() {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level())
        // btleplug is very chatty at debug level
        .level_for("btleplug", LevelFilter::Info)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

pub fn run(args: Args) -> Result<(), AppRunError> {
    if args.headless {
        run_headless(args.config.as_deref())?;
    }
    else {
        run_application(args.config.as_deref())?;
    }
    Ok(())
}
