use clap::Parser;
use log::info;
use msgbox::IconType;
use pressure_ble::{init_logging, run, Args};
use pressure_ble::error::{error_msgbox, AppRunError, ConfigError};

fn main() -> Result<(), AppRunError> {
    init_logging();
    info!(concat!("Pressure BLE ", env!("CARGO_PKG_VERSION")));

    let args = Args::parse();
    let headless = args.headless;

    match run(args) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            let message = "This application has already been started";
            if headless {
                eprintln!("{}", message);
            }
            else if let Err(err) = msgbox::create(concat!("Pressure BLE ", env!("CARGO_PKG_VERSION")), message, IconType::Error) {
                eprintln!("Failed to create msgbox: {:?}", err);
            }
            Ok(())
        },
        Err(err) => {
            if headless {
                eprintln!("Unexpected error: {}", err);
            }
            else {
                error_msgbox("Unexpected error", &err);
            }
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
