//! ykpersonalize - OTP token personalization tool
//!
//! Builds a slot configuration from command line options, shows it, and
//! programs it into a token over USB (or into the in-memory emulator).
//!
//! # Architecture
//!
//! - `ykpers-core` holds the configuration model, the frame codec and the
//!   write/poll protocol, all written against the `HidDevice` trait
//! - `ykpers-usb` and `ykpers-dummy` implement that trait
//! - this binary parses arguments, opens a device and runs one command

mod cli;
mod commands;
mod devices;
mod options;

use clap::Parser;
use cli::{Cli, Commands};
use commands::WriteArgs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Status { device, json } => {
            let mut dev = devices::open_device(&device)?;
            commands::cmd_status(&mut dev, json)
        }
        Commands::Write {
            device,
            config,
            access_code,
            protected,
            yes,
            save,
        } => {
            let mut dev = devices::open_device(&device)?;
            let args = WriteArgs {
                access_code,
                protected,
                yes,
                save,
            };
            commands::cmd_write(&mut dev, &config, &args)
        }
        Commands::Zap {
            device,
            slot,
            access_code,
            yes,
        } => {
            let mut dev = devices::open_device(&device)?;
            commands::cmd_zap(&mut dev, slot.number(), access_code.as_deref(), yes)
        }
        Commands::Serial { device } => {
            let mut dev = devices::open_device(&device)?;
            commands::cmd_serial(&mut dev)
        }
        Commands::ChalResp {
            device,
            slot,
            yubico,
            hex,
            may_block,
            challenge,
        } => {
            let mut dev = devices::open_device(&device)?;
            commands::cmd_chal_resp(&mut dev, slot.number(), yubico, hex, may_block, &challenge)
        }
        Commands::Export { device, config } => {
            let mut dev = devices::open_device(&device)?;
            commands::cmd_export(&mut dev, &config)
        }
        Commands::ListDevices => {
            commands::list_devices();
            Ok(())
        }
    }
}
