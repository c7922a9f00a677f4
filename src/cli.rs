//! CLI argument parsing

use crate::devices;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the device argument
fn device_help() -> String {
    format!(
        "Device to use [available: {}]",
        devices::device_names_short()
    )
}

#[derive(Parser)]
#[command(name = "ykpersonalize")]
#[command(author, version, about = "OTP token personalization tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Slot selection shared across commands
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(multiple = false)]
pub struct SlotArgs {
    /// Use the first configuration slot (default)
    #[arg(short = '1')]
    pub first: bool,

    /// Use the second configuration slot
    #[arg(short = '2')]
    pub second: bool,
}

impl SlotArgs {
    /// Selected slot number
    pub fn number(&self) -> u8 {
        if self.second {
            2
        } else {
            1
        }
    }
}

/// Options that build a configuration
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub slot: SlotArgs,

    /// Key in hex: 32 characters (AES) or 40 characters (HMAC, OATH-HOTP
    /// and HMAC challenge-response modes only)
    #[arg(short = 'a', long = "key")]
    pub key: Option<String>,

    /// Derive the AES key from this passphrase (see -o salt=...)
    #[arg(long, conflicts_with = "key")]
    pub passphrase: Option<String>,

    /// Configuration option, repeatable: fixed=, uid=, access=, salt=,
    /// oath-imf= or [-]flag-name
    #[arg(short = 'o', long = "option")]
    pub options: Vec<String>,

    /// Start from a JSON configuration file
    #[arg(short = 'i', long)]
    pub import: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show firmware version and slot status
    Status {
        /// Device to use
        #[arg(short, long, default_value = "usb", help = device_help())]
        device: String,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Program a configuration slot
    Write {
        /// Device to use
        #[arg(short, long, default_value = "usb", help = device_help())]
        device: String,

        #[command(flatten)]
        config: ConfigArgs,

        /// Current access code of the slot, 12 hex characters
        #[arg(short = 'c', long = "access-code")]
        access_code: Option<String>,

        /// The slot carries an access code; refuse to write without -c
        #[arg(long)]
        protected: bool,

        /// Commit without asking
        #[arg(short = 'y', long)]
        yes: bool,

        /// Save the configuration to this file instead of writing it
        #[arg(short = 's', long)]
        save: Option<PathBuf>,
    },

    /// Erase a configuration slot
    Zap {
        /// Device to use
        #[arg(short, long, default_value = "usb", help = device_help())]
        device: String,

        #[command(flatten)]
        slot: SlotArgs,

        /// Current access code of the slot, 12 hex characters
        #[arg(short = 'c', long = "access-code")]
        access_code: Option<String>,

        /// Commit without asking
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Read the device serial number
    Serial {
        /// Device to use
        #[arg(short, long, default_value = "usb", help = device_help())]
        device: String,
    },

    /// Send a challenge to a slot and print the response
    ChalResp {
        /// Device to use
        #[arg(short, long, default_value = "usb", help = device_help())]
        device: String,

        #[command(flatten)]
        slot: SlotArgs,

        /// Use Yubico OTP challenge-response instead of HMAC-SHA1
        #[arg(long)]
        yubico: bool,

        /// The challenge is given in hex
        #[arg(short = 'x', long)]
        hex: bool,

        /// Wait for a button press if the slot requires one
        #[arg(long)]
        may_block: bool,

        /// Challenge
        challenge: String,
    },

    /// Print a configuration as JSON without writing it
    Export {
        /// Device to use
        #[arg(short, long, default_value = "usb", help = device_help())]
        device: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// List device backends and connected tokens
    ListDevices,
}
