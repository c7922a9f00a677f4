//! Write, zap and export commands

use crate::cli::ConfigArgs;
use crate::devices::Device;
use crate::options;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use ykpers_core::codec::{decode_prefixed, Encoding};
use ykpers_core::config::{dump, Config, HMAC_KEY_SIZE};
use ykpers_core::diagnostics::ErrorContext;
use ykpers_core::error::ConfigError;
use ykpers_core::frame::ACC_CODE_SIZE;
use ykpers_core::json;
use ykpers_core::protocol::{self, ConfigWrite};
use ykpers_core::slot::Slot;
use ykpers_core::status::DeviceStatus;

/// Options of the write command besides the configuration itself
#[derive(Debug, Default)]
pub struct WriteArgs {
    /// Current access code, hex
    pub access_code: Option<String>,
    /// The slot is known to be protected
    pub protected: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Save the dump here instead of writing
    pub save: Option<PathBuf>,
}

/// Build a configuration for the device described by `status`
///
/// Order: slot defaults, JSON import, `-o` options, then key material.
fn build_config(
    dev: &mut Device,
    status: &DeviceStatus,
    args: &ConfigArgs,
    ctx: &mut ErrorContext,
) -> Result<Config, Box<dyn Error>> {
    let mut cfg = Config::new();
    ctx.record(cfg.configure_for(args.slot.number(), status))?;

    if let Some(path) = &args.import {
        let text = std::fs::read_to_string(path)?;
        ctx.record(json::import(&mut cfg, &text))?;
        log::info!("Imported configuration from {}", path.display());
    }

    let state = options::apply_options(&mut cfg, &args.options)?;

    if state.access_by_serial {
        if !status.at_least(2, 0) {
            return Err(ykpers_core::Error::from(ConfigError::OldYubikey).into());
        }
        let serial = ctx.record(protocol::read_serial(dev))?;
        cfg.set_access_code_from_serial(serial);
    }

    if let Some(key) = &args.key {
        let result = if key.len() == HMAC_KEY_SIZE * 2 {
            cfg.set_hmac_key_hex(key)
        } else {
            cfg.set_aes_key_hex(key)
        };
        ctx.record(result)?;
    } else if let Some(passphrase) = &args.passphrase {
        let source = ctx.record(cfg.set_key_from_passphrase(passphrase, state.salt.as_deref()))?;
        if source.is_degraded() {
            ctx.note_degraded_salt();
        }
    }

    Ok(cfg)
}

fn parse_access_code(s: &str) -> Result<[u8; ACC_CODE_SIZE], Box<dyn Error>> {
    let bytes = decode_prefixed(s, Encoding::Hex, ACC_CODE_SIZE * 2, ACC_CODE_SIZE * 2)
        .map_err(|e| format!("Invalid access code '{}': {}", s, e))?;
    let mut code = [0u8; ACC_CODE_SIZE];
    code.copy_from_slice(&bytes);
    Ok(code)
}

fn confirm(prompt: &str) -> io::Result<bool> {
    eprint!("{} (y/n) [n]: ", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn log_failure(ctx: &ErrorContext) {
    if let Some(e) = ctx.last_transport_error() {
        log::debug!("last transport error {:#04x}: {}", e.code(), e);
    }
    if let Some(e) = ctx.last_config_error() {
        log::debug!("last configuration error {:#04x}: {}", e.code(), e);
    }
}

/// Program a slot
pub fn cmd_write(dev: &mut Device, config: &ConfigArgs, args: &WriteArgs) -> Result<(), Box<dyn Error>> {
    let mut ctx = ErrorContext::new();
    let status = ctx.record(protocol::check_firmware(dev))?;
    log::info!("Firmware version {}", status.version());

    let cfg = build_config(dev, &status, config, &mut ctx).inspect_err(|_| log_failure(&ctx))?;
    if ctx.degraded_salt() {
        log::warn!("The key was derived with a time-based salt");
    }
    let text = dump(&cfg);

    if let Some(path) = &args.save {
        std::fs::write(path, &text)?;
        log::info!("Configuration saved to {}", path.display());
        return Ok(());
    }

    let code = args.access_code.as_deref().map(parse_access_code).transpose()?;

    eprintln!("Configuration data to be written to {}:\n", cfg.slot());
    eprintln!("{}", text);
    if !args.yes && !confirm("Commit?")? {
        println!("Aborted");
        return Ok(());
    }

    let mut write = ConfigWrite::new(cfg.slot(), cfg.record()).slot_protected(args.protected);
    if let Some(code) = code {
        write = write.access_code(code);
    }
    let result = ctx.record(write.run(dev));
    if result.is_err() {
        log_failure(&ctx);
    }
    let after = result?;
    println!("{} written (program sequence {})", cfg.slot(), after.pgm_seq);
    Ok(())
}

/// Erase a slot
pub fn cmd_zap(
    dev: &mut Device,
    slot_num: u8,
    access_code: Option<&str>,
    yes: bool,
) -> Result<(), Box<dyn Error>> {
    let slot = Slot::from_number(slot_num)?;
    let status = protocol::check_firmware(dev)?;
    if slot == Slot::Two && !status.at_least(2, 0) {
        return Err(ykpers_core::Error::from(ConfigError::OldYubikey).into());
    }
    let code = access_code.map(parse_access_code).transpose()?;

    if !yes && !confirm(&format!("Erase {}?", slot))? {
        println!("Aborted");
        return Ok(());
    }

    let mut write = ConfigWrite::zap(slot);
    if let Some(code) = code {
        write = write.access_code(code);
    }
    write.run(dev)?;
    println!("{} erased", slot);
    Ok(())
}

/// Print the configuration that `write` would program, as JSON
pub fn cmd_export(dev: &mut Device, config: &ConfigArgs) -> Result<(), Box<dyn Error>> {
    let mut ctx = ErrorContext::new();
    let status = protocol::check_firmware(dev)?;
    let cfg = build_config(dev, &status, config, &mut ctx)?;
    println!("{}", json::export_string(&cfg));
    Ok(())
}
